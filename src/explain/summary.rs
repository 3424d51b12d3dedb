//! Resumos gerados a partir do próprio motor: a tabela de regras em
//! markdown e um resumo estrutural (variáveis, termos, contagens).
//!
//! Como tudo sai da definição compilada, a documentação nunca diverge das
//! regras realmente avaliadas.

use serde::Serialize;

use crate::core::{Antecedent, LinguisticVariable};
use crate::inference::InferenceEngine;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableSummary {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub terms: Vec<String>,
}

impl From<&LinguisticVariable> for VariableSummary {
    fn from(v: &LinguisticVariable) -> Self {
        Self {
            name: v.name.clone(),
            min: v.universe.min,
            max: v.universe.max,
            terms: v.term_names().map(String::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputSummary {
    #[serde(flatten)]
    pub variable: VariableSummary,
    pub rules: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSummary {
    pub name: String,
    pub description: String,
    pub inputs: Vec<VariableSummary>,
    pub outputs: Vec<OutputSummary>,
    pub rule_count: usize,
    pub trace_threshold: f64,
    pub trace_limit: usize,
}

/// Resumo estrutural de um sistema.
pub fn system_summary(engine: &InferenceEngine) -> SystemSummary {
    let definition = engine.definition();
    SystemSummary {
        name: definition.name.clone(),
        description: definition.description.clone(),
        inputs: definition.inputs.iter().map(VariableSummary::from).collect(),
        outputs: definition
            .outputs
            .iter()
            .map(|o| OutputSummary {
                variable: VariableSummary::from(&o.variable),
                rules: o.rules.len(),
            })
            .collect(),
        rule_count: definition.rule_count(),
        trace_threshold: engine.tracer().threshold(),
        trace_limit: engine.tracer().limit(),
    }
}

/// Antecedente em notação simbólica: `price=VERY_HIGH ∧ consumption=LOW`.
fn symbolic(antecedent: &Antecedent) -> String {
    let join = |children: &[Antecedent], op: &str| {
        children
            .iter()
            .map(|c| match c {
                Antecedent::Is(_) => symbolic(c),
                _ => format!("({})", symbolic(c)),
            })
            .collect::<Vec<_>>()
            .join(op)
    };
    match antecedent {
        Antecedent::Is(c) => format!("{}={}", c.variable, c.term.to_uppercase()),
        Antecedent::And(children) => join(children, " ∧ "),
        Antecedent::Or(children) => join(children, " ∨ "),
    }
}

/// Tabela markdown de todas as regras, por saída.
pub fn rules_summary(engine: &InferenceEngine) -> String {
    let definition = engine.definition();
    let mut out = format!(
        "## 🧠 Base de Regras — {}\n\n{}\n\n\
         **Operadores:** AND (∧) = min · OR (∨) = max · \
         Implicação = min · Agregação = max · Defuzzificação = centroide\n",
        definition.name, definition.description
    );

    for output in &definition.outputs {
        out.push_str(&format!(
            "\n### {} ({} regras)\n\n| # | SE (Antecedente) | ENTÃO (Consequente) | Peso |\n|---|---|---|---|\n",
            output.variable.name,
            output.rules.len()
        ));
        for rule in &output.rules.rules {
            out.push_str(&format!(
                "| {} | {} | {}={} | {:.2} |\n",
                rule.id,
                symbolic(&rule.antecedent),
                rule.consequent.variable,
                rule.consequent.term.to_uppercase(),
                rule.weight
            ));
        }
    }
    out
}
