//! # Definições Declarativas de Sistemas Fuzzy
//!
//! Um [`SystemDefinition`] é a **tabela** completa de um sistema:
//! variáveis de entrada, saídas com suas bases de regras e a configuração
//! de rastreamento (quais regras explicar e com que texto).
//!
//! O mesmo motor é instanciado várias vezes a partir de definições
//! diferentes (mercado, fatura, eficiência) sem nenhuma especialização
//! de código. As definições embarcadas são montadas com o builder abaixo;
//! definições externas chegam como JSON (ver [`crate::persistence`]).
//!
//! ## Formato JSON (resumido)
//!
//! ```json
//! {
//!   "name": "market",
//!   "inputs": [{"name": "price", "universe": {"min": 0, "max": 200},
//!               "role": "antecedent", "terms": [...]}],
//!   "outputs": [{"variable": {...}, "rules": [...]}],
//!   "trace": {"threshold": 0.3, "limit": 6, "probes": [...],
//!             "interpretations": {"entries": {...}, "fallback": "..."}}
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::rule::{Antecedent, Clause, Rule, RuleBase};
use super::variable::LinguisticVariable;

/// Limiar padrão de força para uma regra ser considerada ativa.
pub const DEFAULT_TRACE_THRESHOLD: f64 = 0.3;

/// Quantidade padrão de regras ativas reportadas.
pub const DEFAULT_TRACE_LIMIT: usize = 8;

/// Uma saída do sistema e a base de regras que escreve nela.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDefinition {
    pub variable: LinguisticVariable,
    pub rules: RuleBase,
}

/// Sonda de rastreamento: enumera **todas** as combinações de termos das
/// variáveis listadas (1 a 3) e reporta as que passam do limiar.
///
/// Complementa as regras das bases com leituras que não geram regra
/// própria (ex: "fatura é HIGH e consumo é MEDIUM").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probe {
    /// Prefixo do id reportado (`BC` → `BC_very_high_high`).
    pub id_prefix: String,
    pub variables: Vec<String>,
    /// Se `true`, combinações sem interpretação cadastrada são omitidas.
    #[serde(default)]
    pub mapped_only: bool,
}

impl Probe {
    pub fn new(id_prefix: &str, variables: &[&str]) -> Self {
        Self {
            id_prefix: id_prefix.to_string(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
            mapped_only: false,
        }
    }

    pub fn mapped_only(mut self) -> Self {
        self.mapped_only = true;
        self
    }
}

/// Tabela estática `chave do antecedente → texto interpretativo`.
///
/// Chaves seguem [`Antecedent::key()`]. Combinações não mapeadas recebem
/// o texto `fallback`, nunca uma explicação vazia.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpretations {
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
    pub fallback: String,
}

impl Default for Interpretations {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            fallback: "Padrão típico detectado".to_string(),
        }
    }
}

impl Interpretations {
    /// Texto cadastrado para a chave, se houver.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Texto cadastrado ou o fallback.
    pub fn resolve(&self, key: &str) -> &str {
        self.lookup(key).unwrap_or(&self.fallback)
    }
}

fn default_threshold() -> f64 {
    DEFAULT_TRACE_THRESHOLD
}

fn default_limit() -> usize {
    DEFAULT_TRACE_LIMIT
}

fn default_true() -> bool {
    true
}

/// Configuração da extração de regras ativas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSettings {
    /// Força mínima (exclusiva) para uma regra ser reportada.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Máximo de regras reportadas.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Se as regras das bases entram no rastreamento.
    #[serde(default = "default_true")]
    pub include_rules: bool,
    #[serde(default)]
    pub probes: Vec<Probe>,
    #[serde(default)]
    pub interpretations: Interpretations,
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_TRACE_THRESHOLD,
            limit: DEFAULT_TRACE_LIMIT,
            include_rules: true,
            probes: Vec::new(),
            interpretations: Interpretations::default(),
        }
    }
}

/// Tabela completa de um sistema fuzzy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub inputs: Vec<LinguisticVariable>,
    pub outputs: Vec<OutputDefinition>,
    #[serde(default)]
    pub trace: TraceSettings,
    /// Regras do builder sem saída correspondente.
    #[serde(skip)]
    pub orphan_rules: Vec<Rule>,
}

impl SystemDefinition {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            trace: TraceSettings::default(),
            orphan_rules: Vec::new(),
        }
    }

    pub fn input(mut self, variable: LinguisticVariable) -> Self {
        self.inputs.push(variable);
        self
    }

    /// Declara uma saída com base de regras vazia.
    pub fn output(mut self, variable: LinguisticVariable) -> Self {
        self.outputs.push(OutputDefinition {
            variable,
            rules: RuleBase::default(),
        });
        self
    }

    /// Adiciona uma regra AND à saída `output`, com interpretação opcional.
    pub fn rule(
        mut self,
        id: &str,
        when: &[(&str, &str)],
        output: &str,
        then: &str,
        interpretation: Option<&str>,
    ) -> Self {
        let rule = Rule::new(id, Antecedent::all(when), Clause::new(output, then));
        if let Some(text) = interpretation {
            self.trace
                .interpretations
                .entries
                .insert(rule.antecedent.key(), text.to_string());
        }
        self.push_rule(rule);
        self
    }

    /// Adiciona uma regra arbitrária à saída indicada pelo seu consequente.
    ///
    /// Regras cuja saída não foi declarada ficam em `orphan_rules` e fazem
    /// a construção do motor falhar com `UnknownOutput`.
    pub fn push_rule(&mut self, rule: Rule) {
        match self
            .outputs
            .iter_mut()
            .find(|o| o.variable.name == rule.consequent.variable)
        {
            Some(out) => out.rules.rules.push(rule),
            None => self.orphan_rules.push(rule),
        }
    }

    pub fn probe(mut self, probe: Probe) -> Self {
        self.trace.probes.push(probe);
        self
    }

    /// Cadastra uma interpretação para uma combinação de termos.
    pub fn interpret(mut self, when: &[(&str, &str)], text: &str) -> Self {
        self.trace
            .interpretations
            .entries
            .insert(Antecedent::all(when).key(), text.to_string());
        self
    }

    pub fn fallback_text(mut self, text: &str) -> Self {
        self.trace.interpretations.fallback = text.to_string();
        self
    }

    pub fn trace_limit(mut self, limit: usize) -> Self {
        self.trace.limit = limit;
        self
    }

    /// Total de regras em todas as saídas.
    pub fn rule_count(&self) -> usize {
        self.outputs.iter().map(|o| o.rules.len()).sum()
    }
}
