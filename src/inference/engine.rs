//! # Motor Mamdani
//!
//! O [`InferenceEngine`] é a tubulação completa de um sistema fuzzy:
//!
//! ```text
//! entradas crisp ──▶ limita ao universo ──▶ fuzzifica (uma vez)
//!                                              │
//!             ┌────────────────────────────────┤
//!             ▼                                ▼
//!   força de cada regra (min/max)      rastreamento (RuleTracer)
//!             │
//!   implicação: min(força, μ_consequente(y))
//!             │
//!   agregação: max entre regras
//!             │
//!   centroide discreto  Σ y·μ(y) / Σ μ(y)   (ou ponto médio)
//!             │
//!   banding: score ──▶ termo dominante
//! ```
//!
//! ## Imutabilidade
//!
//! Toda validação acontece em [`InferenceEngine::new`]. Depois disso o motor
//! é somente-leitura: `evaluate` recebe `&self`, não há cache nem mutação
//! interna, e o tipo é `Send + Sync`. Várias threads podem avaliar ao mesmo
//! tempo sem qualquer trava ([`InferenceEngine::evaluate_batch`] faz isso
//! com `rayon`).
//!
//! ## Ponto Médio Neutro
//!
//! Se nenhuma regra de uma saída dispara, a agregação é identicamente zero e
//! o centroide é indefinido. O score assume então o ponto médio do universo
//! e a saída é marcada em `fallback_outputs`, para que o chamador saiba que
//! aquele valor não veio de regra alguma.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::Serialize;

use super::trace::{ActiveRule, RuleTracer};
use crate::core::{
    CompiledRule, FuzzyError, FuzzyResult, LinguisticVariable, MembershipMap, OutputDefinition,
    SystemDefinition, VariableRole,
};

/// Resultado completo de uma avaliação.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub system: String,
    /// Entradas efetivamente usadas (já limitadas ao universo).
    pub inputs: BTreeMap<String, f64>,
    /// Score defuzzificado por saída.
    pub crisp_outputs: BTreeMap<String, f64>,
    /// Termo da faixa em que cada score caiu.
    pub dominant_terms: BTreeMap<String, String>,
    /// Fuzzificação de cada entrada, na ordem declarada dos termos.
    pub input_memberships: BTreeMap<String, MembershipMap>,
    pub active_rules: Vec<ActiveRule>,
    /// Saídas em que nenhuma regra disparou (score = ponto médio).
    pub fallback_outputs: Vec<String>,
}

impl EvaluationResult {
    pub fn score(&self, output: &str) -> Option<f64> {
        self.crisp_outputs.get(output).copied()
    }

    pub fn dominant(&self, output: &str) -> Option<&str> {
        self.dominant_terms.get(output).map(String::as_str)
    }

    pub fn is_fallback(&self, output: &str) -> bool {
        self.fallback_outputs.iter().any(|o| o == output)
    }
}

/// Saída com regras compiladas e curvas de consequente pré-amostradas.
#[derive(Debug, Clone)]
struct CompiledOutput {
    rules: Vec<CompiledRule>,
    grid: Vec<f64>,
    /// `term_curves[termo][i]` = μ_termo(grid[i]).
    term_curves: Vec<Vec<f64>>,
}

impl CompiledOutput {
    fn new(output: &OutputDefinition, inputs: &[LinguisticVariable]) -> FuzzyResult<Self> {
        let variable = &output.variable;
        let rules = output.rules.compile(inputs, variable)?;
        let grid: Vec<f64> = variable.universe.grid().collect();
        let term_curves = variable
            .terms
            .iter()
            .map(|t| grid.iter().map(|&y| t.membership(y)).collect())
            .collect();
        Ok(Self {
            rules,
            grid,
            term_curves,
        })
    }

    /// Conjunto agregado: `max` sobre regras de `min(força, μ_consequente)`.
    ///
    /// Regras com força 0 não contribuem e são puladas.
    fn aggregate(&self, strengths: &[f64]) -> Vec<f64> {
        let mut aggregated = vec![0.0_f64; self.grid.len()];
        for (rule, &strength) in self.rules.iter().zip(strengths) {
            if strength <= 0.0 {
                continue;
            }
            let curve = &self.term_curves[rule.consequent_term];
            for (acc, &mu) in aggregated.iter_mut().zip(curve) {
                *acc = acc.max(strength.min(mu));
            }
        }
        aggregated
    }

    /// Centroide discreto. `None` quando a massa agregada é zero.
    fn centroid(&self, aggregated: &[f64]) -> Option<f64> {
        let (num, den) = self
            .grid
            .iter()
            .zip(aggregated)
            .fold((0.0, 0.0), |(num, den), (&y, &mu)| (num + y * mu, den + mu));
        (den > 0.0).then(|| num / den)
    }
}

/// Termo da faixa em que `score` cai.
///
/// O universo é dividido em `n` faixas de largura igual, mapeadas para os
/// termos na ordem declarada. Para um universo 0..100 com 5 termos:
/// `<20`, `20–40`, `40–60`, `60–80`, `≥80`.
pub fn banded_term(variable: &LinguisticVariable, score: f64) -> &str {
    let n = variable.terms.len();
    let band = variable.universe.width() / n as f64;
    let offset = variable.universe.clamp(score) - variable.universe.min;
    let index = ((offset / band).floor() as usize).min(n - 1);
    &variable.terms[index].name
}

/// Monta um mapa de entradas a partir de pares `(nome, valor)`.
pub fn input_map(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Motor de inferência Mamdani imutável, construído a partir de uma
/// [`SystemDefinition`].
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    definition: SystemDefinition,
    compiled: Vec<CompiledOutput>,
    tracer: RuleTracer,
}

impl InferenceEngine {
    /// Valida a definição e compila regras, curvas e rastreamento.
    ///
    /// Qualquer problema estrutural (universo inválido, termo duplicado,
    /// regra apontando para termo inexistente, sonda malformada...) é
    /// reportado aqui, nunca durante `evaluate`.
    pub fn new(definition: SystemDefinition) -> FuzzyResult<Self> {
        if let Some(orphan) = definition.orphan_rules.first() {
            return Err(FuzzyError::UnknownOutput(orphan.consequent.variable.clone()));
        }

        let mut names: Vec<&str> = Vec::new();
        let variables = definition
            .inputs
            .iter()
            .map(|v| (v, VariableRole::Antecedent))
            .chain(
                definition
                    .outputs
                    .iter()
                    .map(|o| (&o.variable, VariableRole::Consequent)),
            );
        for (variable, role) in variables {
            variable.validate()?;
            if variable.role != role {
                return Err(FuzzyError::RoleMismatch {
                    variable: variable.name.clone(),
                    expected: role.to_string(),
                });
            }
            if names.contains(&variable.name.as_str()) {
                return Err(FuzzyError::DuplicateVariable(variable.name.clone()));
            }
            names.push(&variable.name);

            let gaps = variable.coverage_gaps();
            if !gaps.is_empty() {
                tracing::warn!(
                    system = %definition.name,
                    variable = %variable.name,
                    gaps = gaps.len(),
                    first = gaps[0],
                    "Universo com pontos sem cobertura de nenhum termo"
                );
            }
        }

        let compiled = definition
            .outputs
            .iter()
            .map(|o| CompiledOutput::new(o, &definition.inputs))
            .collect::<FuzzyResult<Vec<_>>>()?;
        let tracer = RuleTracer::compile(&definition.trace, &definition.inputs)?;

        tracing::debug!(
            system = %definition.name,
            inputs = definition.inputs.len(),
            outputs = definition.outputs.len(),
            rules = definition.rule_count(),
            "Motor fuzzy compilado"
        );

        Ok(Self {
            definition,
            compiled,
            tracer,
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn description(&self) -> &str {
        &self.definition.description
    }

    /// Definição original (para exportação e resumos).
    pub fn definition(&self) -> &SystemDefinition {
        &self.definition
    }

    pub fn inputs(&self) -> &[LinguisticVariable] {
        &self.definition.inputs
    }

    pub fn outputs(&self) -> impl Iterator<Item = &LinguisticVariable> {
        self.definition.outputs.iter().map(|o| &o.variable)
    }

    /// Variável de entrada ou saída pelo nome.
    pub fn variable(&self, name: &str) -> Option<&LinguisticVariable> {
        self.inputs()
            .iter()
            .chain(self.outputs())
            .find(|v| v.name == name)
    }

    pub fn rule_count(&self) -> usize {
        self.definition.rule_count()
    }

    pub fn tracer(&self) -> &RuleTracer {
        &self.tracer
    }

    /// Curva `(x, μ)` de um termo de qualquer variável.
    pub fn membership_curve(&self, variable: &str, term: &str) -> Option<Vec<(f64, f64)>> {
        self.variable(variable)?.membership_curve(term)
    }

    /// Avalia o sistema para um conjunto de entradas nomeadas.
    ///
    /// Toda entrada declarada precisa estar presente e ser finita; valores
    /// fora do universo são limitados. Chaves extras são ignoradas.
    pub fn evaluate(&self, inputs: &HashMap<String, f64>) -> FuzzyResult<EvaluationResult> {
        let values = self.resolve_inputs(inputs)?;
        Ok(self.evaluate_values(&values))
    }

    /// Avalia várias entradas em paralelo. A ordem do resultado segue a da
    /// entrada.
    pub fn evaluate_batch(
        &self,
        batch: &[HashMap<String, f64>],
    ) -> Vec<FuzzyResult<EvaluationResult>> {
        batch.par_iter().map(|inputs| self.evaluate(inputs)).collect()
    }

    /// Conjunto agregado `(y, μ)` de uma saída, o que o centroide integra.
    pub fn aggregated_output(
        &self,
        inputs: &HashMap<String, f64>,
        output: &str,
    ) -> FuzzyResult<Vec<(f64, f64)>> {
        let index = self
            .definition
            .outputs
            .iter()
            .position(|o| o.variable.name == output)
            .ok_or_else(|| FuzzyError::UnknownOutput(output.to_string()))?;
        let values = self.resolve_inputs(inputs)?;
        let degrees = self.fuzzify(&values);
        let compiled = &self.compiled[index];
        let strengths: Vec<f64> = compiled.rules.iter().map(|r| r.strength(&degrees)).collect();
        Ok(compiled
            .grid
            .iter()
            .copied()
            .zip(compiled.aggregate(&strengths))
            .collect())
    }

    fn resolve_inputs(&self, inputs: &HashMap<String, f64>) -> FuzzyResult<Vec<f64>> {
        self.inputs()
            .iter()
            .map(|variable| {
                let value = *inputs
                    .get(&variable.name)
                    .ok_or_else(|| FuzzyError::MissingInput(variable.name.clone()))?;
                if !value.is_finite() {
                    return Err(FuzzyError::NonFiniteInput {
                        variable: variable.name.clone(),
                        value,
                    });
                }
                Ok(variable.universe.clamp(value))
            })
            .collect()
    }

    fn fuzzify(&self, values: &[f64]) -> Vec<Vec<f64>> {
        self.inputs()
            .iter()
            .zip(values)
            .map(|(variable, &x)| variable.degrees(x))
            .collect()
    }

    fn evaluate_values(&self, values: &[f64]) -> EvaluationResult {
        let degrees = self.fuzzify(values);

        let mut crisp_outputs = BTreeMap::new();
        let mut dominant_terms = BTreeMap::new();
        let mut fallback_outputs = Vec::new();
        let mut strengths = Vec::with_capacity(self.compiled.len());

        for (output, compiled) in self.definition.outputs.iter().zip(&self.compiled) {
            let variable = &output.variable;
            let rule_strengths: Vec<f64> =
                compiled.rules.iter().map(|r| r.strength(&degrees)).collect();

            let score = match compiled.centroid(&compiled.aggregate(&rule_strengths)) {
                Some(score) => score,
                None => {
                    tracing::debug!(
                        system = %self.definition.name,
                        output = %variable.name,
                        "Nenhuma regra disparou, usando ponto médio"
                    );
                    fallback_outputs.push(variable.name.clone());
                    variable.universe.midpoint()
                }
            };

            dominant_terms.insert(
                variable.name.clone(),
                banded_term(variable, score).to_string(),
            );
            crisp_outputs.insert(variable.name.clone(), score);
            strengths.push(rule_strengths);
        }

        let active_rules = self.tracer.extract(
            self.inputs(),
            &self.definition.outputs,
            &degrees,
            &strengths,
        );

        let input_memberships = self
            .inputs()
            .iter()
            .zip(&degrees)
            .map(|(variable, d)| {
                let map = variable
                    .term_names()
                    .map(String::from)
                    .zip(d.iter().copied())
                    .collect();
                (variable.name.clone(), MembershipMap(map))
            })
            .collect();

        EvaluationResult {
            system: self.definition.name.clone(),
            inputs: self
                .inputs()
                .iter()
                .zip(values)
                .map(|(v, &x)| (v.name.clone(), x))
                .collect(),
            crisp_outputs,
            dominant_terms,
            input_memberships,
            active_rules,
            fallback_outputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Antecedent, Clause, Rule};

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    fn five_terms(v: LinguisticVariable, names: [&str; 5]) -> LinguisticVariable {
        v.trap(names[0], 0.0, 0.0, 10.0, 25.0)
            .tri(names[1], 15.0, 30.0, 45.0)
            .tri(names[2], 35.0, 50.0, 65.0)
            .tri(names[3], 55.0, 70.0, 85.0)
            .trap(names[4], 75.0, 90.0, 100.0, 100.0)
    }

    fn thermostat() -> SystemDefinition {
        let temp = LinguisticVariable::antecedent("temp", 0.0, 40.0)
            .trap("cold", 0.0, 0.0, 10.0, 20.0)
            .tri("mild", 10.0, 20.0, 30.0)
            .trap("hot", 20.0, 30.0, 40.0, 40.0);
        let fan = five_terms(
            LinguisticVariable::consequent("fan", 0.0, 100.0),
            ["off", "slow", "medium", "fast", "max"],
        );
        SystemDefinition::new("thermostat", "ventilador")
            .input(temp)
            .output(fan)
            .rule("T1", &[("temp", "cold")], "fan", "off", Some("frio"))
            .rule("T2", &[("temp", "mild")], "fan", "medium", None)
            .rule("T3", &[("temp", "hot")], "fan", "max", Some("calor"))
    }

    fn engine() -> InferenceEngine {
        InferenceEngine::new(thermostat()).unwrap()
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InferenceEngine>();
    }

    #[test]
    fn single_rule_yields_consequent_centroid() {
        let result = engine().evaluate(&input_map(&[("temp", 20.0)])).unwrap();
        // só T2 dispara; "medium" é simétrico em torno de 50
        assert!(approx(result.score("fan").unwrap(), 50.0, 1e-9));
        assert_eq!(result.dominant("fan"), Some("medium"));
        assert!(result.fallback_outputs.is_empty());
    }

    #[test]
    fn cold_and_hot_push_score_to_extremes() {
        let e = engine();
        let cold = e.evaluate(&input_map(&[("temp", 0.0)])).unwrap();
        let hot = e.evaluate(&input_map(&[("temp", 40.0)])).unwrap();
        assert!(cold.score("fan").unwrap() < 20.0);
        assert_eq!(cold.dominant("fan"), Some("off"));
        assert!(hot.score("fan").unwrap() >= 80.0);
        assert_eq!(hot.dominant("fan"), Some("max"));
    }

    #[test]
    fn scores_stay_within_universe() {
        let e = engine();
        for t in -20..=60 {
            let r = e.evaluate(&input_map(&[("temp", t as f64)])).unwrap();
            let s = r.score("fan").unwrap();
            assert!((0.0..=100.0).contains(&s), "temp={} score={}", t, s);
        }
    }

    #[test]
    fn evaluation_is_idempotent() {
        let e = engine();
        let inputs = input_map(&[("temp", 17.3)]);
        let a = e.evaluate(&inputs).unwrap();
        let b = e.evaluate(&inputs).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.score("fan").unwrap().to_bits(), b.score("fan").unwrap().to_bits());
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        let e = engine();
        let clamped = e.evaluate(&input_map(&[("temp", 500.0)])).unwrap();
        let edge = e.evaluate(&input_map(&[("temp", 40.0)])).unwrap();
        assert_eq!(clamped.crisp_outputs, edge.crisp_outputs);
        assert_eq!(clamped.inputs["temp"], 40.0);
    }

    #[test]
    fn missing_and_non_finite_inputs_are_rejected() {
        let e = engine();
        assert_eq!(
            e.evaluate(&HashMap::new()).unwrap_err(),
            FuzzyError::MissingInput("temp".into())
        );
        assert!(matches!(
            e.evaluate(&input_map(&[("temp", f64::NAN)])),
            Err(FuzzyError::NonFiniteInput { .. })
        ));
    }

    #[test]
    fn no_firing_rule_falls_back_to_midpoint() {
        // só regra para "cold": temp quente não dispara nada
        let def = SystemDefinition::new("partial", "")
            .input(
                LinguisticVariable::antecedent("temp", 0.0, 40.0)
                    .trap("cold", 0.0, 0.0, 10.0, 20.0)
                    .trap("hot", 10.0, 20.0, 40.0, 40.0),
            )
            .output(five_terms(
                LinguisticVariable::consequent("fan", 0.0, 100.0),
                ["a", "b", "c", "d", "e"],
            ))
            .rule("P1", &[("temp", "cold")], "fan", "a", None);
        let e = InferenceEngine::new(def).unwrap();
        let r = e.evaluate(&input_map(&[("temp", 35.0)])).unwrap();
        assert_eq!(r.score("fan"), Some(50.0));
        assert!(r.is_fallback("fan"));
        assert_eq!(r.dominant("fan"), Some("c"));
        assert!(r.active_rules.is_empty());
    }

    #[test]
    fn banding_uses_equal_width_bands() {
        let fan = five_terms(
            LinguisticVariable::consequent("fan", 0.0, 100.0),
            ["a", "b", "c", "d", "e"],
        );
        let cases = [
            (0.0, "a"),
            (19.99, "a"),
            (20.0, "b"),
            (39.9, "b"),
            (40.0, "c"),
            (60.0, "d"),
            (79.9, "d"),
            (80.0, "e"),
            (100.0, "e"),
        ];
        for (score, term) in cases {
            assert_eq!(banded_term(&fan, score), term, "score={}", score);
        }
    }

    #[test]
    fn aggregated_output_is_clipped_consequent() {
        let e = engine();
        // temp=15 → cold=0.5, mild=0.5
        let agg = e.aggregated_output(&input_map(&[("temp", 15.0)]), "fan").unwrap();
        assert_eq!(agg.len(), 101);
        assert!(agg.iter().all(|&(_, mu)| mu <= 0.5 + 1e-12));
        assert!(approx(agg[0].1, 0.5, 1e-12));
        assert!(approx(agg[50].1, 0.5, 1e-12));
        assert_eq!(agg[100].1, 0.0);
        assert!(e.aggregated_output(&input_map(&[("temp", 15.0)]), "nope").is_err());
    }

    #[test]
    fn evaluation_reports_memberships_and_active_rules() {
        let r = engine().evaluate(&input_map(&[("temp", 35.0)])).unwrap();
        let temp = &r.input_memberships["temp"];
        assert_eq!(temp.get("hot"), Some(1.0));
        assert_eq!(r.active_rules.len(), 1);
        assert_eq!(r.active_rules[0].rule_id, "T3");
        assert_eq!(r.active_rules[0].interpretation, "calor");
    }

    #[test]
    fn batch_preserves_order() {
        let e = engine();
        let batch: Vec<_> = (0..40).map(|t| input_map(&[("temp", t as f64)])).collect();
        let results = e.evaluate_batch(&batch);
        for (t, result) in results.iter().enumerate() {
            let single = e.evaluate(&batch[t]).unwrap();
            assert_eq!(result.as_ref().unwrap(), &single);
        }
    }

    // ─── Validação na construção ───────────────────────────────

    #[test]
    fn construction_rejects_unknown_term() {
        let def = thermostat().rule("T9", &[("temp", "freezing")], "fan", "off", None);
        assert!(matches!(
            InferenceEngine::new(def),
            Err(FuzzyError::UnknownTerm { .. })
        ));
    }

    #[test]
    fn construction_rejects_orphan_rule() {
        let def = thermostat().rule("T9", &[("temp", "cold")], "heater", "off", None);
        assert_eq!(
            InferenceEngine::new(def).unwrap_err(),
            FuzzyError::UnknownOutput("heater".into())
        );
    }

    #[test]
    fn construction_rejects_duplicate_variable_and_wrong_role() {
        let def = thermostat().input(
            LinguisticVariable::antecedent("temp", 0.0, 10.0).tri("x", 0.0, 5.0, 10.0),
        );
        assert_eq!(
            InferenceEngine::new(def).unwrap_err(),
            FuzzyError::DuplicateVariable("temp".into())
        );

        let def = thermostat().input(
            LinguisticVariable::consequent("humidity", 0.0, 10.0).tri("x", 0.0, 5.0, 10.0),
        );
        assert!(matches!(
            InferenceEngine::new(def),
            Err(FuzzyError::RoleMismatch { .. })
        ));
    }

    #[test]
    fn or_rules_and_weights_participate_in_inference() {
        let mut def = thermostat();
        def.push_rule(
            Rule::new(
                "T4",
                Antecedent::any(&[("temp", "cold"), ("temp", "hot")]),
                Clause::new("fan", "slow"),
            )
            .with_weight(0.5),
        );
        let e = InferenceEngine::new(def).unwrap();
        let with_or = e.evaluate(&input_map(&[("temp", 0.0)])).unwrap();
        let without = engine().evaluate(&input_map(&[("temp", 0.0)])).unwrap();
        // "slow" puxa o score frio para cima
        assert!(with_or.score("fan").unwrap() > without.score("fan").unwrap());
    }
}
