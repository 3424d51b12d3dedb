//! # Rastreamento de Regras Ativas — O "Porquê" da Inferência
//!
//! Depois da fuzzificação, o [`RuleTracer`] decide **quais regras contar
//! ao usuário**. Ele reaproveita os graus de pertinência já calculados
//! (nenhuma interpolação é refeita) e percorre duas fontes numa única
//! passada:
//!
//! 1. **Regras das bases** — as forças já computadas para a inferência
//! 2. **Sondas** — enumeração força-bruta de todas as combinações de termos
//!    de 1 a 3 variáveis (5 termos cada, portanto no máximo 125 combinações)
//!
//! ```text
//! força > limiar (0.3)?
//!   ├── sim → chave do antecedente já reportada? ── sim → descarta
//!   │                 └── não → texto da tabela (ou fallback) → candidata
//!   └── não → descarta
//! ordena por força (desc, estável) → corta em `limit`
//! ```
//!
//! O rastreamento é independente da defuzzificação: roda mesmo quando a
//! saída caiu no ponto médio neutro, para que o chamador distinga
//! "nenhuma história clara" de "uma regra fraca, mas presente, disparou".

use std::collections::HashSet;

use serde::Serialize;

use crate::core::rule::resolve_clause;
use crate::core::{
    Antecedent, FuzzyError, FuzzyResult, Interpretations, LinguisticVariable,
    OutputDefinition, TraceSettings,
};

/// Regra (ou combinação sondada) cuja força passou do limiar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveRule {
    /// Id da regra (`"M5"`) ou da sonda (`"BC_high_medium"`).
    pub rule_id: String,
    /// `IF ... [THEN ...]` legível.
    pub description: String,
    /// Força de disparo em `[0, 1]`.
    pub strength: f64,
    /// Texto interpretativo da tabela estática (ou o fallback).
    pub interpretation: String,
    /// Saída afetada; `None` para sondas, que não escrevem em saída alguma.
    pub output: Option<String>,
}

#[derive(Debug, Clone)]
struct CompiledProbe {
    id_prefix: String,
    variables: Vec<usize>,
    mapped_only: bool,
}

/// Extrator de regras ativas, compilado junto com o motor.
#[derive(Debug, Clone)]
pub struct RuleTracer {
    threshold: f64,
    limit: usize,
    include_rules: bool,
    probes: Vec<CompiledProbe>,
    interpretations: Interpretations,
}

impl RuleTracer {
    /// Valida a configuração e resolve as variáveis das sondas em índices.
    pub fn compile(settings: &TraceSettings, inputs: &[LinguisticVariable]) -> FuzzyResult<Self> {
        if !(0.0..1.0).contains(&settings.threshold) {
            return Err(FuzzyError::InvalidTrace(format!(
                "limiar {} fora de [0, 1)",
                settings.threshold
            )));
        }
        if settings.limit == 0 {
            return Err(FuzzyError::InvalidTrace("limite deve ser ≥ 1".into()));
        }

        let mut probes = Vec::with_capacity(settings.probes.len());
        for probe in &settings.probes {
            if probe.variables.is_empty() || probe.variables.len() > 3 {
                return Err(FuzzyError::InvalidTrace(format!(
                    "sonda '{}' deve cobrir de 1 a 3 variáveis",
                    probe.id_prefix
                )));
            }
            let mut variables = Vec::with_capacity(probe.variables.len());
            for name in &probe.variables {
                let index = inputs
                    .iter()
                    .position(|v| &v.name == name)
                    .ok_or_else(|| FuzzyError::UnknownVariable {
                        rule: probe.id_prefix.clone(),
                        variable: name.clone(),
                    })?;
                if variables.contains(&index) {
                    return Err(FuzzyError::InvalidTrace(format!(
                        "sonda '{}' repete a variável '{}'",
                        probe.id_prefix, name
                    )));
                }
                variables.push(index);
            }
            probes.push(CompiledProbe {
                id_prefix: probe.id_prefix.clone(),
                variables,
                mapped_only: probe.mapped_only,
            });
        }

        // Chaves da tabela precisam apontar para termos existentes; são
        // guardadas na forma canônica para casar com qualquer ordem de cláusulas.
        let mut interpretations = Interpretations {
            entries: Default::default(),
            fallback: settings.interpretations.fallback.clone(),
        };
        for (key, text) in &settings.interpretations.entries {
            let antecedent = Antecedent::parse_key(key).ok_or_else(|| {
                FuzzyError::InvalidTrace(format!("chave de interpretação malformada: '{}'", key))
            })?;
            for clause in antecedent.clauses() {
                resolve_clause(key, clause, inputs)?;
            }
            interpretations
                .entries
                .insert(antecedent.canonical_key(), text.clone());
        }

        Ok(Self {
            threshold: settings.threshold,
            limit: settings.limit,
            include_rules: settings.include_rules,
            probes,
            interpretations,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Extrai as regras ativas.
    ///
    /// `degrees[variável][termo]` vem da fuzzificação e
    /// `strengths[saída][regra]` da avaliação das bases.
    pub fn extract(
        &self,
        inputs: &[LinguisticVariable],
        outputs: &[OutputDefinition],
        degrees: &[Vec<f64>],
        strengths: &[Vec<f64>],
    ) -> Vec<ActiveRule> {
        let mut active = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        if self.include_rules {
            for (output, rule_strengths) in outputs.iter().zip(strengths) {
                for (rule, &strength) in output.rules.rules.iter().zip(rule_strengths) {
                    if strength <= self.threshold {
                        continue;
                    }
                    let key = rule.antecedent.canonical_key();
                    active.push(ActiveRule {
                        rule_id: rule.id.clone(),
                        description: rule.describe(),
                        strength,
                        interpretation: self.interpretations.resolve(&key).to_string(),
                        output: Some(output.variable.name.clone()),
                    });
                    seen.insert(key);
                }
            }
        }

        for probe in &self.probes {
            self.sweep_probe(probe, inputs, degrees, &mut seen, &mut active);
        }

        active.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        active.truncate(self.limit);
        active
    }

    /// Enumera o produto cartesiano dos termos das variáveis da sonda.
    fn sweep_probe(
        &self,
        probe: &CompiledProbe,
        inputs: &[LinguisticVariable],
        degrees: &[Vec<f64>],
        seen: &mut HashSet<String>,
        active: &mut Vec<ActiveRule>,
    ) {
        let sizes: Vec<usize> = probe.variables.iter().map(|&v| degrees[v].len()).collect();
        // odômetro sobre os índices de termo
        let mut cursor = vec![0usize; sizes.len()];

        loop {
            let strength = probe
                .variables
                .iter()
                .zip(&cursor)
                .map(|(&v, &t)| degrees[v][t])
                .fold(1.0, f64::min);

            if strength > self.threshold {
                let pairs: Vec<(&str, &str)> = probe
                    .variables
                    .iter()
                    .zip(&cursor)
                    .map(|(&v, &t)| (inputs[v].name.as_str(), inputs[v].terms[t].name.as_str()))
                    .collect();
                let antecedent = Antecedent::all(&pairs);
                let key = antecedent.canonical_key();
                let mapped = self.interpretations.lookup(&key);

                if !seen.contains(&key) && (mapped.is_some() || !probe.mapped_only) {
                    let terms: Vec<&str> = pairs.iter().map(|(_, t)| *t).collect();
                    active.push(ActiveRule {
                        rule_id: format!("{}_{}", probe.id_prefix, terms.join("_")),
                        description: format!("IF {}", antecedent),
                        strength,
                        interpretation: mapped
                            .unwrap_or(&self.interpretations.fallback)
                            .to_string(),
                        output: None,
                    });
                    seen.insert(key);
                }
            }

            // avança o odômetro; termina quando todas as posições dão a volta
            let mut pos = cursor.len();
            loop {
                if pos == 0 {
                    return;
                }
                pos -= 1;
                cursor[pos] += 1;
                if cursor[pos] < sizes[pos] {
                    break;
                }
                cursor[pos] = 0;
            }
        }
    }
}
