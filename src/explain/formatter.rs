//! # ExplanationFormatter — Do Trace ao Texto
//!
//! Converte um [`EvaluationResult`] em prosa: um rótulo por saída (a faixa
//! do score), a frase correspondente do [`Phrasebook`] e as regras ativas
//! com uma barra de força de 10 células.
//!
//! ```text
//! **Regra M5:** `IF price is VERY_LOW AND consumption is VERY_LOW THEN ...`
//! - Força: [██████████] 1.00
//! - Período fora de pico — momento ideal
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use super::phrasebook::{OutputPhrases, Phrasebook};
use crate::inference::{ActiveRule, EvaluationResult, InferenceEngine};

/// Células da barra de força.
const BAR_CELLS: usize = 10;

/// Quantas regras ativas entram no texto por padrão.
pub const DEFAULT_RULE_LINES: usize = 5;

/// Limite superior assumido para saídas sem escala registrada.
const DEFAULT_SCALE_MAX: f64 = 100.0;

/// Barra `█`/`░` proporcional à força (truncada para baixo).
pub fn strength_bar(strength: f64) -> String {
    let filled = ((strength.clamp(0.0, 1.0) * BAR_CELLS as f64).floor() as usize).min(BAR_CELLS);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_CELLS - filled))
}

/// Leitura de uma saída.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub output: String,
    pub title: String,
    pub term: String,
    pub label: String,
    pub score: f64,
    /// Limite superior do universo da saída.
    pub scale_max: f64,
    pub sentence: String,
    pub colour: String,
    /// `true` quando o score é o ponto médio neutro.
    pub balanced: bool,
}

/// Onde uma seção de contexto entra no markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    BeforeRules,
    AfterRules,
}

/// Seção descritiva calculada fora do motor (estatísticas da série,
/// horário de uso), anexada à explicação.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSection {
    pub heading: String,
    pub lines: Vec<String>,
    pub placement: Placement,
}

impl ContextSection {
    pub fn new(heading: &str, placement: Placement) -> Self {
        Self {
            heading: heading.to_string(),
            lines: Vec::new(),
            placement,
        }
    }

    pub fn line(mut self, line: String) -> Self {
        self.lines.push(line);
        self
    }

    fn render(&self) -> String {
        let mut out = format!("## {}
", self.heading);
        for line in &self.lines {
            out.push_str(&format!("\n{}\n", line));
        }
        out
    }
}

/// Uma regra ativa pronta para exibição.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleLine {
    pub rule_id: String,
    pub description: String,
    pub strength: f64,
    pub bar: String,
    pub interpretation: String,
}

impl From<&ActiveRule> for RuleLine {
    fn from(rule: &ActiveRule) -> Self {
        Self {
            rule_id: rule.rule_id.clone(),
            description: rule.description.clone(),
            strength: rule.strength,
            bar: strength_bar(rule.strength),
            interpretation: rule.interpretation.clone(),
        }
    }
}

/// Explicação completa de uma avaliação.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub headline: String,
    pub assessments: Vec<Assessment>,
    pub rules: Vec<RuleLine>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<ContextSection>,
    pub markdown: String,
}

/// Formatador ligado ao phrasebook de um sistema.
#[derive(Debug, Clone)]
pub struct ExplanationFormatter {
    phrasebook: Phrasebook,
    rule_lines: usize,
    scales: BTreeMap<String, f64>,
}

impl ExplanationFormatter {
    pub fn new(phrasebook: Phrasebook) -> Self {
        Self {
            phrasebook,
            rule_lines: DEFAULT_RULE_LINES,
            scales: BTreeMap::new(),
        }
    }

    /// Formatador com a escala de cada saída do motor.
    pub fn for_engine(phrasebook: Phrasebook, engine: &InferenceEngine) -> Self {
        engine
            .outputs()
            .fold(Self::new(phrasebook), |f, v| f.with_scale(&v.name, v.universe.max))
    }

    pub fn with_scale(mut self, output: &str, max: f64) -> Self {
        self.scales.insert(output.to_string(), max);
        self
    }

    pub fn with_rule_lines(mut self, rule_lines: usize) -> Self {
        self.rule_lines = rule_lines;
        self
    }

    /// Monta a leitura de cada saída, na ordem do phrasebook e depois nas
    /// saídas restantes do resultado.
    pub fn assess(&self, result: &EvaluationResult) -> Vec<Assessment> {
        let declared = self
            .phrasebook
            .outputs
            .iter()
            .map(|p| p.output.as_str())
            .filter(|o| result.crisp_outputs.contains_key(*o));
        let remaining = result
            .crisp_outputs
            .keys()
            .map(String::as_str)
            .filter(|o| self.phrasebook.for_output(o).is_none());

        declared
            .chain(remaining)
            .filter_map(|output| {
                let score = result.score(output)?;
                let term = result.dominant(output)?.to_string();
                let balanced = result.is_fallback(output);
                let (title, phrase) = match self.phrasebook.for_output(output) {
                    Some(p) => (p.title.clone(), p.phrase(&term)),
                    None => (
                        output.to_string(),
                        OutputPhrases::new(output, output).phrase(&term),
                    ),
                };
                Some(Assessment {
                    output: output.to_string(),
                    title,
                    sentence: if balanced {
                        self.phrasebook.balanced.clone()
                    } else {
                        phrase.sentence
                    },
                    label: phrase.label,
                    colour: phrase.colour,
                    term,
                    score,
                    scale_max: self
                        .scales
                        .get(output)
                        .copied()
                        .unwrap_or(DEFAULT_SCALE_MAX),
                    balanced,
                })
            })
            .collect()
    }

    /// Gera a explicação completa (estruturada + markdown).
    pub fn explain(&self, result: &EvaluationResult) -> Explanation {
        self.explain_with(result, Vec::new())
    }

    /// Como [`explain`](Self::explain), com seções de contexto extras.
    pub fn explain_with(
        &self,
        result: &EvaluationResult,
        context: Vec<ContextSection>,
    ) -> Explanation {
        let assessments = self.assess(result);
        let rules: Vec<RuleLine> = result
            .active_rules
            .iter()
            .take(self.rule_lines)
            .map(RuleLine::from)
            .collect();

        let headline = match assessments.first() {
            Some(a) if a.balanced => self.phrasebook.balanced.clone(),
            Some(a) => format!("{}: {}", a.title, a.label),
            None => self.phrasebook.balanced.clone(),
        };
        let markdown = self.render_markdown(&assessments, &rules, &context);

        Explanation {
            headline,
            assessments,
            rules,
            context,
            markdown,
        }
    }

    fn render_markdown(
        &self,
        assessments: &[Assessment],
        rules: &[RuleLine],
        context: &[ContextSection],
    ) -> String {
        let mut sections = Vec::new();

        let mut header = format!("## 🎯 {}\n", self.phrasebook.title);
        for a in assessments {
            header.push_str(&format!(
                "\n**{}:** {} (Score: {:.1}/{})\n",
                a.title, a.label, a.score, a.scale_max
            ));
            if !a.sentence.is_empty() {
                header.push_str(&format!("\n{}\n", a.sentence));
            }
        }
        sections.push(header);

        let placed = |p: Placement| context.iter().filter(move |s| s.placement == p);
        sections.extend(placed(Placement::BeforeRules).map(ContextSection::render));

        let mut trace = String::from("## 📋 Regras Ativas\n");
        if rules.is_empty() {
            trace.push_str("\nNenhuma regra disparou acima do limiar.\n");
        }
        for r in rules {
            trace.push_str(&format!(
                "\n**Regra {}:** `{}`\n- Força: [{}] {:.2}\n- {}\n",
                r.rule_id, r.description, r.bar, r.strength, r.interpretation
            ));
        }
        sections.push(trace);

        sections.extend(placed(Placement::AfterRules).map(ContextSection::render));

        sections.join("\n---\n\n")
    }
}
