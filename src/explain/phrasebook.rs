//! Vocabulário de apresentação de um sistema: rótulos, frases e cores
//! por termo de saída.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::inference::InferenceEngine;

/// Cor usada quando o termo não tem entrada no phrasebook.
pub const NEUTRAL_COLOUR: &str = "gray";

/// Como um termo de saída é apresentado ao usuário.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermPhrase {
    pub label: String,
    pub sentence: String,
    pub colour: String,
}

/// Frases de uma variável de saída.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputPhrases {
    pub output: String,
    pub title: String,
    pub terms: BTreeMap<String, TermPhrase>,
}

impl OutputPhrases {
    pub fn new(output: &str, title: &str) -> Self {
        Self {
            output: output.to_string(),
            title: title.to_string(),
            terms: BTreeMap::new(),
        }
    }

    pub fn term(mut self, term: &str, label: &str, colour: &str, sentence: &str) -> Self {
        self.terms.insert(
            term.to_string(),
            TermPhrase {
                label: label.to_string(),
                sentence: sentence.to_string(),
                colour: colour.to_string(),
            },
        );
        self
    }

    /// Frase do termo; termos sem cadastro viram o próprio nome em
    /// maiúsculas, sem frase e com cor neutra.
    pub fn phrase(&self, term: &str) -> TermPhrase {
        self.terms.get(term).cloned().unwrap_or_else(|| TermPhrase {
            label: term.replace('_', " ").to_uppercase(),
            sentence: String::new(),
            colour: NEUTRAL_COLOUR.to_string(),
        })
    }
}

fn default_balanced() -> String {
    "Condições equilibradas: nenhuma regra disparou para estas entradas.".to_string()
}

/// Vocabulário completo de um sistema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrasebook {
    /// Título do relatório (ex: "Avaliação Fuzzy do Mercado").
    pub title: String,
    pub outputs: Vec<OutputPhrases>,
    /// Frase usada quando a saída caiu no ponto médio neutro.
    #[serde(default = "default_balanced")]
    pub balanced: String,
}

impl Phrasebook {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            outputs: Vec::new(),
            balanced: default_balanced(),
        }
    }

    pub fn output(mut self, phrases: OutputPhrases) -> Self {
        self.outputs.push(phrases);
        self
    }

    pub fn for_output(&self, output: &str) -> Option<&OutputPhrases> {
        self.outputs.iter().find(|o| o.output == output)
    }

    /// Pares `saída.termo` do motor sem frase cadastrada.
    pub fn missing_terms(&self, engine: &InferenceEngine) -> Vec<String> {
        engine
            .outputs()
            .flat_map(|variable| {
                let phrases = self.for_output(&variable.name);
                variable
                    .term_names()
                    .filter(move |t| phrases.map_or(true, |p| !p.terms.contains_key(*t)))
                    .map(move |t| format!("{}.{}", variable.name, t))
            })
            .collect()
    }
}
