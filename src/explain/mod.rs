//! # Módulo Explain — Camada Linguística
//!
//! Transforma o resultado numérico da inferência em texto para pessoas:
//!
//! - [`Phrasebook`] — rótulos, frases e cores por termo de saída
//! - [`ExplanationFormatter`] — monta a [`Explanation`] (estruturada + markdown)
//! - [`rules_summary`] / [`system_summary`] — documentação gerada do motor

pub mod formatter;
pub mod phrasebook;
pub mod summary;

pub use formatter::{
    strength_bar, Assessment, ContextSection, Explanation, ExplanationFormatter, Placement,
    RuleLine,
};
pub use phrasebook::{OutputPhrases, Phrasebook, TermPhrase};
pub use summary::{rules_summary, system_summary, SystemSummary};
