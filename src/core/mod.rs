//! # Módulo Core — Tipos Fundamentais da Lógica Fuzzy
//!
//! Este módulo agrupa os **tipos de dados** sobre os quais o motor de
//! inferência opera. Nada aqui executa inferência: apenas descreve
//! variáveis, termos e regras, e valida essas descrições:
//!
//! - [`FuzzySet`] / [`Shape`] — termo linguístico com função de pertinência
//! - [`LinguisticVariable`] — eixo de entrada ou saída particionado em termos
//! - [`Rule`] / [`Antecedent`] / [`RuleBase`] — regras IF-THEN (AND = min, OR = max)
//! - [`SystemDefinition`] — tabela declarativa completa de um sistema
//! - [`FuzzyError`] — erros de configuração e de entrada
//!
//! ## Ciclo de Vida
//!
//! ```text
//! SystemDefinition (builder ou JSON)
//!   └── InferenceEngine::new()  → valida tudo, compila regras em índices
//!         └── imutável: compartilhado entre threads sem locks
//! ```

/// Sub-módulo com [`FuzzyError`].
pub mod error;

/// Sub-módulo com [`FuzzySet`] e [`Shape`].
pub mod fuzzy_set;

/// Sub-módulo com [`LinguisticVariable`], [`Universe`] e [`MembershipMap`].
pub mod variable;

/// Sub-módulo com [`Rule`], [`Antecedent`], [`RuleBase`] e a compilação de regras.
pub mod rule;

/// Sub-módulo com [`SystemDefinition`] e a configuração de rastreamento.
pub mod definition;

pub use definition::{Interpretations, OutputDefinition, Probe, SystemDefinition, TraceSettings};
pub use error::{FuzzyError, FuzzyResult};
pub use fuzzy_set::{FuzzySet, Shape};
pub use rule::{Antecedent, Clause, CompiledRule, Rule, RuleBase};
pub use variable::{LinguisticVariable, MembershipMap, Universe, VariableRole};
