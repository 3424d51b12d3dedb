//! # Módulo Inference — Motor Mamdani e Rastreamento
//!
//! Transforma entradas crisp em scores defuzzificados e, no mesmo passo,
//! identifica **quais regras** sustentam o resultado.
//!
//! ## Analogia: O Júri
//!
//! Cada regra é um jurado que vota com a força da sua convicção
//! (o grau de disparo). O veredito final (o score) é o centro de massa dos
//! votos; o rastreamento é a ata que registra quem votou forte o bastante
//! para ser citado.
//!
//! | Etapa | Operação |
//! |-------|----------|
//! | Fuzzificação | grau de cada termo de cada entrada |
//! | Força de regra | AND = `min`, OR = `max`, × peso |
//! | Implicação | `min(força, μ_consequente)` |
//! | Agregação | `max` entre regras |
//! | Defuzzificação | centroide discreto (ou ponto médio) |
//!
//! Veja [`InferenceEngine`] e [`RuleTracer`].

/// Sub-módulo com o motor Mamdani.
pub mod engine;
/// Sub-módulo de extração de regras ativas.
pub mod trace;

pub use engine::{banded_term, input_map, EvaluationResult, InferenceEngine};
pub use trace::{ActiveRule, RuleTracer};
