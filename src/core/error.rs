//! # Erros do Motor Fuzzy
//!
//! Todos os erros que o motor pode produzir estão concentrados em
//! [`FuzzyError`]. A taxonomia é propositalmente estreita:
//!
//! | Momento | Erros | Significado |
//! |---------|-------|-------------|
//! | Configuração | `InvalidUniverse`, `InvalidShape`, `UnknownTerm`, ... | Tabela de variáveis/regras malformada; aborta a construção |
//! | Avaliação | `MissingInput`, `NonFiniteInput` | Erro do chamador (entrada ausente ou NaN) |
//!
//! Valores finitos fora do universo **nunca** são erro: são limitados
//! (clamped) ao limite mais próximo antes da fuzzificação.

use thiserror::Error;

/// Erro do motor de inferência fuzzy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FuzzyError {
    /// Universo com limites não finitos, `min >= max` ou passo inválido.
    #[error("variável '{variable}': universo inválido [{min}, {max}] com passo {step}")]
    InvalidUniverse {
        variable: String,
        min: f64,
        max: f64,
        step: f64,
    },

    /// Grade de discretização grande demais para um centroide previsível.
    #[error("variável '{variable}': grade com {points} pontos excede o limite de {limit}")]
    GridTooLarge {
        variable: String,
        points: usize,
        limit: usize,
    },

    /// Pontos de controle fora de ordem ou não finitos.
    #[error("termo '{variable}.{term}': forma inválida ({reason})")]
    InvalidShape {
        variable: String,
        term: String,
        reason: String,
    },

    #[error("variável '{0}' declarada mais de uma vez")]
    DuplicateVariable(String),

    #[error("variável '{variable}': termo '{term}' declarado mais de uma vez")]
    DuplicateTerm { variable: String, term: String },

    #[error("variável '{0}' não possui termos")]
    EmptyVariable(String),

    /// Variável de entrada marcada como consequente (ou vice-versa).
    #[error("variável '{variable}' deveria ter papel {expected}")]
    RoleMismatch { variable: String, expected: String },

    #[error("regra '{rule}': antecedente vazio")]
    EmptyAntecedent { rule: String },

    #[error("regra '{rule}': variável desconhecida '{variable}'")]
    UnknownVariable { rule: String, variable: String },

    #[error("regra '{rule}': termo desconhecido '{variable}.{term}'")]
    UnknownTerm {
        rule: String,
        variable: String,
        term: String,
    },

    /// Regra declarada numa base cuja variável de saída é outra.
    #[error("regra '{rule}': consequente '{found}' não pertence à saída '{expected}'")]
    ConsequentMismatch {
        rule: String,
        expected: String,
        found: String,
    },

    #[error("regra '{rule}': peso {weight} fora de (0, 1]")]
    InvalidWeight { rule: String, weight: f64 },

    #[error("saída desconhecida '{0}'")]
    UnknownOutput(String),

    /// Configuração de rastreamento (limiar, limite ou sondas) inválida.
    #[error("rastreamento inválido: {0}")]
    InvalidTrace(String),

    #[error("entrada ausente: '{0}'")]
    MissingInput(String),

    #[error("entrada '{variable}' não é finita ({value})")]
    NonFiniteInput { variable: String, value: f64 },
}

/// Alias conveniente para resultados do motor.
pub type FuzzyResult<T> = Result<T, FuzzyError>;
