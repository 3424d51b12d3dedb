//! # Módulo Systems — Configurações Embarcadas
//!
//! Cada sistema é **só dados**: uma [`SystemDefinition`] (variáveis, regras,
//! rastreamento) e um [`Phrasebook`]. Nenhum código do motor é especializado.
//!
//! | Sistema | Entradas | Saídas | Regras |
//! |---------|----------|--------|--------|
//! | [`market`] | price, consumption, hour, volatility, trend | market_condition, recommendation | 20 + 8 |
//! | [`billing`] | bill_amount, consumption, deviation, fixed_ratio, efficiency | bill_assessment, savings_potential | 17 + 13 |
//! | [`efficiency`] | bill, kwh | efficiency | 11 |
//!
//! Além das tabelas, cada módulo traz a derivação pura das suas entradas a
//! partir dos dados dos colaboradores externos (série de mercado, resumo de
//! fatura).

pub mod billing;
pub mod efficiency;
pub mod market;

use crate::core::{LinguisticVariable, SystemDefinition};
use crate::explain::Phrasebook;

/// Partição padrão de uma saída 0–100 em cinco termos, do mais baixo ao
/// mais alto.
pub(crate) fn five_band_output(name: &str, terms: [&str; 5]) -> LinguisticVariable {
    LinguisticVariable::consequent(name, 0.0, 100.0)
        .trap(terms[0], 0.0, 0.0, 10.0, 25.0)
        .tri(terms[1], 15.0, 30.0, 45.0)
        .tri(terms[2], 35.0, 50.0, 65.0)
        .tri(terms[3], 55.0, 70.0, 85.0)
        .trap(terms[4], 75.0, 90.0, 100.0, 100.0)
}

/// Definições embarcadas, na ordem de exibição.
pub fn builtin_definitions() -> Vec<SystemDefinition> {
    vec![
        market::definition(),
        billing::definition(),
        efficiency::definition(),
    ]
}

/// Phrasebook do sistema; sistemas desconhecidos (carregados do disco)
/// recebem um phrasebook vazio com o próprio nome como título.
pub fn phrasebook_for(name: &str) -> Phrasebook {
    match name {
        market::NAME => market::phrasebook(),
        billing::NAME => billing::phrasebook(),
        efficiency::NAME => efficiency::phrasebook(),
        other => Phrasebook::new(other),
    }
}
