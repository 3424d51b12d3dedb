//! Analisador de eficiência de fatura: duas entradas (`bill` em CHF e
//! `kwh`) e uma saída `efficiency` (0 = muito ruim, 100 = excelente).
//!
//! Fatura alta com pouco consumo é ineficiente; fatura moderada com muito
//! consumo é eficiente.

use std::collections::HashMap;

use super::five_band_output;
use crate::core::{LinguisticVariable, SystemDefinition};
use crate::explain::{OutputPhrases, Phrasebook};

pub const NAME: &str = "efficiency";

pub fn definition() -> SystemDefinition {
    let bill = LinguisticVariable::antecedent("bill", 0.0, 500.0)
        .trap("very_low", 0.0, 0.0, 30.0, 60.0)
        .tri("low", 40.0, 80.0, 120.0)
        .tri("medium", 100.0, 150.0, 200.0)
        .tri("high", 180.0, 250.0, 350.0)
        .trap("very_high", 300.0, 400.0, 500.0, 500.0);

    let kwh = LinguisticVariable::antecedent("kwh", 0.0, 1000.0)
        .trap("very_low", 0.0, 0.0, 100.0, 200.0)
        .tri("low", 150.0, 250.0, 350.0)
        .tri("medium", 300.0, 400.0, 550.0)
        .tri("high", 500.0, 650.0, 800.0)
        .trap("very_high", 750.0, 900.0, 1000.0, 1000.0);

    const EF: &str = "efficiency";

    SystemDefinition::new(NAME, "Eficiência da fatura em relação ao consumo")
        .input(bill)
        .input(kwh)
        .output(five_band_output(
            EF,
            ["very_poor", "poor", "average", "good", "excellent"],
        ))
        .rule("E1", &[("bill", "very_high"), ("kwh", "low")], EF, "very_poor",
            Some("Custo muito alto para o pouco que se consome"))
        .rule("E2", &[("bill", "high"), ("kwh", "low")], EF, "poor", None)
        .rule("E3", &[("bill", "high"), ("kwh", "medium")], EF, "poor", None)
        .rule("E4", &[("bill", "medium"), ("kwh", "medium")], EF, "average", None)
        .rule("E5", &[("bill", "low"), ("kwh", "low")], EF, "average", None)
        .rule("E6", &[("bill", "high"), ("kwh", "high")], EF, "average", None)
        .rule("E7", &[("bill", "low"), ("kwh", "medium")], EF, "good", None)
        .rule("E8", &[("bill", "medium"), ("kwh", "high")], EF, "good", None)
        .rule("E9", &[("bill", "very_low"), ("kwh", "medium")], EF, "excellent",
            Some("Custo muito baixo para o consumo"))
        .rule("E10", &[("bill", "low"), ("kwh", "high")], EF, "excellent", None)
        .rule("E11", &[("bill", "medium"), ("kwh", "very_high")], EF, "excellent", None)
        .fallback_text("Relação típica entre custo e consumo")
        .trace_limit(6)
}

pub fn phrasebook() -> Phrasebook {
    Phrasebook::new("Eficiência da Fatura").output(
        OutputPhrases::new("efficiency", "Eficiência")
            .term("very_poor", "Muito ruim", "red",
                "Seus custos estão muito acima do esperado para o seu consumo.")
            .term("poor", "Ruim", "orange",
                "Sua eficiência pode melhorar. Revise a tarifa ou os hábitos de uso.")
            .term("average", "Média", "orange",
                "Seus custos são típicos para o seu nível de consumo.")
            .term("good", "Boa", "blue",
                "Você tem um bom custo-benefício pela energia consumida.")
            .term("excellent", "Excelente", "green",
                "Eficiência excelente! Custos muito baixos em relação ao consumo."),
    )
}

/// Entradas do analisador.
pub fn inputs(bill: f64, kwh: f64) -> HashMap<String, f64> {
    HashMap::from([("bill".to_string(), bill), ("kwh".to_string(), kwh)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::InferenceEngine;

    fn engine() -> InferenceEngine {
        InferenceEngine::new(definition()).unwrap()
    }

    #[test]
    fn expensive_low_usage_is_very_poor() {
        let r = engine().evaluate(&inputs(420.0, 250.0)).unwrap();
        assert_eq!(r.dominant("efficiency"), Some("very_poor"));
        assert_eq!(r.active_rules[0].rule_id, "E1");
    }

    #[test]
    fn cheap_medium_usage_is_excellent() {
        let r = engine().evaluate(&inputs(20.0, 400.0)).unwrap();
        assert_eq!(r.dominant("efficiency"), Some("excellent"));
    }

    #[test]
    fn typical_bill_is_average() {
        let r = engine().evaluate(&inputs(150.0, 400.0)).unwrap();
        let score = r.score("efficiency").unwrap();
        assert!((score - 50.0).abs() < 1e-9, "score = {}", score);
        assert_eq!(r.dominant("efficiency"), Some("average"));
    }

    #[test]
    fn uncovered_combination_falls_back_to_midpoint() {
        // very_low × very_low não tem regra
        let r = engine().evaluate(&inputs(0.0, 0.0)).unwrap();
        assert_eq!(r.score("efficiency"), Some(50.0));
        assert!(r.is_fallback("efficiency"));
        assert!(r.active_rules.is_empty());
    }

    #[test]
    fn repeated_evaluation_is_identical() {
        let e = engine();
        for x in [inputs(420.0, 250.0), inputs(20.0, 400.0), inputs(150.0, 350.0)] {
            let first = e.evaluate(&x).unwrap();
            let second = e.evaluate(&x).unwrap();
            assert_eq!(first, second);
            for (out, score) in &first.crisp_outputs {
                assert_eq!(score.to_bits(), second.crisp_outputs[out].to_bits());
            }
            let ids = |r: &crate::inference::EvaluationResult| {
                r.active_rules.iter().map(|a| a.rule_id.clone()).collect::<Vec<_>>()
            };
            assert_eq!(ids(&first), ids(&second));
        }
    }
}
