//! # Sistema de Fatura
//!
//! Avalia uma fatura de eletricidade (CHF/mês) e o potencial de economia.
//!
//! | Entrada | Universo |
//! |---------|----------|
//! | `bill_amount` | 0–500 CHF |
//! | `consumption` | 0–800 kWh |
//! | `deviation` | −100–100 % em relação à média |
//! | `fixed_ratio` | 0–30 % de custo fixo |
//! | `efficiency` | 0–100 |
//!
//! O rastreamento soma às regras três sondas: fatura × consumo (todas as
//! 25 combinações, com texto de fallback), desvio e eficiência.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::five_band_output;
use crate::core::{LinguisticVariable, Probe, SystemDefinition};
use crate::explain::{OutputPhrases, Phrasebook};

pub const NAME: &str = "billing";

/// Tarifa média suíça de referência (CHF/kWh).
pub const REFERENCE_RATE: f64 = 0.28;

pub fn definition() -> SystemDefinition {
    let bill = LinguisticVariable::antecedent("bill_amount", 0.0, 500.0)
        .trap("very_low", 0.0, 0.0, 40.0, 70.0)
        .tri("low", 50.0, 80.0, 110.0)
        .tri("medium", 90.0, 130.0, 180.0)
        .tri("high", 150.0, 220.0, 300.0)
        .trap("very_high", 250.0, 350.0, 500.0, 500.0);

    let consumption = LinguisticVariable::antecedent("consumption", 0.0, 800.0)
        .trap("very_low", 0.0, 0.0, 100.0, 200.0)
        .tri("low", 150.0, 250.0, 350.0)
        .tri("medium", 300.0, 400.0, 500.0)
        .tri("high", 450.0, 550.0, 650.0)
        .trap("very_high", 600.0, 700.0, 800.0, 800.0);

    let deviation = LinguisticVariable::antecedent("deviation", -100.0, 100.0)
        .trap("much_below", -100.0, -100.0, -40.0, -20.0)
        .tri("below", -35.0, -15.0, 5.0)
        .tri("average", -10.0, 0.0, 10.0)
        .tri("above", -5.0, 15.0, 35.0)
        .trap("much_above", 20.0, 40.0, 100.0, 100.0);

    let fixed_ratio = LinguisticVariable::antecedent("fixed_ratio", 0.0, 30.0)
        .trap("very_low", 0.0, 0.0, 4.0, 7.0)
        .tri("low", 5.0, 8.0, 12.0)
        .tri("medium", 10.0, 14.0, 18.0)
        .tri("high", 15.0, 20.0, 25.0)
        .trap("very_high", 22.0, 27.0, 30.0, 30.0);

    let efficiency = LinguisticVariable::antecedent("efficiency", 0.0, 100.0)
        .trap("very_poor", 0.0, 0.0, 15.0, 30.0)
        .tri("poor", 20.0, 35.0, 50.0)
        .tri("average", 40.0, 55.0, 70.0)
        .tri("good", 60.0, 75.0, 90.0)
        .trap("excellent", 80.0, 90.0, 100.0, 100.0);

    const BA: &str = "bill_assessment";
    const SP: &str = "savings_potential";

    SystemDefinition::new(NAME, "Avaliação da fatura e potencial de economia")
        .input(bill)
        .input(consumption)
        .input(deviation)
        .input(fixed_ratio)
        .input(efficiency)
        .output(five_band_output(
            BA,
            ["excellent", "good", "normal", "concerning", "critical"],
        ))
        .output(five_band_output(
            SP,
            ["minimal", "low", "moderate", "high", "very_high"],
        ))
        // fatura × consumo
        .rule("B1", &[("bill_amount", "very_high"), ("consumption", "very_high")], BA, "critical", None)
        .rule("B2", &[("bill_amount", "high"), ("consumption", "high")], BA, "concerning", None)
        .rule("B3", &[("bill_amount", "medium"), ("consumption", "medium")], BA, "normal", None)
        .rule("B4", &[("bill_amount", "low"), ("consumption", "low")], BA, "good", None)
        .rule("B5", &[("bill_amount", "very_low")], BA, "excellent", None)
        // desvio da média
        .rule("B6", &[("deviation", "much_above")], BA, "critical", None)
        .rule("B7", &[("deviation", "above")], BA, "concerning", None)
        .rule("B8", &[("deviation", "average")], BA, "normal", None)
        .rule("B9", &[("deviation", "below")], BA, "good", None)
        .rule("B10", &[("deviation", "much_below")], BA, "excellent", None)
        // eficiência
        .rule("B11", &[("efficiency", "very_poor")], BA, "critical", None)
        .rule("B12", &[("efficiency", "poor"), ("bill_amount", "high")], BA, "critical", None)
        .rule("B13", &[("efficiency", "average")], BA, "normal", None)
        .rule("B14", &[("efficiency", "good")], BA, "good", None)
        .rule("B15", &[("efficiency", "excellent")], BA, "excellent", None)
        // custo fixo
        .rule("B16", &[("fixed_ratio", "very_high")], BA, "good", None)
        .rule("B17", &[("fixed_ratio", "very_low"), ("bill_amount", "high")], BA, "concerning", None)
        // potencial de economia
        .rule("S1", &[("bill_amount", "very_high"), ("efficiency", "poor")], SP, "very_high", None)
        .rule("S2", &[("bill_amount", "high"), ("efficiency", "average")], SP, "high", None)
        .rule("S3", &[("deviation", "much_above")], SP, "very_high", None)
        .rule("S4", &[("deviation", "above")], SP, "high", None)
        .rule("S5", &[("deviation", "average"), ("efficiency", "average")], SP, "moderate", None)
        .rule("S6", &[("deviation", "below")], SP, "low", None)
        .rule("S7", &[("deviation", "much_below")], SP, "minimal", None)
        .rule("S8", &[("efficiency", "excellent")], SP, "minimal", None)
        .rule("S9", &[("bill_amount", "very_low")], SP, "minimal", None)
        .rule("S10", &[("consumption", "very_high"), ("efficiency", "average")], SP, "high", None)
        .rule("S11", &[("fixed_ratio", "very_high")], SP, "low", None)
        .rule("S12", &[("fixed_ratio", "very_low"), ("bill_amount", "high")], SP, "high", None)
        .rule("S13", &[("fixed_ratio", "medium")], SP, "moderate", None)
        .probe(Probe::new("BC", &["bill_amount", "consumption"]))
        .probe(Probe::new("DEV", &["deviation"]))
        .probe(Probe::new("EFF", &["efficiency"]))
        .interpret(&[("bill_amount", "very_high"), ("consumption", "very_high")],
            "Fatura e consumo muito altos: medidas de eficiência são urgentes")
        .interpret(&[("bill_amount", "very_high"), ("consumption", "high")],
            "Fatura muito alta sugere ineficiências ou tarifa premium")
        .interpret(&[("bill_amount", "very_high"), ("consumption", "medium")],
            "Fatura alta para o consumo - verifique sua tarifa")
        .interpret(&[("bill_amount", "high"), ("consumption", "high")],
            "O consumo elevado está puxando a fatura para cima")
        .interpret(&[("bill_amount", "high"), ("consumption", "medium")],
            "Fatura um pouco alta - há espaço para otimização")
        .interpret(&[("bill_amount", "medium"), ("consumption", "medium")],
            "Fatura típica para o seu nível de consumo")
        .interpret(&[("bill_amount", "medium"), ("consumption", "high")],
            "Bom custo-benefício para o seu consumo")
        .interpret(&[("bill_amount", "low"), ("consumption", "low")],
            "Consumo baixo mantém a fatura sob controle")
        .interpret(&[("bill_amount", "low"), ("consumption", "medium")],
            "Eficiência excelente - ótimo custo-benefício")
        .interpret(&[("bill_amount", "very_low"), ("consumption", "very_low")],
            "Consumo mínimo resulta em fatura muito baixa")
        .interpret(&[("bill_amount", "very_low"), ("consumption", "low")],
            "Padrão de uso muito eficiente")
        .interpret(&[("deviation", "much_above")],
            "Fatura bem acima da média de residências semelhantes - alto potencial de economia")
        .interpret(&[("deviation", "above")], "Fatura acima da média - há espaço para melhorar")
        .interpret(&[("deviation", "average")], "Fatura típica para residências como a sua")
        .interpret(&[("deviation", "below")], "Fatura abaixo da média - bom trabalho")
        .interpret(&[("deviation", "much_below")], "Excelente! Fatura bem abaixo da média")
        .interpret(&[("efficiency", "excellent")], "Eficiência energética excelente - desperdício mínimo")
        .interpret(&[("efficiency", "good")], "Boa eficiência - mantenha os bons hábitos")
        .interpret(&[("efficiency", "average")], "Eficiência média - alguma otimização é possível")
        .interpret(&[("efficiency", "poor")], "Eficiência abaixo da média - considere uma auditoria energética")
        .interpret(&[("efficiency", "very_poor")],
            "Problemas sérios de eficiência - ação imediata recomendada")
        .fallback_text("Padrão típico de faturamento")
        .trace_limit(8)
}

pub fn phrasebook() -> Phrasebook {
    Phrasebook::new("Avaliação Fuzzy da Fatura")
        .output(
            OutputPhrases::new("bill_assessment", "Avaliação da Fatura")
                .term("excellent", "Excelente", "green",
                    "🌟 Sua fatura de eletricidade está muito bem controlada.")
                .term("good", "Boa", "blue",
                    "✅ Sua fatura está abaixo da média e sob controle.")
                .term("normal", "Normal", "orange",
                    "📊 Sua fatura é típica para o seu tipo de residência.")
                .term("concerning", "Preocupante", "orange",
                    "⚠️ Sua fatura está acima do esperado.")
                .term("critical", "Crítica", "red",
                    "🔴 Sua fatura está muito acima da média: ação necessária."),
        )
        .output(
            OutputPhrases::new("savings_potential", "Potencial de Economia")
                .term("minimal", "Mínimo", "green",
                    "Pouco espaço para economizar: você já é eficiente.")
                .term("low", "Baixo", "blue",
                    "Pequenas otimizações podem gerar economias modestas.")
                .term("moderate", "Moderado", "orange",
                    "Há potencial moderado de economia com melhorias de eficiência.")
                .term("high", "Alto", "orange",
                    "Economias significativas são possíveis com as mudanças certas.")
                .term("very_high", "Muito alto", "red",
                    "Grande potencial de economia: considere uma auditoria energética."),
        )
}

fn default_rate() -> f64 {
    REFERENCE_RATE
}

/// Resumo vindo do calculador de faturas (colaborador externo).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillSummary {
    pub total_bill: f64,
    pub estimated_kwh: f64,
    /// Desvio percentual em relação à média de residências semelhantes.
    pub diff_bill_pct: f64,
    /// Parcela fixa da fatura, em %.
    pub pct_fixed: f64,
    #[serde(default = "default_rate")]
    pub avg_chf_per_kwh: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BillingInputs {
    pub bill_amount: f64,
    pub consumption: f64,
    pub deviation: f64,
    pub fixed_ratio: f64,
    pub efficiency: f64,
}

impl BillingInputs {
    /// Tarifa acima da referência reduz a eficiência; 70 corresponde à
    /// tarifa de referência.
    pub fn efficiency_score(avg_chf_per_kwh: f64) -> f64 {
        if avg_chf_per_kwh > 0.0 {
            (REFERENCE_RATE / avg_chf_per_kwh * 70.0).clamp(0.0, 100.0)
        } else {
            50.0
        }
    }

    pub fn from_summary(summary: &BillSummary) -> Self {
        Self {
            bill_amount: summary.total_bill,
            consumption: summary.estimated_kwh,
            deviation: summary.diff_bill_pct,
            fixed_ratio: summary.pct_fixed,
            efficiency: Self::efficiency_score(summary.avg_chf_per_kwh),
        }
    }

    pub fn to_map(&self) -> HashMap<String, f64> {
        HashMap::from([
            ("bill_amount".to_string(), self.bill_amount),
            ("consumption".to_string(), self.consumption),
            ("deviation".to_string(), self.deviation),
            ("fixed_ratio".to_string(), self.fixed_ratio),
            ("efficiency".to_string(), self.efficiency),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::InferenceEngine;

    fn engine() -> InferenceEngine {
        InferenceEngine::new(definition()).unwrap()
    }

    fn inputs(bill: f64, kwh: f64, dev: f64, fixed: f64, eff: f64) -> HashMap<String, f64> {
        BillingInputs {
            bill_amount: bill,
            consumption: kwh,
            deviation: dev,
            fixed_ratio: fixed,
            efficiency: eff,
        }
        .to_map()
    }

    #[test]
    fn rule_counts() {
        let def = definition();
        assert_eq!(def.outputs[0].rules.len(), 17);
        assert_eq!(def.outputs[1].rules.len(), 13);
    }

    #[test]
    fn critical_bill() {
        let r = engine().evaluate(&inputs(450.0, 750.0, 60.0, 5.0, 15.0)).unwrap();
        assert_eq!(r.dominant("bill_assessment"), Some("critical"));
        assert_eq!(r.dominant("savings_potential"), Some("very_high"));

        let ids: Vec<&str> = r.active_rules.iter().map(|a| a.rule_id.as_str()).collect();
        for id in ["B1", "B6", "B11", "S3"] {
            assert!(ids.contains(&id), "{} ausente em {:?}", id, ids);
        }
        // a sonda DEV não repete a chave já coberta por B6
        assert!(!ids.contains(&"DEV_much_above"));
        let b6 = r.active_rules.iter().find(|a| a.rule_id == "B6").unwrap();
        assert!(b6.interpretation.contains("bem acima da média"));
    }

    #[test]
    fn excellent_bill() {
        let r = engine().evaluate(&inputs(30.0, 80.0, -50.0, 25.0, 95.0)).unwrap();
        assert_eq!(r.dominant("bill_assessment"), Some("excellent"));
        assert_eq!(r.dominant("savings_potential"), Some("minimal"));
    }

    #[test]
    fn unmapped_bill_consumption_combination_gets_fallback() {
        // fatura baixa (80) e consumo alto (550): combinação sem texto
        let r = engine().evaluate(&inputs(80.0, 550.0, 0.0, 14.0, 55.0)).unwrap();
        let probe = r.active_rules.iter().find(|a| a.rule_id == "BC_low_high").unwrap();
        assert_eq!(probe.interpretation, "Padrão típico de faturamento");
        assert!(r.active_rules.len() <= 8);
    }

    #[test]
    fn efficiency_score_from_rate() {
        assert!((BillingInputs::efficiency_score(0.28) - 70.0).abs() < 1e-9);
        assert!((BillingInputs::efficiency_score(0.56) - 35.0).abs() < 1e-9);
        assert_eq!(BillingInputs::efficiency_score(0.1), 100.0);
        assert_eq!(BillingInputs::efficiency_score(0.0), 50.0);
        assert_eq!(BillingInputs::efficiency_score(-1.0), 50.0);
    }

    #[test]
    fn from_summary_maps_fields() {
        let summary: BillSummary = serde_json::from_str(
            r#"{"total_bill": 210.0, "estimated_kwh": 650.0, "diff_bill_pct": 12.5, "pct_fixed": 9.0}"#,
        )
        .unwrap();
        assert_eq!(summary.avg_chf_per_kwh, REFERENCE_RATE);
        let i = BillingInputs::from_summary(&summary);
        assert_eq!(i.bill_amount, 210.0);
        assert_eq!(i.consumption, 650.0);
        assert_eq!(i.deviation, 12.5);
        assert_eq!(i.fixed_ratio, 9.0);
        assert!((i.efficiency - 70.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_evaluation_is_identical() {
        let e = engine();
        for x in [
            inputs(450.0, 750.0, 60.0, 5.0, 15.0),
            inputs(30.0, 80.0, -50.0, 25.0, 95.0),
            inputs(80.0, 550.0, 0.0, 14.0, 55.0),
        ] {
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
