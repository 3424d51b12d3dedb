//! # Sistema de Mercado
//!
//! Explica o momento do mercado de energia a partir de cinco entradas:
//!
//! | Entrada | Universo | Origem |
//! |---------|----------|--------|
//! | `price` | 0–200 €/MWh | último preço da série |
//! | `consumption` | 0–100 % | último consumo normalizado no intervalo da série |
//! | `hour` | 0–23 | hora do último timestamp |
//! | `volatility` | 0–50 | desvio-padrão amostral dos preços |
//! | `trend` | −50–50 % | variação do preço em 24 amostras |
//!
//! Duas saídas independentes: `market_condition` (0 = muito favorável) e
//! `recommendation` (0 = evitar consumo).
//!
//! A hora é um eixo **linear**: 23h e 0h ficam nos extremos opostos do
//! universo, embora sejam vizinhas no relógio.
//!
//! ## Contexto da Série
//!
//! Além das entradas do motor, [`MarketContext`] resume a série para o
//! texto: nível do preço e do consumo pelo z-score, rótulos de tendência
//! e volatilidade, e o prêmio de preço no horário de pico.
//!
//! | z-score | Nível | Cor |
//! |---------|-------|-----|
//! | < −1,5 | muito baixo | green |
//! | < −0,5 | relativamente baixo | lightgreen |
//! | < 0,5 | moderado | orange |
//! | < 1,5 | relativamente alto | darkorange |
//! | ≥ 1,5 | muito alto | red |

use std::collections::HashMap;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use super::five_band_output;
use crate::core::{LinguisticVariable, Probe, SystemDefinition};
use crate::explain::{ContextSection, OutputPhrases, Phrasebook, Placement};

pub const NAME: &str = "market";

/// Amostras necessárias para calcular a tendência de 24h.
const TREND_WINDOW: usize = 24;

/// Hora assumida quando a última amostra não traz timestamp.
const DEFAULT_HOUR: f64 = 12.0;

/// Amostras usadas na tendência de consumo.
const CONSUMPTION_TREND_WINDOW: usize = 6;

/// Horas de pico tarifário.
pub const PEAK_HOURS: [u32; 7] = [7, 8, 9, 18, 19, 20, 21];

pub fn is_peak_hour(hour: u32) -> bool {
    PEAK_HOURS.contains(&hour)
}

pub fn definition() -> SystemDefinition {
    let price = LinguisticVariable::antecedent("price", 0.0, 200.0)
        .trap("very_low", 0.0, 0.0, 20.0, 40.0)
        .tri("low", 20.0, 45.0, 70.0)
        .tri("medium", 50.0, 80.0, 110.0)
        .tri("high", 90.0, 120.0, 150.0)
        .trap("very_high", 130.0, 160.0, 200.0, 200.0);

    let consumption = LinguisticVariable::antecedent("consumption", 0.0, 100.0)
        .trap("very_low", 0.0, 0.0, 15.0, 30.0)
        .tri("low", 15.0, 35.0, 55.0)
        .tri("medium", 40.0, 55.0, 70.0)
        .tri("high", 55.0, 75.0, 90.0)
        .trap("very_high", 80.0, 90.0, 100.0, 100.0);

    // afternoon vai até 18 e evening_peak tem ombro em 23 para que
    // nenhuma hora fique sem termo
    let hour = LinguisticVariable::antecedent("hour", 0.0, 23.0)
        .trap("night", 0.0, 0.0, 4.0, 6.0)
        .tri("early_morning", 5.0, 7.0, 9.0)
        .tri("morning_peak", 7.0, 9.0, 12.0)
        .tri("afternoon", 11.0, 14.0, 18.0)
        .trap("evening_peak", 17.0, 20.0, 23.0, 23.0);

    let volatility = LinguisticVariable::antecedent("volatility", 0.0, 50.0)
        .trap("very_low", 0.0, 0.0, 3.0, 8.0)
        .tri("low", 5.0, 10.0, 15.0)
        .tri("medium", 12.0, 18.0, 25.0)
        .tri("high", 20.0, 30.0, 40.0)
        .trap("very_high", 35.0, 45.0, 50.0, 50.0);

    let trend = LinguisticVariable::antecedent("trend", -50.0, 50.0)
        .trap("falling_fast", -50.0, -50.0, -30.0, -15.0)
        .tri("falling", -25.0, -12.0, 0.0)
        .tri("stable", -8.0, 0.0, 8.0)
        .tri("rising", 0.0, 12.0, 25.0)
        .trap("rising_fast", 15.0, 30.0, 50.0, 50.0);

    const MC: &str = "market_condition";
    const REC: &str = "recommendation";

    SystemDefinition::new(
        NAME,
        "Condição do mercado de energia e recomendação de consumo",
    )
    .input(price)
    .input(consumption)
    .input(hour)
    .input(volatility)
    .input(trend)
    .output(five_band_output(
        MC,
        ["very_favorable", "favorable", "neutral", "unfavorable", "very_unfavorable"],
    ))
    .output(five_band_output(
        REC,
        ["avoid", "reduce", "normal", "increase", "optimal"],
    ))
    // preço × consumo
    .rule("M1", &[("price", "very_high"), ("consumption", "very_high")], MC, "very_unfavorable",
        Some("🔥 Crise de pico de demanda - rede sob estresse máximo"))
    .rule("M2", &[("price", "high"), ("consumption", "high")], MC, "unfavorable", None)
    .rule("M3", &[("price", "medium"), ("consumption", "medium")], MC, "neutral", None)
    .rule("M4", &[("price", "low"), ("consumption", "low")], MC, "favorable", None)
    .rule("M5", &[("price", "very_low"), ("consumption", "very_low")], MC, "very_favorable",
        Some("🌙 Período fora de pico - momento ideal para consumir"))
    // restrição de oferta
    .rule("M6", &[("price", "very_high"), ("consumption", "low")], MC, "unfavorable", None)
    .rule("M7", &[("price", "high"), ("consumption", "very_low")], MC, "unfavorable", None)
    // excedente renovável
    .rule("M8", &[("price", "very_low"), ("consumption", "high")], MC, "very_favorable",
        Some("🌱 Excedente renovável - abundância eólica e solar"))
    .rule("M9", &[("price", "low"), ("consumption", "very_high")], MC, "favorable", None)
    // hora do dia
    .rule("M10", &[("hour", "night"), ("price", "low")], MC, "very_favorable",
        Some("🌙 Vantagem noturna - período de menor demanda"))
    .rule("M11", &[("hour", "morning_peak"), ("price", "high")], MC, "unfavorable", None)
    .rule("M12", &[("hour", "evening_peak"), ("price", "very_high")], MC, "very_unfavorable",
        Some("🔴 Crise do pico noturno - demanda residencial máxima"))
    .rule("M13", &[("hour", "afternoon"), ("price", "medium")], MC, "neutral", None)
    // volatilidade
    .rule("M14", &[("volatility", "very_high"), ("price", "high")], MC, "very_unfavorable", None)
    .rule("M15", &[("volatility", "high"), ("trend", "rising_fast")], MC, "unfavorable", None)
    .rule("M16", &[("volatility", "low"), ("trend", "stable")], MC, "favorable", None)
    .rule("M17", &[("volatility", "very_low"), ("price", "low")], MC, "very_favorable", None)
    // tendência
    .rule("M18", &[("trend", "falling_fast"), ("price", "high")], MC, "neutral", None)
    .rule("M19", &[("trend", "rising_fast"), ("price", "low")], MC, "neutral", None)
    .rule("M20", &[("trend", "stable"), ("price", "medium")], MC, "neutral", None)
    // recomendação
    .rule("R1", &[("price", "very_low"), ("hour", "night")], REC, "optimal", None)
    .rule("R2", &[("price", "low"), ("consumption", "low")], REC, "optimal", None)
    .rule("R3", &[("price", "very_high"), ("hour", "evening_peak")], REC, "avoid", None)
    .rule("R4", &[("price", "high"), ("hour", "morning_peak")], REC, "reduce", None)
    .rule("R5", &[("price", "medium"), ("hour", "afternoon")], REC, "normal", None)
    .rule("R6", &[("price", "medium"), ("consumption", "medium")], REC, "normal", None)
    .rule("R7", &[("price", "low"), ("volatility", "low")], REC, "increase", None)
    .rule("R8", &[("price", "very_low"), ("trend", "falling")], REC, "optimal", None)
    // leituras sem regra própria
    .probe(Probe::new("PC", &["price", "consumption"]).mapped_only())
    .probe(Probe::new("V", &["volatility"]).mapped_only())
    .probe(Probe::new("T", &["trend"]).mapped_only())
    .interpret(&[("price", "high"), ("consumption", "low")],
        "⚡ Restrição de oferta - falta de geração ou de combustível")
    .interpret(&[("volatility", "very_high")], "📊 Alta volatilidade - mercado instável")
    .interpret(&[("trend", "rising_fast")], "📈 Alta rápida de preço - considere adiar o consumo")
    .interpret(&[("trend", "falling_fast")],
        "📉 Queda rápida de preço - bom momento para tarefas intensivas")
    .fallback_text("Padrão típico de mercado")
    .trace_limit(6)
}

pub fn phrasebook() -> Phrasebook {
    Phrasebook::new("Avaliação Fuzzy do Mercado")
        .output(
            OutputPhrases::new("market_condition", "Condição de Mercado")
                .term("very_favorable", "Muito favorável", "#00c853",
                    "Preço e demanda muito baixos: excelente momento para consumir.")
                .term("favorable", "Favorável", "#64dd17",
                    "Condições abaixo da média: bom momento para consumir.")
                .term("neutral", "Neutra", "#ffa726",
                    "Condições típicas de mercado.")
                .term("unfavorable", "Desfavorável", "#ff6f00",
                    "Preço ou demanda elevados: prefira adiar consumos flexíveis.")
                .term("very_unfavorable", "Muito desfavorável", "#d32f2f",
                    "Mercado sob estresse: evite consumo não essencial."),
        )
        .output(
            OutputPhrases::new("recommendation", "Recomendação")
                .term("avoid", "Evitar", "#d32f2f", "Evite consumir agora.")
                .term("reduce", "Reduzir", "#ff6f00", "Reduza o consumo onde possível.")
                .term("normal", "Normal", "#ffa726", "Consumo normal.")
                .term("increase", "Aumentar", "#64dd17",
                    "Bom momento para antecipar consumos flexíveis.")
                .term("optimal", "Ótimo", "#00c853",
                    "Momento ideal para tarefas de alto consumo."),
        )
}

/// Uma observação da série de mercado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSample {
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
    pub price: f64,
    pub consumption: f64,
}

/// Entradas derivadas da série, nas unidades do sistema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketInputs {
    pub price: f64,
    pub consumption: f64,
    pub hour: f64,
    pub volatility: f64,
    pub trend: f64,
}

impl MarketInputs {
    /// Deriva as cinco entradas da série (última amostra = "agora").
    ///
    /// Retorna `None` para série vazia.
    pub fn from_series(samples: &[MarketSample]) -> Option<Self> {
        let last = samples.last()?;

        let prices: Vec<f64> = samples.iter().map(|s| s.price).collect();
        let (cons_min, cons_max) = samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
                (lo.min(s.consumption), hi.max(s.consumption))
            });
        let consumption = if cons_max > cons_min {
            (last.consumption - cons_min) / (cons_max - cons_min) * 100.0
        } else {
            50.0
        };

        let trend = price_trend_pct(samples);

        Some(Self {
            price: last.price,
            consumption,
            hour: last
                .timestamp
                .map(|t| t.hour() as f64)
                .unwrap_or(DEFAULT_HOUR),
            volatility: sample_std(&prices).min(50.0),
            trend: trend.clamp(-50.0, 50.0),
        })
    }

    pub fn to_map(&self) -> HashMap<String, f64> {
        HashMap::from([
            ("price".to_string(), self.price),
            ("consumption".to_string(), self.consumption),
            ("hour".to_string(), self.hour),
            ("volatility".to_string(), self.volatility),
            ("trend".to_string(), self.trend),
        ])
    }
}

/// Variação percentual do preço nas últimas [`TREND_WINDOW`] amostras,
/// sem limite. Zero com série curta ou referência não positiva.
fn price_trend_pct(samples: &[MarketSample]) -> f64 {
    let prices: Vec<f64> = samples.iter().map(|s| s.price).collect();
    window_change_pct(&prices, TREND_WINDOW)
}

/// `(último - primeiro) / primeiro * 100` sobre as últimas `window` amostras.
fn window_change_pct(values: &[f64], window: usize) -> f64 {
    if values.len() < window {
        return 0.0;
    }
    let recent = &values[values.len() - window..];
    match (recent.first(), recent.last()) {
        (Some(&first), Some(&last)) if first > 0.0 => (last - first) / first * 100.0,
        _ => 0.0,
    }
}

// ─── Contexto da série ───────────────────────────────────────────

/// Nível do valor atual em relação à série.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelCategory {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl LevelCategory {
    /// Classifica pelo z-score. Desvio nulo conta como 1.
    pub fn classify(value: f64, mean: f64, std: f64) -> Self {
        let std = if std > 0.0 { std } else { 1.0 };
        let z = (value - mean) / std;
        if z < -1.5 {
            Self::VeryLow
        } else if z < -0.5 {
            Self::Low
        } else if z < 0.5 {
            Self::Moderate
        } else if z < 1.5 {
            Self::High
        } else {
            Self::VeryHigh
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::VeryLow => "muito baixo",
            Self::Low => "relativamente baixo",
            Self::Moderate => "moderado",
            Self::High => "relativamente alto",
            Self::VeryHigh => "muito alto",
        }
    }

    pub fn colour(self) -> &'static str {
        match self {
            Self::VeryLow => "green",
            Self::Low => "lightgreen",
            Self::Moderate => "orange",
            Self::High => "darkorange",
            Self::VeryHigh => "red",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    FallingRapidly,
    Decreasing,
    Stable,
    Increasing,
    RisingRapidly,
}

impl TrendLabel {
    pub fn from_pct(pct: f64) -> Self {
        if pct < -15.0 {
            Self::FallingRapidly
        } else if pct < -5.0 {
            Self::Decreasing
        } else if pct < 5.0 {
            Self::Stable
        } else if pct < 15.0 {
            Self::Increasing
        } else {
            Self::RisingRapidly
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FallingRapidly => "em queda acelerada",
            Self::Decreasing => "em queda",
            Self::Stable => "estável",
            Self::Increasing => "em alta",
            Self::RisingRapidly => "em alta acelerada",
        }
    }
}

/// Volatilidade pelo desvio-padrão dos preços (sem o teto do motor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityLabel {
    Low,
    Medium,
    High,
}

impl VolatilityLabel {
    pub fn from_std(std: f64) -> Self {
        if std > 20.0 {
            Self::High
        } else if std > 10.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "baixa",
            Self::Medium => "média",
            Self::High => "alta",
        }
    }
}

/// Peso do prêmio de pico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakPricing {
    Minimal,
    Moderate,
    Significant,
}

impl PeakPricing {
    pub fn from_premium(premium_pct: f64) -> Self {
        if premium_pct > 15.0 {
            Self::Significant
        } else if premium_pct > 5.0 {
            Self::Moderate
        } else {
            Self::Minimal
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Minimal => "Mínimo",
            Self::Moderate => "Moderado",
            Self::Significant => "Significativo",
        }
    }
}

/// Estatísticas de uma coluna da série e o nível do valor atual.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesLevel {
    pub current: f64,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub category: LevelCategory,
    pub label: &'static str,
    pub colour: &'static str,
    pub trend: TrendLabel,
    pub trend_pct: f64,
}

impl SeriesLevel {
    fn of(values: &[f64], trend_pct: f64) -> Option<Self> {
        let current = *values.last()?;
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let std = sample_std(values);
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let category = LevelCategory::classify(current, mean, std);
        Some(Self {
            current,
            mean,
            std,
            min,
            max,
            category,
            label: category.label(),
            colour: category.colour(),
            trend: TrendLabel::from_pct(trend_pct),
            trend_pct,
        })
    }
}

/// Preço médio no pico contra fora do pico.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeOfUse {
    /// `(pico - fora) / fora * 100`; zero se a média fora do pico não for positiva.
    pub peak_premium: f64,
    pub peak_pricing: PeakPricing,
    pub peak_price_avg: f64,
    pub offpeak_price_avg: f64,
    pub current_hour: u32,
    pub is_peak_hour: bool,
}

impl TimeOfUse {
    /// Usa só as amostras com timestamp. Exige que a última tenha hora e
    /// que existam amostras dentro e fora do pico.
    fn from_series(samples: &[MarketSample]) -> Option<Self> {
        let current_hour = samples.last()?.timestamp?.hour();
        let (peak, offpeak): (Vec<(u32, f64)>, Vec<(u32, f64)>) = samples
            .iter()
            .filter_map(|s| s.timestamp.map(|t| (t.hour(), s.price)))
            .partition(|(h, _)| is_peak_hour(*h));
        if peak.is_empty() || offpeak.is_empty() {
            return None;
        }
        let avg = |group: &[(u32, f64)]| group.iter().map(|(_, p)| p).sum::<f64>() / group.len() as f64;
        let peak_price_avg = avg(peak.as_slice());
        let offpeak_price_avg = avg(offpeak.as_slice());
        let peak_premium = if offpeak_price_avg > 0.0 {
            (peak_price_avg - offpeak_price_avg) / offpeak_price_avg * 100.0
        } else {
            0.0
        };
        Some(Self {
            peak_premium,
            peak_pricing: PeakPricing::from_premium(peak_premium),
            peak_price_avg,
            offpeak_price_avg,
            current_hour,
            is_peak_hour: is_peak_hour(current_hour),
        })
    }
}

/// Resumo descritivo da série que acompanha a análise de mercado.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketContext {
    pub price: SeriesLevel,
    pub consumption: SeriesLevel,
    pub volatility: VolatilityLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_of_use: Option<TimeOfUse>,
}

impl MarketContext {
    /// `None` para série vazia.
    pub fn from_series(samples: &[MarketSample]) -> Option<Self> {
        let prices: Vec<f64> = samples.iter().map(|s| s.price).collect();
        let consumption: Vec<f64> = samples.iter().map(|s| s.consumption).collect();

        let price = SeriesLevel::of(&prices, price_trend_pct(samples))?;
        let consumption = SeriesLevel::of(
            &consumption,
            window_change_pct(&consumption, CONSUMPTION_TREND_WINDOW),
        )?;

        Some(Self {
            volatility: VolatilityLabel::from_std(price.std),
            price,
            consumption,
            time_of_use: TimeOfUse::from_series(samples),
        })
    }

    /// Seções de preço e consumo antes das regras; horário de uso depois.
    pub fn sections(&self) -> Vec<ContextSection> {
        let mut sections = vec![
            ContextSection::new("⚡ Análise de Preço", Placement::BeforeRules)
                .line(format!(
                    "**Situação:** preço **{}** (€{:.2}/MWh vs média €{:.2})",
                    self.price.label, self.price.current, self.price.mean
                ))
                .line(format!(
                    "**Tendência:** {} ({:+.1}%)",
                    self.price.trend.label(),
                    self.price.trend_pct
                ))
                .line(format!("**Volatilidade:** {}", self.volatility.label())),
            ContextSection::new("🔌 Análise de Consumo", Placement::BeforeRules)
                .line(format!(
                    "**Situação:** demanda **{}** ({:.0} MW vs média {:.0} MW)",
                    self.consumption.label, self.consumption.current, self.consumption.mean
                ))
                .line(format!(
                    "**Tendência:** {} ({:+.1}%)",
                    self.consumption.trend.label(),
                    self.consumption.trend_pct
                )),
        ];
        if let Some(tou) = &self.time_of_use {
            sections.push(
                ContextSection::new("🕐 Horário de Uso", Placement::AfterRules)
                    .line(format!(
                        "**Prêmio de pico:** {} ({:+.1}%)",
                        tou.peak_pricing.label(),
                        tou.peak_premium
                    ))
                    .line(format!(
                        "**Agora:** {}",
                        if tou.is_peak_hour {
                            "⚠️ Horário de pico"
                        } else {
                            "✅ Fora do pico"
                        }
                    )),
            );
        }
        sections
    }
}

/// Desvio-padrão amostral (n − 1). Zero com menos de duas amostras.
fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}
