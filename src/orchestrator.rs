//! # Orquestrador — Catálogo de Analisadores
//!
//! O [`Orchestrator`] reúne os sistemas disponíveis, cada um como um
//! [`Analyzer`] (motor + formatador), e expõe os fluxos completos:
//!
//! ```text
//! entradas nomeadas ──▶ Analyzer::analyze ──▶ EvaluationResult + Explanation
//! série de mercado  ──▶ MarketInputs + MarketContext ──▶ "market"
//! resumo da fatura  ──▶ BillingInputs::from_summary ──▶ "billing"
//! ```
//!
//! ## Origem das Definições
//!
//! 1. As três definições embarcadas ([`crate::systems`])
//! 2. Se houver diretório configurado, cada JSON encontrado **substitui** o
//!    sistema de mesmo nome ou é acrescentado ao catálogo
//!
//! ## Concorrência
//!
//! O orquestrador é imutável depois de construído. A camada web o guarda
//! como `Arc<Orchestrator>` e, num reload, troca o `Arc` inteiro: quem já
//! estava avaliando continua com o catálogo antigo até terminar.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;

use crate::core::{FuzzyError, SystemDefinition};
use crate::explain::{ContextSection, Explanation, ExplanationFormatter, Phrasebook};
use crate::inference::{EvaluationResult, InferenceEngine};
use crate::persistence;
use crate::systems::billing::{self, BillSummary, BillingInputs};
use crate::systems::market::{self, MarketContext, MarketInputs, MarketSample};
use crate::systems::{builtin_definitions, phrasebook_for};

/// Falhas de uma análise.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("sistema desconhecido: '{0}'")]
    UnknownSystem(String),

    #[error("série de mercado vazia")]
    EmptySeries,

    #[error(transparent)]
    Fuzzy(#[from] FuzzyError),
}

/// Resultado numérico + explicação.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub result: EvaluationResult,
    pub explanation: Explanation,
}

/// Análise com as entradas derivadas que a originaram.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedAnalysis<I> {
    pub derived_inputs: I,
    #[serde(flatten)]
    pub analysis: Analysis,
}

/// Análise de mercado: entradas derivadas, resumo da série e análise.
#[derive(Debug, Clone, Serialize)]
pub struct MarketAnalysis {
    pub derived_inputs: MarketInputs,
    pub context: MarketContext,
    #[serde(flatten)]
    pub analysis: Analysis,
}

/// Um sistema pronto para uso: motor compilado + formatador.
#[derive(Debug, Clone)]
pub struct Analyzer {
    engine: InferenceEngine,
    formatter: ExplanationFormatter,
}

impl Analyzer {
    pub fn new(definition: SystemDefinition, phrasebook: Phrasebook) -> Result<Self, FuzzyError> {
        let engine = InferenceEngine::new(definition)?;
        let formatter = ExplanationFormatter::for_engine(phrasebook, &engine);
        Ok(Self { engine, formatter })
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn analyze(&self, inputs: &HashMap<String, f64>) -> Result<Analysis, FuzzyError> {
        self.analyze_with(inputs, Vec::new())
    }

    /// Avalia e anexa seções de contexto à explicação.
    pub fn analyze_with(
        &self,
        inputs: &HashMap<String, f64>,
        context: Vec<ContextSection>,
    ) -> Result<Analysis, FuzzyError> {
        let result = self.engine.evaluate(inputs)?;
        let explanation = self.formatter.explain_with(&result, context);
        Ok(Analysis {
            result,
            explanation,
        })
    }

    /// Avalia um lote em paralelo e explica cada resultado.
    pub fn analyze_batch(&self, batch: &[HashMap<String, f64>]) -> Vec<Result<Analysis, FuzzyError>> {
        self.engine
            .evaluate_batch(batch)
            .into_iter()
            .map(|r| {
                r.map(|result| Analysis {
                    explanation: self.formatter.explain(&result),
                    result,
                })
            })
            .collect()
    }
}

/// Catálogo imutável de analisadores, na ordem de exibição.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    analyzers: Vec<Analyzer>,
}

impl Orchestrator {
    /// Catálogo com os sistemas embarcados.
    pub fn builtin() -> Result<Self> {
        Self::from_definitions(builtin_definitions())
    }

    /// Compila cada definição com o phrasebook do seu nome.
    pub fn from_definitions(definitions: Vec<SystemDefinition>) -> Result<Self> {
        let analyzers = definitions
            .into_iter()
            .map(|def| {
                let name = def.name.clone();
                let phrasebook = phrasebook_for(&name);
                Analyzer::new(def, phrasebook)
                    .with_context(|| format!("Definição inválida do sistema '{}'", name))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            systems = analyzers.len(),
            rules = analyzers.iter().map(|a| a.engine.rule_count()).sum::<usize>(),
            "Catálogo de sistemas fuzzy pronto"
        );
        Ok(Self { analyzers })
    }

    /// Embarcados + definições do diretório (se houver), que substituem os
    /// de mesmo nome.
    pub fn load(definitions_dir: Option<&Path>) -> Result<Self> {
        let mut definitions = builtin_definitions();
        if let Some(dir) = definitions_dir {
            for def in persistence::load_definitions(dir)? {
                match definitions.iter_mut().find(|d| d.name == def.name) {
                    Some(existing) => {
                        tracing::info!(system = %def.name, "Definição embarcada substituída");
                        *existing = def;
                    }
                    None => definitions.push(def),
                }
            }
        }
        Self::from_definitions(definitions)
    }

    pub fn get(&self, name: &str) -> Option<&Analyzer> {
        self.analyzers.iter().find(|a| a.engine.name() == name)
    }

    pub fn analyzers(&self) -> &[Analyzer] {
        &self.analyzers
    }

    pub fn names(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.engine.name()).collect()
    }

    fn require(&self, name: &str) -> Result<&Analyzer, AnalysisError> {
        self.get(name)
            .ok_or_else(|| AnalysisError::UnknownSystem(name.to_string()))
    }

    pub fn analyze(
        &self,
        system: &str,
        inputs: &HashMap<String, f64>,
    ) -> Result<Analysis, AnalysisError> {
        Ok(self.require(system)?.analyze(inputs)?)
    }

    /// Deriva as entradas e o resumo da série e avalia o sistema de mercado.
    pub fn analyze_market(&self, samples: &[MarketSample]) -> Result<MarketAnalysis, AnalysisError> {
        let analyzer = self.require(market::NAME)?;
        let derived = MarketInputs::from_series(samples).ok_or(AnalysisError::EmptySeries)?;
        let context = MarketContext::from_series(samples).ok_or(AnalysisError::EmptySeries)?;
        Ok(MarketAnalysis {
            analysis: analyzer.analyze_with(&derived.to_map(), context.sections())?,
            derived_inputs: derived,
            context,
        })
    }

    /// Deriva as entradas do resumo e avalia o sistema de fatura.
    pub fn analyze_billing(
        &self,
        summary: &BillSummary,
    ) -> Result<DerivedAnalysis<BillingInputs>, AnalysisError> {
        let analyzer = self.require(billing::NAME)?;
        let derived = BillingInputs::from_summary(summary);
        Ok(DerivedAnalysis {
            analysis: analyzer.analyze(&derived.to_map())?,
            derived_inputs: derived,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LinguisticVariable;
    use crate::inference::input_map;
    use crate::systems::efficiency;

    #[test]
    fn builtin_catalogue_order() {
        let o = Orchestrator::builtin().unwrap();
        assert_eq!(o.names(), ["market", "billing", "efficiency"]);
    }

    #[test]
    fn analyze_explains_result() {
        let o = Orchestrator::builtin().unwrap();
        let a = o
            .analyze("efficiency", &efficiency::inputs(420.0, 250.0))
            .unwrap();
        assert_eq!(a.result.dominant("efficiency"), Some("very_poor"));
        assert_eq!(a.explanation.headline, "Eficiência: Muito ruim");
        assert_eq!(a.explanation.assessments[0].colour, "red");
    }

    #[test]
    fn unknown_system_and_bad_inputs() {
        let o = Orchestrator::builtin().unwrap();
        assert!(matches!(
            o.analyze("weather", &HashMap::new()),
            Err(AnalysisError::UnknownSystem(_))
        ));
        assert!(matches!(
            o.analyze("efficiency", &input_map(&[("bill", 1.0)])),
            Err(AnalysisError::Fuzzy(FuzzyError::MissingInput(_)))
        ));
    }

    #[test]
    fn market_pipeline_derives_inputs() {
        let o = Orchestrator::builtin().unwrap();
        let samples = vec![
            MarketSample { timestamp: None, price: 12.0, consumption: 100.0 },
            MarketSample { timestamp: None, price: 10.0, consumption: 40.0 },
        ];
        let a = o.analyze_market(&samples).unwrap();
        assert_eq!(a.derived_inputs.price, 10.0);
        assert_eq!(a.derived_inputs.consumption, 0.0);
        assert_eq!(a.analysis.result.dominant("market_condition"), Some("very_favorable"));
        assert_eq!(a.context.consumption.current, 40.0);
        assert_eq!(a.context.time_of_use, None);

        let markdown = &a.analysis.explanation.markdown;
        let price = markdown.find("## ⚡ Análise de Preço").unwrap();
        let rules = markdown.find("## 📋 Regras Ativas").unwrap();
        assert!(price < rules);
        assert!(!markdown.contains("Horário de Uso"));

        assert!(matches!(o.analyze_market(&[]), Err(AnalysisError::EmptySeries)));
    }

    #[test]
    fn score_scale_follows_output_universe() {
        let mut def = efficiency::definition();
        def.name = "efficiency_500".into();
        def.outputs[0].variable = LinguisticVariable::consequent("efficiency", 0.0, 500.0)
            .trap("very_poor", 0.0, 0.0, 50.0, 125.0)
            .tri("poor", 75.0, 150.0, 225.0)
            .tri("average", 175.0, 250.0, 325.0)
            .tri("good", 275.0, 350.0, 425.0)
            .trap("excellent", 375.0, 450.0, 500.0, 500.0);
        let o = Orchestrator::from_definitions(vec![def]).unwrap();
        let a = o.analyze("efficiency_500", &efficiency::inputs(420.0, 250.0)).unwrap();
        assert_eq!(a.explanation.assessments[0].scale_max, 500.0);
        assert!(a.explanation.markdown.contains("/500)"));

        let a = Orchestrator::builtin()
            .unwrap()
            .analyze("efficiency", &efficiency::inputs(420.0, 250.0))
            .unwrap();
        assert!(a.explanation.markdown.contains("/100)"));
    }

    #[test]
    fn billing_pipeline_derives_efficiency() {
        let o = Orchestrator::builtin().unwrap();
        let summary = BillSummary {
            total_bill: 450.0,
            estimated_kwh: 750.0,
            diff_bill_pct: 60.0,
            pct_fixed: 5.0,
            avg_chf_per_kwh: 1.3,
        };
        let a = o.analyze_billing(&summary).unwrap();
        assert!(a.derived_inputs.efficiency < 20.0);
        assert_eq!(a.analysis.result.dominant("bill_assessment"), Some("critical"));
        let json = serde_json::to_value(&a).unwrap();
        assert!(json["derived_inputs"]["efficiency"].is_number());
        assert!(json["result"]["crisp_outputs"]["bill_assessment"].is_number());
    }

    #[test]
    fn batch_keeps_order_and_errors() {
        let o = Orchestrator::builtin().unwrap();
        let analyzer = o.get("efficiency").unwrap();
        let batch = vec![
            efficiency::inputs(420.0, 250.0),
            HashMap::new(),
            efficiency::inputs(20.0, 400.0),
        ];
        let out = analyzer.analyze_batch(&batch);
        assert_eq!(out.len(), 3);
        assert!(out[1].is_err());
        assert_eq!(
            out[2].as_ref().unwrap().result.dominant("efficiency"),
            Some("excellent")
        );
    }

    #[test]
    fn definitions_on_disk_override_builtins() {
        let dir = std::env::temp_dir().join(format!("energy-fuzzy-override-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let mut custom = efficiency::definition();
        custom.description = "personalizado".into();
        let extra = SystemDefinition {
            name: "efficiency_copy".into(),
            ..efficiency::definition()
        };
        persistence::export_definitions(&dir, &[custom, extra]).unwrap();

        let o = Orchestrator::load(Some(&dir)).unwrap();
        assert_eq!(o.names(), ["market", "billing", "efficiency", "efficiency_copy"]);
        assert_eq!(o.get("efficiency").unwrap().engine().description(), "personalizado");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn invalid_definition_is_reported_with_system_name() {
        let mut def = efficiency::definition();
        def.outputs[0].rules.rules[0].consequent.term = "terrible".into();
        let err = Orchestrator::from_definitions(vec![def]).unwrap_err();
        assert!(format!("{:#}", err).contains("efficiency"));
    }
}
