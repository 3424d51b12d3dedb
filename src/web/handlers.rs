//! # Handlers HTTP — Os Endpoints da Aplicação
//!
//! Cada função pública neste módulo é um handler Axum, mapeado a uma
//! rota em [`super::create_router()`]. Todas as respostas são JSON.
//!
//! ## Padrão de Resposta
//!
//! | Handler | Método | Retorno |
//! |---------|--------|---------|
//! | `status` | GET | prontidão + nomes dos sistemas |
//! | `list_systems` | GET | [`SystemSummary`] de cada sistema |
//! | `system_rules` | GET | tabela markdown das regras |
//! | `variable_curves` | GET | curvas `(x, μ)` de cada termo |
//! | `evaluate` | POST | resultado + explicação |
//! | `evaluate_batch` | POST | um item por mapa de entradas, na ordem |
//! | `analyze_market` | POST | entradas derivadas + resumo da série + análise |
//! | `analyze_billing` | POST | entradas derivadas da fatura + análise |
//! | `reload` | POST | catálogo recarregado do disco |
//!
//! ## Erros
//!
//! Toda falha vira [`ApiError`], serializado como `{ "error": "..." }`:
//! sistema ou variável desconhecidos → 404, erro do chamador → 400,
//! o resto → 500.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::state::AppState;
use crate::core::FuzzyError;
use crate::explain::{rules_summary, system_summary, SystemSummary};
use crate::orchestrator::{Analysis, AnalysisError, DerivedAnalysis, MarketAnalysis, Orchestrator};
use crate::systems::billing::{BillSummary, BillingInputs};
use crate::systems::market::MarketSample;

// ─── Erros ───────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(m) => {
                tracing::error!(error = %m, "Falha interna no handler");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<FuzzyError> for ApiError {
    fn from(e: FuzzyError) -> Self {
        match e {
            FuzzyError::MissingInput(_) | FuzzyError::NonFiniteInput { .. } => {
                ApiError::BadRequest(e.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::UnknownSystem(_) => ApiError::NotFound(e.to_string()),
            AnalysisError::EmptySeries => ApiError::BadRequest(e.to_string()),
            AnalysisError::Fuzzy(inner) => inner.into(),
        }
    }
}

fn unknown_system(name: &str) -> ApiError {
    AnalysisError::UnknownSystem(name.to_string()).into()
}

// ─── Tipos de requisição/resposta ────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ready: bool,
    pub systems: Vec<String>,
}

impl StatusResponse {
    fn of(orchestrator: &Orchestrator) -> Self {
        Self {
            ready: true,
            systems: orchestrator.names().into_iter().map(String::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RulesResponse {
    pub system: String,
    pub markdown: String,
}

#[derive(Debug, Serialize)]
pub struct TermCurve {
    pub term: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Serialize)]
pub struct VariableCurves {
    pub system: String,
    pub variable: String,
    pub min: f64,
    pub max: f64,
    pub terms: Vec<TermCurve>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub inputs: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub inputs: Vec<HashMap<String, f64>>,
}

/// Item de lote: `analysis` ou `error`, nunca os dois.
#[derive(Debug, Serialize)]
pub struct BatchItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub system: String,
    pub results: Vec<BatchItem>,
}

#[derive(Debug, Deserialize)]
pub struct MarketRequest {
    pub samples: Vec<MarketSample>,
}

// ─── Consulta ────────────────────────────────────────────────────

/// GET `/status`
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse::of(&state.catalogue()))
}

/// GET `/systems`
pub async fn list_systems(State(state): State<AppState>) -> Json<Vec<SystemSummary>> {
    let catalogue = state.catalogue();
    Json(
        catalogue
            .analyzers()
            .iter()
            .map(|a| system_summary(a.engine()))
            .collect(),
    )
}

/// GET `/systems/{name}/rules`
pub async fn system_rules(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RulesResponse>, ApiError> {
    let catalogue = state.catalogue();
    let analyzer = catalogue.get(&name).ok_or_else(|| unknown_system(&name))?;
    Ok(Json(RulesResponse {
        markdown: rules_summary(analyzer.engine()),
        system: name,
    }))
}

/// GET `/systems/{name}/variables/{variable}`
///
/// Curvas de pertinência amostradas na grade do universo, na ordem dos
/// termos. Serve tanto entradas quanto saídas.
pub async fn variable_curves(
    State(state): State<AppState>,
    Path((name, variable)): Path<(String, String)>,
) -> Result<Json<VariableCurves>, ApiError> {
    let catalogue = state.catalogue();
    let analyzer = catalogue.get(&name).ok_or_else(|| unknown_system(&name))?;
    let var = analyzer.engine().variable(&variable).ok_or_else(|| {
        ApiError::NotFound(format!(
            "variável '{}' não existe no sistema '{}'",
            variable, name
        ))
    })?;

    let terms = var
        .term_names()
        .filter_map(|term| {
            var.membership_curve(term).map(|points| TermCurve {
                term: term.to_string(),
                points,
            })
        })
        .collect();

    Ok(Json(VariableCurves {
        system: name,
        variable,
        min: var.universe.min,
        max: var.universe.max,
        terms,
    }))
}

// ─── Avaliação ───────────────────────────────────────────────────

/// POST `/systems/{name}/evaluate`
pub async fn evaluate(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<Analysis>, ApiError> {
    let analysis = state.catalogue().analyze(&name, &req.inputs)?;
    Ok(Json(analysis))
}

/// POST `/systems/{name}/evaluate/batch`
///
/// O lote é avaliado com rayon dentro de `spawn_blocking` para não ocupar
/// as threads do runtime. Uma entrada inválida não derruba o lote.
pub async fn evaluate_batch(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    let catalogue = state.catalogue();
    if catalogue.get(&name).is_none() {
        return Err(unknown_system(&name));
    }

    let size = req.inputs.len();
    let system = name.clone();
    let results = tokio::task::spawn_blocking(move || {
        catalogue
            .get(&system)
            .map(|analyzer| analyzer.analyze_batch(&req.inputs))
            .unwrap_or_default()
    })
    .await
    .map_err(|e| ApiError::Internal(format!("avaliação em lote interrompida: {}", e)))?;

    tracing::debug!(system = %name, size, "Lote avaliado");

    Ok(Json(BatchResponse {
        system: name,
        results: results
            .into_iter()
            .map(|r| match r {
                Ok(analysis) => BatchItem {
                    analysis: Some(analysis),
                    error: None,
                },
                Err(e) => BatchItem {
                    analysis: None,
                    error: Some(e.to_string()),
                },
            })
            .collect(),
    }))
}

/// POST `/market/analyze`
pub async fn analyze_market(
    State(state): State<AppState>,
    Json(req): Json<MarketRequest>,
) -> Result<Json<MarketAnalysis>, ApiError> {
    Ok(Json(state.catalogue().analyze_market(&req.samples)?))
}

/// POST `/billing/analyze`
pub async fn analyze_billing(
    State(state): State<AppState>,
    Json(summary): Json<BillSummary>,
) -> Result<Json<DerivedAnalysis<BillingInputs>>, ApiError> {
    Ok(Json(state.catalogue().analyze_billing(&summary)?))
}

// ─── Administração ───────────────────────────────────────────────

/// POST `/systems/reload`
///
/// Recompila o catálogo (embarcados + diretório configurado). Se qualquer
/// definição falhar, o catálogo anterior continua em uso.
pub async fn reload(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let dir = state.config.definitions_dir.clone();
    let loaded = tokio::task::spawn_blocking(move || Orchestrator::load(dir.as_deref()))
        .await
        .map_err(|e| ApiError::Internal(format!("recarga interrompida: {}", e)))?;

    match loaded {
        Ok(orchestrator) => {
            let response = StatusResponse::of(&orchestrator);
            state.replace_catalogue(orchestrator);
            tracing::info!(systems = response.systems.len(), "Catálogo recarregado");
            Ok(Json(response))
        }
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "Recarga rejeitada, catálogo mantido");
            Err(ApiError::Internal(format!("{:#}", e)))
        }
    }
}
