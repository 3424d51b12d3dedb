//! # Módulo Web — API JSON dos Sistemas Fuzzy
//!
//! Camada HTTP construída com **Axum**; só JSON, sem renderização de HTML.
//!
//! ## Rotas
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ Axum Router (este módulo)                                        │
//! │  ├── GET  /status                          → prontidão + nomes   │
//! │  ├── GET  /systems                         → resumos             │
//! │  ├── GET  /systems/{name}/rules            → tabela markdown     │
//! │  ├── GET  /systems/{name}/variables/{var}  → curvas (x, μ)       │
//! │  ├── POST /systems/{name}/evaluate         → resultado+explicação│
//! │  ├── POST /systems/{name}/evaluate/batch   → lote (rayon)        │
//! │  ├── POST /market/analyze                  → série → análise     │
//! │  ├── POST /billing/analyze                 → fatura → análise    │
//! │  └── POST /systems/reload                  → relê definições     │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ CorsLayer (tower_http) — origens de ENERGY_CORS_ORIGINS          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Submódulos
//!
//! | Módulo | Responsabilidade |
//! |--------|------------------|
//! | [`state`] | Estado compartilhado (`AppState`) |
//! | [`handlers`] | Handlers Axum e `ApiError` |

pub mod handlers;
pub mod state;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use state::AppState;

/// Cria o router Axum com todas as rotas da aplicação.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    Router::new()
        // ── Consulta ──────────────────────────────────────────
        .route("/status", get(handlers::status))
        .route("/systems", get(handlers::list_systems))
        .route("/systems/{name}/rules", get(handlers::system_rules))
        .route(
            "/systems/{name}/variables/{variable}",
            get(handlers::variable_curves),
        )
        // ── Avaliação ─────────────────────────────────────────
        .route("/systems/{name}/evaluate", post(handlers::evaluate))
        .route("/systems/{name}/evaluate/batch", post(handlers::evaluate_batch))
        .route("/market/analyze", post(handlers::analyze_market))
        .route("/billing/analyze", post(handlers::analyze_billing))
        // ── Administração ─────────────────────────────────────
        .route("/systems/reload", post(handlers::reload))
        .layer(cors)
        .with_state(state)
}

/// Lista vazia libera qualquer origem.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Origem CORS inválida ignorada");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
