//! # Estado da Aplicação Web
//!
//! ```text
//! AppState (Clone, barato)
//!  ├── orchestrator: Arc<RwLock<Arc<Orchestrator>>>
//!  │     leitura: clona o Arc interno e solta o lock
//!  │     reload:  troca o Arc inteiro sob write lock
//!  └── config: Arc<AppConfig>
//! ```
//!
//! Nenhuma avaliação roda com o lock adquirido.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::AppConfig;
use crate::orchestrator::Orchestrator;

/// Estado compartilhado da aplicação Axum.
#[derive(Clone)]
pub struct AppState {
    /// Catálogo atual de sistemas, substituível por inteiro.
    pub orchestrator: Arc<RwLock<Arc<Orchestrator>>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, config: AppConfig) -> Self {
        Self {
            orchestrator: Arc::new(RwLock::new(Arc::new(orchestrator))),
            config: Arc::new(config),
        }
    }

    /// Snapshot do catálogo atual.
    pub fn catalogue(&self) -> Arc<Orchestrator> {
        self.orchestrator.read().clone()
    }

    pub fn replace_catalogue(&self, orchestrator: Orchestrator) {
        *self.orchestrator.write() = Arc::new(orchestrator);
    }
}
