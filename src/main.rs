#![allow(dead_code, unused_imports)]
#![allow(rustdoc::broken_intra_doc_links)]
//! # Energy Fuzzy Explainer
//!
//! **Ponto de entrada principal** do serviço de explicação fuzzy.
//!
//! Motor Mamdani (min/max, centroide) com três sistemas embarcados: condição
//! do mercado de energia, avaliação de fatura e eficiência de fatura. Cada
//! avaliação devolve os números, as regras que mais pesaram e um texto
//! legível.
//!
//! ## Fluxo de Inicialização
//!
//! ```text
//! main()
//!   ├── Configura tracing/logging
//!   ├── Lê AppConfig do ambiente (ENERGY_*)
//!   ├── Monta o Orchestrator (embarcados + ENERGY_DEFINITIONS_DIR)
//!   ├── Monta AppState e Router
//!   └── Inicia servidor TCP
//! ```
//!
//! ## Exemplo de Uso
//!
//! ```bash
//! # Executar com logs padrão (info)
//! cargo run
//!
//! # Logs detalhados, incluindo fallbacks para o ponto médio
//! RUST_LOG=debug cargo run
//!
//! # Definições extras em disco
//! ENERGY_DEFINITIONS_DIR=./definitions ENERGY_PORT=8080 cargo run
//! ```

// Declaração dos módulos da aplicação.

/// Configuração por variáveis de ambiente.
mod config;

/// Tipos fundamentais: universos, conjuntos fuzzy, variáveis, regras, definições.
mod core;

/// Camada linguística: phrasebooks, explicações e resumos de regras.
mod explain;

/// Motor Mamdani e extração de regras ativas.
mod inference;

/// Catálogo de analisadores e fluxos de mercado/fatura.
mod orchestrator;

/// Leitura/escrita de definições de sistema em JSON.
mod persistence;

/// Os sistemas embarcados (mercado, fatura, eficiência).
mod systems;

/// Servidor web axum (API JSON).
mod web;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::orchestrator::Orchestrator;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controla o nível; padrão info.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("⚡ Energy Fuzzy Explainer — Starting...");

    let config = AppConfig::from_env().context("Configuração inválida")?;

    // Qualquer definição inválida impede a subida: nunca servimos um
    // catálogo parcial.
    let orchestrator = Orchestrator::load(config.definitions_dir.as_deref())
        .context("Falha ao montar o catálogo de sistemas")?;
    tracing::info!(systems = ?orchestrator.names(), "Sistemas disponíveis");

    let addr = config.socket_addr();
    let state = AppState::new(orchestrator, config);
    let app = web::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Falha ao fazer bind em {}", addr))?;
    tracing::info!("🚀 Server running at http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
