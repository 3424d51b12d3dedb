//! # Configuração — Variáveis de Ambiente
//!
//! | Variável | Padrão | Uso |
//! |----------|--------|-----|
//! | `ENERGY_HOST` | `0.0.0.0` | endereço de bind |
//! | `ENERGY_PORT` | `3000` | porta HTTP |
//! | `ENERGY_DEFINITIONS_DIR` | — | diretório com definições JSON extras |
//! | `ENERGY_CORS_ORIGINS` | — | origens permitidas (separadas por vírgula); vazio = qualquer |

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Definições de sistema carregadas do disco (substituem as embarcadas
    /// de mesmo nome).
    #[serde(default)]
    pub definitions_dir: Option<PathBuf>,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            definitions_dir: None,
            cors_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Lê a configuração do ambiente do processo.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Monta a configuração a partir de uma função de consulta
    /// (o ambiente, em produção).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(host) = lookup("ENERGY_HOST").filter(|h| !h.trim().is_empty()) {
            config.host = host.trim().to_string();
        }
        if let Some(port) = lookup("ENERGY_PORT") {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("ENERGY_PORT inválida: '{}'", port))?;
        }
        config.definitions_dir = lookup("ENERGY_DEFINITIONS_DIR")
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from);
        if let Some(origins) = lookup("ENERGY_CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(config)
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
