//! # Persistência — Definições de Sistema em JSON
//!
//! Carrega e exporta [`SystemDefinition`]s como arquivos JSON, um sistema
//! por arquivo (`<nome>.json`).
//!
//! ## Quando é Usado?
//!
//! - Na inicialização e em `POST /systems/reload`, se
//!   `ENERGY_DEFINITIONS_DIR` estiver configurado
//! - Para exportar as tabelas embarcadas como ponto de partida de uma
//!   configuração editada à mão
//!
//! Este módulo só lida com arquivos: a validação da definição acontece
//! em [`InferenceEngine::new`](crate::inference::InferenceEngine::new).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::SystemDefinition;

/// Lê uma definição de um arquivo JSON.
pub fn load_definition(path: &Path) -> Result<SystemDefinition> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Falha ao ler {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("Falha ao desserializar {}", path.display()))
}

/// Lê todos os `*.json` de um diretório, em ordem alfabética de arquivo.
///
/// # Erros
///
/// Falha se o diretório não puder ser lido ou se algum arquivo estiver
/// corrompido; uma configuração parcial nunca é aplicada.
pub fn load_definitions(dir: &Path) -> Result<Vec<SystemDefinition>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Falha ao listar {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let definitions = paths
        .iter()
        .map(|p| load_definition(p))
        .collect::<Result<Vec<_>>>()?;
    tracing::info!(
        dir = %dir.display(),
        systems = definitions.len(),
        "Definições carregadas do disco"
    );
    Ok(definitions)
}

/// Escreve cada definição como `<dir>/<nome>.json` (pretty-printed).
///
/// Cria o diretório se não existir. Retorna os caminhos escritos.
pub fn export_definitions(dir: &Path, definitions: &[SystemDefinition]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Falha ao criar diretório {}", dir.display()))?;
    definitions
        .iter()
        .map(|def| {
            let path = dir.join(format!("{}.json", def.name));
            let json = serde_json::to_string_pretty(def)
                .with_context(|| format!("Falha ao serializar '{}'", def.name))?;
            std::fs::write(&path, json)
                .with_context(|| format!("Falha ao escrever {}", path.display()))?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "energy-fuzzy-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn export_then_load_reproduces_builtins() {
        let dir = scratch_dir("export");
        let builtins = systems::builtin_definitions();
        let written = export_definitions(&dir, &builtins).unwrap();
        assert_eq!(written.len(), 3);

        let loaded = load_definitions(&dir).unwrap();
        // ordem alfabética: billing, efficiency, market
        let names: Vec<&str> = loaded.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["billing", "efficiency", "market"]);
        let market = loaded.iter().find(|d| d.name == "market").unwrap();
        assert_eq!(market, &systems::market::definition());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn non_json_files_are_ignored() {
        let dir = scratch_dir("ignore");
        export_definitions(&dir, &[systems::efficiency::definition()]).unwrap();
        std::fs::write(dir.join("notes.txt"), "não é json").unwrap();
        assert_eq!(load_definitions(&dir).unwrap().len(), 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn corrupt_file_fails_whole_load() {
        let dir = scratch_dir("corrupt");
        export_definitions(&dir, &[systems::efficiency::definition()]).unwrap();
        std::fs::write(dir.join("broken.json"), "{ nope").unwrap();
        let err = load_definitions(&dir).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.json"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(load_definitions(&scratch_dir("missing")).is_err());
    }
}
