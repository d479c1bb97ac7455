use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::query::text_search::TextSearchConfig;
use crate::storage::{StoreParams, DEFAULT_EMBED_DIM};

/// Contents of `vectra.toml`. Every field is optional; command-line flags
/// take precedence and built-in defaults fill the rest.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct VectraConfig {
    pub database: Option<String>,
    pub table_name: Option<String>,
    pub embed_dim: Option<usize>,
    pub hybrid_search: Option<bool>,
    pub text_search_config: Option<TextSearchConfig>,
}

/// Command-line overrides, applied on top of a loaded config
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub table_name: Option<String>,
    pub embed_dim: Option<usize>,
    pub hybrid_search: bool,
    pub text_search_config: Option<TextSearchConfig>,
}

impl VectraConfig {
    /// Resolve store parameters: overrides, then config, then defaults
    pub fn store_params(&self, overrides: &Overrides) -> StoreParams {
        let database = overrides
            .database
            .clone()
            .or_else(|| self.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(default_database_path);
        let table_name = overrides
            .table_name
            .clone()
            .or_else(|| self.table_name.clone())
            .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());

        StoreParams::new(database, table_name)
            .with_embed_dim(overrides.embed_dim.or(self.embed_dim).unwrap_or(DEFAULT_EMBED_DIM))
            .with_hybrid_search(overrides.hybrid_search || self.hybrid_search.unwrap_or(false))
            .with_text_search_config(
                overrides
                    .text_search_config
                    .or(self.text_search_config)
                    .unwrap_or_default(),
            )
    }
}

pub const DEFAULT_TABLE_NAME: &str = "embeddings";

pub fn default_config_path() -> PathBuf {
    PathBuf::from("vectra.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from(".vectra").join("vectra.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<VectraConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: VectraConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &VectraConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectra.toml");
        let config = VectraConfig {
            database: Some("data/test.db".into()),
            table_name: Some("lorem_ipsum".into()),
            embed_dim: Some(2),
            hybrid_search: Some(true),
            text_search_config: Some(TextSearchConfig::Simple),
        };

        write_config(&path, &config, false).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), Some(config.clone()));

        // refuses to clobber without force
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &VectraConfig::default(), true).unwrap();
    }

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_overrides_win() {
        let config = VectraConfig {
            table_name: Some("from_config".into()),
            embed_dim: Some(8),
            ..VectraConfig::default()
        };
        let overrides = Overrides {
            embed_dim: Some(2),
            hybrid_search: true,
            ..Overrides::default()
        };

        let params = config.store_params(&overrides);
        assert_eq!(params.table_name, "from_config");
        assert_eq!(params.embed_dim, 2);
        assert!(params.hybrid_search);
        assert_eq!(params.database, default_database_path());
        assert_eq!(params.text_search_config, TextSearchConfig::English);
    }

    #[test]
    fn test_text_search_config_override() {
        let config = VectraConfig {
            text_search_config: Some(TextSearchConfig::English),
            ..VectraConfig::default()
        };
        let overrides = Overrides {
            text_search_config: Some(TextSearchConfig::Simple),
            ..Overrides::default()
        };

        assert_eq!(config.store_params(&overrides).text_search_config, TextSearchConfig::Simple);
        assert_eq!(
            config.store_params(&Overrides::default()).text_search_config,
            TextSearchConfig::English
        );
    }
}
