use super::fields::FieldDefinition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write config file {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GlobalConfig {
    pub database_path: String,
    pub language: String,
}

/// On-disk shape of the settings file.
///
/// Field entries stay raw JSON here so that one malformed field does not
/// discard the rest of the file; their order is preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub global: GlobalConfig,
    pub modules: BTreeMap<String, serde_json::Map<String, serde_json::Value>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parsed field definitions of `module`, in file order, with keys filled in.
    ///
    /// Entries that do not parse are returned as errors next to their key.
    pub fn module_fields(
        &self,
        module: &str,
    ) -> Vec<(String, Result<FieldDefinition, serde_json::Error>)> {
        self.modules
            .get(module)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(key, raw)| {
                        let parsed = serde_json::from_value::<FieldDefinition>(raw.clone()).map(
                            |mut field| {
                                field.key = key.clone();
                                field
                            },
                        );
                        (key.clone(), parsed)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_module_fields(&mut self, module: &str, fields: &[FieldDefinition]) -> Result<(), ConfigError> {
        let mut map = serde_json::Map::new();
        for field in fields {
            map.insert(field.key.clone(), serde_json::to_value(field)?);
        }
        self.modules.insert(module.to_string(), map);
        Ok(())
    }
}
