pub mod fields;
mod file_config;

pub use fields::{FieldDefinition, FieldType, ValidationKind};
pub use file_config::{ConfigError, FileConfig, GlobalConfig};

use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const START_ACTION: &str = "start";

/// CLI arguments that take part in config resolution.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config_path: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    MetadataSync,
    TracksReport,
}

impl ModuleKind {
    pub const ALL: [ModuleKind; 2] = [ModuleKind::MetadataSync, ModuleKind::TracksReport];

    pub fn name(&self) -> &'static str {
        match self {
            ModuleKind::MetadataSync => "metadata-sync",
            ModuleKind::TracksReport => "tracks-report",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn requires_database(&self) -> bool {
        true
    }

    /// Modules that open the library as soon as they are loaded skip the
    /// throwaway connection check during preflight.
    pub fn needs_immediate_db_access(&self) -> bool {
        matches!(self, ModuleKind::TracksReport)
    }

    pub fn default_fields(&self) -> Vec<FieldDefinition> {
        match self {
            ModuleKind::MetadataSync => vec![
                FieldDefinition::new("folder", FieldType::Folder)
                    .required()
                    .validation(ValidationKind::Exists)
                    .on_actions(&[START_ACTION]),
                FieldDefinition::new("recursive", FieldType::Checkbox).value("true"),
            ],
            ModuleKind::TracksReport => vec![
                FieldDefinition::new("source", FieldType::Select)
                    .value("folder")
                    .validation(ValidationKind::Filled),
                FieldDefinition::new("folder", FieldType::Folder)
                    .required()
                    .depends_on("source", "folder")
                    .validation(ValidationKind::Exists)
                    .on_actions(&[START_ACTION]),
                FieldDefinition::new("playlist", FieldType::Playlist)
                    .required()
                    .depends_on("source", "playlist")
                    .on_actions(&[START_ACTION]),
                FieldDefinition::new("date_from", FieldType::Date).validation(ValidationKind::Date),
                FieldDefinition::new("date_to", FieldType::Date).validation(ValidationKind::Date),
                FieldDefinition::new("output_folder", FieldType::Folder)
                    .required()
                    .validation(ValidationKind::ExistsWrite)
                    .on_actions(&[START_ACTION]),
            ],
        }
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Field set of one module, in declaration order.
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    pub kind: ModuleKind,
    pub fields: Vec<FieldDefinition>,
}

impl ModuleConfig {
    pub fn with_defaults(kind: ModuleKind) -> Self {
        Self {
            kind,
            fields: kind.default_fields(),
        }
    }

    pub fn field(&self, key: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Trimmed value of `key`, empty when the field is unknown.
    pub fn value(&self, key: &str) -> &str {
        self.field(key).map(|f| f.value.trim()).unwrap_or("")
    }

    /// Returns false when the module has no field named `key`.
    pub fn set_value(&mut self, key: &str, value: &str) -> bool {
        match self.fields.iter_mut().find(|f| f.key == key) {
            Some(field) => {
                field.value = value.to_string();
                true
            }
            None => false,
        }
    }

    /// Whether the dependency of `field`, if any, currently holds.
    pub fn is_active(&self, field: &FieldDefinition) -> bool {
        match &field.depends_on {
            None => true,
            Some(key) => self.value(key) == field.active_when.as_deref().unwrap_or("").trim(),
        }
    }

    fn merge_file_fields(&mut self, file: &FileConfig) {
        for (key, parsed) in file.module_fields(self.kind.name()) {
            match parsed {
                Ok(field) => match self.fields.iter_mut().find(|f| f.key == key) {
                    Some(existing) => *existing = field,
                    None => self.fields.push(field),
                },
                Err(e) => warn!(
                    "Ignoring malformed field {}.{} in config file: {}",
                    self.kind, key, e
                ),
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: Option<PathBuf>,
    pub language: String,
    pub metadata_sync: ModuleConfig,
    pub tracks_report: ModuleConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self::resolve(&CliConfig::default(), None)
    }
}

impl Settings {
    /// Resolve settings from CLI arguments and an optional config file.
    /// An explicit `--db` wins over `global.databasePath`.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Self {
        let file = file_config.unwrap_or_default();

        let database_path = cli.database_path.clone().or_else(|| {
            let from_file = file.global.database_path.trim();
            (!from_file.is_empty()).then(|| PathBuf::from(from_file))
        });

        let language = match file.global.language.trim() {
            "" => DEFAULT_LANGUAGE.to_string(),
            lang => lang.to_string(),
        };

        for name in file.modules.keys() {
            if ModuleKind::from_name(name).is_none() {
                warn!("Ignoring unknown module {:?} in config file", name);
            }
        }

        let module = |kind| {
            let mut module = ModuleConfig::with_defaults(kind);
            module.merge_file_fields(&file);
            module
        };

        Self {
            database_path,
            language,
            metadata_sync: module(ModuleKind::MetadataSync),
            tracks_report: module(ModuleKind::TracksReport),
        }
    }

    /// Like [`Settings::resolve`], but reads the file named by `--config`.
    /// A missing or malformed file falls back to defaults.
    pub fn load_or_default(cli: &CliConfig) -> Self {
        let file_config = cli
            .config_path
            .as_deref()
            .and_then(|path| match FileConfig::load(path) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("{}; using defaults", e);
                    None
                }
            });
        Self::resolve(cli, file_config)
    }

    pub fn module(&self, kind: ModuleKind) -> &ModuleConfig {
        match kind {
            ModuleKind::MetadataSync => &self.metadata_sync,
            ModuleKind::TracksReport => &self.tracks_report,
        }
    }

    pub fn module_mut(&mut self, kind: ModuleKind) -> &mut ModuleConfig {
        match kind {
            ModuleKind::MetadataSync => &mut self.metadata_sync,
            ModuleKind::TracksReport => &mut self.tracks_report,
        }
    }

    pub fn modules(&self) -> [&ModuleConfig; 2] {
        [&self.metadata_sync, &self.tracks_report]
    }

    pub fn to_file_config(&self) -> Result<FileConfig, ConfigError> {
        let mut file = FileConfig {
            global: GlobalConfig {
                database_path: self
                    .database_path
                    .as_deref()
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_default(),
                language: self.language.clone(),
            },
            ..Default::default()
        };
        for module in self.modules() {
            file.set_module_fields(module.kind.name(), &module.fields)?;
        }
        Ok(file)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.to_file_config()?.save(path)
    }
}
