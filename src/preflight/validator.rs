use super::probe::probe_writable;
use super::PreflightError;
use crate::config::{FieldDefinition, FieldType, ModuleConfig, ValidationKind};
use crate::library_db::ConnectionManager;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreflightReport {
    /// Pre-image of the library taken once every check passed.
    pub backup: Option<PathBuf>,
}

pub struct Validator<'a> {
    module: &'a ModuleConfig,
    database_path: Option<&'a Path>,
}

impl<'a> Validator<'a> {
    pub fn new(module: &'a ModuleConfig, database_path: Option<&'a Path>) -> Self {
        Self {
            module,
            database_path,
        }
    }

    /// Runs every check that applies to `action`, in field declaration
    /// order, then the database checks. Stops at the first failure.
    pub fn validate(&self, action: &str) -> Result<PreflightReport, PreflightError> {
        debug!(
            module = "preflight",
            operation = "validate",
            "Validating {} for action {:?}",
            self.module.kind,
            action
        );

        for field in &self.module.fields {
            if !field.validates_on(action) {
                continue;
            }
            if !self.module.is_active(field) {
                debug!(
                    module = "preflight",
                    operation = "validate",
                    "Skipping inactive field {}",
                    field.key
                );
                continue;
            }
            validate_field(field)?;
        }

        if !self.module.kind.requires_database() {
            return Ok(PreflightReport::default());
        }

        let backup = self.validate_database()?;
        info!(
            module = "preflight",
            operation = "validate",
            "{} ready for {:?}, backup at {:?}",
            self.module.kind,
            action,
            backup
        );
        Ok(PreflightReport {
            backup: Some(backup),
        })
    }

    fn validate_database(&self) -> Result<PathBuf, PreflightError> {
        let path = self
            .database_path
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(PreflightError::DatabasePathNotSet)?;

        match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => {
                if metadata.len() == 0 {
                    return Err(PreflightError::DatabaseEmpty(path.to_path_buf()));
                }
            }
            _ => return Err(PreflightError::DatabaseMissing(path.to_path_buf())),
        }

        let dir = containing_dir(path);
        probe_writable(&dir)
            .map_err(|source| PreflightError::DatabaseDirNotWritable { path: dir, source })?;

        if !self.module.kind.needs_immediate_db_access() {
            let probe = ConnectionManager::new(path);
            probe.connect().map_err(PreflightError::Connection)?;
            probe.finalize();
        }

        ConnectionManager::new(path)
            .backup_database()
            .map_err(PreflightError::Backup)
    }
}

fn containing_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn validate_field(field: &FieldDefinition) -> Result<(), PreflightError> {
    let value = field.value.trim();
    let is_date = field.field_type == FieldType::Date || field.validation_type == ValidationKind::Date;

    if is_date && !value.is_empty() && NaiveDate::parse_from_str(value, DATE_FORMAT).is_err() {
        return Err(PreflightError::InvalidDate {
            key: field.key.clone(),
            value: value.to_string(),
        });
    }

    if value.is_empty() {
        if field.required {
            return Err(required_error(field));
        }
        if field.validation_type == ValidationKind::Filled {
            return Err(PreflightError::FieldRequired(field.key.clone()));
        }
        return Ok(());
    }

    match field.validation_type {
        ValidationKind::Exists => check_exists(field, Path::new(value)),
        ValidationKind::ExistsWrite => {
            let path = Path::new(value);
            check_exists(field, path)?;
            let dir = if field.field_type == FieldType::File {
                containing_dir(path)
            } else {
                path.to_path_buf()
            };
            probe_writable(&dir).map_err(|source| PreflightError::NotWritable {
                key: field.key.clone(),
                path: dir,
                source,
            })
        }
        ValidationKind::None | ValidationKind::Date | ValidationKind::Filled => Ok(()),
    }
}

fn required_error(field: &FieldDefinition) -> PreflightError {
    let key = field.key.clone();
    match field.field_type {
        FieldType::Folder => PreflightError::FolderRequired(key),
        FieldType::Playlist => PreflightError::PlaylistRequired(key),
        FieldType::Date => PreflightError::DateRequired(key),
        FieldType::File | FieldType::Checkbox | FieldType::Select => {
            PreflightError::FieldRequired(key)
        }
    }
}

fn check_exists(field: &FieldDefinition, path: &Path) -> Result<(), PreflightError> {
    let exists = match field.field_type {
        FieldType::Folder => path.is_dir(),
        FieldType::File => path.is_file(),
        _ => path.exists(),
    };
    if exists {
        Ok(())
    } else {
        Err(PreflightError::NotFound {
            key: field.key.clone(),
            path: path.to_path_buf(),
        })
    }
}
