use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Folder,
    File,
    Date,
    Checkbox,
    Select,
    Playlist,
}

/// Check applied to a non-empty field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValidationKind {
    #[default]
    #[serde(rename = "none", alias = "")]
    None,
    #[serde(rename = "exists")]
    Exists,
    #[serde(rename = "exists|write")]
    ExistsWrite,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "filled")]
    Filled,
}

/// One user-editable setting of a module.
///
/// Values are always strings; checkboxes hold `"true"`/`"false"` and dates
/// `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    #[serde(skip)]
    pub key: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_when: Option<String>,
    #[serde(default)]
    pub validation_type: ValidationKind,
    #[serde(default)]
    pub value: String,
    /// Actions that trigger validation; empty means every action.
    #[serde(default)]
    pub validate_on_actions: Vec<String>,
}

impl FieldDefinition {
    pub fn new(key: &str, field_type: FieldType) -> Self {
        Self {
            key: key.to_string(),
            field_type,
            required: false,
            depends_on: None,
            active_when: None,
            validation_type: ValidationKind::None,
            value: String::new(),
            validate_on_actions: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn depends_on(mut self, key: &str, active_when: &str) -> Self {
        self.depends_on = Some(key.to_string());
        self.active_when = Some(active_when.to_string());
        self
    }

    pub fn validation(mut self, kind: ValidationKind) -> Self {
        self.validation_type = kind;
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn on_actions(mut self, actions: &[&str]) -> Self {
        self.validate_on_actions = actions.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn validates_on(&self, action: &str) -> bool {
        self.validate_on_actions.is_empty() || self.validate_on_actions.iter().any(|a| a == action)
    }

    pub fn is_checked(&self) -> bool {
        self.value.trim().eq_ignore_ascii_case("true")
    }
}
