pub mod keys;
pub mod lab;
pub mod test_case;
pub mod token;

pub use lab::{Lab, LabContact};
pub use test_case::{TestCase, TestStatus};
pub use token::{Token, TokenProperties};

use bson::{oid::ObjectId, Bson, Document};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use keys::{CREATED_KEY, ID_KEY, SCHEMA_VERSION, VERSION_KEY};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Missing mandatory key '{0}'")]
    MissingField(String),
    #[error("Invalid value for '{key}': {reason}")]
    InvalidField { key: String, reason: String },
    #[error("{0}")]
    Inconsistent(String),
}

impl ModelError {
    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ModelError::InvalidField {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Capabilities every stored resource provides.
pub trait DocumentModel: Sized {
    /// Collection the documents live in.
    const COLLECTION: &'static str;

    fn id(&self) -> Option<ObjectId>;

    fn created_on(&self) -> Option<DateTime<Utc>>;

    /// Schema version of the stored document.
    fn version(&self) -> &str;

    /// Document view without `_id`, ready for insert or `$set`.
    fn to_document(&self) -> Document;

    /// Build a new model from a validated request body.
    fn from_json(body: &Map<String, Value>) -> Result<Self, ModelError>;

    /// Rebuild a model from a stored document. Missing fields take defaults.
    fn from_document(document: &Document) -> Result<Self, ModelError>;
}

/// Fields shared by every model.
#[derive(Debug, Clone, PartialEq)]
pub struct Meta {
    pub id: Option<ObjectId>,
    pub created_on: Option<DateTime<Utc>>,
    pub version: String,
}

impl Meta {
    pub fn new() -> Self {
        Self {
            id: None,
            created_on: Some(Utc::now()),
            version: SCHEMA_VERSION.to_string(),
        }
    }

    pub fn from_document(document: &Document) -> Self {
        Self {
            id: document.get_object_id(ID_KEY).ok(),
            created_on: document
                .get_datetime(CREATED_KEY)
                .ok()
                .map(|dt| dt.to_chrono()),
            version: document
                .get_str(VERSION_KEY)
                .unwrap_or(SCHEMA_VERSION)
                .to_string(),
        }
    }

    pub fn write(&self, document: &mut Document) {
        if let Some(created_on) = self.created_on {
            document.insert(CREATED_KEY, bson::DateTime::from_chrono(created_on));
        }
        document.insert(VERSION_KEY, self.version.as_str());
    }
}

impl Default for Meta {
    fn default() -> Self {
        Self::new()
    }
}

// JSON field readers shared by the models

pub(crate) fn json_string(key: &str, value: &Value) -> Result<String, ModelError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        _ => Err(ModelError::invalid(key, "must be a string")),
    }
}

/// Flags accept booleans or integers (non-zero is true).
pub(crate) fn json_flag(key: &str, value: &Value) -> Result<bool, ModelError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => n
            .as_i64()
            .map(|i| i != 0)
            .ok_or_else(|| ModelError::invalid(key, "must be a boolean or an integer")),
        _ => Err(ModelError::invalid(key, "must be a boolean or an integer")),
    }
}

pub(crate) fn json_object(key: &str, value: &Value) -> Result<Map<String, Value>, ModelError> {
    match value {
        Value::Object(object) => Ok(object.clone()),
        _ => Err(ModelError::invalid(key, "must be a JSON object")),
    }
}

pub(crate) fn json_to_bson(key: &str, value: &Value) -> Result<Bson, ModelError> {
    bson::to_bson(value).map_err(|e| ModelError::invalid(key, e.to_string()))
}

pub(crate) fn bson_to_json(value: &Bson) -> Value {
    value.clone().into_relaxed_extjson()
}
