//! Validation of decoded JSON request bodies.
//!
//! These functions never modify their input. Key validation returns a filtered
//! copy of the body together with the keys that were dropped, so callers
//! decide what to do with the warning.

use std::collections::BTreeSet;

use bson::oid::ObjectId;
use serde_json::{Map, Value};

use crate::models::keys::{CONTACT_KEY, EMAIL_KEY, NAME_KEY, SURNAME_KEY};

/// Keys a request body may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySchema {
    /// Any subset of these keys is acceptable.
    Accepted(&'static [&'static str]),
    /// `mandatory` keys must all be present; anything outside `accepted` is dropped.
    Structured {
        mandatory: &'static [&'static str],
        accepted: &'static [&'static str],
    },
}

impl KeySchema {
    pub fn accepted(&self) -> &'static [&'static str] {
        match *self {
            KeySchema::Accepted(accepted) => accepted,
            KeySchema::Structured { accepted, .. } => accepted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Provided data is not JSON")]
    NotJson,
    #[error("No valid keys defined for this request")]
    NoSchema,
    #[error("No valid or acceptable keys in the JSON data")]
    NoValidKeys,
    #[error("One or more mandatory keys are missing: {}", .0.join(", "))]
    MissingKeys(Vec<String>),
    #[error("Provided 'contact' data structure is not a JSON object or is empty")]
    ContactNotObject,
    #[error("Missing mandatory keys for 'contact' JSON object: {}", .0.join(", "))]
    MissingContactKeys(Vec<String>),
}

/// Outcome of a successful key validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBody {
    pub body: Map<String, Value>,
    /// Keys removed because the schema does not accept them, sorted.
    pub dropped: Vec<String>,
}

impl ValidatedBody {
    /// Non-fatal warning describing the dropped keys, if any.
    pub fn warning(&self) -> Option<String> {
        if self.dropped.is_empty() {
            None
        } else {
            Some(format!(
                "Found non recognizable keys, they will not be considered: {}",
                self.dropped.join(", ")
            ))
        }
    }
}

pub fn validate_keys(body: &Value, schema: &KeySchema) -> Result<ValidatedBody, ValidationError> {
    let object = body.as_object().ok_or(ValidationError::NotJson)?;

    if schema.accepted().is_empty() {
        return Err(ValidationError::NoSchema);
    }

    if let KeySchema::Structured { mandatory, .. } = schema {
        let missing: BTreeSet<&str> = mandatory
            .iter()
            .copied()
            .filter(|key| !object.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingKeys(
                missing.into_iter().map(str::to_string).collect(),
            ));
        }
    }

    let accepted = schema.accepted();
    let (kept, dropped): (Vec<_>, Vec<_>) = object
        .iter()
        .partition(|(key, _)| accepted.contains(&key.as_str()));

    if kept.is_empty() {
        return Err(ValidationError::NoValidKeys);
    }

    let mut dropped: Vec<String> = dropped.into_iter().map(|(key, _)| key.clone()).collect();
    dropped.sort();

    Ok(ValidatedBody {
        body: kept
            .into_iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        dropped,
    })
}

/// Check a batch body: `body[batch_key]` must be a non-empty list of objects
/// that only use `accepted` keys.
pub fn validate_batch(body: &Value, batch_key: &str, accepted: &[&str]) -> bool {
    if batch_key.is_empty() || accepted.is_empty() {
        return false;
    }

    let operations = match body
        .as_object()
        .filter(|object| !object.is_empty())
        .and_then(|object| object.get(batch_key))
    {
        Some(Value::Array(operations)) if !operations.is_empty() => operations,
        _ => return false,
    };

    operations.iter().all(|operation| {
        operation
            .as_object()
            .map(|object| object.keys().all(|key| accepted.contains(&key.as_str())))
            .unwrap_or(false)
    })
}

/// Check the `contact` object of a lab body.
pub fn validate_contact(body: &Map<String, Value>) -> Result<(), ValidationError> {
    let contact = match body.get(CONTACT_KEY) {
        Some(Value::Object(contact)) if !contact.is_empty() => contact,
        _ => return Err(ValidationError::ContactNotObject),
    };

    let missing: BTreeSet<&str> = [NAME_KEY, SURNAME_KEY, EMAIL_KEY]
        .into_iter()
        .filter(|key| !contact.contains_key(*key))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingContactKeys(
            missing.into_iter().map(str::to_string).collect(),
        ))
    }
}

pub fn parse_object_id(id: &str) -> Option<ObjectId> {
    if id.is_empty() {
        return None;
    }
    ObjectId::parse_str(id).ok()
}

pub fn validate_object_id(id: &str) -> bool {
    parse_object_id(id).is_some()
}
