use std::fmt;
use std::str::FromStr;

use bson::{doc, oid::ObjectId, Bson, Document};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::keys::*;
use super::{bson_to_json, json_object, json_string, json_to_bson, DocumentModel, Meta, ModelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    Pass,
    Fail,
    Skip,
    Error,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Pass => "PASS",
            TestStatus::Fail => "FAIL",
            TestStatus::Skip => "SKIP",
            TestStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PASS" => Ok(TestStatus::Pass),
            "FAIL" => Ok(TestStatus::Fail),
            "SKIP" => Ok(TestStatus::Skip),
            "ERROR" => Ok(TestStatus::Error),
            _ => Err(ModelError::invalid(
                STATUS_KEY,
                format!("'{}' is not one of PASS, FAIL, SKIP, ERROR", s),
            )),
        }
    }
}

/// A single test result belonging to a test group.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub meta: Meta,
    pub name: String,
    pub test_group_id: ObjectId,
    pub status: Option<TestStatus>,
    pub time: Option<f64>,
    pub definition_uri: Option<String>,
    pub vcs_commit: Option<String>,
    pub kvm_guest: Option<String>,
    pub index: Option<i64>,
    pub measurements: Vec<Value>,
    pub parameters: Option<Map<String, Value>>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, test_group_id: ObjectId) -> Self {
        Self {
            meta: Meta::new(),
            name: name.into(),
            test_group_id,
            status: None,
            time: None,
            definition_uri: None,
            vcs_commit: None,
            kvm_guest: None,
            index: None,
            measurements: Vec::new(),
            parameters: None,
        }
    }

    pub fn apply_json(&mut self, body: &Map<String, Value>) -> Result<(), ModelError> {
        for (key, value) in body {
            match key.as_str() {
                NAME_KEY => self.name = json_string(key, value)?,
                TEST_GROUP_ID_KEY => self.test_group_id = parse_group_id(value)?,
                STATUS_KEY => self.status = Some(json_string(key, value)?.parse()?),
                TIME_KEY => {
                    self.time = Some(
                        value
                            .as_f64()
                            .filter(|t| *t >= 0.0)
                            .ok_or_else(|| ModelError::invalid(key, "must be a non-negative number"))?,
                    )
                }
                DEFINITION_URI_KEY => self.definition_uri = Some(json_string(key, value)?),
                VCS_COMMIT_KEY => self.vcs_commit = Some(json_string(key, value)?),
                KVM_GUEST_KEY => self.kvm_guest = Some(json_string(key, value)?),
                INDEX_KEY => {
                    self.index = Some(
                        value
                            .as_i64()
                            .ok_or_else(|| ModelError::invalid(key, "must be an integer"))?,
                    )
                }
                MEASUREMENTS_KEY => self.measurements = parse_measurements(value)?,
                PARAMETERS_KEY => self.parameters = Some(json_object(key, value)?),
                _ => {}
            }
        }
        Ok(())
    }
}

fn parse_group_id(value: &Value) -> Result<ObjectId, ModelError> {
    let text = json_string(TEST_GROUP_ID_KEY, value)?;
    crate::validator::parse_object_id(&text).ok_or_else(|| {
        ModelError::invalid(TEST_GROUP_ID_KEY, format!("'{}' is not a valid document id", text))
    })
}

fn parse_measurements(value: &Value) -> Result<Vec<Value>, ModelError> {
    match value {
        Value::Array(items) if items.iter().all(Value::is_object) => Ok(items.clone()),
        _ => Err(ModelError::invalid(MEASUREMENTS_KEY, "must be a list of JSON objects")),
    }
}

impl DocumentModel for TestCase {
    const COLLECTION: &'static str = TEST_CASE_COLLECTION;

    fn id(&self) -> Option<ObjectId> {
        self.meta.id
    }

    fn created_on(&self) -> Option<DateTime<Utc>> {
        self.meta.created_on
    }

    fn version(&self) -> &str {
        &self.meta.version
    }

    fn to_document(&self) -> Document {
        let mut document = doc! {
            NAME_KEY: self.name.as_str(),
            TEST_GROUP_ID_KEY: self.test_group_id,
        };
        if let Some(status) = self.status {
            document.insert(STATUS_KEY, status.as_str());
        }
        if let Some(time) = self.time {
            document.insert(TIME_KEY, time);
        }
        if let Some(uri) = &self.definition_uri {
            document.insert(DEFINITION_URI_KEY, uri.as_str());
        }
        if let Some(commit) = &self.vcs_commit {
            document.insert(VCS_COMMIT_KEY, commit.as_str());
        }
        if let Some(guest) = &self.kvm_guest {
            document.insert(KVM_GUEST_KEY, guest.as_str());
        }
        if let Some(index) = self.index {
            document.insert(INDEX_KEY, index);
        }
        // values were checked when parsed, conversion cannot fail
        let measurements: Vec<Bson> = self
            .measurements
            .iter()
            .filter_map(|m| json_to_bson(MEASUREMENTS_KEY, m).ok())
            .collect();
        document.insert(MEASUREMENTS_KEY, measurements);
        if let Some(parameters) = &self.parameters {
            if let Ok(value) = json_to_bson(PARAMETERS_KEY, &Value::Object(parameters.clone())) {
                document.insert(PARAMETERS_KEY, value);
            }
        }
        self.meta.write(&mut document);
        document
    }

    fn from_json(body: &Map<String, Value>) -> Result<Self, ModelError> {
        let name = body
            .get(NAME_KEY)
            .ok_or_else(|| ModelError::MissingField(NAME_KEY.to_string()))
            .and_then(|v| json_string(NAME_KEY, v))?;
        let group = body
            .get(TEST_GROUP_ID_KEY)
            .ok_or_else(|| ModelError::MissingField(TEST_GROUP_ID_KEY.to_string()))
            .and_then(parse_group_id)?;

        let mut test_case = TestCase::new(name, group);
        test_case.apply_json(body)?;
        Ok(test_case)
    }

    fn from_document(document: &Document) -> Result<Self, ModelError> {
        let test_group_id = document
            .get_object_id(TEST_GROUP_ID_KEY)
            .map_err(|_| ModelError::MissingField(TEST_GROUP_ID_KEY.to_string()))?;

        let status = match document.get_str(STATUS_KEY) {
            Ok(status) => Some(status.parse()?),
            Err(_) => None,
        };

        let measurements = document
            .get_array(MEASUREMENTS_KEY)
            .map(|items| items.iter().map(bson_to_json).collect())
            .unwrap_or_default();

        let parameters = match document.get(PARAMETERS_KEY).map(bson_to_json) {
            Some(Value::Object(parameters)) => Some(parameters),
            _ => None,
        };

        Ok(Self {
            meta: Meta::from_document(document),
            name: document.get_str(NAME_KEY).unwrap_or_default().to_string(),
            test_group_id,
            status,
            time: document.get(TIME_KEY).and_then(Bson::as_f64),
            definition_uri: document.get_str(DEFINITION_URI_KEY).ok().map(str::to_string),
            vcs_commit: document.get_str(VCS_COMMIT_KEY).ok().map(str::to_string),
            kvm_guest: document.get_str(KVM_GUEST_KEY).ok().map(str::to_string),
            index: document.get(INDEX_KEY).and_then(|v| match v {
                Bson::Int32(i) => Some(i64::from(*i)),
                Bson::Int64(i) => Some(*i),
                _ => None,
            }),
            measurements,
            parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const GROUP: &str = "5432b6a4c4c0b8c95e42d8e1";

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn builds_from_json() {
        let test_case = TestCase::from_json(&body(json!({
            "name": "boot",
            "test_group_id": GROUP,
            "status": "pass",
            "time": 1.5,
            "measurements": [{ "value": 10, "unit": "ms" }],
        })))
        .unwrap();

        assert_eq!(test_case.name, "boot");
        assert_eq!(test_case.test_group_id.to_hex(), GROUP);
        assert_eq!(test_case.status, Some(TestStatus::Pass));
        assert_eq!(test_case.time, Some(1.5));
        assert_eq!(test_case.measurements.len(), 1);
    }

    #[test]
    fn rejects_invalid_fields() {
        for bad in [
            json!({ "name": "boot" }),
            json!({ "name": "boot", "test_group_id": "group" }),
            json!({ "name": "boot", "test_group_id": GROUP, "status": "MAYBE" }),
            json!({ "name": "boot", "test_group_id": GROUP, "time": -1 }),
            json!({ "name": "boot", "test_group_id": GROUP, "measurements": [1] }),
            json!({ "name": 1, "test_group_id": GROUP }),
        ] {
            assert!(TestCase::from_json(&body(bad.clone())).is_err(), "accepted {}", bad);
        }
    }

    #[test]
    fn document_round_trip() {
        let mut test_case = TestCase::new("ltp", ObjectId::parse_str(GROUP).unwrap());
        test_case.status = Some(TestStatus::Fail);
        test_case.index = Some(3);
        test_case.parameters = Some(body(json!({ "arch": "arm64" })));
        test_case.measurements = vec![json!({ "value": 1 })];

        let read = TestCase::from_document(&test_case.to_document()).unwrap();
        assert_eq!(read.name, "ltp");
        assert_eq!(read.status, Some(TestStatus::Fail));
        assert_eq!(read.index, Some(3));
        assert_eq!(read.parameters, test_case.parameters);
        assert_eq!(read.measurements, vec![json!({ "value": 1 })]);
    }
}
