use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::keys::*;
use super::{bson_to_json, json_flag, json_object, json_string, json_to_bson, DocumentModel, Meta, ModelError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabContact {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub telephone: Option<String>,
    pub mobile: Option<String>,
    pub affiliation: Option<String>,
}

impl LabContact {
    fn from_json(object: &Map<String, Value>) -> Result<Self, ModelError> {
        let required = |key: &str| -> Result<String, ModelError> {
            object
                .get(key)
                .ok_or_else(|| ModelError::MissingField(format!("{}.{}", CONTACT_KEY, key)))
                .and_then(|value| json_string(key, value))
        };
        let optional = |key: &str| -> Result<Option<String>, ModelError> {
            object.get(key).map(|value| json_string(key, value)).transpose()
        };

        Ok(Self {
            name: required(NAME_KEY)?,
            surname: required(SURNAME_KEY)?,
            email: required(EMAIL_KEY)?,
            telephone: optional(TELEPHONE_KEY)?,
            mobile: optional(MOBILE_KEY)?,
            affiliation: optional(AFFILIATION_KEY)?,
        })
    }

    fn to_document(&self) -> Document {
        let mut document = doc! {
            NAME_KEY: self.name.as_str(),
            SURNAME_KEY: self.surname.as_str(),
            EMAIL_KEY: self.email.as_str(),
        };
        for (key, value) in [
            (TELEPHONE_KEY, &self.telephone),
            (MOBILE_KEY, &self.mobile),
            (AFFILIATION_KEY, &self.affiliation),
        ] {
            if let Some(value) = value {
                document.insert(key, value.as_str());
            }
        }
        document
    }

    fn from_document(document: &Document) -> Self {
        let text = |key: &str| document.get_str(key).ok().map(str::to_string);
        Self {
            name: text(NAME_KEY).unwrap_or_default(),
            surname: text(SURNAME_KEY).unwrap_or_default(),
            email: text(EMAIL_KEY).unwrap_or_default(),
            telephone: text(TELEPHONE_KEY),
            mobile: text(MOBILE_KEY),
            affiliation: text(AFFILIATION_KEY),
        }
    }
}

/// A lab submitting results.
#[derive(Debug, Clone, PartialEq)]
pub struct Lab {
    pub meta: Meta,
    pub name: String,
    pub contact: LabContact,
    pub address: Option<Map<String, Value>>,
    pub private: bool,
    pub description: Option<String>,
}

impl Lab {
    pub fn apply_json(&mut self, body: &Map<String, Value>) -> Result<(), ModelError> {
        for (key, value) in body {
            match key.as_str() {
                NAME_KEY => self.name = json_string(key, value)?,
                CONTACT_KEY => self.contact = LabContact::from_json(&json_object(key, value)?)?,
                ADDRESS_KEY => self.address = Some(json_object(key, value)?),
                PRIVATE_KEY => self.private = json_flag(key, value)?,
                DESCRIPTION_KEY => self.description = Some(json_string(key, value)?),
                _ => {}
            }
        }
        Ok(())
    }
}

impl DocumentModel for Lab {
    const COLLECTION: &'static str = LAB_COLLECTION;

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
            CONTACT_KEY: self.contact.to_document(),
            PRIVATE_KEY: self.private,
        };
        if let Some(address) = &self.address {
            if let Ok(value) = json_to_bson(ADDRESS_KEY, &Value::Object(address.clone())) {
                document.insert(ADDRESS_KEY, value);
            }
        }
        if let Some(description) = &self.description {
            document.insert(DESCRIPTION_KEY, description.as_str());
        }
        self.meta.write(&mut document);
        document
    }

    fn from_json(body: &Map<String, Value>) -> Result<Self, ModelError> {
        let name = body
            .get(NAME_KEY)
            .ok_or_else(|| ModelError::MissingField(NAME_KEY.to_string()))
            .and_then(|value| json_string(NAME_KEY, value))?;
        let contact = body
            .get(CONTACT_KEY)
            .ok_or_else(|| ModelError::MissingField(CONTACT_KEY.to_string()))
            .and_then(|value| json_object(CONTACT_KEY, value))
            .and_then(|object| LabContact::from_json(&object))?;

        let mut lab = Lab {
            meta: Meta::new(),
            name,
            contact,
            address: None,
            private: false,
            description: None,
        };
        lab.apply_json(body)?;
        Ok(lab)
    }

    fn from_document(document: &Document) -> Result<Self, ModelError> {
        let address = match document.get(ADDRESS_KEY).map(bson_to_json) {
            Some(Value::Object(address)) => Some(address),
            _ => None,
        };

        Ok(Self {
            meta: Meta::from_document(document),
            name: document
                .get_str(NAME_KEY)
                .map_err(|_| ModelError::MissingField(NAME_KEY.to_string()))?
                .to_string(),
            contact: document
                .get_document(CONTACT_KEY)
                .map(LabContact::from_document)
                .unwrap_or_default(),
            address,
            private: document.get_bool(PRIVATE_KEY).unwrap_or(false),
            description: document.get_str(DESCRIPTION_KEY).ok().map(str::to_string),
        })
    }
}
