use std::net::{IpAddr, Ipv4Addr};

use axum::http::Method;
use bson::{doc, oid::ObjectId, Bson, Document};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::keys::*;
use super::{json_flag, json_string, DocumentModel, Meta, ModelError};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Permission flags of a token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenProperties {
    pub admin: bool,
    pub superuser: bool,
    pub get: bool,
    pub post: bool,
    pub put: bool,
    pub delete: bool,
    pub ip_restricted: bool,
    pub lab: bool,
    pub test_lab: bool,
    pub upload: bool,
}

impl TokenProperties {
    /// Every permission, used for the master key.
    pub fn all() -> Self {
        Self {
            admin: true,
            superuser: true,
            get: true,
            post: true,
            put: true,
            delete: true,
            ip_restricted: false,
            lab: true,
            test_lab: true,
            upload: true,
        }
    }

    fn flag_mut(&mut self, key: &str) -> Option<&mut bool> {
        match key {
            ADMIN_KEY => Some(&mut self.admin),
            SUPERUSER_KEY => Some(&mut self.superuser),
            GET_KEY => Some(&mut self.get),
            POST_KEY => Some(&mut self.post),
            PUT_KEY => Some(&mut self.put),
            DELETE_KEY => Some(&mut self.delete),
            IP_RESTRICTED_KEY => Some(&mut self.ip_restricted),
            LAB_KEY => Some(&mut self.lab),
            TEST_LAB_KEY => Some(&mut self.test_lab),
            UPLOAD_KEY => Some(&mut self.upload),
            _ => None,
        }
    }

    fn flags(&self) -> [(&'static str, bool); 10] {
        [
            (ADMIN_KEY, self.admin),
            (SUPERUSER_KEY, self.superuser),
            (GET_KEY, self.get),
            (POST_KEY, self.post),
            (PUT_KEY, self.put),
            (DELETE_KEY, self.delete),
            (IP_RESTRICTED_KEY, self.ip_restricted),
            (LAB_KEY, self.lab),
            (TEST_LAB_KEY, self.test_lab),
            (UPLOAD_KEY, self.upload),
        ]
    }

    /// Whether the flags allow an HTTP method. Admins may do anything,
    /// superusers anything but delete.
    pub fn permits(&self, method: &Method) -> bool {
        if self.admin {
            return true;
        }
        match *method {
            Method::GET | Method::HEAD => self.get || self.superuser,
            Method::POST => self.post || self.superuser,
            Method::PUT => self.put || self.superuser,
            Method::DELETE => self.delete,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub meta: Meta,
    pub token: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub expires_on: Option<NaiveDate>,
    pub expired: bool,
    pub ip_address: Vec<IpAddr>,
    pub properties: TokenProperties,
}

impl Token {
    /// Fresh token with a random value and no permissions.
    pub fn new() -> Self {
        Self {
            meta: Meta::new(),
            token: Uuid::new_v4().to_string(),
            email: None,
            username: None,
            expires_on: None,
            expired: false,
            ip_address: Vec::new(),
            properties: TokenProperties::default(),
        }
    }

    /// Apply the keys of a request body. Unknown keys are ignored; the
    /// validator has already dropped them.
    pub fn apply_json(&mut self, body: &Map<String, Value>) -> Result<(), ModelError> {
        for (key, value) in body {
            match key.as_str() {
                EMAIL_KEY => self.email = Some(json_string(key, value)?),
                USERNAME_KEY => self.username = Some(json_string(key, value)?),
                EXPIRES_KEY => self.expires_on = Some(parse_date(key, value)?),
                EXPIRED_KEY => self.expired = json_flag(key, value)?,
                IP_ADDRESS_KEY => self.ip_address = parse_ip_addresses(key, value)?,
                other => {
                    if let Some(flag) = self.properties.flag_mut(other) {
                        *flag = json_flag(key, value)?;
                    }
                }
            }
        }
        self.check_ip_restriction()
    }

    /// An IP restricted token needs addresses, and addresses need the restriction.
    fn check_ip_restriction(&self) -> Result<(), ModelError> {
        match (self.properties.ip_restricted, self.ip_address.is_empty()) {
            (true, true) => Err(ModelError::Inconsistent(
                "IP restricted token requires at least one IP address".to_string(),
            )),
            (false, false) => Err(ModelError::Inconsistent(
                "IP addresses provided but the token is not IP restricted".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expired
            || self
                .expires_on
                .map(|date| date < now.date_naive())
                .unwrap_or(false)
    }

    pub fn allows_ip(&self, remote: Option<IpAddr>) -> bool {
        if !self.properties.ip_restricted {
            return true;
        }
        match remote {
            Some(ip) => self.ip_address.iter().any(|allowed| *allowed == ip),
            None => false,
        }
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentModel for Token {
    const COLLECTION: &'static str = TOKEN_COLLECTION;

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
        let mut properties = Document::new();
        for (key, value) in self.properties.flags() {
            properties.insert(key, value);
        }

        let mut document = doc! {
            TOKEN_KEY: self.token.as_str(),
            EXPIRED_KEY: self.expired,
            IP_ADDRESS_KEY: self.ip_address.iter().map(|ip| ip.to_string()).collect::<Vec<_>>(),
            PROPERTIES_KEY: properties,
        };
        if let Some(email) = &self.email {
            document.insert(EMAIL_KEY, email.as_str());
        }
        if let Some(username) = &self.username {
            document.insert(USERNAME_KEY, username.as_str());
        }
        if let Some(expires_on) = self.expires_on {
            document.insert(EXPIRES_KEY, expires_on.format(DATE_FORMAT).to_string());
        }
        self.meta.write(&mut document);
        document
    }

    fn from_json(body: &Map<String, Value>) -> Result<Self, ModelError> {
        if !body.contains_key(EMAIL_KEY) {
            return Err(ModelError::MissingField(EMAIL_KEY.to_string()));
        }
        let mut token = Token::new();
        token.apply_json(body)?;
        Ok(token)
    }

    fn from_document(document: &Document) -> Result<Self, ModelError> {
        let mut properties = TokenProperties::default();
        if let Ok(stored) = document.get_document(PROPERTIES_KEY) {
            for (key, value) in stored {
                if let (Some(flag), Some(set)) = (properties.flag_mut(key), bson_flag(value)) {
                    *flag = set;
                }
            }
        }

        let ip_address = match document.get_array(IP_ADDRESS_KEY) {
            Ok(addresses) => addresses
                .iter()
                .filter_map(Bson::as_str)
                .map(|ip| {
                    parse_ip(ip)
                        .ok_or_else(|| ModelError::invalid(IP_ADDRESS_KEY, format!("'{}' is not an IP address", ip)))
                })
                .collect::<Result<Vec<_>, _>>()?,
            Err(_) => Vec::new(),
        };

        let expires_on = match document.get_str(EXPIRES_KEY) {
            Ok(date) => Some(
                NaiveDate::parse_from_str(date, DATE_FORMAT)
                    .map_err(|_| ModelError::invalid(EXPIRES_KEY, format!("'{}' is not a date", date)))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            meta: Meta::from_document(document),
            token: document.get_str(TOKEN_KEY).unwrap_or_default().to_string(),
            email: document.get_str(EMAIL_KEY).ok().map(str::to_string),
            username: document.get_str(USERNAME_KEY).ok().map(str::to_string),
            expires_on,
            expired: document.get(EXPIRED_KEY).and_then(bson_flag).unwrap_or(false),
            ip_address,
            properties,
        })
    }
}

fn bson_flag(value: &Bson) -> Option<bool> {
    match value {
        Bson::Boolean(b) => Some(*b),
        Bson::Int32(i) => Some(*i != 0),
        Bson::Int64(i) => Some(*i != 0),
        _ => None,
    }
}

fn parse_date(key: &str, value: &Value) -> Result<NaiveDate, ModelError> {
    let text = json_string(key, value)?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT)
        .map_err(|_| ModelError::invalid(key, format!("'{}' is not a YYYY-MM-DD date", text)))
}

fn parse_ip_addresses(key: &str, value: &Value) -> Result<Vec<IpAddr>, ModelError> {
    let parse = |value: &Value| -> Result<IpAddr, ModelError> {
        let text = json_string(key, value)?;
        parse_ip(text.trim())
            .ok_or_else(|| ModelError::invalid(key, format!("'{}' is not an IP address", text)))
    };

    match value {
        Value::Array(items) => items.iter().map(parse).collect(),
        single => Ok(vec![parse(single)?]),
    }
}

fn parse_ip(text: &str) -> Option<IpAddr> {
    text.parse()
        .ok()
        .or_else(|| parse_short_ipv4(text).map(IpAddr::V4))
}

/// Shorthand IPv4 forms (`127`, `10.1`, `10.1.2`): leading parts are single
/// bytes and the last part fills the remaining low bytes.
fn parse_short_ipv4(text: &str) -> Option<Ipv4Addr> {
    let parts = text
        .split('.')
        .map(|part| {
            let decimal = !part.is_empty()
                && part.bytes().all(|b| b.is_ascii_digit())
                && (part.len() == 1 || !part.starts_with('0'));
            if decimal {
                part.parse::<u32>().ok()
            } else {
                None
            }
        })
        .collect::<Option<Vec<u32>>>()?;

    let (last, leading) = parts.split_last()?;
    if leading.len() > 3 {
        return None;
    }

    let mut address = 0u32;
    for (i, part) in leading.iter().enumerate() {
        if *part > 255 {
            return None;
        }
        address |= part << (24 - 8 * i);
    }
    let low_bits = 32 - 8 * leading.len() as u32;
    if low_bits < 32 && *last >= 1 << low_bits {
        return None;
    }
    Some(Ipv4Addr::from(address | last))
}
