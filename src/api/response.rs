use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

/// Content type written on every envelope.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResponseError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Response object every handler returns.
///
/// `result` is always a list once set. `count`, `limit` and `skip` are omitted
/// from the serialized view while `None`; `errors` and `messages` are omitted
/// while empty. Custom headers travel with the response but never appear in
/// the body.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    #[serde(rename = "code")]
    status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    messages: Vec<String>,
    #[serde(skip)]
    headers: HeaderMap,
}

impl Default for HandlerResponse {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl HandlerResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status_code: status.as_u16(),
            count: None,
            limit: None,
            skip: None,
            result: None,
            reason: None,
            errors: Vec::new(),
            messages: Vec::new(),
            headers: HeaderMap::new(),
        }
    }

    /// 201 response pointing at the new resource.
    pub fn created(location: &str) -> Result<Self, ResponseError> {
        let mut response = Self::new(StatusCode::CREATED);
        response.set_location(location)?;
        Ok(response)
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status_code = status.as_u16();
    }

    /// Set a status reported as a raw integer, e.g. by the datastore layer.
    pub fn try_set_status(&mut self, code: u16) -> Result<(), ResponseError> {
        let status = StatusCode::from_u16(code)
            .map_err(|_| ResponseError::InvalidArgument(format!("{} is not a status code", code)))?;
        self.set_status(status);
        Ok(())
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn set_reason(&mut self, reason: impl Into<String>) {
        self.reason = Some(reason.into());
    }

    pub fn count(&self) -> Option<u64> {
        self.count
    }

    pub fn set_count(&mut self, count: impl Into<Option<u64>>) {
        self.count = count.into();
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn set_limit(&mut self, limit: impl Into<Option<u64>>) {
        self.limit = limit.into();
    }

    pub fn skip(&self) -> Option<u64> {
        self.skip
    }

    pub fn set_skip(&mut self, skip: impl Into<Option<u64>>) {
        self.skip = skip.into();
    }

    pub fn result(&self) -> Option<&[Value]> {
        self.result.as_deref()
    }

    /// `null` clears the result, an array is kept as is, anything else is
    /// wrapped in a one-element list.
    pub fn set_result(&mut self, value: Value) {
        self.result = match value {
            Value::Null => None,
            Value::Array(items) => Some(items),
            other => Some(vec![other]),
        };
    }

    /// Drain a lazy sequence (e.g. a datastore cursor) into the result.
    pub fn set_results<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = Value>,
    {
        self.result = Some(values.into_iter().collect());
    }

    pub fn clear_result(&mut self) {
        self.result = None;
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        push_non_empty(&mut self.errors, error.into());
    }

    pub fn add_errors<I, S>(&mut self, errors: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.errors.extend(errors.into_iter().map(Into::into));
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn add_message(&mut self, message: impl Into<String>) {
        push_non_empty(&mut self.messages, message.into());
    }

    pub fn add_messages<I, S>(&mut self, messages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.messages.extend(messages.into_iter().map(Into::into));
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn set_location(&mut self, location: &str) -> Result<(), ResponseError> {
        let value = HeaderValue::from_str(location)
            .map_err(|_| ResponseError::InvalidArgument(format!("invalid location '{}'", location)))?;
        self.set_header(header::LOCATION, value);
        Ok(())
    }

    /// Serializable view of the response, without headers.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize response: {}", e);
            json!({ "code": 500, "reason": "Failed to serialize response" })
        })
    }
}

fn push_non_empty(target: &mut Vec<String>, value: String) {
    if !value.is_empty() {
        target.push(value);
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_value().to_string();

        let mut response = (status, body).into_response();
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        for (name, value) in self.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        response
    }
}
