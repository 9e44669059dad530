use bson::{Bson, Document};
use tracing::debug;

use crate::config::ApiConfig;
use crate::database::Page;
use crate::error::ApiError;
use crate::models::keys::{ID_KEY, LIMIT_KEY, SKIP_KEY};
use crate::validator::parse_object_id;

/// Query string of a list request: the page window and equality filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    /// Limit as the caller asked for it, echoed back in the envelope.
    pub limit: u64,
    /// Window handed to the datastore, `limit` clamped to the configured maximum.
    pub page: Page,
    pub filter: Document,
}

impl ListQuery {
    /// Parse query pairs. `limit` and `skip` must be non-negative integers;
    /// other keys become filters when listed in `searchable` and are ignored
    /// otherwise. Keys naming document ids (`_id`, `*_id`) must hold valid
    /// ObjectIds.
    pub fn from_pairs(
        pairs: &[(String, String)],
        searchable: &[&str],
        api: &ApiConfig,
    ) -> Result<Self, ApiError> {
        let mut limit = api.default_limit;
        let mut skip = 0;
        let mut filter = Document::new();

        for (key, value) in pairs {
            match key.as_str() {
                LIMIT_KEY => limit = parse_count(key, value)?,
                SKIP_KEY => skip = parse_count(key, value)?,
                key if searchable.contains(&key) => {
                    filter.insert(key, filter_value(key, value)?);
                }
                other => debug!("Ignoring unknown query key '{}'", other),
            }
        }

        let mut window = limit;
        if let Some(max) = api.max_limit.filter(|max| *max > 0) {
            if window == 0 || window > max {
                window = max;
            }
        }

        Ok(Self {
            limit,
            page: Page {
                skip,
                limit: window,
            },
            filter,
        })
    }
}

fn parse_count(key: &str, value: &str) -> Result<u64, ApiError> {
    value.trim().parse::<u64>().map_err(|_| {
        ApiError::bad_request(format!(
            "Invalid value for '{}': '{}' is not a non-negative integer",
            key, value
        ))
    })
}

fn filter_value(key: &str, value: &str) -> Result<Bson, ApiError> {
    if key == ID_KEY || key.ends_with("_id") {
        return parse_object_id(value)
            .map(Bson::ObjectId)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid document id '{}' for '{}'", value, key)));
    }
    Ok(match value {
        "true" => Bson::Boolean(true),
        "false" => Bson::Boolean(false),
        other => Bson::String(other.to_string()),
    })
}
