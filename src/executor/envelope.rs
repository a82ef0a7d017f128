use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Page information attached to list responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: u64,
    #[serde(default, alias = "per_page", alias = "pageSize")]
    pub limit: u64,
    #[serde(default, alias = "total_count", alias = "totalCount")]
    pub total: u64,
    #[serde(default, alias = "totalPages", alias = "pages")]
    pub total_pages: u64,
}

/// JSON envelope `{ status, message, data, pagination? }` returned by the
/// backend. `data` is the authoritative representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub status: Value,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl ApiEnvelope {
    pub fn ok(data: Value) -> Self {
        Self {
            status: Value::String("success".to_string()),
            message: None,
            data,
            pagination: None,
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Interpret a decoded body. Bodies without a `data` field are taken as
    /// the data itself.
    pub fn from_body(body: Value) -> Self {
        let is_envelope = body
            .as_object()
            .map(|fields| fields.contains_key("data"))
            .unwrap_or(false);

        if is_envelope {
            if let Ok(envelope) = serde_json::from_value::<ApiEnvelope>(body.clone()) {
                return envelope;
            }
        }
        Self {
            status: Value::Null,
            message: None,
            data: body,
            pagination: None,
        }
    }

    pub fn into_data(self) -> Value {
        self.data
    }
}

/// Extract the human readable reason from an error body.
pub fn error_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error", "detail"]
                .iter()
                .find_map(|name| value.get(*name).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                fallback.to_string()
            } else {
                body.trim().to_string()
            }
        })
}
