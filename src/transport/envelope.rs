use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::domain::{Envelope, Pagination, Status};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response is missing required field: {field}")]
    MissingField { field: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TransportStatus {
    Success,
    Error,
}

impl From<TransportStatus> for Status {
    fn from(value: TransportStatus) -> Self {
        match value {
            TransportStatus::Success => Status::Success,
            TransportStatus::Error => Status::Error,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum TransportCount {
    Int(u64),
    String(String),
}

impl TransportCount {
    pub(crate) fn into_u64(self) -> Option<u64> {
        match self {
            Self::Int(value) => Some(value),
            Self::String(value) => value.trim().parse::<u64>().ok(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PaginationJson {
    #[serde(default)]
    current_page: Option<TransportCount>,
    #[serde(default)]
    per_page: Option<TransportCount>,
    #[serde(default)]
    total: Option<TransportCount>,
    #[serde(default)]
    last_page: Option<TransportCount>,
}

impl From<PaginationJson> for Pagination {
    fn from(value: PaginationJson) -> Self {
        let count = |it: Option<TransportCount>| it.and_then(TransportCount::into_u64).unwrap_or(0);
        Self {
            current_page: count(value.current_page),
            per_page: count(value.per_page),
            total: count(value.total),
            last_page: count(value.last_page),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct EnvelopeJson<T> {
    status: TransportStatus,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
    #[serde(default)]
    pagination: Option<PaginationJson>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct StatusFieldJson {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Detect a gateway-level failure carried inside a 2xx body.
///
/// Returns `Some(message)` when the body is a JSON object whose `status` is
/// `"error"`, regardless of which response family the endpoint belongs to.
pub fn detect_error_status(body: &str) -> Option<Option<String>> {
    let peek: StatusFieldJson = serde_json::from_str(body).ok()?;
    match peek.status.as_deref() {
        Some(status) if status.eq_ignore_ascii_case("error") => Some(peek.message),
        _ => None,
    }
}

/// Decode the standard `{status, data, message, pagination}` envelope.
pub fn decode_envelope<T: DeserializeOwned>(json: &str) -> Result<Envelope<T>, TransportError> {
    let parsed: EnvelopeJson<T> = serde_json::from_str(json)?;
    Ok(Envelope {
        status: parsed.status.into(),
        message: parsed.message,
        data: parsed.data,
        pagination: parsed.pagination.map(Pagination::from),
    })
}

/// Decode an envelope whose `data` may be a single object or an array.
pub fn decode_envelope_list<T: DeserializeOwned>(
    json: &str,
) -> Result<Envelope<Vec<T>>, TransportError> {
    let parsed: EnvelopeJson<OneOrMany<T>> = serde_json::from_str(json)?;
    Ok(Envelope {
        status: parsed.status.into(),
        message: parsed.message,
        data: parsed.data.map(Vec::from),
        pagination: parsed.pagination.map(Pagination::from),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::domain::MessageReceipt;

    #[test]
    fn detect_error_status_reads_any_family() {
        assert_eq!(
            detect_error_status(r#"{"status":"error","message":"Invalid sender"}"#),
            Some(Some("Invalid sender".to_owned()))
        );
        assert_eq!(detect_error_status(r#"{"status":"Error"}"#), Some(None));
        assert_eq!(detect_error_status(r#"{"status":"success"}"#), None);
        assert_eq!(detect_error_status(r#"{"templates":[]}"#), None);
        assert_eq!(detect_error_status("not json"), None);
    }

    #[test]
    fn decode_envelope_maps_pagination_counts() {
        let json = r#"
        {
          "status": "success",
          "data": {"uid": "c1"},
          "pagination": {"current_page": "2", "per_page": 25, "total": 60, "last_page": 3}
        }
        "#;
        let parsed = decode_envelope::<Value>(json).unwrap();
        assert_eq!(parsed.status, Status::Success);
        assert_eq!(
            parsed.pagination,
            Some(Pagination {
                current_page: 2,
                per_page: 25,
                total: 60,
                last_page: 3
            })
        );
    }

    #[test]
    fn decode_envelope_list_accepts_object_or_array() {
        let one = r#"{"status":"success","data":{"uid":"a","to":"+1234567"}}"#;
        let parsed = decode_envelope_list::<MessageReceipt>(one).unwrap();
        assert_eq!(parsed.data.as_ref().map(Vec::len), Some(1));

        let many = r#"{"status":"success","data":[{"uid":"a"},{"uid":"b","campaign":"x"}]}"#;
        let parsed = decode_envelope_list::<MessageReceipt>(many).unwrap();
        let data = parsed.data.unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[1].extra.get("campaign"), Some(&Value::from("x")));
    }

    #[test]
    fn decode_envelope_without_data_for_typed_payload() {
        let json = r#"{"status":"success","message":"Contact deleted"}"#;
        let parsed = decode_envelope::<MessageReceipt>(json).unwrap();
        assert_eq!(parsed.message.as_deref(), Some("Contact deleted"));
        assert_eq!(parsed.data, None);

        let parsed = decode_envelope_list::<MessageReceipt>(json).unwrap();
        assert_eq!(parsed.data, None);
    }

    #[test]
    fn decode_envelope_rejects_unknown_status() {
        assert!(decode_envelope::<Value>(r#"{"status":"maybe"}"#).is_err());
    }
}
