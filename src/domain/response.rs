use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    pub current_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
}

/// Standard gateway response wrapper.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub status: Status,
    pub message: Option<String>,
    pub data: Option<T>,
    pub pagination: Option<Pagination>,
}

/// Response of endpoints whose payload carries no typed data.
pub type StatusOnlyResponse = Envelope<Value>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageReceipt {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub cost: Option<Value>,
    #[serde(default)]
    pub sms_count: Option<u32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmsPage {
    pub messages: Vec<MessageReceipt>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    /// Remaining balance exactly as the gateway formatted it.
    pub remaining_balance: Option<String>,
    pub expired_on: Option<String>,
}

/// Cached OAuth2 access token.
///
/// `expires_at` is the instant the server stops honoring the token. The
/// client-side safety margin is applied by
/// [`TokenState::is_expired_at`], never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenState {
    /// Seconds before `expires_at` within which a token is already treated as expired.
    pub const EXPIRY_BUFFER_SECS: i64 = 300;

    /// `true` once `now` is within [`TokenState::EXPIRY_BUFFER_SECS`] of `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at - Duration::seconds(Self::EXPIRY_BUFFER_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_at: DateTime<Utc>) -> TokenState {
        TokenState {
            access_token: "at".to_owned(),
            token_type: "Bearer".to_owned(),
            expires_at,
            scope: None,
            refresh_token: None,
        }
    }

    #[test]
    fn expiry_applies_buffer_at_check_time() {
        let issued = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let state = token(issued + Duration::seconds(3600));

        assert!(!state.is_expired_at(issued));
        assert!(!state.is_expired_at(issued + Duration::seconds(3600 - 301)));
        assert!(state.is_expired_at(issued + Duration::seconds(3600 - 300)));
        assert!(state.is_expired_at(issued + Duration::milliseconds(3_600_000 - 1)));
    }

    #[test]
    fn token_state_round_trips_through_json_for_persistence() {
        let issued = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let mut state = token(issued);
        state.refresh_token = Some("rt".to_owned());

        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("scope"));
        let restored: TokenState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }
}
