use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::envelope::{TransportCount, TransportError};
use crate::domain::{ClientId, ClientSecret, TokenRequest, TokenState};

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;
/// Upper bound applied to `expires_in` (ten years).
const MAX_EXPIRES_IN_SECS: u64 = 10 * 365 * 24 * 3600;

#[derive(Debug, Clone, Deserialize)]
struct TokenJson {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<TransportCount>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OAuthErrorJson {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TokenReplyJson {
    Rejected(OAuthErrorJson),
    Granted(TokenJson),
}

/// Outcome of a call to the token endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenReply {
    Granted(TokenState),
    Rejected {
        error: String,
        description: Option<String>,
    },
}

fn credentials_body(client_id: &ClientId, client_secret: &ClientSecret) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert(
        ClientId::FIELD.to_owned(),
        Value::String(client_id.as_str().to_owned()),
    );
    body.insert(
        ClientSecret::FIELD.to_owned(),
        Value::String(client_secret.as_str().to_owned()),
    );
    body
}

pub fn encode_token_request_json(
    client_id: &ClientId,
    client_secret: &ClientSecret,
    request: &TokenRequest,
) -> Value {
    let mut body = credentials_body(client_id, client_secret);
    body.insert(
        "grant_type".to_owned(),
        Value::String(request.grant_type.as_str().to_owned()),
    );
    if let Some(username) = request.username.as_ref() {
        body.insert(
            "username".to_owned(),
            Value::String(username.as_str().to_owned()),
        );
    }
    if let Some(password) = request.password.as_ref() {
        body.insert(
            "password".to_owned(),
            Value::String(password.as_str().to_owned()),
        );
    }
    if let Some(refresh_token) = request.refresh_token.as_deref() {
        body.insert(
            "refresh_token".to_owned(),
            Value::String(refresh_token.to_owned()),
        );
    }
    if let Some(scope) = request.scope.as_deref() {
        body.insert("scope".to_owned(), Value::String(scope.to_owned()));
    }
    Value::Object(body)
}

pub fn encode_revoke_request_json(
    client_id: &ClientId,
    client_secret: &ClientSecret,
    token: &str,
) -> Value {
    let mut body = credentials_body(client_id, client_secret);
    body.insert("token".to_owned(), Value::String(token.to_owned()));
    body.insert(
        "token_type_hint".to_owned(),
        Value::String("access_token".to_owned()),
    );
    Value::Object(body)
}

/// Decode a token endpoint body, resolving `expires_in` against `issued_at`.
pub fn decode_token_json_response(
    json: &str,
    issued_at: DateTime<Utc>,
) -> Result<TokenReply, TransportError> {
    let parsed: TokenReplyJson = serde_json::from_str(json)?;
    Ok(match parsed {
        TokenReplyJson::Rejected(err) => TokenReply::Rejected {
            error: err.error,
            description: err.error_description,
        },
        TokenReplyJson::Granted(token) => {
            let expires_in = token
                .expires_in
                .and_then(TransportCount::into_u64)
                .unwrap_or(DEFAULT_EXPIRES_IN_SECS)
                .min(MAX_EXPIRES_IN_SECS);
            let expires_at = issued_at
                .checked_add_signed(Duration::seconds(expires_in as i64))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            TokenReply::Granted(TokenState {
                access_token: token.access_token,
                token_type: token.token_type.unwrap_or_else(|| "Bearer".to_owned()),
                expires_at,
                scope: token.scope,
                refresh_token: token.refresh_token,
            })
        }
    })
}

/// Extract `{error, error_description}` from a non-token body, if present.
pub fn decode_oauth_error(json: &str) -> Option<(String, Option<String>)> {
    let parsed: OAuthErrorJson = serde_json::from_str(json).ok()?;
    Some((parsed.error, parsed.error_description))
}
