//! OAuth2 token lifecycle: request, cache, expiry check, refresh and revoke.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, instrument};

use super::clock::Clock;
use super::error::SmsGateError;
use super::http::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::domain::{ClientId, ClientSecret, TokenRequest, TokenState, ValidationError};
use crate::transport::{
    TokenReply, decode_oauth_error, decode_token_json_response, encode_revoke_request_json,
    encode_token_request_json,
};

/// Token manager for one OAuth2 client registration.
///
/// The cached [`TokenState`] lives only in memory. Use [`OAuth2Client::token`]
/// and [`OAuth2Client::set_token`] to persist it across restarts.
///
/// Two calls that observe an expired token concurrently may both fetch a new
/// one; the later response wins.
pub struct OAuth2Client {
    client_id: ClientId,
    client_secret: ClientSecret,
    token_url: String,
    revoke_url: String,
    http: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    token: Mutex<Option<TokenState>>,
}

impl fmt::Debug for OAuth2Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Client")
            .field("client_id", &self.client_id)
            .field("token_url", &self.token_url)
            .field("has_token", &self.token().is_some())
            .finish_non_exhaustive()
    }
}

impl OAuth2Client {
    pub(crate) fn new(
        client_id: ClientId,
        client_secret: ClientSecret,
        base_url: &str,
        http: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let base_url = base_url.trim_end_matches('/');
        Self {
            client_id,
            client_secret,
            token_url: format!("{base_url}/oauth/token"),
            revoke_url: format!("{base_url}/oauth/revoke"),
            http,
            clock,
            token: Mutex::new(None),
        }
    }

    /// Return the cached access token, fetching a client-credentials token if
    /// none is cached or the cached one is expired.
    pub async fn get_access_token(&self) -> Result<String, SmsGateError> {
        if let Some(token) = self.token().filter(|token| !token.is_expired_at(self.clock.now())) {
            return Ok(token.access_token);
        }
        debug!("no valid cached token, requesting a new one");
        let token = self
            .request_token(TokenRequest::client_credentials())
            .await?;
        Ok(token.access_token)
    }

    /// Perform a token request and cache the result.
    ///
    /// Grant parameters are validated before anything is sent.
    #[instrument(skip_all, fields(grant_type = request.grant_type.as_str()))]
    pub async fn request_token(&self, request: TokenRequest) -> Result<TokenState, SmsGateError> {
        let token = self.fetch_token(&request).await?;
        info!(expires_at = %token.expires_at, "oauth token acquired");
        self.set_token(token.clone());
        Ok(token)
    }

    /// Exchange the stored refresh token for a new token.
    ///
    /// The previous refresh token is kept when the response does not carry a
    /// new one.
    #[instrument(skip_all)]
    pub async fn refresh_token(&self) -> Result<TokenState, SmsGateError> {
        let previous = self
            .token()
            .and_then(|token| token.refresh_token)
            .ok_or(ValidationError::MissingRefreshToken)?;

        let mut token = self
            .fetch_token(&TokenRequest::refresh(previous.clone()))
            .await?;
        if token.refresh_token.is_none() {
            token.refresh_token = Some(previous);
        }
        info!(expires_at = %token.expires_at, "oauth token refreshed");
        self.set_token(token.clone());
        Ok(token)
    }

    /// Revoke the cached access token.
    ///
    /// Without a cached token this is a no-op. Otherwise local state is
    /// cleared whatever the outcome, and a remote failure is still returned.
    #[instrument(skip_all)]
    pub async fn revoke_token(&self) -> Result<(), SmsGateError> {
        let Some(token) = self.token() else {
            return Ok(());
        };

        let body =
            encode_revoke_request_json(&self.client_id, &self.client_secret, &token.access_token);
        let request = HttpRequest::new(Method::Post, self.revoke_url.clone()).json(body);
        let outcome = self.http.execute(&request).await;
        self.clear_token();

        let response = outcome?;
        if !response.is_success() {
            return Err(oauth_failure(response));
        }
        info!("oauth token revoked");
        Ok(())
    }

    pub fn token(&self) -> Option<TokenState> {
        self.lock().clone()
    }

    pub fn set_token(&self, token: TokenState) {
        *self.lock() = Some(token);
    }

    pub fn clear_token(&self) {
        *self.lock() = None;
    }

    /// `true` when a token is cached and outside the expiry buffer.
    pub fn is_token_valid(&self) -> bool {
        let now = self.clock.now();
        self.lock()
            .as_ref()
            .is_some_and(|token| !token.is_expired_at(now))
    }

    async fn fetch_token(&self, request: &TokenRequest) -> Result<TokenState, SmsGateError> {
        request.validate()?;

        let body = encode_token_request_json(&self.client_id, &self.client_secret, request);
        let http_request = HttpRequest::new(Method::Post, self.token_url.clone()).json(body);
        let issued_at = self.clock.now();
        let response = self.http.execute(&http_request).await?;
        if !response.is_success() {
            return Err(oauth_failure(response));
        }

        let reply = decode_token_json_response(&response.body, issued_at)
            .map_err(|err| SmsGateError::Parse(Box::new(err)))?;
        match reply {
            TokenReply::Granted(token) => Ok(token),
            TokenReply::Rejected { error, description } => Err(SmsGateError::Authentication {
                message: description.unwrap_or(error),
                status: Some(response.status),
                body: Some(response.body),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<TokenState>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// OAuth2 error bodies become authentication failures; anything else is
/// mapped by status code.
fn oauth_failure(response: HttpResponse) -> SmsGateError {
    match decode_oauth_error(&response.body) {
        Some((error, description)) => SmsGateError::Authentication {
            message: description.unwrap_or(error),
            status: Some(response.status),
            body: Some(response.body),
        },
        None => SmsGateError::from_http_status(response.status, response.body),
    }
}
