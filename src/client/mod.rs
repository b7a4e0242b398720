//! Client layer: the request executor, authentication and endpoint methods.
//!
//! Every endpoint call runs the same fixed pipeline:
//! rate-limit admission, payload sanitization, credential resolution, the
//! HTTP exchange under the retry controller, error mapping, and finally
//! decoding of the endpoint's response family.

mod clock;
mod config;
mod error;
mod http;
mod oauth;
mod rate_limit;
mod retry;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

pub use clock::{Clock, SystemClock};
pub use config::{ClientConfig, OAuth2Config};
pub use error::{ErrorKind, SmsGateError};
pub use oauth::OAuth2Client;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use retry::{RetryPolicy, Retryable, retry};

use self::http::{HttpRequest, HttpTransport, Method, ReqwestTransport};
use crate::domain::sanitize::{SanitizeLimits, contains_dangerous_patterns, sanitize_payload};
use crate::domain::{
    AddContactToGroup, ApiKey, Balance, ClientId, ClientSecret, Contact, ContactId, Envelope,
    Group, GroupId, MessageId, MessageReceipt, MessageText, NewContact, NewGroup, Page, SendMms,
    SendSms, SendTemplateSms, SendVoice, SendWhatsApp, SmsPage, Status, StatusOnlyResponse,
    Template, ValidationError,
};
use crate::transport::{self, TransportError};

const DEFAULT_BASE_URL: &str = "https://api.smsgateway.example/api/v3";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Rate-limit bucket shared by every OAuth2-authenticated call of one client.
const OAUTH_RATE_LIMIT_IDENTITY: &str = "oauth2-client";

#[derive(Debug, Clone)]
/// Credentials for the gateway.
///
/// Exactly one mode is chosen when the client is built; see
/// [`ClientConfig`] for building from loosely-typed configuration.
pub enum Auth {
    /// Static key sent as `Authorization: Bearer <key>`.
    ApiKey(ApiKey),
    /// OAuth2 client registration; access tokens are obtained and cached by
    /// [`OAuth2Client`].
    OAuth2 {
        client_id: ClientId,
        client_secret: ClientSecret,
    },
}

impl Auth {
    /// Create [`Auth::ApiKey`], validating the key.
    pub fn api_key(value: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self::ApiKey(ApiKey::new(value)?))
    }

    /// Create [`Auth::OAuth2`]; both parts must be non-empty.
    pub fn oauth2(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self::OAuth2 {
            client_id: ClientId::new(client_id)?,
            client_secret: ClientSecret::new(client_secret)?,
        })
    }
}

#[derive(Debug)]
enum Credential {
    StaticKey(ApiKey),
    OAuth2(Arc<OAuth2Client>),
}

#[derive(Debug, Clone)]
/// Builder for [`SmsGateClient`].
pub struct SmsGateClientBuilder {
    auth: Auth,
    base_url: String,
    timeout: Duration,
    retry_policy: RetryPolicy,
    rate_limit: RateLimitConfig,
    user_agent: Option<String>,
    clock: Arc<dyn Clock>,
}

impl SmsGateClientBuilder {
    /// Builder with the default base URL, a 30 second timeout, 3 attempts and
    /// 100 requests per minute.
    pub fn new(auth: Auth) -> Self {
        Self {
            auth,
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            retry_policy: RetryPolicy::default(),
            rate_limit: RateLimitConfig::default(),
            user_agent: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Override the gateway root, e.g. `https://gateway.example/api/v3`.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Timeout applied to each HTTP exchange (default 30 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts per call, keeping the default backoff.
    pub fn retries(mut self, max_attempts: u32) -> Self {
        self.retry_policy.max_attempts = max_attempts;
        self
    }

    /// Replace the whole retry policy (attempts, base delay, multiplier).
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Local rate limit applied before every request.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    /// Override the HTTP `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Time source for token expiry and rate-limit windows.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build a [`SmsGateClient`].
    ///
    /// Fails with [`SmsGateError::Validation`] when the base URL is not an
    /// absolute `http`/`https` URL.
    pub fn build(self) -> Result<SmsGateClient, SmsGateError> {
        let mut builder = reqwest::Client::builder().timeout(self.timeout);
        if let Some(user_agent) = self.user_agent.as_deref() {
            builder = builder.user_agent(user_agent);
        }
        let client = builder
            .build()
            .map_err(|err| SmsGateError::Unexpected(Box::new(err)))?;
        self.build_with_transport(Arc::new(ReqwestTransport { client }))
    }

    fn build_with_transport(
        self,
        http: Arc<dyn HttpTransport>,
    ) -> Result<SmsGateClient, SmsGateError> {
        let base_url = normalize_base_url(&self.base_url)?;
        let credential = match self.auth {
            Auth::ApiKey(key) => Credential::StaticKey(key),
            Auth::OAuth2 {
                client_id,
                client_secret,
            } => Credential::OAuth2(Arc::new(OAuth2Client::new(
                client_id,
                client_secret,
                &base_url,
                http.clone(),
                self.clock.clone(),
            ))),
        };

        Ok(SmsGateClient {
            base_url,
            credential: Arc::new(credential),
            http,
            retry_policy: self.retry_policy,
            rate_limiter: Arc::new(RateLimiter::with_clock(self.rate_limit, self.clock)),
        })
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|err| ValidationError::InvalidConfig {
        field: "base_url",
        reason: err.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidConfig {
            field: "base_url",
            reason: format!("unsupported scheme {}", parsed.scheme()),
        });
    }
    Ok(trimmed.to_owned())
}

#[derive(Clone)]
/// Gateway client.
///
/// Clones share the token cache and the rate limiter.
pub struct SmsGateClient {
    base_url: String,
    credential: Arc<Credential>,
    http: Arc<dyn HttpTransport>,
    retry_policy: RetryPolicy,
    rate_limiter: Arc<RateLimiter>,
}

impl std::fmt::Debug for SmsGateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsGateClient")
            .field("base_url", &self.base_url)
            .field("credential", &self.credential)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl SmsGateClient {
    /// Client with default settings.
    pub fn new(auth: Auth) -> Result<Self, SmsGateError> {
        Self::builder(auth).build()
    }

    /// Start building a client with custom settings.
    pub fn builder(auth: Auth) -> SmsGateClientBuilder {
        SmsGateClientBuilder::new(auth)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Token manager, when the client authenticates with OAuth2.
    pub fn oauth(&self) -> Option<&OAuth2Client> {
        match self.credential.as_ref() {
            Credential::OAuth2(oauth) => Some(oauth),
            Credential::StaticKey(_) => None,
        }
    }

    /// Send a plain SMS to every recipient of `request`.
    ///
    /// Errors:
    /// - [`SmsGateError::Validation`] when a field fails the sanitizer scan,
    /// - [`SmsGateError::QuotaExceeded`] when the local rate limit is hit or on HTTP 429,
    /// - [`SmsGateError::Api`] for other non-2xx responses or `status: "error"`.
    pub async fn send_sms(
        &self,
        request: SendSms,
    ) -> Result<Envelope<Vec<MessageReceipt>>, SmsGateError> {
        let body = transport::encode_send_sms_json(&request);
        let response = self
            .execute(Method::Post, "sms/send", Vec::new(), Some(body))
            .await?;
        parse(transport::decode_envelope_list(&response))
    }

    /// Send an MMS with its media URL.
    ///
    /// Errors:
    /// - [`SmsGateError::Validation`] when a field fails the sanitizer scan,
    /// - [`SmsGateError::QuotaExceeded`] when the local rate limit is hit or on HTTP 429,
    /// - [`SmsGateError::Api`] for other non-2xx responses or `status: "error"`.
    pub async fn send_mms(
        &self,
        request: SendMms,
    ) -> Result<Envelope<Vec<MessageReceipt>>, SmsGateError> {
        let body = transport::encode_send_mms_json(&request);
        let response = self
            .execute(Method::Post, "sms/send", Vec::new(), Some(body))
            .await?;
        parse(transport::decode_envelope_list(&response))
    }

    /// Place a text-to-speech call.
    ///
    /// Errors:
    /// - [`SmsGateError::Validation`] when a field fails the sanitizer scan,
    /// - [`SmsGateError::QuotaExceeded`] when the local rate limit is hit or on HTTP 429,
    /// - [`SmsGateError::Api`] for other non-2xx responses or `status: "error"`.
    pub async fn send_voice(
        &self,
        request: SendVoice,
    ) -> Result<Envelope<Vec<MessageReceipt>>, SmsGateError> {
        let body = transport::encode_send_voice_json(&request);
        let response = self
            .execute(Method::Post, "sms/send", Vec::new(), Some(body))
            .await?;
        parse(transport::decode_envelope_list(&response))
    }

    /// Send a WhatsApp message.
    ///
    /// Errors:
    /// - [`SmsGateError::Validation`] when a field fails the sanitizer scan,
    /// - [`SmsGateError::QuotaExceeded`] when the local rate limit is hit or on HTTP 429,
    /// - [`SmsGateError::Api`] for other non-2xx responses or `status: "error"`.
    pub async fn send_whatsapp(
        &self,
        request: SendWhatsApp,
    ) -> Result<Envelope<Vec<MessageReceipt>>, SmsGateError> {
        let body = transport::encode_send_whatsapp_json(&request);
        let response = self
            .execute(Method::Post, "sms/send", Vec::new(), Some(body))
            .await?;
        parse(transport::decode_envelope_list(&response))
    }

    /// Send an SMS rendered from a stored template.
    ///
    /// Errors:
    /// - [`SmsGateError::Validation`] when a field fails the sanitizer scan,
    /// - [`SmsGateError::QuotaExceeded`] when the local rate limit is hit or on HTTP 429,
    /// - [`SmsGateError::Api`] for other non-2xx responses or `status: "error"`.
    pub async fn send_template_sms(
        &self,
        request: SendTemplateSms,
    ) -> Result<Envelope<Vec<MessageReceipt>>, SmsGateError> {
        let body = transport::encode_send_template_sms_json(&request);
        let response = self
            .execute(Method::Post, "sms/send", Vec::new(), Some(body))
            .await?;
        parse(transport::decode_envelope_list(&response))
    }

    /// Fetch one sent message by uid.
    ///
    /// Errors:
    /// - [`SmsGateError::Validation`] when the id contains `/` or a dangerous pattern,
    /// - [`SmsGateError::Api`] for non-2xx responses (e.g. 404) or `status: "error"`.
    pub async fn get_sms(&self, uid: &MessageId) -> Result<Envelope<MessageReceipt>, SmsGateError> {
        let path = resource_path("sms", MessageId::FIELD, uid.as_str())?;
        let response = self.execute(Method::Get, &path, Vec::new(), None).await?;
        parse(transport::decode_envelope(&response))
    }

    /// List sent messages; this endpoint answers with `{messages, pagination}`.
    ///
    /// Errors:
    /// - [`SmsGateError::Api`] for non-2xx responses or `status: "error"`,
    /// - [`SmsGateError::Parse`] when the body is not a message page.
    pub async fn list_sms(&self, page: Page) -> Result<SmsPage, SmsGateError> {
        let query = transport::encode_page_query(page);
        let response = self.execute(Method::Get, "sms", query, None).await?;
        parse(transport::decode_sms_list_json_response(&response))
    }

    /// List message templates; this endpoint answers with `{templates}`.
    ///
    /// Errors:
    /// - [`SmsGateError::Api`] for non-2xx responses or `status: "error"`,
    /// - [`SmsGateError::Parse`] when `templates` is missing.
    pub async fn list_templates(&self) -> Result<Vec<Template>, SmsGateError> {
        let response = self
            .execute(Method::Get, "templates", Vec::new(), None)
            .await?;
        parse(transport::decode_templates_json_response(&response))
    }

    /// Current account balance. Amounts keep the gateway's textual form.
    ///
    /// Errors:
    /// - [`SmsGateError::Authentication`] when the credentials are rejected,
    /// - [`SmsGateError::Api`] for other non-2xx responses or `status: "error"`.
    pub async fn get_balance(&self) -> Result<Envelope<Balance>, SmsGateError> {
        let response = self.execute(Method::Get, "balance", Vec::new(), None).await?;
        parse(transport::decode_balance_json_response(&response))
    }

    /// Create a contact.
    ///
    /// Errors:
    /// - [`SmsGateError::Validation`] when a field fails the sanitizer scan,
    /// - [`SmsGateError::QuotaExceeded`] when the local rate limit is hit or on HTTP 429,
    /// - [`SmsGateError::Api`] for other non-2xx responses or `status: "error"`.
    pub async fn create_contact(&self, request: NewContact) -> Result<Envelope<Contact>, SmsGateError> {
        let body = transport::encode_new_contact_json(&request);
        let response = self
            .execute(Method::Post, "contacts", Vec::new(), Some(body))
            .await?;
        parse(transport::decode_envelope(&response))
    }

    /// Fetch one contact by id.
    ///
    /// Errors:
    /// - [`SmsGateError::Validation`] when the id contains `/` or a dangerous pattern,
    /// - [`SmsGateError::Api`] for non-2xx responses (e.g. 404) or `status: "error"`.
    pub async fn get_contact(&self, id: &ContactId) -> Result<Envelope<Contact>, SmsGateError> {
        let path = resource_path("contacts", ContactId::FIELD, id.as_str())?;
        let response = self.execute(Method::Get, &path, Vec::new(), None).await?;
        parse(transport::decode_envelope(&response))
    }

    /// List contacts, one page at a time.
    ///
    /// Errors:
    /// - [`SmsGateError::Api`] for non-2xx responses or `status: "error"`.
    pub async fn list_contacts(&self, page: Page) -> Result<Envelope<Vec<Contact>>, SmsGateError> {
        let query = transport::encode_page_query(page);
        let response = self.execute(Method::Get, "contacts", query, None).await?;
        parse(transport::decode_envelope_list(&response))
    }

    /// Delete a contact. An empty 2xx body counts as success.
    ///
    /// Errors:
    /// - [`SmsGateError::Validation`] when the id contains `/` or a dangerous pattern,
    /// - [`SmsGateError::Api`] for non-2xx responses (e.g. 404) or `status: "error"`.
    pub async fn delete_contact(&self, id: &ContactId) -> Result<StatusOnlyResponse, SmsGateError> {
        let path = resource_path("contacts", ContactId::FIELD, id.as_str())?;
        let response = self
            .execute(Method::Delete, &path, Vec::new(), None)
            .await?;
        if response.trim().is_empty() {
            return Ok(Envelope {
                status: Status::Success,
                message: None,
                data: None,
                pagination: None,
            });
        }
        parse(transport::decode_envelope(&response))
    }

    /// Create a contact group.
    ///
    /// Errors:
    /// - [`SmsGateError::Validation`] when a field fails the sanitizer scan,
    /// - [`SmsGateError::QuotaExceeded`] when the local rate limit is hit or on HTTP 429,
    /// - [`SmsGateError::Api`] for other non-2xx responses or `status: "error"`.
    pub async fn create_group(&self, request: NewGroup) -> Result<Envelope<Group>, SmsGateError> {
        let body = transport::encode_new_group_json(&request);
        let response = self
            .execute(Method::Post, "groups", Vec::new(), Some(body))
            .await?;
        parse(transport::decode_envelope(&response))
    }

    /// List contact groups, one page at a time.
    ///
    /// Errors:
    /// - [`SmsGateError::Api`] for non-2xx responses or `status: "error"`.
    pub async fn list_groups(&self, page: Page) -> Result<Envelope<Vec<Group>>, SmsGateError> {
        let query = transport::encode_page_query(page);
        let response = self.execute(Method::Get, "groups", query, None).await?;
        parse(transport::decode_envelope_list(&response))
    }

    /// Add an existing contact to an existing group.
    ///
    /// Errors:
    /// - [`SmsGateError::Validation`] when the id contains `/` or a dangerous pattern,
    /// - [`SmsGateError::Api`] for non-2xx responses (e.g. 404) or `status: "error"`.
    pub async fn add_contact_to_group(
        &self,
        request: AddContactToGroup,
    ) -> Result<StatusOnlyResponse, SmsGateError> {
        let group = resource_path("groups", GroupId::FIELD, request.group.as_str())?;
        let path = format!("{group}/contacts");
        let body = transport::encode_add_contact_to_group_json(&request);
        let response = self
            .execute(Method::Post, &path, Vec::new(), Some(body))
            .await?;
        parse(transport::decode_envelope(&response))
    }

    /// Run one call through the pipeline and return the raw 2xx body.
    #[instrument(skip(self, query, body))]
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<Value>,
    ) -> Result<String, SmsGateError> {
        if !self.rate_limiter.is_allowed(self.rate_limit_identity()) {
            warn!("request rejected by local rate limiter");
            return Err(SmsGateError::rate_limited());
        }

        let body = body
            .map(|body| sanitize_payload(body, sanitize_limits()))
            .transpose()?;
        for (key, value) in &query {
            if contains_dangerous_patterns(value) {
                return Err(ValidationError::DangerousContent { field: key.clone() }.into());
            }
        }

        let bearer = self.bearer_token().await?;
        let request = HttpRequest {
            method,
            url: format!("{}/{}", self.base_url, path),
            bearer: Some(bearer),
            query,
            body,
        };

        let request = &request;
        let response = retry(&self.retry_policy, move |attempt| async move {
            debug!(attempt, "sending request");
            let response = self.http.execute(request).await?;
            if response.is_success() {
                Ok(response)
            } else {
                Err(SmsGateError::from_http_status(response.status, response.body))
            }
        })
        .await?;

        if let Some(message) = transport::detect_error_status(&response.body) {
            return Err(SmsGateError::Api {
                message: message.unwrap_or_else(|| "request failed".to_owned()),
                status: Some(response.status),
                body: Some(response.body),
            });
        }
        debug!(status = response.status, "request completed");
        Ok(response.body)
    }

    fn rate_limit_identity(&self) -> &str {
        match self.credential.as_ref() {
            Credential::StaticKey(key) => key.as_str(),
            Credential::OAuth2(_) => OAUTH_RATE_LIMIT_IDENTITY,
        }
    }

    async fn bearer_token(&self) -> Result<String, SmsGateError> {
        match self.credential.as_ref() {
            Credential::StaticKey(key) => Ok(key.as_str().to_owned()),
            Credential::OAuth2(oauth) => oauth.get_access_token().await,
        }
    }
}

/// Long enough for a full-length message; other fields are far shorter.
fn sanitize_limits() -> SanitizeLimits {
    SanitizeLimits {
        max_value_len: MessageText::MAX_LEN,
        ..SanitizeLimits::default()
    }
}

fn resource_path(collection: &str, field: &'static str, id: &str) -> Result<String, ValidationError> {
    if contains_dangerous_patterns(id) || id.contains('/') {
        return Err(ValidationError::DangerousContent {
            field: field.to_owned(),
        });
    }
    Ok(format!("{collection}/{id}"))
}

fn parse<T>(result: Result<T, TransportError>) -> Result<T, SmsGateError> {
    result.map_err(|err| SmsGateError::Parse(Box::new(err)))
}
