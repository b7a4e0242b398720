use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use super::{Auth, SmsGateClient, SmsGateClientBuilder, SmsGateError};
use crate::domain::ValidationError;

const ENV_API_KEY: &str = "SMSGATE_API_KEY";
const ENV_CLIENT_ID: &str = "SMSGATE_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "SMSGATE_CLIENT_SECRET";
const ENV_BASE_URL: &str = "SMSGATE_BASE_URL";
const ENV_TIMEOUT_MS: &str = "SMSGATE_TIMEOUT_MS";
const ENV_RETRIES: &str = "SMSGATE_RETRIES";

/// Loosely-typed client settings, e.g. from a config file or the environment.
///
/// Exactly one of `api_key` and `oauth2` must be present.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    pub oauth2: Option<OAuth2Config>,
    pub base_url: Option<String>,
    #[serde(alias = "timeout")]
    pub timeout_ms: Option<u64>,
    pub retries: Option<u32>,
}

/// OAuth2 registration. Its optional settings take precedence over the
/// top-level ones.
#[derive(Clone, Deserialize)]
pub struct OAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default, alias = "timeout")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub retries: Option<u32>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("oauth2", &self.oauth2)
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("retries", &self.retries)
            .finish()
    }
}

impl fmt::Debug for OAuth2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("retries", &self.retries)
            .finish()
    }
}

impl ClientConfig {
    /// Read `SMSGATE_*` environment variables. Blank values count as unset.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ValidationError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let oauth2 = match (var(ENV_CLIENT_ID), var(ENV_CLIENT_SECRET)) {
            (Some(client_id), Some(client_secret)) => Some(OAuth2Config {
                client_id,
                client_secret,
                base_url: None,
                timeout_ms: None,
                retries: None,
            }),
            (None, None) => None,
            (Some(_), None) => return Err(missing_pair(ENV_CLIENT_SECRET)),
            (None, Some(_)) => return Err(missing_pair(ENV_CLIENT_ID)),
        };

        Ok(Self {
            api_key: var(ENV_API_KEY),
            oauth2,
            base_url: var(ENV_BASE_URL),
            timeout_ms: parse_number(ENV_TIMEOUT_MS, var(ENV_TIMEOUT_MS))?,
            retries: parse_number(ENV_RETRIES, var(ENV_RETRIES))?,
        })
    }

    /// Validate the credentials and turn the settings into a builder.
    pub fn into_builder(self) -> Result<SmsGateClientBuilder, ValidationError> {
        let (auth, oauth2) = match (self.api_key, self.oauth2) {
            (Some(api_key), None) => (Auth::api_key(api_key)?, None),
            (None, Some(oauth2)) => (
                Auth::oauth2(oauth2.client_id.clone(), oauth2.client_secret.clone())?,
                Some(oauth2),
            ),
            _ => return Err(ValidationError::AmbiguousCredentials),
        };

        let base_url = oauth2
            .as_ref()
            .and_then(|it| it.base_url.clone())
            .or(self.base_url);
        let timeout_ms = oauth2.as_ref().and_then(|it| it.timeout_ms).or(self.timeout_ms);
        let retries = oauth2.as_ref().and_then(|it| it.retries).or(self.retries);

        let mut builder = SmsGateClient::builder(auth);
        if let Some(base_url) = base_url {
            builder = builder.base_url(base_url);
        }
        if let Some(timeout_ms) = timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        if let Some(retries) = retries {
            builder = builder.retries(retries);
        }
        Ok(builder)
    }

    pub fn build(self) -> Result<SmsGateClient, SmsGateError> {
        self.into_builder()?.build()
    }
}

fn missing_pair(field: &'static str) -> ValidationError {
    ValidationError::InvalidConfig {
        field,
        reason: format!("must be set together with {ENV_CLIENT_ID} and {ENV_CLIENT_SECRET}"),
    }
}

fn parse_number<T: std::str::FromStr>(
    field: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ValidationError>
where
    T::Err: fmt::Display,
{
    raw.map(|raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|err| ValidationError::InvalidConfig {
                field,
                reason: err.to_string(),
            })
    })
    .transpose()
}
