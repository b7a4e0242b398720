use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use phonenumber::country;
use regex::{Regex, RegexSet};
use url::Url;

use crate::domain::sanitize::strip_controls;
use crate::domain::validation::ValidationError;

static API_KEY_ATTACK_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"\.\.[/\\]",
        r"(?i)(javascript|vbscript|data|file)\s*:",
        r"(?i)\b(script|eval|exec|shell|system|cmd|powershell|bash)\b",
    ])
    .unwrap_or_else(|err| panic!("api key pattern set must compile: {err}"))
});

static MESSAGE_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)<\s*script",
        r"(?i)javascript\s*:",
        r"(?i)\bon[a-z]+\s*=",
        r"(?i)vbscript\s*:",
        r"(?i)data\s*:\s*text/html",
        r"(?i)<\s*iframe",
        r"(?i)<\s*object",
        r"(?i)<\s*embed",
    ])
    .unwrap_or_else(|err| panic!("message pattern set must compile: {err}"))
});

static TEMPLATE_VARIABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$")
        .unwrap_or_else(|err| panic!("template variable pattern must compile: {err}"))
});

#[derive(Clone, PartialEq, Eq, Hash)]
/// Gateway API key, sent as `Authorization: Bearer <key>`.
///
/// Invariant: 10..=200 printable ASCII characters after trimming, free of
/// traversal, protocol and shell tokens. `|` is allowed.
pub struct ApiKey(String);

impl ApiKey {
    pub const FIELD: &'static str = "api_key";
    pub const MIN_LEN: usize = 10;
    pub const MAX_LEN: usize = 200;

    /// Create a validated [`ApiKey`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        let len = trimmed.chars().count();
        if len > Self::MAX_LEN {
            return Err(ValidationError::TooLong {
                field: Self::FIELD,
                max: Self::MAX_LEN,
                actual: len,
            });
        }
        if len < Self::MIN_LEN {
            return Err(ValidationError::TooShort {
                field: Self::FIELD,
                min: Self::MIN_LEN,
                actual: len,
            });
        }
        if !trimmed.chars().all(|c| (' '..='~').contains(&c)) {
            return Err(ValidationError::InvalidCharacters { field: Self::FIELD });
        }
        if API_KEY_ATTACK_PATTERNS.is_match(trimmed) {
            return Err(ValidationError::DangerousContent {
                field: Self::FIELD.to_owned(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the validated key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Recipient phone number in the gateway's `+<digits>` form.
///
/// Invariant: 7..=15 digits, not starting with `0`, always prefixed with `+`.
/// Normalization is idempotent.
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub const FIELD: &'static str = "recipient";
    pub const MIN_DIGITS: usize = 7;
    pub const MAX_DIGITS: usize = 15;
    pub const MAX_RAW_LEN: usize = 50;

    const FORBIDDEN: &'static [char] = &['<', '>', '"', '\'', '&', ';', '(', ')', '|', '`', '$', '\\'];

    /// Validate and normalize a phone number by keeping only its digits.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let raw_len = value.chars().count();
        if raw_len > Self::MAX_RAW_LEN {
            return Err(ValidationError::TooLong {
                field: Self::FIELD,
                max: Self::MAX_RAW_LEN,
                actual: raw_len,
            });
        }
        if value.trim().is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        if value.contains(Self::FORBIDDEN) {
            return Err(ValidationError::InvalidPhoneNumber { input: value });
        }

        let digits: String = value.chars().filter(char::is_ascii_digit).collect();
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len()) || digits.starts_with('0')
        {
            return Err(ValidationError::InvalidPhoneNumber { input: value });
        }
        Ok(Self(format!("+{digits}")))
    }

    /// Parse a number that may be written in national format, then normalize it.
    ///
    /// `default_region` is used when the input does not contain an explicit country prefix.
    pub fn parse_with_region(
        default_region: Option<country::Id>,
        input: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let input = input.into();
        let raw = input.trim();
        if raw.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        let parsed = phonenumber::parse(default_region, raw).map_err(|_| {
            ValidationError::InvalidPhoneNumber {
                input: raw.to_owned(),
            }
        })?;
        let e164 = phonenumber::format(&parsed)
            .mode(phonenumber::Mode::E164)
            .to_string();
        Self::new(e164)
    }

    /// Normalized `+<digits>` value as sent to the gateway.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Message body for SMS, MMS, voice and WhatsApp sends.
///
/// Invariant: non-empty, at most 1600 characters, free of script and
/// event-handler fragments. Stored trimmed.
pub struct MessageText(String);

impl MessageText {
    pub const FIELD: &'static str = "message";
    pub const MAX_LEN: usize = 1600;
    /// Inputs longer than this are rejected before any other inspection.
    pub const HARD_LIMIT: usize = 10_000;

    /// Create validated message text.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let len = value.chars().count();
        if len > Self::HARD_LIMIT {
            return Err(ValidationError::TooLong {
                field: Self::FIELD,
                max: Self::HARD_LIMIT,
                actual: len,
            });
        }
        if value.trim().is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        if len > Self::MAX_LEN {
            return Err(ValidationError::TooLong {
                field: Self::FIELD,
                max: Self::MAX_LEN,
                actual: len,
            });
        }
        if MESSAGE_PATTERNS.is_match(&value)
            || MESSAGE_PATTERNS.is_match(&strip_controls(&value))
        {
            return Err(ValidationError::DangerousContent {
                field: Self::FIELD.to_owned(),
            });
        }
        Ok(Self(value.trim().to_owned()))
    }

    /// Borrow the trimmed message text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Sender id shown to recipients (`sender_id`).
///
/// Invariant: 1..=11 characters after trimming.
pub struct SenderId(String);

impl SenderId {
    pub const FIELD: &'static str = "sender_id";
    pub const MAX_LEN: usize = 11;

    /// Create a validated [`SenderId`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        let len = trimmed.chars().count();
        if len > Self::MAX_LEN {
            return Err(ValidationError::TooLong {
                field: Self::FIELD,
                max: Self::MAX_LEN,
                actual: len,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the validated sender id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Publicly reachable image URL attached to an MMS (`media_url`).
pub struct MediaUrl(Url);

impl MediaUrl {
    pub const FIELD: &'static str = "media_url";

    const BLOCKED_SCHEMES: &'static [&'static str] =
        &["javascript:", "data:", "vbscript:", "file:", "ftp:"];
    const PRIVATE_HOST_PREFIXES: &'static [&'static str] = &["127.", "192.168.", "10."];
    const IMAGE_EXTENSIONS: &'static [&'static str] =
        &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp"];

    /// Create a validated [`MediaUrl`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        let invalid = |reason| ValidationError::InvalidUrl {
            input: trimmed.to_owned(),
            reason,
        };

        let lowered = trimmed.to_ascii_lowercase();
        if Self::BLOCKED_SCHEMES
            .iter()
            .any(|scheme| lowered.starts_with(scheme))
        {
            return Err(invalid("blocked scheme"));
        }

        let url = Url::parse(trimmed).map_err(|_| invalid("not an absolute url"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }

        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        if host.is_empty()
            || host == "localhost"
            || Self::PRIVATE_HOST_PREFIXES
                .iter()
                .any(|prefix| host.starts_with(prefix))
        {
            return Err(invalid("host is not publicly reachable"));
        }

        let path = url.path().to_ascii_lowercase();
        if !Self::IMAGE_EXTENSIONS.iter().any(|ext| path.contains(ext)) {
            return Err(invalid("path must reference an image"));
        }

        Ok(Self(url))
    }

    /// Borrow the validated URL.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Named substitutions for a template message.
///
/// Invariant: every name matches `^[A-Za-z][A-Za-z0-9_]*$`.
pub struct TemplateVariables(BTreeMap<String, String>);

impl TemplateVariables {
    pub const FIELD: &'static str = "variables";

    /// Validate every variable name; a single bad name rejects the whole set.
    pub fn new<K, V>(variables: impl IntoIterator<Item = (K, V)>) -> Result<Self, ValidationError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut out = BTreeMap::new();
        for (name, value) in variables {
            let name = name.into();
            if !TEMPLATE_VARIABLE_NAME.is_match(&name) {
                return Err(ValidationError::InvalidTemplateVariable { name });
            }
            out.insert(name, value.into());
        }
        Ok(Self(out))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Gateway message uid returned by send endpoints.
///
/// Invariant: non-empty after trimming.
pub struct MessageId(String);

impl MessageId {
    pub const FIELD: &'static str = "uid";

    /// Create a validated [`MessageId`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Contact uid.
///
/// Invariant: non-empty after trimming.
pub struct ContactId(String);

impl ContactId {
    pub const FIELD: &'static str = "contact_id";

    /// Create a validated [`ContactId`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Contact group uid.
///
/// Invariant: non-empty after trimming.
pub struct GroupId(String);

impl GroupId {
    pub const FIELD: &'static str = "group_id";

    /// Create a validated [`GroupId`].
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// OAuth2 client id.
///
/// Invariant: non-empty after trimming.
pub struct ClientId(String);

impl ClientId {
    pub const FIELD: &'static str = "client_id";

    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
/// OAuth2 client secret.
///
/// Invariant: non-empty after trimming.
pub struct ClientSecret(String);

impl ClientSecret {
    pub const FIELD: &'static str = "client_secret";

    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Resource-owner username for the password grant.
///
/// Invariant: non-empty after trimming.
pub struct Username(String);

impl Username {
    pub const FIELD: &'static str = "username";

    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
/// Resource-owner password for the password grant.
///
/// Invariant: must not be empty (whitespace is preserved and allowed).
pub struct Password(String);

impl Password {
    pub const FIELD: &'static str = "password";

    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}
