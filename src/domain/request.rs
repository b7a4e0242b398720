use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::domain::validation::ValidationError;
use crate::domain::value::{
    ContactId, GroupId, MediaUrl, MessageText, Password, PhoneNumber, SenderId,
    TemplateVariables, Username,
};

/// Most recipients accepted by one send request.
pub const SEND_MAX_RECIPIENTS: usize = 100;

#[derive(Debug, Clone, Default)]
/// Settings shared by every send request.
pub struct SendOptions {
    /// Deliver at this instant instead of immediately.
    pub schedule_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Voice used to read out a voice message.
pub enum VoiceGender {
    #[default]
    Female,
    Male,
}

impl VoiceGender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Female => "female",
            Self::Male => "male",
        }
    }
}

fn check_recipients(recipients: &[PhoneNumber]) -> Result<(), ValidationError> {
    if recipients.is_empty() {
        return Err(ValidationError::Empty {
            field: PhoneNumber::FIELD,
        });
    }
    if recipients.len() > SEND_MAX_RECIPIENTS {
        return Err(ValidationError::TooLong {
            field: PhoneNumber::FIELD,
            max: SEND_MAX_RECIPIENTS,
            actual: recipients.len(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
/// Plain-text SMS to up to [`SEND_MAX_RECIPIENTS`] numbers (`type: "plain"`).
pub struct SendSms {
    recipients: Vec<PhoneNumber>,
    sender_id: SenderId,
    message: MessageText,
    options: SendOptions,
}

impl SendSms {
    /// Build a request for `recipients`.
    ///
    /// Fails with [`ValidationError::Empty`] for no recipients and
    /// [`ValidationError::TooLong`] for more than [`SEND_MAX_RECIPIENTS`].
    pub fn new(
        recipients: Vec<PhoneNumber>,
        sender_id: SenderId,
        message: MessageText,
        options: SendOptions,
    ) -> Result<Self, ValidationError> {
        check_recipients(&recipients)?;
        Ok(Self {
            recipients,
            sender_id,
            message,
            options,
        })
    }

    /// Single-recipient shorthand.
    pub fn to_one(recipient: PhoneNumber, sender_id: SenderId, message: MessageText) -> Self {
        Self {
            recipients: vec![recipient],
            sender_id,
            message,
            options: SendOptions::default(),
        }
    }

    pub fn recipients(&self) -> &[PhoneNumber] {
        &self.recipients
    }

    pub fn sender_id(&self) -> &SenderId {
        &self.sender_id
    }

    pub fn message(&self) -> &MessageText {
        &self.message
    }

    pub fn options(&self) -> &SendOptions {
        &self.options
    }
}

#[derive(Debug, Clone)]
/// MMS carrying a media URL and an optional caption (`type: "mms"`).
pub struct SendMms {
    recipients: Vec<PhoneNumber>,
    sender_id: SenderId,
    message: Option<MessageText>,
    media_url: MediaUrl,
    options: SendOptions,
}

impl SendMms {
    /// Same recipient rules as [`SendSms::new`].
    pub fn new(
        recipients: Vec<PhoneNumber>,
        sender_id: SenderId,
        media_url: MediaUrl,
        message: Option<MessageText>,
        options: SendOptions,
    ) -> Result<Self, ValidationError> {
        check_recipients(&recipients)?;
        Ok(Self {
            recipients,
            sender_id,
            message,
            media_url,
            options,
        })
    }

    pub fn recipients(&self) -> &[PhoneNumber] {
        &self.recipients
    }

    pub fn sender_id(&self) -> &SenderId {
        &self.sender_id
    }

    pub fn message(&self) -> Option<&MessageText> {
        self.message.as_ref()
    }

    pub fn media_url(&self) -> &MediaUrl {
        &self.media_url
    }

    pub fn options(&self) -> &SendOptions {
        &self.options
    }
}

#[derive(Debug, Clone)]
/// Text-to-speech call (`type: "voice"`).
///
/// Language defaults to [`SendVoice::DEFAULT_LANGUAGE`] and the voice to
/// [`VoiceGender::Female`].
pub struct SendVoice {
    recipients: Vec<PhoneNumber>,
    sender_id: SenderId,
    message: MessageText,
    language: String,
    gender: VoiceGender,
    options: SendOptions,
}

impl SendVoice {
    pub const DEFAULT_LANGUAGE: &'static str = "en-gb";

    /// Same recipient rules as [`SendSms::new`].
    pub fn new(
        recipients: Vec<PhoneNumber>,
        sender_id: SenderId,
        message: MessageText,
        options: SendOptions,
    ) -> Result<Self, ValidationError> {
        check_recipients(&recipients)?;
        Ok(Self {
            recipients,
            sender_id,
            message,
            language: Self::DEFAULT_LANGUAGE.to_owned(),
            gender: VoiceGender::default(),
            options,
        })
    }

    /// Override the language code; a blank code is rejected.
    pub fn with_language(mut self, language: impl Into<String>) -> Result<Self, ValidationError> {
        let language = language.into();
        let trimmed = language.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "language" });
        }
        self.language = trimmed.to_owned();
        Ok(self)
    }

    pub fn with_gender(mut self, gender: VoiceGender) -> Self {
        self.gender = gender;
        self
    }

    pub fn recipients(&self) -> &[PhoneNumber] {
        &self.recipients
    }

    pub fn sender_id(&self) -> &SenderId {
        &self.sender_id
    }

    pub fn message(&self) -> &MessageText {
        &self.message
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn gender(&self) -> VoiceGender {
        self.gender
    }

    pub fn options(&self) -> &SendOptions {
        &self.options
    }
}

#[derive(Debug, Clone)]
/// WhatsApp message (`type: "whatsapp"`). No sender id is sent.
pub struct SendWhatsApp {
    recipients: Vec<PhoneNumber>,
    message: MessageText,
    options: SendOptions,
}

impl SendWhatsApp {
    /// Same recipient rules as [`SendSms::new`].
    pub fn new(
        recipients: Vec<PhoneNumber>,
        message: MessageText,
        options: SendOptions,
    ) -> Result<Self, ValidationError> {
        check_recipients(&recipients)?;
        Ok(Self {
            recipients,
            message,
            options,
        })
    }

    pub fn recipients(&self) -> &[PhoneNumber] {
        &self.recipients
    }

    pub fn message(&self) -> &MessageText {
        &self.message
    }

    pub fn options(&self) -> &SendOptions {
        &self.options
    }
}

#[derive(Debug, Clone)]
/// SMS rendered by the gateway from a stored template and its variables.
pub struct SendTemplateSms {
    recipients: Vec<PhoneNumber>,
    sender_id: SenderId,
    template_id: String,
    variables: TemplateVariables,
    options: SendOptions,
}

impl SendTemplateSms {
    pub const TEMPLATE_FIELD: &'static str = "template_id";

    /// Same recipient rules as [`SendSms::new`]; `template_id` must not be blank.
    pub fn new(
        recipients: Vec<PhoneNumber>,
        sender_id: SenderId,
        template_id: impl Into<String>,
        variables: TemplateVariables,
        options: SendOptions,
    ) -> Result<Self, ValidationError> {
        check_recipients(&recipients)?;
        let template_id = template_id.into();
        let template_id = template_id.trim();
        if template_id.is_empty() {
            return Err(ValidationError::Empty {
                field: Self::TEMPLATE_FIELD,
            });
        }
        Ok(Self {
            recipients,
            sender_id,
            template_id: template_id.to_owned(),
            variables,
            options,
        })
    }

    pub fn recipients(&self) -> &[PhoneNumber] {
        &self.recipients
    }

    pub fn sender_id(&self) -> &SenderId {
        &self.sender_id
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn variables(&self) -> &TemplateVariables {
        &self.variables
    }

    pub fn options(&self) -> &SendOptions {
        &self.options
    }
}

#[derive(Debug, Clone)]
/// Contact to create. Names are free text and go through the payload sanitizer.
pub struct NewContact {
    pub phone: PhoneNumber,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub group: Option<GroupId>,
}

impl NewContact {
    pub fn new(phone: PhoneNumber) -> Self {
        Self {
            phone,
            first_name: None,
            last_name: None,
            group: None,
        }
    }
}

#[derive(Debug, Clone)]
/// Contact group to create; the name must not be blank.
pub struct NewGroup {
    name: String,
}

impl NewGroup {
    pub const FIELD: &'static str = "name";

    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }
        Ok(Self {
            name: trimmed.to_owned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
/// Membership to add: `contact` joins `group`.
pub struct AddContactToGroup {
    pub group: GroupId,
    pub contact: ContactId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Page selection for list endpoints; `None` leaves the gateway default.
pub struct Page {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl Page {
    pub fn number(page: u32) -> Self {
        Self {
            page: Some(page),
            per_page: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    ClientCredentials,
    Password,
    RefreshToken,
}

impl GrantType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientCredentials => "client_credentials",
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl FromStr for GrantType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "client_credentials" => Ok(Self::ClientCredentials),
            "password" => Ok(Self::Password),
            "refresh_token" => Ok(Self::RefreshToken),
            other => Err(ValidationError::UnsupportedGrantType {
                grant_type: other.to_owned(),
            }),
        }
    }
}

/// Parameters of one OAuth2 token request.
///
/// [`TokenRequest::validate`] enforces the per-grant requirements: the password
/// grant needs both `username` and `password`, the refresh grant needs a
/// `refresh_token`.
#[derive(Clone)]
pub struct TokenRequest {
    pub grant_type: GrantType,
    pub username: Option<Username>,
    pub password: Option<Password>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

impl TokenRequest {
    pub fn new(grant_type: GrantType) -> Self {
        Self {
            grant_type,
            username: None,
            password: None,
            refresh_token: None,
            scope: None,
        }
    }

    pub fn client_credentials() -> Self {
        Self::new(GrantType::ClientCredentials)
    }

    pub fn password(username: Username, password: Password) -> Self {
        Self {
            username: Some(username),
            password: Some(password),
            ..Self::new(GrantType::Password)
        }
    }

    pub fn refresh(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: Some(refresh_token.into()),
            ..Self::new(GrantType::RefreshToken)
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.grant_type {
            GrantType::ClientCredentials => Ok(()),
            GrantType::Password => {
                if self.username.is_none() {
                    return Err(ValidationError::MissingGrantParameter {
                        grant_type: "password",
                        parameter: Username::FIELD,
                    });
                }
                if self.password.is_none() {
                    return Err(ValidationError::MissingGrantParameter {
                        grant_type: "password",
                        parameter: Password::FIELD,
                    });
                }
                Ok(())
            }
            GrantType::RefreshToken => match self.refresh_token.as_deref().map(str::trim) {
                Some(token) if !token.is_empty() => Ok(()),
                _ => Err(ValidationError::MissingGrantParameter {
                    grant_type: "refresh_token",
                    parameter: "refresh_token",
                }),
            },
        }
    }
}

impl fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("username", &self.username)
            .field("password", &self.password)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("scope", &self.scope)
            .finish()
    }
}
