//! Typed Rust client for an SMS/voice/MMS/WhatsApp gateway HTTP API.
//!
//! The crate is layered: a domain layer of validated types, a transport layer
//! for the gateway's wire formats, and a client layer that runs every call
//! through one pipeline (rate limiting, payload sanitization, authentication,
//! retries with exponential backoff, and error mapping).
//!
//! ```rust,no_run
//! use smsgate::{Auth, MessageText, PhoneNumber, SenderId, SendSms, SmsGateClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), smsgate::SmsGateError> {
//!     let client = SmsGateClient::new(Auth::api_key("...")?)?;
//!     let request = SendSms::to_one(
//!         PhoneNumber::new("+1234567890")?,
//!         SenderId::new("Acme")?,
//!         MessageText::new("hello")?,
//!     );
//!     let _resp = client.send_sms(request).await?;
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod client;
pub mod domain;
mod transport;

pub use client::{
    Auth, ClientConfig, Clock, ErrorKind, OAuth2Client, OAuth2Config, RateLimitConfig,
    RateLimiter, RetryPolicy, SmsGateClient, SmsGateClientBuilder, SmsGateError, SystemClock,
};
pub use domain::{
    AddContactToGroup, ApiKey, Balance, ClientId, ClientSecret, Contact, ContactId, Envelope,
    GrantType, Group, GroupId, MediaUrl, MessageId, MessageReceipt, MessageText, NewContact,
    NewGroup, Page, Pagination, Password, PhoneNumber, SendMms, SendOptions, SendSms,
    SendTemplateSms, SendVoice, SendWhatsApp, SenderId, SmsPage, Status, StatusOnlyResponse,
    Template, TemplateVariables, TokenRequest, TokenState, Username, ValidationError, VoiceGender,
};
