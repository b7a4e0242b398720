//! Domain layer: strong types with validation and invariants (no I/O).

mod request;
mod response;
pub mod sanitize;
mod validation;
mod value;

pub use request::{
    AddContactToGroup, GrantType, NewContact, NewGroup, Page, SEND_MAX_RECIPIENTS, SendMms,
    SendOptions, SendSms, SendTemplateSms, SendVoice, SendWhatsApp, TokenRequest, VoiceGender,
};
pub use response::{
    Balance, Contact, Envelope, Group, MessageReceipt, Pagination, SmsPage, Status,
    StatusOnlyResponse, Template, TokenState,
};
pub use validation::ValidationError;
pub use value::{
    ApiKey, ClientId, ClientSecret, ContactId, GroupId, MediaUrl, MessageId, MessageText,
    Password, PhoneNumber, SenderId, TemplateVariables, Username,
};
