//! Transport layer: wire-format details (JSON payloads and response families).

mod contacts;
mod envelope;
mod messages;
mod money;
mod oauth;
mod templates;

pub use contacts::{
    encode_add_contact_to_group_json, encode_new_contact_json, encode_new_group_json,
};
pub use envelope::{TransportError, decode_envelope, decode_envelope_list, detect_error_status};
pub use messages::{
    decode_sms_list_json_response, encode_page_query, encode_send_mms_json, encode_send_sms_json,
    encode_send_template_sms_json, encode_send_voice_json, encode_send_whatsapp_json,
};
pub use money::decode_balance_json_response;
pub use oauth::{
    TokenReply, decode_oauth_error, decode_token_json_response, encode_revoke_request_json,
    encode_token_request_json,
};
pub use templates::decode_templates_json_response;
