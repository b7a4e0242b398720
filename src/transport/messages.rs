use serde::Deserialize;
use serde_json::{Map, Value};

use super::envelope::{PaginationJson, TransportError};
use crate::domain::{
    MediaUrl, MessageReceipt, MessageText, Page, Pagination, PhoneNumber, SendMms, SendOptions,
    SendSms, SendTemplateSms, SendVoice, SendWhatsApp, SenderId, SmsPage,
};

const SCHEDULE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Deserialize)]
struct SmsListJson {
    #[serde(default)]
    messages: Vec<MessageReceipt>,
    #[serde(default)]
    pagination: Option<PaginationJson>,
}

fn push_str(body: &mut Map<String, Value>, key: &str, value: &str) {
    body.insert(key.to_owned(), Value::String(value.to_owned()));
}

fn push_recipients(body: &mut Map<String, Value>, recipients: &[PhoneNumber]) {
    let joined = recipients
        .iter()
        .map(PhoneNumber::as_str)
        .collect::<Vec<_>>()
        .join(",");
    push_str(body, PhoneNumber::FIELD, &joined);
}

fn push_options(body: &mut Map<String, Value>, options: &SendOptions) {
    if let Some(at) = options.schedule_time {
        push_str(
            body,
            "schedule_time",
            &at.format(SCHEDULE_TIME_FORMAT).to_string(),
        );
    }
}

pub fn encode_send_sms_json(request: &SendSms) -> Value {
    let mut body = Map::new();
    push_recipients(&mut body, request.recipients());
    push_str(&mut body, SenderId::FIELD, request.sender_id().as_str());
    push_str(&mut body, "type", "plain");
    push_str(&mut body, MessageText::FIELD, request.message().as_str());
    push_options(&mut body, request.options());
    Value::Object(body)
}

pub fn encode_send_mms_json(request: &SendMms) -> Value {
    let mut body = Map::new();
    push_recipients(&mut body, request.recipients());
    push_str(&mut body, SenderId::FIELD, request.sender_id().as_str());
    push_str(&mut body, "type", "mms");
    if let Some(message) = request.message() {
        push_str(&mut body, MessageText::FIELD, message.as_str());
    }
    push_str(&mut body, MediaUrl::FIELD, request.media_url().as_str());
    push_options(&mut body, request.options());
    Value::Object(body)
}

pub fn encode_send_voice_json(request: &SendVoice) -> Value {
    let mut body = Map::new();
    push_recipients(&mut body, request.recipients());
    push_str(&mut body, SenderId::FIELD, request.sender_id().as_str());
    push_str(&mut body, "type", "voice");
    push_str(&mut body, "language", request.language());
    push_str(&mut body, "gender", request.gender().as_str());
    push_str(&mut body, MessageText::FIELD, request.message().as_str());
    push_options(&mut body, request.options());
    Value::Object(body)
}

pub fn encode_send_whatsapp_json(request: &SendWhatsApp) -> Value {
    let mut body = Map::new();
    push_recipients(&mut body, request.recipients());
    push_str(&mut body, "type", "whatsapp");
    push_str(&mut body, MessageText::FIELD, request.message().as_str());
    push_options(&mut body, request.options());
    Value::Object(body)
}

pub fn encode_send_template_sms_json(request: &SendTemplateSms) -> Value {
    let mut body = Map::new();
    push_recipients(&mut body, request.recipients());
    push_str(&mut body, SenderId::FIELD, request.sender_id().as_str());
    push_str(&mut body, "type", "plain");
    push_str(
        &mut body,
        SendTemplateSms::TEMPLATE_FIELD,
        request.template_id(),
    );
    let variables = request
        .variables()
        .iter()
        .map(|(name, value)| (name.to_owned(), Value::String(value.to_owned())))
        .collect::<Map<_, _>>();
    body.insert("variables".to_owned(), Value::Object(variables));
    push_options(&mut body, request.options());
    Value::Object(body)
}

pub fn encode_page_query(page: Page) -> Vec<(String, String)> {
    let mut query = Vec::new();
    if let Some(number) = page.page {
        query.push(("page".to_owned(), number.to_string()));
    }
    if let Some(per_page) = page.per_page {
        query.push(("per_page".to_owned(), per_page.to_string()));
    }
    query
}

/// Decode the `{messages, pagination}` shape returned by the SMS listing endpoint.
pub fn decode_sms_list_json_response(json: &str) -> Result<SmsPage, TransportError> {
    let parsed: SmsListJson = serde_json::from_str(json)?;
    Ok(SmsPage {
        messages: parsed.messages,
        pagination: parsed.pagination.map(Pagination::from),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::domain::{TemplateVariables, VoiceGender};

    fn recipients() -> Vec<PhoneNumber> {
        vec![
            PhoneNumber::new("+1234567890").unwrap(),
            PhoneNumber::new("447700900123").unwrap(),
        ]
    }

    #[test]
    fn encode_sms_joins_recipients_and_formats_schedule() {
        let options = SendOptions {
            schedule_time: Some(Utc.with_ymd_and_hms(2026, 11, 2, 9, 30, 0).unwrap()),
        };
        let request = SendSms::new(
            recipients(),
            SenderId::new("Acme").unwrap(),
            MessageText::new("Hi there").unwrap(),
            options,
        )
        .unwrap();

        assert_eq!(
            encode_send_sms_json(&request),
            json!({
                "recipient": "+1234567890,+447700900123",
                "sender_id": "Acme",
                "type": "plain",
                "message": "Hi there",
                "schedule_time": "2026-11-02 09:30"
            })
        );
    }

    #[test]
    fn encode_mms_omits_missing_message() {
        let request = SendMms::new(
            recipients(),
            SenderId::new("Acme").unwrap(),
            MediaUrl::new("https://cdn.example.com/a.png").unwrap(),
            None,
            SendOptions::default(),
        )
        .unwrap();
        let body = encode_send_mms_json(&request);
        assert_eq!(body["type"], "mms");
        assert_eq!(body["media_url"], "https://cdn.example.com/a.png");
        assert!(body.get("message").is_none());
    }

    #[test]
    fn encode_voice_carries_language_and_gender() {
        let request = SendVoice::new(
            recipients(),
            SenderId::new("Acme").unwrap(),
            MessageText::new("Your code is 1234").unwrap(),
            SendOptions::default(),
        )
        .unwrap()
        .with_gender(VoiceGender::Male);
        let body = encode_send_voice_json(&request);
        assert_eq!(body["type"], "voice");
        assert_eq!(body["language"], "en-gb");
        assert_eq!(body["gender"], "male");
    }

    #[test]
    fn encode_whatsapp_and_template_payloads() {
        let whatsapp = SendWhatsApp::new(
            recipients(),
            MessageText::new("hello").unwrap(),
            SendOptions::default(),
        )
        .unwrap();
        let body = encode_send_whatsapp_json(&whatsapp);
        assert_eq!(body["type"], "whatsapp");
        assert!(body.get("sender_id").is_none());

        let template = SendTemplateSms::new(
            recipients(),
            SenderId::new("Acme").unwrap(),
            "tpl-1",
            TemplateVariables::new([("name", "Ann")]).unwrap(),
            SendOptions::default(),
        )
        .unwrap();
        let body = encode_send_template_sms_json(&template);
        assert_eq!(body["template_id"], "tpl-1");
        assert_eq!(body["variables"], json!({"name": "Ann"}));
    }

    #[test]
    fn encode_page_query_skips_unset_fields() {
        assert!(encode_page_query(Page::default()).is_empty());
        assert_eq!(
            encode_page_query(Page {
                page: Some(2),
                per_page: Some(50)
            }),
            vec![
                ("page".to_owned(), "2".to_owned()),
                ("per_page".to_owned(), "50".to_owned()),
            ]
        );
    }

    #[test]
    fn decode_sms_list_reads_messages_and_pagination() {
        let json = r#"
        {
          "messages": [{"uid": "m1", "to": "+1234567890", "status": "Delivered"}],
          "pagination": {"current_page": 1, "per_page": 15, "total": 1, "last_page": 1}
        }
        "#;
        let page = decode_sms_list_json_response(json).unwrap();
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.messages[0].status.as_deref(), Some("Delivered"));
        assert_eq!(page.pagination.map(|p| p.total), Some(1));
    }
}
