use serde::Deserialize;

use super::envelope::TransportError;
use crate::domain::Template;

#[derive(Debug, Clone, Deserialize)]
struct TemplatesJson {
    templates: Option<Vec<Template>>,
}

/// Decode the `{templates: [...]}` shape; this endpoint does not use the standard envelope.
pub fn decode_templates_json_response(json: &str) -> Result<Vec<Template>, TransportError> {
    let parsed: TemplatesJson = serde_json::from_str(json)?;
    parsed
        .templates
        .ok_or(TransportError::MissingField { field: "templates" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_templates_reads_bare_list() {
        let json = r#"
        {
          "templates": [
            {"uid": "t1", "name": "otp", "message": "Your code is {code}"},
            {"uid": "t2", "name": "promo", "message": "Sale!", "status": true}
          ]
        }
        "#;
        let templates = decode_templates_json_response(json).unwrap();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].name.as_deref(), Some("otp"));
        assert!(templates[1].extra.contains_key("status"));
    }

    #[test]
    fn decode_templates_requires_the_templates_key() {
        let err = decode_templates_json_response(r#"{"status":"success","data":[]}"#).unwrap_err();
        assert!(matches!(
            err,
            TransportError::MissingField { field: "templates" }
        ));
    }
}
