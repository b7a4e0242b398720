use serde::Deserialize;
use serde::de::Error as DeError;

use super::envelope::TransportError;
use crate::domain::{Balance, Envelope};

/// Money-like value returned by the gateway as either JSON string or JSON number.
///
/// For numbers, the raw JSON token is preserved to avoid formatting drift
/// (`10.00` remains `"10.00"` instead of becoming `"10.0"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportMoney(String);

impl TransportMoney {
    pub fn into_string(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for TransportMoney {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw: Box<serde_json::value::RawValue> = Deserialize::deserialize(deserializer)?;
        let token = raw.get();

        match token.as_bytes().first().copied() {
            Some(b'"') => {
                let parsed = serde_json::from_str::<String>(token).map_err(D::Error::custom)?;
                Ok(Self(parsed))
            }
            Some(b'-' | b'0'..=b'9') => Ok(Self(token.to_owned())),
            _ => Err(D::Error::custom(
                "expected money field to be JSON string or number",
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct BalanceJson {
    #[serde(default)]
    remaining_balance: Option<TransportMoney>,
    #[serde(default)]
    expired_on: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct BalanceEnvelopeJson {
    status: super::envelope::TransportStatus,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<BalanceJson>,
}

pub fn decode_balance_json_response(json: &str) -> Result<Envelope<Balance>, TransportError> {
    let parsed: BalanceEnvelopeJson = serde_json::from_str(json)?;
    Ok(Envelope {
        status: parsed.status.into(),
        message: parsed.message,
        data: parsed.data.map(|data| Balance {
            remaining_balance: data.remaining_balance.map(TransportMoney::into_string),
            expired_on: data.expired_on,
        }),
        pagination: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_balance_supports_numeric_and_string_money() {
        let numeric = r#"
        {
          "status": "success",
          "data": {"remaining_balance": 10.50, "expired_on": "2027-01-01"}
        }
        "#;
        let parsed = decode_balance_json_response(numeric).unwrap();
        let data = parsed.data.unwrap();
        assert_eq!(data.remaining_balance.as_deref(), Some("10.50"));
        assert_eq!(data.expired_on.as_deref(), Some("2027-01-01"));

        let string = r#"
        {
          "status": "success",
          "data": {"remaining_balance": "$1,250.00"}
        }
        "#;
        let parsed = decode_balance_json_response(string).unwrap();
        assert_eq!(
            parsed.data.unwrap().remaining_balance.as_deref(),
            Some("$1,250.00")
        );
    }

    #[test]
    fn decode_balance_rejects_non_money_tokens() {
        let json = r#"{"status":"success","data":{"remaining_balance":true}}"#;
        assert!(decode_balance_json_response(json).is_err());
    }
}
