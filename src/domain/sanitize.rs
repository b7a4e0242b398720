//! Free-text hygiene applied to every outbound field and every user-facing error.
//!
//! Two separate passes exist: a scanner that *rejects* input carrying script,
//! command, traversal or SQL fragments, and a sanitizer that *normalizes* input
//! which passed the scan (control characters removed, length capped, trimmed).

use std::sync::LazyLock;

use regex::{Regex, RegexSet};
use serde_json::{Map, Value};

use crate::domain::validation::ValidationError;

/// Default cap applied to string values by [`sanitize_text`].
pub const DEFAULT_MAX_VALUE_LEN: usize = 1000;
/// Default cap applied to object keys by [`sanitize_payload`].
pub const DEFAULT_MAX_KEY_LEN: usize = 100;
/// Longest error message shown to a caller after scrubbing.
pub const MAX_ERROR_MESSAGE_LEN: usize = 500;

static DANGEROUS_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)<\s*script",
        r"(?i)javascript\s*:",
        r"(?i)vbscript\s*:",
        r"(?i)data\s*:\s*text/html",
        r"(?i)\bon[a-z]+\s*=",
        r"(?i)\b(eval|exec|system)\s*\(",
        r"\.\.[/\\]",
        r"(?i)\b(union|drop|insert|delete|update)\b",
        r"(?i)<\s*(iframe|object|embed|link|meta|style|svg|img|form|base)\b",
    ])
    .unwrap_or_else(|err| panic!("dangerous pattern set must compile: {err}"))
});

static SECRET_PAIRS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(password|token|key|secret)=[^\s&,;]*")
        .unwrap_or_else(|err| panic!("secret pattern must compile: {err}"))
});

/// Returns `true` if `input` contains script, event-handler, command, traversal,
/// SQL keyword or HTML tag fragments.
///
/// SQL keywords match as whole words in any case, so `"DROP"` and
/// `"1; delete users"` are flagged while `"updated"` is not.
pub fn contains_dangerous_patterns(input: &str) -> bool {
    DANGEROUS_PATTERNS.is_match(input)
}

/// Length caps used by [`sanitize_payload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeLimits {
    pub max_value_len: usize,
    pub max_key_len: usize,
}

impl Default for SanitizeLimits {
    fn default() -> Self {
        Self {
            max_value_len: DEFAULT_MAX_VALUE_LEN,
            max_key_len: DEFAULT_MAX_KEY_LEN,
        }
    }
}

/// Remove NUL and control characters (tab, line feed and carriage return are kept),
/// cap the result to `max_len` characters and trim it.
pub fn sanitize_text(input: &str, max_len: usize) -> String {
    let cleaned: String = input
        .chars()
        .filter(|c| !is_stripped_control(*c))
        .take(max_len)
        .collect();
    cleaned.trim().to_owned()
}

/// `input` without the characters [`sanitize_text`] removes.
pub(crate) fn strip_controls(input: &str) -> String {
    input.chars().filter(|c| !is_stripped_control(*c)).collect()
}

fn is_stripped_control(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{7f}')
}

/// Scan and sanitize every string inside a JSON payload.
///
/// The first string matching [`contains_dangerous_patterns`] aborts the whole
/// payload; nothing is returned partially sanitized.
pub fn sanitize_payload(payload: Value, limits: SanitizeLimits) -> Result<Value, ValidationError> {
    sanitize_value(payload, "payload", limits)
}

fn sanitize_value(value: Value, path: &str, limits: SanitizeLimits) -> Result<Value, ValidationError> {
    match value {
        Value::String(text) => {
            let dangerous = || ValidationError::DangerousContent {
                field: path.to_owned(),
            };
            if contains_dangerous_patterns(&text) {
                return Err(dangerous());
            }
            // Stripping controls can join a fragment split by a NUL byte.
            let cleaned = sanitize_text(&text, limits.max_value_len);
            if contains_dangerous_patterns(&cleaned) {
                return Err(dangerous());
            }
            Ok(Value::String(cleaned))
        }
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| sanitize_value(item, &format!("{path}[{idx}]"), limits))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(fields) => {
            let mut out = Map::with_capacity(fields.len());
            for (key, item) in fields {
                let key = sanitize_text(&key, limits.max_key_len);
                let item = sanitize_value(item, &key, limits)?;
                out.insert(key, item);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other),
    }
}

/// Mask `password=`, `token=`, `key=` and `secret=` pairs and cap the message
/// at [`MAX_ERROR_MESSAGE_LEN`] characters.
pub fn scrub_error_message(message: &str) -> String {
    let masked = SECRET_PAIRS.replace_all(message, "$1=***");
    masked.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn scanner_flags_script_and_accepts_plain_text() {
        assert!(contains_dangerous_patterns("<script>alert(1)</script>"));
        assert!(!contains_dangerous_patterns("Hello world"));
    }

    #[test]
    fn scanner_covers_each_family() {
        for input in [
            "javascript:alert(1)",
            "<img src=x onerror=alert(1)>",
            "eval(payload)",
            "system (\"rm\")",
            "../../etc/passwd",
            "1 UNION SELECT password FROM users",
            "DROP TABLE contacts",
            "DROP",
            "INSERT",
            "x UNION y",
            "DELETE users",
            "1; DROP users--",
            "please Update me",
            "<iframe src=evil>",
            "data:text/html;base64,xxx",
        ] {
            assert!(contains_dangerous_patterns(input), "not flagged: {input}");
        }
    }

    #[test]
    fn scanner_does_not_flag_ordinary_prose() {
        for input in [
            "Your address was updated",
            "Dropped off at the front desk",
            "See you on Monday",
            "Your code is 1234. Do not share it.",
            "Delivery window: 10-12",
        ] {
            assert!(!contains_dangerous_patterns(input), "flagged: {input}");
        }
    }

    #[test]
    fn sanitize_text_strips_controls_caps_and_trims() {
        assert_eq!(sanitize_text("  a\u{0}b\u{7}c\u{7f}  ", 100), "abc");
        assert_eq!(sanitize_text("line1\nline2", 100), "line1\nline2");
        assert_eq!(sanitize_text("abcdef", 3), "abc");
    }

    #[test]
    fn sanitize_payload_walks_nested_values() {
        let payload = json!({
            "recipient": " +1234567890 ",
            "contacts": [{"name": "Ann\u{0}"}],
            "count": 3
        });
        let cleaned = sanitize_payload(payload, SanitizeLimits::default()).unwrap();
        assert_eq!(
            cleaned,
            json!({
                "recipient": "+1234567890",
                "contacts": [{"name": "Ann"}],
                "count": 3
            })
        );
    }

    #[test]
    fn sanitize_payload_rejects_whole_payload_on_dangerous_field() {
        let payload = json!({
            "message": "hi",
            "contacts": [{"name": "<script>x</script>"}]
        });
        let err = sanitize_payload(payload, SanitizeLimits::default()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DangerousContent {
                field: "name".to_owned()
            }
        );
    }

    #[test]
    fn sanitize_payload_rejects_fragment_joined_by_stripping() {
        let payload = json!({ "message": "hi <scr\u{0}ipt>alert(1)</scr\u{0}ipt>" });
        assert!(!contains_dangerous_patterns("hi <scr\u{0}ipt>"));
        let err = sanitize_payload(payload, SanitizeLimits::default()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DangerousContent {
                field: "message".to_owned()
            }
        );

        let split_keyword = json!({ "note": "1; DR\u{7}OP users" });
        assert!(sanitize_payload(split_keyword, SanitizeLimits::default()).is_err());
    }

    #[test]
    fn scrub_masks_secrets_and_truncates() {
        let scrubbed = scrub_error_message("failed: token=abc123&key=xyz password=hunter2");
        assert_eq!(scrubbed, "failed: token=***&key=*** password=***");

        let long = "x".repeat(MAX_ERROR_MESSAGE_LEN + 50);
        assert_eq!(scrub_error_message(&long).chars().count(), MAX_ERROR_MESSAGE_LEN);
    }
}
