use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Empty { field: &'static str },
    TooLong { field: &'static str, max: usize, actual: usize },
    TooShort { field: &'static str, min: usize, actual: usize },
    InvalidPhoneNumber { input: String },
    DangerousContent { field: String },
    InvalidCharacters { field: &'static str },
    InvalidUrl { input: String, reason: &'static str },
    InvalidTemplateVariable { name: String },
    UnsupportedGrantType { grant_type: String },
    MissingGrantParameter { grant_type: &'static str, parameter: &'static str },
    MissingRefreshToken,
    AmbiguousCredentials,
    InvalidConfig { field: &'static str, reason: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::TooLong { field, max, actual } => {
                write!(f, "{field} is too long: {actual} characters (max {max})")
            }
            Self::TooShort { field, min, actual } => {
                write!(f, "{field} is too short: {actual} characters (min {min})")
            }
            Self::InvalidPhoneNumber { input } => write!(f, "invalid phone number: {input}"),
            Self::DangerousContent { field } => {
                write!(f, "{field} contains potentially dangerous content")
            }
            Self::InvalidCharacters { field } => write!(f, "{field} contains invalid characters"),
            Self::InvalidUrl { input, reason } => write!(f, "invalid media url {input}: {reason}"),
            Self::InvalidTemplateVariable { name } => {
                write!(f, "invalid template variable name: {name}")
            }
            Self::UnsupportedGrantType { grant_type } => {
                write!(f, "unsupported grant type: {grant_type}")
            }
            Self::MissingGrantParameter {
                grant_type,
                parameter,
            } => write!(f, "{grant_type} grant requires {parameter}"),
            Self::MissingRefreshToken => write!(f, "no refresh token available"),
            Self::AmbiguousCredentials => {
                write!(f, "exactly one of api key or oauth2 credentials must be provided")
            }
            Self::InvalidConfig { field, reason } => write!(f, "invalid {field}: {reason}"),
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::ValidationError;

    #[test]
    fn display_messages_are_human_readable() {
        let err = ValidationError::Empty { field: "message" };
        assert_eq!(err.to_string(), "message must not be empty");

        let err = ValidationError::TooLong {
            field: "sender_id",
            max: 11,
            actual: 12,
        };
        assert_eq!(
            err.to_string(),
            "sender_id is too long: 12 characters (max 11)"
        );

        let err = ValidationError::InvalidPhoneNumber {
            input: "bad".to_owned(),
        };
        assert_eq!(err.to_string(), "invalid phone number: bad");

        let err = ValidationError::MissingGrantParameter {
            grant_type: "password",
            parameter: "username",
        };
        assert_eq!(err.to_string(), "password grant requires username");

        assert_eq!(
            ValidationError::AmbiguousCredentials.to_string(),
            "exactly one of api key or oauth2 credentials must be provided"
        );
    }
}
