use thiserror::Error;

/// Reasons a single bridge command gets dropped.
///
/// None of these ever leave the dispatcher: a failed command is logged and
/// skipped so the next push message still goes through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Malformed field `{field}`: {reason}")]
    MalformedField { field: String, reason: String },

    #[error("Unknown comment type: {0}")]
    UnknownCommentType(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl BridgeError {
    pub fn missing(field: &str) -> Self {
        BridgeError::MalformedField {
            field: field.to_string(),
            reason: "missing".to_string(),
        }
    }

    pub fn malformed(field: &str, reason: impl Into<String>) -> Self {
        BridgeError::MalformedField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
