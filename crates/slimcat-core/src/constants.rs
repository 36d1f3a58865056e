//! Application-wide constants
//!
//! Centralized location for protocol field names and defaults that are
//! shared between the parser, the notices and the config layer.

/// Default site that comment deep links point at
pub const DEFAULT_SITE_DOMAIN: &str = "https://www.f-list.net";

/// Default tracing filter when neither RUST_LOG nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Env var that overrides the configured log file path
pub const LOG_FILE_ENV: &str = "SLIMCAT_LOG_FILE";

// Bridge payload field names
pub const FIELD_TYPE: &str = "type";
pub const FIELD_NAME: &str = "name";
pub const FIELD_SENDER: &str = "sender";
pub const FIELD_SUBJECT: &str = "subject";
pub const FIELD_ID: &str = "id";
pub const FIELD_PARENT_ID: &str = "parent_id";
pub const FIELD_TARGET_ID: &str = "target_id";
pub const FIELD_TARGET: &str = "target";
pub const FIELD_TARGET_TYPE: &str = "target_type";

/// Suffix appended to a character name to address their notes pane
pub const NOTES_SUFFIX: &str = "/notes";

/// User command that opens a private conversation
pub const PRIVATE_CONVERSATION_COMMAND: &str = "priv";
