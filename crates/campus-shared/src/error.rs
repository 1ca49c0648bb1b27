use thiserror::Error;

/// Contract violations rejected at the hub boundary.
///
/// References to users, channels or messages that do not exist are not
/// errors: the hub answers those with `None` or an empty collection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// A required field was empty.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Message content was empty or whitespace only.
    #[error("Message content must not be empty")]
    EmptyContent,

    /// Reaction emoji was empty or too long.
    #[error("Invalid reaction emoji")]
    InvalidEmoji,

    #[error("Unknown presence status: {0}")]
    InvalidStatus(String),

    #[error("Unknown role: {0}")]
    InvalidRole(String),
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, HubError>;
