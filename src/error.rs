//! Command Engine Errors
//!
//! Errors in this enum are reserved for misuse at the API boundary and for hard
//! failures of a collaborator. Expected failure categories (no handler matched, a
//! response with an unknown correlation id, a request that timed out) are reported
//! as typed outcomes instead, see `ProcessOutcome` and `CommandResponse`.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// A request was sent with a correlation id that is still pending.
    #[error("Duplicate correlation id: {0}")]
    DuplicateCorrelation(String),

    #[error("Command '{0}' has not been started")]
    NotStarted(String),

    #[error("Command '{0}' is already running")]
    AlreadyStarted(String),

    #[error("Payload codec error: {0}")]
    Codec(String),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    /// The thread-blocking send shim was called without being enabled in the policy.
    #[error("Blocking send is disabled for this command")]
    BlockingSendDisabled,

    #[error("Negotiation protocol violation: unknown action '{0}'")]
    NegotiationProtocolViolation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<serde_json::Error> for CommandError {
    fn from(e: serde_json::Error) -> Self {
        CommandError::Codec(e.to_string())
    }
}

impl From<bincode::Error> for CommandError {
    fn from(e: bincode::Error) -> Self {
        CommandError::Codec(e.to_string())
    }
}
