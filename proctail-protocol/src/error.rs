//! Stable error codes (spec §4.4) and framing-layer errors.

use serde::{Deserialize, Serialize};

/// Stable error-code tokens carried in a failure [`crate::request::Response`].
///
/// These are wire-stable identifiers, not `Display` text — clients may
/// match on them. New variants are forward-compatible additions only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "PROCESS_NOT_FOUND")]
    ProcessNotFound,
    #[serde(rename = "TAG_NOT_FOUND")]
    TagNotFound,
    #[serde(rename = "TAG_ALREADY_EXISTS")]
    TagAlreadyExists,
    #[serde(rename = "INSUFFICIENT_PERMISSIONS")]
    InsufficientPermissions,
    #[serde(rename = "TRACE_SESSION_ERROR")]
    TraceSessionError,
    #[serde(rename = "PIPE_SERVER_ERROR")]
    PipeServerError,
    #[serde(rename = "INVALID_REQUEST")]
    InvalidRequest,
    #[serde(rename = "SERVICE_NOT_RUNNING")]
    ServiceNotRunning,
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

/// Errors arising from the length-prefixed framing layer itself, as opposed
/// to a well-formed request that fails at the domain level.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("connection closed before a full frame was received")]
    ConnectionClosed,

    #[error("frame length {0} exceeds the maximum allowed frame size")]
    FrameTooLarge(u32),

    #[error("failed to decode frame as UTF-8 JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_serializes_to_stable_token() {
        let json = serde_json::to_string(&ErrorCode::TagNotFound).unwrap();
        assert_eq!(json, "\"TAG_NOT_FOUND\"");
    }
}
