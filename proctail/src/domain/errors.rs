//! Structured error types for the ProcTail core.
//!
//! Uses `thiserror` for automatic `Display` and error chaining, and maps
//! one-to-one onto the stable [`ErrorCode`] catalog carried in IPC failure
//! responses (spec §4.4, §7).

use proctail_protocol::{ErrorCode, Pid};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcTailError {
    #[error("invalid process id: {0}")]
    InvalidPid(i32),

    #[error("tag must be non-empty and not whitespace-only")]
    InvalidTag,

    #[error("process {0} is not registered")]
    ProcessNotFound(Pid),

    #[error("tag '{0}' is not registered")]
    TagNotFound(String),

    /// Decided open question: `add(pid, tag)` returning `false` because the
    /// PID is already watched is surfaced to IPC callers as
    /// `TAG_ALREADY_EXISTS` rather than silently succeeding twice — the
    /// existing tag is named in the message to make the conflict
    /// actionable. See DESIGN.md.
    #[error("process {pid} is already watched under tag '{existing_tag}'")]
    AlreadyWatched { pid: Pid, existing_tag: String },

    #[error("insufficient permissions to access process {0}")]
    InsufficientPermissions(Pid),

    #[error("trace session error: {0}")]
    TraceSession(String),

    #[error("pipe server error: {0}")]
    PipeServer(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("service is not running")]
    ServiceNotRunning,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProcTailError {
    /// Maps this error to the stable wire [`ErrorCode`] it corresponds to.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            ProcTailError::InvalidPid(_)
            | ProcTailError::InvalidTag
            | ProcTailError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            ProcTailError::ProcessNotFound(_) => ErrorCode::ProcessNotFound,
            ProcTailError::TagNotFound(_) => ErrorCode::TagNotFound,
            ProcTailError::AlreadyWatched { .. } => ErrorCode::TagAlreadyExists,
            ProcTailError::InsufficientPermissions(_) => ErrorCode::InsufficientPermissions,
            ProcTailError::TraceSession(_) => ErrorCode::TraceSessionError,
            ProcTailError::PipeServer(_) => ErrorCode::PipeServerError,
            ProcTailError::ServiceNotRunning => ErrorCode::ServiceNotRunning,
            ProcTailError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_not_found_display() {
        let err = ProcTailError::ProcessNotFound(Pid(1234));
        assert_eq!(err.to_string(), "process 1234 is not registered");
        assert_eq!(err.code(), ErrorCode::ProcessNotFound);
    }

    #[test]
    fn already_watched_maps_to_tag_already_exists() {
        let err = ProcTailError::AlreadyWatched { pid: Pid(1), existing_tag: "a".to_string() };
        assert_eq!(err.code(), ErrorCode::TagAlreadyExists);
        assert!(err.to_string().contains("already watched"));
    }

    #[test]
    fn invalid_tag_maps_to_invalid_request() {
        assert_eq!(ProcTailError::InvalidTag.code(), ErrorCode::InvalidRequest);
    }
}
