//! Domain model for the ProcTail core.
//!
//! The wire-level newtypes (`Pid`, `Tag`, `Tid`), the event types, and the
//! timestamp wrapper all live in `proctail-protocol` so a client can share
//! them without depending on the server. This module adds the
//! server-internal types and the structured error taxonomy (spec §7).

pub mod errors;
pub mod watch_target;

pub use errors::ProcTailError;
pub use watch_target::WatchTarget;

pub use proctail_protocol::{PayloadValue, Pid, RawEvent, Tag, Tid, Timestamp, TypedEvent};
