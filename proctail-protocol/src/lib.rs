//! Shared data model and wire schema for ProcTail.
//!
//! This crate contains everything a client and the server both need to
//! agree on: the domain newtypes, the typed-event tagged union, the
//! request/response envelope, the stable error codes, and the
//! length-prefixed JSON framing used over the IPC endpoint. It has no
//! dependency on the server crate so a client can link against it alone.

pub mod error;
pub mod event;
pub mod framing;
pub mod request;
pub mod timestamp;
pub mod types;

pub use error::{ErrorCode, ProtocolError};
pub use event::{PayloadValue, RawEvent, TypedEvent, TypedEventHeader};
pub use framing::{read_frame, write_frame};
pub use request::{Request, RequestParams, Response, ResponseBody};
pub use timestamp::Timestamp;
pub use types::{Pid, Tag, Tid};
