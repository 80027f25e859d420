//! Raw and typed event data model (spec §3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;
use crate::types::{Pid, Tag, Tid};

/// A single payload value carried by a raw event.
///
/// Raw events from the trace provider carry a string-keyed map of
/// loosely-typed values; this is the variant set that map's values can
/// take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Integer(i64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(Timestamp),
}

impl PayloadValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PayloadValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PayloadValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Rough byte cost of this value, used by [`crate::event`] consumers that
    /// estimate storage memory usage. Not a precise accounting.
    #[must_use]
    pub fn heuristic_size(&self) -> usize {
        match self {
            PayloadValue::Integer(_) => 8,
            PayloadValue::String(s) => s.len(),
            PayloadValue::Bytes(b) => b.len(),
            PayloadValue::Timestamp(_) => 8,
        }
    }
}

pub type Payload = HashMap<String, PayloadValue>;

/// An untyped event as delivered by the trace provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawEvent {
    pub timestamp: Timestamp,
    pub provider_name: String,
    pub event_name: String,
    pub process_id: Pid,
    pub thread_id: Tid,
    pub activity_id: String,
    pub related_activity_id: String,
    pub payload: Payload,
}

/// Fields common to every typed event variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TypedEventHeader {
    pub timestamp: Timestamp,
    #[serde(rename = "TagName")]
    pub tag: Tag,
    pub process_id: Pid,
    pub thread_id: Tid,
    pub provider_name: String,
    pub event_name: String,
    pub activity_id: String,
    pub related_activity_id: String,
    pub payload: Payload,
}

/// A domain record produced from a raw event by the event processor.
///
/// Serializes as a tagged union keyed on `$type`, with the common header
/// fields flattened alongside the variant-specific fields — consumers
/// must tolerate additional unknown fields (forward compatibility, spec
/// §4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum TypedEvent {
    FileEvent {
        #[serde(flatten)]
        header: TypedEventHeader,
        #[serde(rename = "FilePath")]
        file_path: String,
    },
    ProcessStart {
        #[serde(flatten)]
        header: TypedEventHeader,
        #[serde(rename = "ChildProcessId")]
        child_process_id: Pid,
        #[serde(rename = "ChildProcessName")]
        child_process_name: String,
    },
    ProcessEnd {
        #[serde(flatten)]
        header: TypedEventHeader,
        #[serde(rename = "ExitCode")]
        exit_code: i64,
    },
    Generic {
        #[serde(flatten)]
        header: TypedEventHeader,
    },
}

impl TypedEvent {
    #[must_use]
    pub fn header(&self) -> &TypedEventHeader {
        match self {
            TypedEvent::FileEvent { header, .. }
            | TypedEvent::ProcessStart { header, .. }
            | TypedEvent::ProcessEnd { header, .. }
            | TypedEvent::Generic { header, .. } => header,
        }
    }

    #[must_use]
    pub fn tag(&self) -> &Tag {
        &self.header().tag
    }

    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.header().timestamp
    }

    #[must_use]
    pub fn process_id(&self) -> Pid {
        self.header().process_id
    }

    /// Best-effort size estimate for storage statistics (spec §4.3): a fixed
    /// per-event overhead plus a per-payload-field heuristic. This is
    /// explicitly an approximation, not a precise memory accounting.
    #[must_use]
    pub fn estimated_bytes(&self) -> usize {
        const HEADER_OVERHEAD: usize = 128;
        let header = self.header();
        let payload_bytes: usize =
            header.payload.iter().map(|(k, v)| k.len() + v.heuristic_size()).sum();
        let variant_bytes = match self {
            TypedEvent::FileEvent { file_path, .. } => file_path.len(),
            TypedEvent::ProcessStart { child_process_name, .. } => child_process_name.len() + 8,
            TypedEvent::ProcessEnd { .. } => 8,
            TypedEvent::Generic { .. } => 0,
        };
        HEADER_OVERHEAD + payload_bytes + variant_bytes
    }
}
