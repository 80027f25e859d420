//! IPC request/response envelope and command vocabulary (spec §4.4, §6).

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::event::TypedEvent;
use crate::types::Pid;

fn default_max_count() -> i64 {
    50
}

/// A request frame's discriminated payload.
///
/// Serializes with a `RequestType` discriminator, matching the wire
/// vocabulary in spec §4.4. An unrecognized `RequestType`, or a body that
/// doesn't deserialize against the matched variant, is the dispatcher's
/// `INVALID_REQUEST` case — that failure is surfaced by the caller of
/// `serde_json::from_slice`, not represented as a variant here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "RequestType")]
pub enum Request {
    AddWatchTarget {
        #[serde(rename = "ProcessId")]
        process_id: i32,
        #[serde(rename = "TagName")]
        tag_name: String,
    },
    RemoveWatchTarget {
        #[serde(rename = "TagName")]
        tag_name: String,
    },
    GetWatchTargets,
    GetRecordedEvents {
        #[serde(rename = "TagName")]
        tag_name: String,
        #[serde(rename = "MaxCount", default = "default_max_count")]
        max_count: i64,
    },
    ClearEvents {
        #[serde(rename = "TagName")]
        tag_name: String,
    },
    GetStatus,
    HealthCheck,
    Shutdown {
        #[serde(rename = "Force", default)]
        force: bool,
    },
}

impl Request {
    #[must_use]
    pub fn request_type(&self) -> &'static str {
        match self {
            Request::AddWatchTarget { .. } => "AddWatchTarget",
            Request::RemoveWatchTarget { .. } => "RemoveWatchTarget",
            Request::GetWatchTargets => "GetWatchTargets",
            Request::GetRecordedEvents { .. } => "GetRecordedEvents",
            Request::ClearEvents { .. } => "ClearEvents",
            Request::GetStatus => "GetStatus",
            Request::HealthCheck => "HealthCheck",
            Request::Shutdown { .. } => "Shutdown",
        }
    }
}

/// A watch target as reported to a client, enriched with a best-effort
/// process name / executable path lookup (spec §4.1 `list_target_infos`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WatchTargetInfo {
    pub process_id: Pid,
    pub process_name: String,
    pub executable_path: String,
    pub start_time: crate::timestamp::Timestamp,
    pub tag_name: String,
}

/// Health/status snapshot body (spec §4.4 `GetStatus` / `HealthCheck`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusBody {
    pub is_running: bool,
    pub is_monitoring: bool,
    pub is_pipe_server_running: bool,
    pub active_watch_targets: i64,
    pub total_tags: i64,
    pub total_events: i64,
    pub estimated_memory_usage_mb: f64,
    pub status: String,
}

/// Command-specific response data, flattened into the enclosing [`Response`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    RemovedCount {
        #[serde(rename = "RemovedCount")]
        removed_count: i64,
    },
    WatchTargets {
        #[serde(rename = "WatchTargets")]
        watch_targets: Vec<WatchTargetInfo>,
    },
    Events {
        #[serde(rename = "Events")]
        events: Vec<TypedEvent>,
    },
    Status(StatusBody),
    None {},
}

impl Default for ResponseBody {
    fn default() -> Self {
        ResponseBody::None {}
    }
}

/// The envelope every response carries (spec §4.4 / §7): `Success`,
/// `ErrorMessage` (empty on success), an optional stable `ErrorCode`, and
/// command-specific data flattened alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Response {
    pub success: bool,
    #[serde(default)]
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_code: Option<ErrorCode>,
    #[serde(flatten)]
    pub body: ResponseBody,
}

impl Response {
    #[must_use]
    pub fn ok(body: ResponseBody) -> Self {
        Response { success: true, error_message: String::new(), error_code: None, body }
    }

    #[must_use]
    pub fn ok_empty() -> Self {
        Self::ok(ResponseBody::None {})
    }

    #[must_use]
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Response {
            success: false,
            error_message: message.into(),
            error_code: Some(code),
            body: ResponseBody::None {},
        }
    }
}

/// A synthetic `RequestParams` alias kept for call sites that want to
/// pattern-match just the parameters without repeating `Request::`.
pub type RequestParams = Request;
