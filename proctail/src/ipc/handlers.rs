//! Request dispatch: turns an IPC [`Request`] into a [`Response`] by
//! consulting the shared [`ServiceState`] (spec §4.4).

use std::sync::Arc;

use log::warn;
use proctail_protocol::request::{ResponseBody, StatusBody, WatchTargetInfo};
use proctail_protocol::{Pid, Request, Response, Tag};

use crate::domain::ProcTailError;
use crate::process_validator::ProcessValidator;
use crate::storage::EventStorage;
use crate::trace_provider::TraceProvider;
use crate::watch_targets::WatchTargetManager;

/// Everything a request handler needs, shared across every connection.
pub struct ServiceState {
    pub targets: Arc<WatchTargetManager>,
    pub storage: Arc<EventStorage>,
    pub validator: Arc<dyn ProcessValidator>,
    pub trace_provider: Arc<dyn TraceProvider>,
    pub shutdown: tokio_util::sync::CancellationToken,
}

fn parse_tag(tag_name: &str) -> Result<Tag, ProcTailError> {
    Tag::new(tag_name).map_err(|_| ProcTailError::InvalidTag)
}

fn error_response(err: &ProcTailError) -> Response {
    Response::error(err.code(), err.to_string())
}

impl ServiceState {
    /// Dispatches a single request and returns its response. Never panics
    /// on a well-formed [`Request`] — per-request failures become an error
    /// envelope rather than propagating (spec §7 non-fatal class).
    pub fn handle(&self, request: Request) -> Response {
        match request {
            Request::AddWatchTarget { process_id, tag_name } => {
                self.add_watch_target(process_id, &tag_name)
            }
            Request::RemoveWatchTarget { tag_name } => self.remove_watch_target(&tag_name),
            Request::GetWatchTargets => self.get_watch_targets(),
            Request::GetRecordedEvents { tag_name, max_count } => {
                self.get_recorded_events(&tag_name, max_count)
            }
            Request::ClearEvents { tag_name } => self.clear_events(&tag_name),
            Request::GetStatus => self.get_status(),
            Request::HealthCheck => self.health_check(),
            Request::Shutdown { force } => self.shutdown_request(force),
        }
    }

    fn add_watch_target(&self, process_id: i32, tag_name: &str) -> Response {
        let tag = match parse_tag(tag_name) {
            Ok(tag) => tag,
            Err(err) => return error_response(&err),
        };
        if process_id <= 0 {
            return error_response(&ProcTailError::InvalidPid(process_id));
        }
        let pid = Pid(process_id);
        if !self.validator.exists(pid) {
            return error_response(&ProcTailError::ProcessNotFound(pid));
        }
        match self.targets.add(pid, tag) {
            Ok(true) => Response::ok_empty(),
            Ok(false) => {
                let existing_tag =
                    self.targets.tag_of(pid).map(Tag::into_string).unwrap_or_default();
                error_response(&ProcTailError::AlreadyWatched { pid, existing_tag })
            }
            Err(err) => error_response(&err),
        }
    }

    fn remove_watch_target(&self, tag_name: &str) -> Response {
        let tag = match parse_tag(tag_name) {
            Ok(tag) => tag,
            Err(err) => return error_response(&err),
        };
        let removed_count = i64::try_from(self.targets.remove_by_tag(&tag)).unwrap_or(i64::MAX);
        Response::ok(ResponseBody::RemovedCount { removed_count })
    }

    fn get_watch_targets(&self) -> Response {
        let watch_targets: Vec<WatchTargetInfo> =
            self.targets.list_target_infos(self.validator.as_ref());
        Response::ok(ResponseBody::WatchTargets { watch_targets })
    }

    fn get_recorded_events(&self, tag_name: &str, max_count: i64) -> Response {
        let tag = match parse_tag(tag_name) {
            Ok(tag) => tag,
            Err(err) => return error_response(&err),
        };
        let events = self.storage.get_latest(&tag, max_count);
        Response::ok(ResponseBody::Events { events })
    }

    fn clear_events(&self, tag_name: &str) -> Response {
        let tag = match parse_tag(tag_name) {
            Ok(tag) => tag,
            Err(err) => return error_response(&err),
        };
        self.storage.clear(&tag);
        Response::ok_empty()
    }

    /// Healthy iff the trace session is active and the storage layer is
    /// reachable (the pipe server is implicitly reachable — this handler
    /// only runs because it is) (spec §4.4, §7).
    fn is_healthy(&self) -> bool {
        self.trace_provider.is_active()
    }

    fn status_body(&self) -> StatusBody {
        let stats = self.storage.statistics();
        StatusBody {
            is_running: true,
            is_monitoring: self.trace_provider.is_active(),
            is_pipe_server_running: true,
            active_watch_targets: i64::try_from(self.targets.active_count()).unwrap_or(i64::MAX),
            total_tags: i64::try_from(stats.total_tags).unwrap_or(i64::MAX),
            total_events: i64::try_from(stats.total_events).unwrap_or(i64::MAX),
            estimated_memory_usage_mb: stats.estimated_bytes as f64 / (1024.0 * 1024.0),
            status: if self.is_healthy() { "Healthy" } else { "Unhealthy" }.to_string(),
        }
    }

    fn get_status(&self) -> Response {
        Response::ok(ResponseBody::Status(self.status_body()))
    }

    /// Always a `Success` envelope: `Status` carries `"Healthy"` or
    /// `"Unhealthy"` with a diagnostic snapshot, per spec §7 ("Health-check
    /// reports Healthy iff ... otherwise Unhealthy with a diagnostic
    /// message") — unhealthy is a documented status value, not a failed
    /// request.
    fn health_check(&self) -> Response {
        Response::ok(ResponseBody::Status(self.status_body()))
    }

    fn shutdown_request(&self, force: bool) -> Response {
        if !force && self.targets.active_count() > 0 {
            warn!(
                "shutdown requested with {} active watch targets still registered",
                self.targets.active_count()
            );
        }
        self.shutdown.cancel();
        Response::ok_empty()
    }
}
