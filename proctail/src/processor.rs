//! Event processor: classification, filtering, and the watch-target
//! side-effects of process start/end events (spec §4.2).

use std::sync::Arc;

use proctail_protocol::event::{Payload, PayloadValue, TypedEventHeader};
use proctail_protocol::{Pid, RawEvent, Tag, TypedEvent};

use crate::process_validator::ProcessValidator;
use crate::watch_targets::WatchTargetManager;

const FILEIO_PROVIDER: &str = "Microsoft-Windows-Kernel-FileIO";
const PROCESS_PROVIDER: &str = "Microsoft-Windows-Kernel-Process";

fn is_fileio_provider(name: &str) -> bool {
    name.eq_ignore_ascii_case(FILEIO_PROVIDER) || name.to_ascii_lowercase().contains("fileio")
}

fn is_process_provider(name: &str) -> bool {
    name.eq_ignore_ascii_case(PROCESS_PROVIDER)
        || name.to_ascii_lowercase().contains("kernel-process")
}

fn is_close_event(event_name: &str) -> bool {
    event_name.to_ascii_lowercase().contains("close")
}

fn payload_string(payload: &Payload, key: &str) -> Option<String> {
    payload.get(key).and_then(PayloadValue::as_str).map(str::to_string)
}

fn payload_integer(payload: &Payload, key: &str) -> Option<i64> {
    payload.get(key).and_then(PayloadValue::as_integer)
}

/// Why `process` declined to produce a typed event (spec §4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingFailure {
    NullInput,
    Filtered,
    Unwatched,
    TagLookupMiss,
    ConversionFailed(String),
}

impl std::fmt::Display for ProcessingFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingFailure::NullInput => write!(f, "null input"),
            ProcessingFailure::Filtered => write!(f, "filtered by policy"),
            ProcessingFailure::Unwatched => write!(f, "process id is not watched"),
            ProcessingFailure::TagLookupMiss => write!(f, "tag lookup miss"),
            ProcessingFailure::ConversionFailed(reason) => {
                write!(f, "conversion failed: {reason}")
            }
        }
    }
}

/// Matches a single `*`-wildcard glob pattern against `text`, case-insensitively
/// (Windows paths are case-insensitive; spec §4.2 exclude-pattern policy).
#[must_use]
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let text = text.to_ascii_lowercase();
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    // dp[i][j] = pattern[..i] matches text[..j]
    let mut dp = vec![vec![false; t.len() + 1]; p.len() + 1];
    dp[0][0] = true;
    for i in 1..=p.len() {
        if p[i - 1] == '*' {
            dp[i][0] = dp[i - 1][0];
        }
    }
    for i in 1..=p.len() {
        for j in 1..=t.len() {
            dp[i][j] = if p[i - 1] == '*' {
                dp[i - 1][j] || dp[i][j - 1]
            } else {
                dp[i - 1][j - 1] && p[i - 1] == t[j - 1]
            };
        }
    }
    dp[p.len()][t.len()]
}

/// Configurable filter policy evaluated by [`EventProcessor::should_process`]
/// (spec §4.2, §6).
#[derive(Debug, Clone, Default)]
pub struct FilterPolicy {
    pub enabled_providers: Vec<String>,
    pub enabled_event_names: Vec<String>,
    pub exclude_system_processes: bool,
    pub min_process_id: i32,
    pub excluded_process_names: Vec<String>,
    pub include_file_extensions: Vec<String>,
    pub exclude_file_patterns: Vec<String>,
}

impl FilterPolicy {
    fn provider_allowed(&self, provider: &str) -> bool {
        self.enabled_providers.is_empty()
            || self.enabled_providers.iter().any(|p| p.eq_ignore_ascii_case(provider))
    }

    fn event_name_allowed(&self, event_name: &str) -> bool {
        self.enabled_event_names.is_empty()
            || self.enabled_event_names.iter().any(|e| e.eq_ignore_ascii_case(event_name))
    }

    /// Evaluates the file-path-specific checks (extension allow-list,
    /// exclude patterns with the watched-PID override). Bypassed entirely
    /// for non-file events (spec §4.2).
    fn file_path_allowed(&self, file_path: &str, watched: bool) -> bool {
        if !self.include_file_extensions.is_empty()
            && !self
                .include_file_extensions
                .iter()
                .any(|ext| file_path.to_ascii_lowercase().ends_with(&ext.to_ascii_lowercase()))
        {
            return false;
        }

        let excluded = self.exclude_file_patterns.iter().any(|pat| glob_match(pat, file_path));
        // Decided open question (see DESIGN.md): the watched-PID override is
        // evaluated after pattern exclusion and wins.
        if excluded && !watched {
            return false;
        }
        true
    }
}

/// Classifies/filters raw events and produces typed events, enrolling or
/// evicting watch targets as a side effect of process start/end events
/// (spec §4.2).
pub struct EventProcessor {
    policy: FilterPolicy,
    targets: Arc<WatchTargetManager>,
    validator: Arc<dyn ProcessValidator>,
}

impl EventProcessor {
    #[must_use]
    pub fn new(
        policy: FilterPolicy,
        targets: Arc<WatchTargetManager>,
        validator: Arc<dyn ProcessValidator>,
    ) -> Self {
        EventProcessor { policy, targets, validator }
    }

    /// Returns true iff `raw` should be converted into a typed event (spec
    /// §4.2). Does not mutate any state.
    #[must_use]
    pub fn should_process(&self, raw: &RawEvent) -> bool {
        if !self.policy.provider_allowed(&raw.provider_name) {
            return false;
        }
        if !self.policy.event_name_allowed(&raw.event_name) {
            return false;
        }
        if !self.targets.is_watched(raw.process_id) {
            return false;
        }
        if self.policy.exclude_system_processes && raw.process_id.0 < self.policy.min_process_id {
            return false;
        }
        if let Some(name) = self.validator.name_of(raw.process_id) {
            if self
                .policy
                .excluded_process_names
                .iter()
                .any(|excluded| excluded.eq_ignore_ascii_case(&name))
            {
                return false;
            }
        }
        if is_fileio_provider(&raw.provider_name) && !is_close_event(&raw.event_name) {
            if let Some(path) = resolve_file_path(raw) {
                let watched = self.targets.is_watched(raw.process_id);
                if !self.policy.file_path_allowed(&path, watched) {
                    return false;
                }
            }
        }
        true
    }

    /// Converts `raw` into a typed event, applying the watch-target
    /// side-effects (enroll child on start, evict on end) before returning
    /// (spec §4.2 "side-effect ordering").
    ///
    /// # Errors
    /// Returns a [`ProcessingFailure`] describing why no event was
    /// produced; per-event failures never poison the processor (spec §4.2,
    /// §7).
    pub fn process(&self, raw: &RawEvent) -> Result<TypedEvent, ProcessingFailure> {
        if !self.should_process(raw) {
            if !self.targets.is_watched(raw.process_id) {
                return Err(ProcessingFailure::Unwatched);
            }
            return Err(ProcessingFailure::Filtered);
        }

        let Some(tag) = self.targets.tag_of(raw.process_id) else {
            return Err(ProcessingFailure::TagLookupMiss);
        };

        if is_fileio_provider(&raw.provider_name) {
            return self.convert_file_event(raw, tag);
        }
        if is_process_provider(&raw.provider_name) {
            let lower = raw.event_name.to_ascii_lowercase();
            if lower.contains("start") {
                return self.convert_process_start(raw, tag);
            }
            if lower.contains("end") || lower.contains("stop") {
                return self.convert_process_end(raw, tag);
            }
        }

        Ok(TypedEvent::Generic { header: self.header(raw, tag) })
    }

    fn header(&self, raw: &RawEvent, tag: Tag) -> TypedEventHeader {
        TypedEventHeader {
            timestamp: raw.timestamp,
            tag,
            process_id: raw.process_id,
            thread_id: raw.thread_id,
            provider_name: raw.provider_name.clone(),
            event_name: raw.event_name.clone(),
            activity_id: raw.activity_id.clone(),
            related_activity_id: raw.related_activity_id.clone(),
            payload: raw.payload.clone(),
        }
    }

    fn convert_file_event(&self, raw: &RawEvent, tag: Tag) -> Result<TypedEvent, ProcessingFailure> {
        let file_path = match resolve_file_path(raw) {
            Some(path) => path,
            None if is_close_event(&raw.event_name) => {
                format!("<{}:PID{}>", raw.event_name, raw.process_id)
            }
            None => {
                return Err(ProcessingFailure::ConversionFailed(
                    "missing FileName/FilePath payload key".to_string(),
                ));
            }
        };
        Ok(TypedEvent::FileEvent { header: self.header(raw, tag), file_path })
    }

    fn convert_process_start(
        &self,
        raw: &RawEvent,
        tag: Tag,
    ) -> Result<TypedEvent, ProcessingFailure> {
        let Some(child_pid) = payload_integer(&raw.payload, "ProcessId") else {
            return Err(ProcessingFailure::ConversionFailed(
                "missing ProcessId payload key".to_string(),
            ));
        };
        let Some(child_name) = payload_string(&raw.payload, "ProcessName") else {
            return Err(ProcessingFailure::ConversionFailed(
                "missing ProcessName payload key".to_string(),
            ));
        };
        let child_pid = Pid(i32::try_from(child_pid).unwrap_or(i32::MAX));

        // Side effect happens before the typed event is returned (spec §4.2).
        self.targets.add_child(child_pid, raw.process_id);

        Ok(TypedEvent::ProcessStart {
            header: self.header(raw, tag),
            child_process_id: child_pid,
            child_process_name: child_name,
        })
    }

    fn convert_process_end(&self, raw: &RawEvent, tag: Tag) -> Result<TypedEvent, ProcessingFailure> {
        // Decided open question (see DESIGN.md): prefer ExitCode, fall back
        // to ExitStatus, default 0.
        let exit_code = payload_integer(&raw.payload, "ExitCode")
            .or_else(|| payload_integer(&raw.payload, "ExitStatus"))
            .unwrap_or(0);

        // Side effect happens before the typed event is returned (spec §4.2).
        self.targets.remove_by_pid(raw.process_id);

        Ok(TypedEvent::ProcessEnd { header: self.header(raw, tag), exit_code })
    }
}

fn resolve_file_path(raw: &RawEvent) -> Option<String> {
    payload_string(&raw.payload, "FilePath").or_else(|| payload_string(&raw.payload, "FileName"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process_validator::ProcessValidator;
    use chrono::Utc;
    use proctail_protocol::{Tid, Timestamp};
    use std::collections::HashMap;

    struct StubValidator;
    impl ProcessValidator for StubValidator {
        fn exists(&self, _pid: Pid) -> bool {
            true
        }
        fn name_of(&self, _pid: Pid) -> Option<String> {
            None
        }
        fn executable_path_of(&self, _pid: Pid) -> Option<String> {
            None
        }
    }

    fn raw(provider: &str, event_name: &str, pid: i32, payload: Payload) -> RawEvent {
        RawEvent {
            timestamp: Timestamp::from_datetime(Utc::now()),
            provider_name: provider.to_string(),
            event_name: event_name.to_string(),
            process_id: Pid(pid),
            thread_id: Tid(1),
            activity_id: String::new(),
            related_activity_id: String::new(),
            payload,
        }
    }

    fn processor() -> (EventProcessor, Arc<WatchTargetManager>) {
        let targets = Arc::new(WatchTargetManager::new());
        let processor = EventProcessor::new(
            FilterPolicy::default(),
            Arc::clone(&targets),
            Arc::new(StubValidator),
        );
        (processor, targets)
    }

    #[test]
    fn unwatched_pid_is_not_processed() {
        let (processor, _targets) = processor();
        let event = raw(FILEIO_PROVIDER, "FileIO/Create", 1234, HashMap::new());
        assert!(!processor.should_process(&event));
        assert_eq!(processor.process(&event).unwrap_err(), ProcessingFailure::Unwatched);
    }

    #[test]
    fn file_create_produces_file_event() {
        let (processor, targets) = processor();
        targets.add(Pid(1234), Tag::new("app").unwrap()).unwrap();
        let mut payload = HashMap::new();
        payload.insert("FileName".to_string(), PayloadValue::String("C:\\a.txt".to_string()));
        let event = raw(FILEIO_PROVIDER, "FileIO/Create", 1234, payload);

        let typed = processor.process(&event).unwrap();
        match typed {
            TypedEvent::FileEvent { file_path, .. } => assert_eq!(file_path, "C:\\a.txt"),
            other => panic!("expected FileEvent, got {other:?}"),
        }
    }

    #[test]
    fn close_event_without_path_synthesizes_sentinel() {
        let (processor, targets) = processor();
        targets.add(Pid(1234), Tag::new("app").unwrap()).unwrap();
        let event = raw(FILEIO_PROVIDER, "FileIO/Close", 1234, HashMap::new());
        let typed = processor.process(&event).unwrap();
        match typed {
            TypedEvent::FileEvent { file_path, .. } => {
                assert_eq!(file_path, "<FileIO/Close:PID1234>");
            }
            other => panic!("expected FileEvent, got {other:?}"),
        }
    }

    #[test]
    fn file_event_missing_path_fails_conversion() {
        let (processor, targets) = processor();
        targets.add(Pid(1234), Tag::new("app").unwrap()).unwrap();
        let event = raw(FILEIO_PROVIDER, "FileIO/Write", 1234, HashMap::new());
        assert!(matches!(
            processor.process(&event),
            Err(ProcessingFailure::ConversionFailed(_))
        ));
    }

    #[test]
    fn process_start_enrolls_child_before_returning() {
        let (processor, targets) = processor();
        targets.add(Pid(1000), Tag::new("parent").unwrap()).unwrap();
        let mut payload = HashMap::new();
        payload.insert("ProcessId".to_string(), PayloadValue::Integer(2000));
        payload.insert("ProcessName".to_string(), PayloadValue::String("child.exe".to_string()));
        let event = raw(PROCESS_PROVIDER, "Process/Start", 1000, payload);

        let typed = processor.process(&event).unwrap();
        assert!(matches!(typed, TypedEvent::ProcessStart { .. }));
        assert!(targets.is_watched(Pid(2000)));
        assert_eq!(targets.tag_of(Pid(2000)).unwrap().as_str(), "parent");
    }

    #[test]
    fn process_end_evicts_watch_target() {
        let (processor, targets) = processor();
        targets.add(Pid(1000), Tag::new("t").unwrap()).unwrap();
        let mut payload = HashMap::new();
        payload.insert("ExitCode".to_string(), PayloadValue::Integer(0));
        let event = raw(PROCESS_PROVIDER, "Process/End", 1000, payload);

        let typed = processor.process(&event).unwrap();
        assert!(matches!(typed, TypedEvent::ProcessEnd { exit_code: 0, .. }));
        assert!(!targets.is_watched(Pid(1000)));
    }

    #[test]
    fn exit_status_key_is_used_when_exit_code_absent() {
        let (processor, targets) = processor();
        targets.add(Pid(7), Tag::new("t").unwrap()).unwrap();
        let mut payload = HashMap::new();
        payload.insert("ExitStatus".to_string(), PayloadValue::Integer(42));
        let event = raw(PROCESS_PROVIDER, "Process/End", 7, payload);
        let typed = processor.process(&event).unwrap();
        assert!(matches!(typed, TypedEvent::ProcessEnd { exit_code: 42, .. }));
    }

    #[test]
    fn non_matching_provider_is_generic() {
        let (processor, targets) = processor();
        targets.add(Pid(1), Tag::new("t").unwrap()).unwrap();
        let event = raw("Some-Other-Provider", "SomeEvent", 1, HashMap::new());
        assert!(matches!(processor.process(&event).unwrap(), TypedEvent::Generic { .. }));
    }

    #[test]
    fn exclude_pattern_blocks_unwatched_override_path() {
        let targets = Arc::new(WatchTargetManager::new());
        targets.add(Pid(1), Tag::new("t").unwrap()).unwrap();
        let policy = FilterPolicy {
            exclude_file_patterns: vec!["*\\Temp\\*".to_string()],
            ..FilterPolicy::default()
        };
        let processor = EventProcessor::new(policy, Arc::clone(&targets), Arc::new(StubValidator));
        let mut payload = HashMap::new();
        payload.insert(
            "FileName".to_string(),
            PayloadValue::String("C:\\Temp\\test-process_output.txt".to_string()),
        );
        let event = raw(FILEIO_PROVIDER, "FileIO/Create", 1, payload);
        // PID 1 is a registered watch target, so the exclude pattern is
        // overridden and the event is still admitted (spec §4.2, §9).
        assert!(processor.should_process(&event));
    }

    #[test]
    fn glob_match_supports_star_wildcard() {
        assert!(glob_match("*\\temp\\*", "c:\\temp\\file.txt"));
        assert!(!glob_match("*\\temp\\*", "c:\\other\\file.txt"));
        assert!(glob_match("*.log", "app.log"));
        assert!(!glob_match("*.log", "app.txt"));
    }
}
