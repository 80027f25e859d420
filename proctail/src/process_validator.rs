//! Process-validator interface (spec §6) and a real `/proc`-backed
//! implementation, grounded in the teacher's `/proc` process lookup.

use proctail_protocol::Pid;

/// Answers "does this process still exist, and what is it called" without
/// touching its memory or injecting into it (spec §1 non-goals).
///
/// Implementations may return `"[Terminated]"` (or simply `None`) when the
/// process is gone rather than erroring — lookups here are best-effort by
/// design (spec §6).
pub trait ProcessValidator: Send + Sync {
    fn exists(&self, pid: Pid) -> bool;
    fn name_of(&self, pid: Pid) -> Option<String>;
    fn executable_path_of(&self, pid: Pid) -> Option<String>;
}

/// The sentinel name/path used when a lookup fails because the process has
/// already exited (spec §4.1, §6).
pub const TERMINATED_PLACEHOLDER: &str = "[Terminated]";

/// A `/proc`-backed [`ProcessValidator`] for Linux hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcfsValidator;

impl ProcfsValidator {
    #[must_use]
    pub fn new() -> Self {
        ProcfsValidator
    }

    fn read_comm(pid: Pid) -> Option<String> {
        let path = format!("/proc/{}/comm", pid.0);
        std::fs::read_to_string(path).ok().map(|s| s.trim().to_string())
    }

    fn read_exe(pid: Pid) -> Option<String> {
        let path = format!("/proc/{}/exe", pid.0);
        std::fs::read_link(path).ok().map(|p| p.to_string_lossy().into_owned())
    }
}

impl ProcessValidator for ProcfsValidator {
    fn exists(&self, pid: Pid) -> bool {
        std::path::Path::new(&format!("/proc/{}", pid.0)).exists()
    }

    fn name_of(&self, pid: Pid) -> Option<String> {
        Self::read_comm(pid)
    }

    fn executable_path_of(&self, pid: Pid) -> Option<String> {
        Self::read_exe(pid)
    }
}

/// Looks up a process's name via `validator`, falling back to the
/// `"[Terminated]"` placeholder on failure (spec §4.1).
#[must_use]
pub fn name_or_placeholder(validator: &dyn ProcessValidator, pid: Pid) -> String {
    validator.name_of(pid).unwrap_or_else(|| TERMINATED_PLACEHOLDER.to_string())
}

/// Looks up a process's executable path via `validator`, falling back to
/// the `"[Terminated]"` placeholder on failure (spec §4.1).
#[must_use]
pub fn exe_path_or_placeholder(validator: &dyn ProcessValidator, pid: Pid) -> String {
    validator.executable_path_of(pid).unwrap_or_else(|| TERMINATED_PLACEHOLDER.to_string())
}
