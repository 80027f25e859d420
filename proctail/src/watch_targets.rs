//! Watch-target manager (spec §4.1).
//!
//! Maintains the PID→tag and tag→PID-set relations under concurrent
//! access. Backed by `DashMap` — the idiomatic Rust rendering of the
//! source's "shared mutable state via concurrent-dictionary" pattern
//! (spec §9): mutations are linearizable per key, and reads never block a
//! writer on an unrelated key.

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};

use proctail_protocol::{Pid, Tag};

use crate::domain::errors::ProcTailError;
use crate::domain::watch_target::WatchTarget;
use crate::process_validator::{exe_path_or_placeholder, name_or_placeholder, ProcessValidator};

/// Concurrent PID→tag / tag→PID-set watch-target registry.
#[derive(Default)]
pub struct WatchTargetManager {
    by_pid: DashMap<Pid, WatchTarget>,
    by_tag: DashMap<Tag, DashSet<Pid>>,
}

impl WatchTargetManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `pid` under `tag`.
    ///
    /// # Errors
    /// Returns [`ProcTailError::InvalidPid`] if `pid <= 0`, or
    /// [`ProcTailError::InvalidTag`] if `tag` is empty/whitespace-only.
    /// Returns `Ok(false)` without mutation if `pid` is already watched —
    /// this is reported to IPC callers as [`ProcTailError::AlreadyWatched`]
    /// by the caller, not from here, since `add` itself is also used
    /// internally where "already watched" isn't an error (spec §4.1).
    pub fn add(&self, pid: Pid, tag: Tag) -> Result<bool, ProcTailError> {
        if pid.0 <= 0 {
            return Err(ProcTailError::InvalidPid(pid.0));
        }
        match self.by_pid.entry(pid) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                entry.insert(WatchTarget::explicit(pid, tag.clone()));
                self.by_tag.entry(tag).or_default().insert(pid);
                Ok(true)
            }
        }
    }

    /// Enrolls `child_pid` under `parent_pid`'s tag, if `parent_pid` is
    /// currently watched. Idempotent with respect to an already-enrolled
    /// child PID (spec §4.1).
    pub fn add_child(&self, child_pid: Pid, parent_pid: Pid) -> bool {
        if self.by_pid.contains_key(&child_pid) {
            return false;
        }
        let Some(parent) = self.by_pid.get(&parent_pid) else {
            return false;
        };
        let tag = parent.tag.clone();
        drop(parent);

        let target = WatchTarget::child_of(child_pid, parent_pid, tag.clone());
        self.by_pid.insert(child_pid, target);
        self.by_tag.entry(tag).or_default().insert(child_pid);
        true
    }

    #[must_use]
    pub fn is_watched(&self, pid: Pid) -> bool {
        self.by_pid.contains_key(&pid)
    }

    #[must_use]
    pub fn tag_of(&self, pid: Pid) -> Option<Tag> {
        self.by_pid.get(&pid).map(|t| t.tag.clone())
    }

    /// Removes a single PID regardless of tag.
    pub fn remove_by_pid(&self, pid: Pid) -> bool {
        let Some((_, target)) = self.by_pid.remove(&pid) else {
            return false;
        };
        if let Some(set) = self.by_tag.get(&target.tag) {
            set.remove(&pid);
        }
        true
    }

    /// Removes every target with `tag`. Returns the number removed.
    /// Removing a non-existent tag returns `0` (spec §8).
    pub fn remove_by_tag(&self, tag: &Tag) -> usize {
        let Some((_, pids)) = self.by_tag.remove(tag) else {
            return 0;
        };
        let pids: Vec<Pid> = pids.iter().map(|r| *r).collect();
        let mut removed = 0;
        for pid in pids {
            if self.by_pid.remove(&pid).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Snapshot of current targets, independent of the live map.
    #[must_use]
    pub fn list_targets(&self) -> Vec<WatchTarget> {
        self.by_pid.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Same as [`Self::list_targets`], enriched with a best-effort process
    /// name / executable path lookup (spec §4.1).
    #[must_use]
    pub fn list_target_infos(
        &self,
        validator: &dyn ProcessValidator,
    ) -> Vec<proctail_protocol::request::WatchTargetInfo> {
        self.list_targets()
            .into_iter()
            .map(|target| proctail_protocol::request::WatchTargetInfo {
                process_id: target.process_id,
                process_name: name_or_placeholder(validator, target.process_id),
                executable_path: exe_path_or_placeholder(validator, target.process_id),
                start_time: target.registered_at,
                tag_name: target.tag.into_string(),
            })
            .collect()
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.by_pid.len()
    }
}
