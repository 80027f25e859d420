//! The watch target record (spec §3).

use proctail_protocol::{Pid, Tag, Timestamp};

/// A single PID registered under a tag, with descendant-enrollment
/// provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchTarget {
    pub process_id: Pid,
    pub tag: Tag,
    pub registered_at: Timestamp,
    pub is_child: bool,
    pub parent_process_id: Option<Pid>,
}

impl WatchTarget {
    /// Builds a target registered directly via an explicit `add`.
    #[must_use]
    pub fn explicit(process_id: Pid, tag: Tag) -> Self {
        WatchTarget {
            process_id,
            tag,
            registered_at: Timestamp::now(),
            is_child: false,
            parent_process_id: None,
        }
    }

    /// Builds a target auto-enrolled from a parent's process-start event.
    #[must_use]
    pub fn child_of(process_id: Pid, parent_process_id: Pid, tag: Tag) -> Self {
        WatchTarget {
            process_id,
            tag,
            registered_at: Timestamp::now(),
            is_child: true,
            parent_process_id: Some(parent_process_id),
        }
    }
}
