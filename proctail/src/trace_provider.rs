//! Trace-provider interface (spec §6) and a simulated reference
//! implementation.
//!
//! A real implementation backed by ETW (Windows) or an eBPF kernel probe
//! (Linux) is an external collaborator per spec §1 — this module defines
//! only the trait boundary plus the one concrete, fully-working instance
//! used for tests, demos, and `proctaild --simulate`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use proctail_protocol::RawEvent;

/// Delivers raw events (spec §3) from a kernel event-tracing facility.
///
/// `start`/`stop` must tolerate being called repeatedly and in either
/// order without corrupting state or losing previously stored events
/// (spec §8 "trace-session restart"); `subscribe` may only be called once
/// per provider instance.
pub trait TraceProvider: Send + Sync {
    /// Begins delivering events to the channel returned by `subscribe`.
    ///
    /// # Errors
    /// Returns an error if the underlying tracing facility cannot be
    /// started (spec §7 fatal-failure class).
    fn start(&self) -> anyhow::Result<()>;

    /// Stops delivering events. Idempotent.
    fn stop(&self);

    fn is_active(&self) -> bool;

    /// Takes the receiving half of this provider's event channel. Returns
    /// `None` if already taken.
    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<RawEvent>>;
}

/// A provider whose events are injected programmatically rather than
/// sourced from a real kernel facility. This is the reference
/// implementation exercised by the test suite and by `proctaild
/// --simulate`.
pub struct SimulatedTraceProvider {
    active: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<RawEvent>,
    rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<RawEvent>>>,
}

/// A cloneable handle used to feed events into a [`SimulatedTraceProvider`]
/// from test code or a demo data generator.
#[derive(Clone)]
pub struct SimulatedTraceProviderHandle {
    tx: mpsc::UnboundedSender<RawEvent>,
    active: Arc<AtomicBool>,
}

impl SimulatedTraceProviderHandle {
    /// Injects one raw event. Silently dropped if the provider has no
    /// remaining subscriber (mirrors a real provider whose consumer has
    /// gone away).
    pub fn emit(&self, event: RawEvent) {
        let _ = self.tx.send(event);
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl SimulatedTraceProvider {
    #[must_use]
    pub fn new() -> (Self, SimulatedTraceProviderHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let active = Arc::new(AtomicBool::new(false));
        let provider = SimulatedTraceProvider {
            active: Arc::clone(&active),
            tx: tx.clone(),
            rx: std::sync::Mutex::new(Some(rx)),
        };
        let handle = SimulatedTraceProviderHandle { tx, active };
        (provider, handle)
    }
}

impl Default for SimulatedTraceProvider {
    fn default() -> Self {
        Self::new().0
    }
}

impl TraceProvider for SimulatedTraceProvider {
    fn start(&self) -> anyhow::Result<()> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<RawEvent>> {
        self.rx.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proctail_protocol::{Pid, Tid, Timestamp};
    use std::collections::HashMap;

    fn sample_raw_event(pid: i32) -> RawEvent {
        RawEvent {
            timestamp: Timestamp::from_datetime(Utc::now()),
            provider_name: "Microsoft-Windows-Kernel-FileIO".to_string(),
            event_name: "FileIO/Create".to_string(),
            process_id: Pid(pid),
            thread_id: Tid(1),
            activity_id: String::new(),
            related_activity_id: String::new(),
            payload: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn start_stop_toggles_is_active() {
        let (provider, _handle) = SimulatedTraceProvider::new();
        assert!(!provider.is_active());
        provider.start().unwrap();
        assert!(provider.is_active());
        provider.stop();
        assert!(!provider.is_active());
    }

    #[tokio::test]
    async fn restart_does_not_lose_in_flight_subscription() {
        let (provider, handle) = SimulatedTraceProvider::new();
        let mut rx = provider.subscribe().unwrap();
        provider.start().unwrap();
        provider.stop();
        provider.start().unwrap();
        handle.emit(sample_raw_event(42));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.process_id, Pid(42));
    }

    #[test]
    fn subscribe_can_only_be_taken_once() {
        let (provider, _handle) = SimulatedTraceProvider::new();
        assert!(provider.subscribe().is_some());
        assert!(provider.subscribe().is_none());
    }

    #[test]
    fn handle_reflects_provider_activity() {
        let (provider, handle) = SimulatedTraceProvider::new();
        assert!(!handle.is_active());
        provider.start().unwrap();
        assert!(handle.is_active());
        provider.stop();
        assert!(!handle.is_active());
    }
}
