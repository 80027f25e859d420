//! Wires the watch-target manager, event storage, event processor, trace
//! provider, and IPC endpoint together, and owns graceful shutdown
//! (spec §5, §6).

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::ipc::{PipeServer, ServiceState};
use crate::process_validator::ProcfsValidator;
use crate::processor::EventProcessor;
use crate::storage::EventStorage;
use crate::trace_provider::{SimulatedTraceProvider, SimulatedTraceProviderHandle, TraceProvider};
use crate::watch_targets::WatchTargetManager;

/// Owns every long-lived component and the shutdown signal that tears them
/// down together.
pub struct Orchestrator {
    config: Config,
    socket_path: std::path::PathBuf,
    targets: Arc<WatchTargetManager>,
    storage: Arc<EventStorage>,
    processor: Arc<EventProcessor>,
    trace_provider: Arc<dyn TraceProvider>,
    shutdown: CancellationToken,
}

impl Orchestrator {
    /// Builds an orchestrator backed by the simulated trace provider,
    /// returning a handle the caller can use to inject synthetic events
    /// (spec §6 — no real ETW/eBPF backend is in scope here).
    #[must_use]
    pub fn new(config: Config, socket_path: std::path::PathBuf) -> (Self, SimulatedTraceProviderHandle) {
        let targets = Arc::new(WatchTargetManager::new());
        let storage = Arc::new(EventStorage::new(config.max_events_per_tag));
        let validator = Arc::new(ProcfsValidator::new());
        let (provider, handle) = SimulatedTraceProvider::new();
        let trace_provider: Arc<dyn TraceProvider> = Arc::new(provider);

        let processor = Arc::new(EventProcessor::new(
            config.filter_policy(),
            Arc::clone(&targets),
            validator,
        ));

        let orchestrator = Orchestrator {
            config,
            socket_path,
            targets,
            storage,
            processor,
            trace_provider,
            shutdown: CancellationToken::new(),
        };
        (orchestrator, handle)
    }

    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Starts the trace provider, the raw-event consumer, and the IPC
    /// endpoint, and runs until `shutdown_token()` is cancelled.
    ///
    /// # Errors
    /// Returns an error if the trace provider fails to start or the IPC
    /// socket cannot be bound.
    pub async fn run(&self) -> anyhow::Result<()> {
        self.trace_provider.start()?;
        let mut raw_rx = self
            .trace_provider
            .subscribe()
            .ok_or_else(|| anyhow::anyhow!("trace provider subscription already taken"))?;

        let processor = Arc::clone(&self.processor);
        let storage = Arc::clone(&self.storage);
        let consumer_shutdown = self.shutdown.clone();
        let consumer = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = consumer_shutdown.cancelled() => break,
                    raw = raw_rx.recv() => {
                        let Some(raw) = raw else { break };
                        match processor.process(&raw) {
                            Ok(typed) => {
                                let tag = typed.tag().clone();
                                storage.append(&tag, typed);
                            }
                            Err(reason) => {
                                // Per-event failures are isolated; the stream
                                // keeps flowing (spec §7).
                                log::debug!("dropping event: {reason}");
                            }
                        }
                    }
                }
            }
        });

        let validator = Arc::new(ProcfsValidator::new());
        let service_state = Arc::new(ServiceState {
            targets: Arc::clone(&self.targets),
            storage: Arc::clone(&self.storage),
            validator,
            trace_provider: Arc::clone(&self.trace_provider),
            shutdown: self.shutdown.clone(),
        });

        let server = PipeServer::new(
            service_state,
            self.socket_path.clone(),
            self.config.max_concurrent_connections,
            Duration::from_secs(self.config.connection_timeout_seconds),
            Duration::from_secs(self.config.response_timeout_seconds),
        );

        let result = server.run(self.shutdown.clone()).await;

        self.shutdown.cancel();
        self.trace_provider.stop();
        if let Err(e) = consumer.await {
            warn!("raw-event consumer task panicked: {e}");
        }
        info!("orchestrator shut down");
        result
    }
}
