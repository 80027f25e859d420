//! Length-framed JSON IPC endpoint over a Unix domain socket — the
//! host-local stand-in for the spec's Windows named pipe (spec §4.4, §6).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use proctail_protocol::ProtocolError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::handlers::ServiceState;

/// Coarse server lifecycle state, observable for status reporting
/// (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Starting,
    Running,
    Stopping,
    Stopped,
    /// Terminal state on an unrecoverable listener failure (spec §4.4).
    Error,
}

impl ServerState {
    fn from_code(code: u8) -> Self {
        match code {
            0 => ServerState::Starting,
            1 => ServerState::Running,
            2 => ServerState::Stopping,
            3 => ServerState::Stopped,
            _ => ServerState::Error,
        }
    }

    fn code(self) -> u8 {
        match self {
            ServerState::Starting => 0,
            ServerState::Running => 1,
            ServerState::Stopping => 2,
            ServerState::Stopped => 3,
            ServerState::Error => 4,
        }
    }
}

/// Reads one length-prefixed frame from an async stream.
async fn read_frame_async(stream: &mut UnixStream) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(len_buf);
    if len > proctail_protocol::framing::MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Writes one length-prefixed frame to an async stream.
async fn write_frame_async(stream: &mut UnixStream, payload: &[u8]) -> Result<(), ProtocolError> {
    let len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
    if len > proctail_protocol::framing::MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    stream.write_all(&len.to_le_bytes()).await?;
    stream.write_all(payload).await?;
    stream.flush().await?;
    Ok(())
}

/// The IPC endpoint: accepts connections up to `max_concurrent_connections`,
/// dispatches each framed request through [`ServiceState::handle`], and
/// drains outstanding connections on cancellation (spec §4.4, §5).
pub struct PipeServer {
    state: Arc<ServiceState>,
    socket_path: PathBuf,
    max_concurrent_connections: usize,
    connection_idle_timeout: Duration,
    response_timeout: Duration,
    server_state: Arc<AtomicU8>,
    /// Observers notified with `(previous, current)` on every state
    /// transition (spec §4.4 `StatusChanged`).
    observers: Mutex<Vec<Box<dyn Fn(ServerState, ServerState) + Send + Sync>>>,
}

impl PipeServer {
    #[must_use]
    pub fn new(
        state: Arc<ServiceState>,
        socket_path: impl Into<PathBuf>,
        max_concurrent_connections: usize,
        connection_idle_timeout: Duration,
        response_timeout: Duration,
    ) -> Self {
        PipeServer {
            state,
            socket_path: socket_path.into(),
            max_concurrent_connections,
            connection_idle_timeout,
            response_timeout,
            server_state: Arc::new(AtomicU8::new(ServerState::Starting.code())),
            observers: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn state(&self) -> ServerState {
        ServerState::from_code(self.server_state.load(Ordering::SeqCst))
    }

    /// Registers a callback invoked with `(previous, current)` on every
    /// subsequent state transition (spec §4.4 `StatusChanged`).
    pub fn on_state_changed(
        &self,
        observer: impl Fn(ServerState, ServerState) + Send + Sync + 'static,
    ) {
        self.observers.lock().unwrap_or_else(|e| e.into_inner()).push(Box::new(observer));
    }

    fn set_state(&self, state: ServerState) {
        let previous = ServerState::from_code(self.server_state.swap(state.code(), Ordering::SeqCst));
        if previous == state {
            return;
        }
        let observers = self.observers.lock().unwrap_or_else(|e| e.into_inner());
        for observer in observers.iter() {
            observer(previous, state);
        }
    }

    /// Binds the socket and serves connections until `shutdown` is
    /// cancelled, then drains in-flight connections and removes the socket
    /// file.
    ///
    /// # Errors
    /// Returns an error if the socket path cannot be bound.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }
        let listener = match UnixListener::bind(&self.socket_path) {
            Ok(listener) => listener,
            Err(e) => {
                self.set_state(ServerState::Error);
                return Err(e.into());
            }
        };
        if let Err(e) = restrict_permissions(&self.socket_path) {
            self.set_state(ServerState::Error);
            return Err(e.into());
        }
        self.set_state(ServerState::Running);
        info!("IPC endpoint listening on {}", self.socket_path.display());

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_connections));
        let mut connections = tokio::task::JoinSet::new();

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let permit = Arc::clone(&semaphore).try_acquire_owned();
                            let Ok(permit) = permit else {
                                warn!("rejecting connection: max_concurrent_connections reached");
                                drop(stream);
                                continue;
                            };
                            let state = Arc::clone(&self.state);
                            let idle_timeout = self.connection_idle_timeout;
                            let response_timeout = self.response_timeout;
                            connections.spawn(async move {
                                let _permit = permit;
                                serve_connection(stream, state, idle_timeout, response_timeout).await;
                            });
                        }
                        Err(e) => warn!("accept failed: {e}"),
                    }
                }
            }
        }

        self.set_state(ServerState::Stopping);
        info!("draining {} in-flight connection(s)", connections.len());
        while connections.join_next().await.is_some() {}

        let _ = std::fs::remove_file(&self.socket_path);
        self.set_state(ServerState::Stopped);
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

async fn serve_connection(
    mut stream: UnixStream,
    state: Arc<ServiceState>,
    idle_timeout: Duration,
    response_timeout: Duration,
) {
    loop {
        let frame = match timeout(idle_timeout, read_frame_async(&mut stream)).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(ProtocolError::ConnectionClosed)) => break,
            Ok(Err(e)) => {
                debug!("frame read error, closing connection: {e}");
                break;
            }
            Err(_) => {
                debug!("connection idle timeout reached, closing");
                break;
            }
        };

        let response = match serde_json::from_slice::<proctail_protocol::Request>(&frame) {
            Ok(request) => state.handle(request),
            Err(e) => proctail_protocol::Response::error(
                proctail_protocol::ErrorCode::InvalidRequest,
                format!("malformed request: {e}"),
            ),
        };

        let Ok(payload) = serde_json::to_vec(&response) else {
            warn!("failed to serialize response, closing connection");
            break;
        };
        if timeout(response_timeout, write_frame_async(&mut stream, &payload)).await.is_err() {
            debug!("response write timed out, closing connection");
            break;
        }
    }
}
