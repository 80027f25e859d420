//! IPC dispatcher: request handling plus the framed socket endpoint
//! (spec §4.4).

pub mod handlers;
pub mod server;

pub use handlers::ServiceState;
pub use server::{PipeServer, ServerState};
