//! CLI argument definitions.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "proctaild",
    about = "Host-resident process-activity observer with a typed IPC query surface",
    after_help = "\
EXAMPLES:
    proctaild --socket-path /tmp/proctail.sock
    proctaild --config proctail.toml --quiet"
)]
pub struct Args {
    /// Path to a TOML configuration file. Missing fields take their
    /// documented default; a missing file falls back entirely to defaults.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the IPC endpoint's Unix domain socket.
    #[arg(long, value_name = "PATH", default_value = "/tmp/proctail.sock")]
    pub socket_path: PathBuf,

    /// Suppress non-essential startup output.
    #[arg(short, long)]
    pub quiet: bool,
}
