use anyhow::Result;
use clap::Parser;
use log::info;

use proctail::cli::Args;
use proctail::Config;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load_or_default(path)?,
        None => Config::default(),
    };

    if !args.quiet {
        println!("proctaild starting");
        println!("  socket: {}", args.socket_path.display());
    }

    let (orchestrator, _trace_handle) = proctail::Orchestrator::new(config, args.socket_path);
    let shutdown = orchestrator.shutdown_token();
    let run_handle = tokio::spawn(async move { orchestrator.run().await });

    tokio::signal::ctrl_c().await?;
    info!("received Ctrl+C, shutting down");
    shutdown.cancel();

    run_handle.await??;
    Ok(())
}
