//! Debug adapter server entry point
//!
//! Listens for IDE connections and runs one independent debug session per
//! accepted socket. The process stays up across sessions; it only exits
//! on a signal or a fatal listener error.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "stepwise", about = "Domain-parametric debug adapter server")]
struct Cli {
    /// TCP port to listen on for debug protocol connections
    #[arg(long, value_parser = clap::value_parser!(u32).range(4000..=99_999))]
    port: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing();

    let addr = format!("127.0.0.1:{}", cli.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot listen on {addr}"))?;
    eprintln!("waiting for debug protocol at {}", listener.local_addr()?);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        info!(%peer, "accepted debug client");
                        tokio::spawn(stepwise_debug::session::run(stream));
                    }
                    Err(err) => {
                        error!(error = %err, "listener failed");
                        return Err(err).context("listener failed");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                return Ok(());
            }
        }
    }
}

/// Tracing goes to stderr so stdout stays clean; `RUST_LOG` overrides the
/// default level
fn setup_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
