//! Rephrasing gRPC server
//!
//! Loads the paraphrase model synchronously, then serves the single
//! `Rephrase` RPC until an interrupt signal arrives.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::signal;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rephraser_core::{ModelConfig, Rephraser};

mod proto;
mod service;

use proto::rephraser_server::RephraserServer;
use service::RephraserService;

/// Run the rephrasing server.
#[derive(Parser, Debug)]
#[command(name = "rephraser-server", version, about = "Run the rephrasing server")]
struct Args {
    /// Model identifier on the HuggingFace Hub
    #[arg(short, long, default_value = "humarin/chatgpt_paraphraser_on_T5_base")]
    model: String,

    /// Local cache directory for downloaded model artifacts
    #[arg(short, long, default_value = "models")]
    path: PathBuf,

    /// Number of workers servicing generation requests in parallel
    #[arg(short = 'w', long = "max-workers", default_value_t = 4)]
    max_workers: usize,

    /// Address to bind the gRPC server to
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    address: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    if args.max_workers == 0 {
        anyhow::bail!("--max-workers must be at least 1");
    }

    let config = ModelConfig {
        model_id: args.model,
        cache_dir: args.path,
    };
    let model = Rephraser::load(&config)?;
    let servicer = RephraserService::new(model, args.max_workers);

    info!("serving on {}", args.address);
    Server::builder()
        .add_service(RephraserServer::new(servicer))
        .serve_with_shutdown(args.address, shutdown_signal())
        .await?;

    info!("Bye!");
    Ok(())
}

/// Resolve when the process should stop serving.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn cli_defaults() {
        let args = Args::try_parse_from(["rephraser-server"]).unwrap();
        assert_eq!(args.model, "humarin/chatgpt_paraphraser_on_T5_base");
        assert_eq!(args.path, PathBuf::from("models"));
        assert_eq!(args.max_workers, 4);
        assert_eq!(args.address, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn cli_short_flags() {
        let args = Args::try_parse_from([
            "rephraser-server",
            "-m",
            "some-org/some-model",
            "-p",
            "/tmp/cache",
            "-w",
            "8",
            "-a",
            "127.0.0.1:9090",
        ])
        .unwrap();
        assert_eq!(args.model, "some-org/some-model");
        assert_eq!(args.path, PathBuf::from("/tmp/cache"));
        assert_eq!(args.max_workers, 8);
        assert_eq!(args.address, "127.0.0.1:9090".parse::<SocketAddr>().unwrap());
    }
}
