use axum::Router;
use axum_helpers::server::{create_app, create_router};
use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use grpc_server::{GrpcServer, run_grpc_server};
use lifecycle::{LifecycleHandle, ListenerHandle, ServeResult, TerminationSource};
use std::process::ExitCode;
use tracing::{error, info};

mod config;

use config::{Config, Environment};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run a service until SIGINT/SIGTERM, then shut it down gracefully"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Serve the HTTP status endpoints under HTTP_BASE_PATH
    Http,
    /// Serve gRPC health checks and reflection
    Grpc,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    let args = Args::parse();
    init_tracing(&Environment::from_env(), env!("CARGO_PKG_NAME"));

    match run(args.command).await {
        Ok(()) => {
            info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(report) => {
            error!(error = ?report, "Exiting with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> eyre::Result<()> {
    let config = Config::from_env()?;
    info!(
        name = config.app.name,
        version = config.app.version,
        committish = config.app.committish,
        ?command,
        "Starting"
    );

    // A second SIGINT/SIGTERM while this is installed exits immediately.
    let termination = TerminationSource::install(&LifecycleHandle::new())?;

    match command {
        Command::Http => serve_http(&config, termination.handle()).await?,
        Command::Grpc => serve_grpc(&config, termination.handle()).await?,
    }
    Ok(())
}

async fn serve_http(config: &Config, handle: &LifecycleHandle) -> ServeResult {
    let router = create_router(&config.server.base_path, config.app, Router::new());
    create_app(router, &config.server, handle).await
}

async fn serve_grpc(config: &Config, handle: &LifecycleHandle) -> ServeResult {
    let listener = ListenerHandle::bind(config.grpc.addr_string()).await?;
    let server = GrpcServer::new(config.grpc.clone());

    run_grpc_server(handle, server, listener)
        .await
        .inspect_err(|e| error!(error = %e, kind = ?e.kind(), "gRPC server encountered an error"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let args = Args::try_parse_from(["scaffold", "http"]).unwrap();
        assert!(matches!(args.command, Command::Http));

        let args = Args::try_parse_from(["scaffold", "grpc"]).unwrap();
        assert!(matches!(args.command, Command::Grpc));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Args::try_parse_from(["scaffold"]).is_err());
        assert!(Args::try_parse_from(["scaffold", "ftp"]).is_err());
    }
}
