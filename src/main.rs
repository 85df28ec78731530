//! `numwire` binary: receive framed numeric sequences and print them.
//!
//! Runs until SIGINT or SIGTERM, then closes the listener and live sessions.

mod cli;

use std::{net::SocketAddr, process::ExitCode};

use clap::Parser;
use numwire::{config::ServerConfig, server::Server, sink::StdoutSink};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = cli::Cli::parse();
    let config = ServerConfig {
        max_connections: cli.max_connections,
        max_connection_seconds: cli.max_connection_seconds,
        max_read_wait_seconds: cli.max_read_wait_seconds,
        buffer_size_kb: cli.buffer_size_kb,
        port: cli.port,
    };

    if let Some(addr) = cli.metrics_listen
        && let Err(e) = install_metrics_exporter(addr)
    {
        error!(error = %e, %addr, "could not install metrics exporter");
        return ExitCode::FAILURE;
    }

    let mut server = Server::new(config, StdoutSink::new());
    if let Some(bytes) = cli.payload_limit {
        server = server.payload_limit(bytes);
    }
    let server = match server.bind() {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, port = config.port, "could not start server");
            return ExitCode::FAILURE;
        }
    };

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "metrics")]
fn install_metrics_exporter(
    addr: SocketAddr,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!(%addr, "serving metrics");
    Ok(())
}

/// `--metrics-listen` was given to a binary built without the `metrics` feature.
#[cfg(not(feature = "metrics"))]
#[derive(Debug, thiserror::Error)]
#[error("metrics support was not compiled in")]
struct MetricsDisabled;

#[cfg(not(feature = "metrics"))]
fn install_metrics_exporter(_addr: SocketAddr) -> Result<(), MetricsDisabled> { Err(MetricsDisabled) }

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, SocketAddr};

    use super::install_metrics_exporter;

    fn loopback() -> SocketAddr { SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0) }

    #[cfg(feature = "metrics")]
    #[tokio::test]
    async fn second_exporter_install_reports_build_error() {
        install_metrics_exporter(loopback()).expect("first install");
        let err = install_metrics_exporter(loopback()).expect_err("recorder already installed");
        assert!(matches!(
            err,
            metrics_exporter_prometheus::BuildError::FailedToSetGlobalRecorder(_)
        ));
    }

    #[cfg(not(feature = "metrics"))]
    #[test]
    fn exporter_install_fails_without_metrics_support() {
        let err = install_metrics_exporter(loopback()).expect_err("metrics disabled");
        assert_eq!(err.to_string(), "metrics support was not compiled in");
    }
}
