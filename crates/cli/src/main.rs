//! Workflows handler entry point.
//!
//! This binary is the composition root:
//!
//! 1. **Parse configuration** from flags and environment ([`config::CliConfig`]).
//! 2. **Wire observability**: `tracing-subscriber` with a JSON or pretty layer,
//!    plus an OpenTelemetry OTLP exporter when an endpoint is configured.
//! 3. **Connect** to the message queue with bounded retry. Running out of
//!    attempts ends the process with a non-zero exit code.
//! 4. **Construct** the authenticated API client and the event consumer and
//!    run the consumption loop until SIGINT or SIGTERM.

mod config;
mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use api_client::ApiClient;
use clap::Parser;
use handler::{EventConsumer, LogForwarder};
use listener::BrokerConnection;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use workflows::{ConnectionError, EventMatcher, MatchStrategy, WorkflowApi};

use crate::config::CliConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    let telemetry = telemetry::init(&config)?;

    let result = run(config).await;
    if let Err(e) = &result {
        error!(error = %format!("{e:#}"), "Workflows handler stopped");
    }

    telemetry.shutdown();
    result
}

async fn run(config: CliConfig) -> anyhow::Result<()> {
    config.validate()?;

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    let api: Arc<dyn WorkflowApi> = Arc::new(
        ApiClient::from_config(config.api_config()).context("failed to build API client")?,
    );

    let connection = match BrokerConnection::establish(
        &config.broker_config(),
        config.retry_schedule(),
        &shutdown,
    )
    .await
    {
        Ok(connection) => connection,
        Err(ConnectionError::Cancelled { attempts }) => {
            info!(attempts, "Shutdown requested before the message queue was reachable");
            return Ok(());
        }
        Err(e) => return Err(e).context("message queue is unavailable"),
    };

    let mut consumer = EventConsumer::new(api, EventMatcher::new(MatchStrategy::Exact));
    if config.forward_invocation_logs {
        consumer = consumer.with_invocation_logs(LogForwarder::new(Arc::new(connection.publisher())));
    }

    info!(
        queue = %config.rabbitmq_queue,
        forward_invocation_logs = config.forward_invocation_logs,
        "Workflows handler started"
    );
    let result = connection
        .subscribe(&config.rabbitmq_queue, &consumer, &shutdown)
        .await;

    shutdown.cancel();
    connection.close().await;
    result.context("message consumption stopped")
}

fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received");
        shutdown.cancel();
    });
}

async fn wait_for_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }
}
