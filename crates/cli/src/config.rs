//! Command-line and environment configuration.
//!
//! Every option can be set by flag or by environment variable. The values are
//! converted here into the per-crate configuration types; library crates never
//! read the environment themselves.

use anyhow::bail;
use api_client::{ApiConfig, CredentialConfig};
use clap::{Parser, ValueEnum};
use listener::{BrokerConfig, RetrySchedule};

/// Output format of the log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable, multi-line output for local runs.
    Pretty,
}

/// Consumes lifecycle events and starts the workflows registered for them.
#[derive(Parser)]
#[command(name = "workflows-handler", version, about)]
pub struct CliConfig {
    #[arg(long, env = "RABBITMQ_ADDRESS", default_value = "localhost")]
    pub rabbitmq_host: String,

    #[arg(long, env = "RABBITMQ_PORT", default_value_t = 5672)]
    pub rabbitmq_port: u16,

    #[arg(long, env = "RABBITMQ_USERNAME", default_value = "guest")]
    pub rabbitmq_username: String,

    #[arg(long, env = "RABBITMQ_PASSWORD", default_value = "guest", hide_env_values = true)]
    pub rabbitmq_password: String,

    #[arg(long, env = "RABBITMQ_VHOST", default_value = "/")]
    pub rabbitmq_vhost: String,

    /// Queue lifecycle events are consumed from.
    #[arg(long, env = "RABBITMQ_QUEUE", default_value = "lagoon-actions:items")]
    pub rabbitmq_queue: String,

    /// Direct exchange the queue is bound to.
    #[arg(long, env = "RABBITMQ_EXCHANGE", default_value = "lagoon-actions")]
    pub rabbitmq_exchange: String,

    #[arg(long, env = "GRAPHQL_ENDPOINT", default_value = "http://localhost:3000/graphql")]
    pub graphql_endpoint: String,

    /// HS256 key used to sign the per-call API credential.
    #[arg(long, env = "JWTSECRET", hide_env_values = true)]
    pub jwt_token_signing_key: String,

    #[arg(long, env = "JWTAUDIENCE", default_value = "api.dev")]
    pub jwt_audience: String,

    #[arg(long, env = "JWTSUBJECT", default_value = "actions-handler")]
    pub jwt_subject: String,

    #[arg(long, env = "JWTISSUER", default_value = "actions-handler")]
    pub jwt_issuer: String,

    /// Connection attempts before giving up at startup.
    #[arg(long, env = "STARTUP_CONNECTION_ATTEMPTS", default_value_t = 10)]
    pub startup_connection_attempts: u32,

    /// Seconds to wait between failed connection attempts.
    #[arg(long, env = "STARTUP_CONNECTION_INTERVAL_SECONDS", default_value_t = 30)]
    pub startup_connection_interval_seconds: u64,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, env = "ENABLE_DEBUG")]
    pub debug: bool,

    /// Publish a log entry for every workflow invocation.
    #[arg(long, env = "FORWARD_INVOCATION_LOGS")]
    pub forward_invocation_logs: bool,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// OTLP gRPC endpoint for span export. Spans are not exported when unset.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl CliConfig {
    /// Rejects values that parse but cannot work.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.startup_connection_attempts == 0 {
            bail!("--startup-connection-attempts must be at least 1");
        }
        if self.jwt_token_signing_key.is_empty() {
            bail!("--jwt-token-signing-key must not be empty");
        }
        if self.rabbitmq_queue.is_empty() {
            bail!("--rabbitmq-queue must not be empty");
        }
        Ok(())
    }

    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            host: self.rabbitmq_host.clone(),
            port: self.rabbitmq_port,
            username: self.rabbitmq_username.clone(),
            password: self.rabbitmq_password.clone(),
            vhost: self.rabbitmq_vhost.clone(),
            queue: self.rabbitmq_queue.clone(),
            exchange: self.rabbitmq_exchange.clone(),
        }
    }

    pub fn retry_schedule(&self) -> RetrySchedule {
        RetrySchedule::new(
            self.startup_connection_attempts,
            self.startup_connection_interval_seconds,
        )
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            endpoint: self.graphql_endpoint.clone(),
            credentials: CredentialConfig {
                signing_key: self.jwt_token_signing_key.clone(),
                audience: self.jwt_audience.clone(),
                subject: self.jwt_subject.clone(),
                issuer: self.jwt_issuer.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn parse(extra: &[&str]) -> CliConfig {
        let mut args = vec!["workflows-handler", "--jwt-token-signing-key", "s3cret"];
        args.extend_from_slice(extra);
        CliConfig::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--rabbitmq-host",
            "broker",
            "--rabbitmq-port",
            "5673",
            "--rabbitmq-queue",
            "events",
            "--startup-connection-attempts",
            "3",
            "--startup-connection-interval-seconds",
            "5",
            "--jwt-audience",
            "api.prod",
            "--log-format",
            "pretty",
            "--forward-invocation-logs",
        ]);

        let broker = config.broker_config();
        assert_eq!(broker.host, "broker");
        assert_eq!(broker.port, 5673);
        assert_eq!(broker.queue, "events");

        let schedule = config.retry_schedule();
        assert_eq!(schedule.max_attempts, 3);
        assert_eq!(schedule.interval, Duration::from_secs(5));

        assert_eq!(config.api_config().credentials.audience, "api.prod");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.forward_invocation_logs);
    }

    #[test]
    fn test_credentials_are_copied_into_api_config() {
        let config = parse(&["--jwt-subject", "handler", "--jwt-issuer", "issuer"]);
        let api = config.api_config();

        assert_eq!(api.credentials.signing_key, "s3cret");
        assert_eq!(api.credentials.subject, "handler");
        assert_eq!(api.credentials.issuer, "issuer");
    }

    #[test]
    fn test_zero_attempts_is_rejected() {
        let config = parse(&["--startup-connection-attempts", "0"]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("startup-connection-attempts"));
    }

    #[test]
    fn test_empty_signing_key_is_rejected() {
        let config = CliConfig::try_parse_from(["workflows-handler", "--jwt-token-signing-key", ""]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_log_format_fails_to_parse() {
        let result = CliConfig::try_parse_from([
            "workflows-handler",
            "--jwt-token-signing-key",
            "k",
            "--log-format",
            "xml",
        ]);
        assert!(result.is_err());
    }
}
