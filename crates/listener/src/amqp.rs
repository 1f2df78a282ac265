//! `lapin` adapters for the broker ports.

use async_trait::async_trait;
use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
    ConfirmSelectOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::uri::{AMQPAuthority, AMQPUri, AMQPUserInfo};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use workflows::{BrokerError, ConnectionError, InboundMessage, LogPublisher, MessageHandler};

use crate::connection::{connect_with_retry, spawn_error_drain, Connector, RetrySchedule};
use crate::consume::consume;

const CONSUMER_TAG: &str = "workflows-handler";

/// AMQP reply code for a normal close.
const REPLY_SUCCESS: u16 = 200;

/// Broker address, credentials, and topology.
#[derive(Clone)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub vhost: String,
    /// Queue events are consumed from.
    pub queue: String,
    /// Direct exchange the queue is bound to.
    pub exchange: String,
}

impl std::fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("vhost", &self.vhost)
            .field("queue", &self.queue)
            .field("exchange", &self.exchange)
            .finish()
    }
}

impl BrokerConfig {
    fn uri(&self) -> AMQPUri {
        AMQPUri {
            authority: AMQPAuthority {
                userinfo: AMQPUserInfo {
                    username: self.username.clone(),
                    password: self.password.clone(),
                },
                host: self.host.clone(),
                port: self.port,
            },
            vhost: self.vhost.clone(),
            ..AMQPUri::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Connecting
// ---------------------------------------------------------------------------

/// An open connection with its consuming and publishing channels.
pub struct AmqpSession {
    connection: Connection,
    consume_channel: Channel,
    publish_channel: Channel,
}

/// Opens a connection, declares topology, and opens both channels.
///
/// Everything up to a usable consuming channel counts as one attempt, so a
/// topology failure is retried the same way as a refused connection.
pub struct AmqpConnector {
    config: BrokerConfig,
}

impl AmqpConnector {
    pub fn new(config: BrokerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for AmqpConnector {
    type Connection = AmqpSession;

    async fn connect(&self) -> Result<AmqpSession, BrokerError> {
        let config = &self.config;
        let connection = Connection::connect_uri(config.uri(), ConnectionProperties::default())
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))?;

        let channel_error = |e: lapin::Error| BrokerError::Channel(e.to_string());

        let consume_channel = connection.create_channel().await.map_err(channel_error)?;
        consume_channel
            .exchange_declare(
                &config.exchange,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(channel_error)?;
        consume_channel
            .queue_declare(
                &config.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(channel_error)?;
        consume_channel
            .queue_bind(
                &config.queue,
                &config.exchange,
                "",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(channel_error)?;
        // One unacknowledged message at a time.
        consume_channel
            .basic_qos(1, BasicQosOptions::default())
            .await
            .map_err(channel_error)?;

        // Publishing to a missing exchange closes the channel, so forwarding
        // gets its own.
        let publish_channel = connection.create_channel().await.map_err(channel_error)?;
        publish_channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(channel_error)?;

        Ok(AmqpSession {
            connection,
            consume_channel,
            publish_channel,
        })
    }
}

/// The process's single broker connection.
///
/// Owns the background error drain; both stop when [`BrokerConnection::close`]
/// is called or the shutdown token passed to
/// [`BrokerConnection::establish`] is cancelled.
pub struct BrokerConnection {
    session: AmqpSession,
    lifetime: CancellationToken,
    drain: JoinHandle<()>,
}

impl BrokerConnection {
    /// Connects with bounded retry and starts the error drain.
    pub async fn establish(
        config: &BrokerConfig,
        schedule: RetrySchedule,
        shutdown: &CancellationToken,
    ) -> Result<Self, ConnectionError> {
        info!(
            host = %config.host,
            port = config.port,
            max_attempts = schedule.max_attempts,
            "Connecting to message queue"
        );
        let session = connect_with_retry(&AmqpConnector::new(config.clone()), schedule, shutdown).await?;

        let lifetime = shutdown.child_token();
        let (errors, receiver) = mpsc::unbounded_channel::<lapin::Error>();
        session.connection.on_error(move |e| {
            let _ = errors.send(e);
        });
        let drain = spawn_error_drain(receiver, lifetime.clone());

        Ok(Self {
            session,
            lifetime,
            drain,
        })
    }

    /// Consumes `queue`, passing each delivery to `handler` until `shutdown`
    /// is cancelled or the broker stops delivering.
    pub async fn subscribe(
        &self,
        queue: &str,
        handler: &dyn MessageHandler,
        shutdown: &CancellationToken,
    ) -> Result<(), BrokerError> {
        let consumer = self
            .session
            .consume_channel
            .basic_consume(
                queue,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Consume(format!("failed to set handler on '{queue}': {e}")))?;

        info!(queue, "Listening for messages");
        consume(consumer.map(|delivery| delivery.map(AmqpDelivery)), handler, shutdown).await
    }

    /// A publisher sharing this connection.
    pub fn publisher(&self) -> AmqpPublisher {
        AmqpPublisher {
            channel: self.session.publish_channel.clone(),
        }
    }

    /// Stops the error drain and closes the connection.
    pub async fn close(self) {
        self.lifetime.cancel();
        if let Err(e) = self.session.connection.close(REPLY_SUCCESS, "shutdown").await {
            debug!(error = %e, "Error while closing message queue connection");
        }
        if let Err(e) = self.drain.await {
            warn!(error = %e, "Message queue error drain did not stop cleanly");
        }
        info!("Message queue connection closed");
    }
}

// ---------------------------------------------------------------------------
// Deliveries and publishing
// ---------------------------------------------------------------------------

/// A delivery from the consumed queue.
pub struct AmqpDelivery(Delivery);

#[async_trait]
impl InboundMessage for AmqpDelivery {
    fn body(&self) -> &[u8] {
        &self.0.data
    }

    async fn ack(&self) -> Result<(), BrokerError> {
        self.0
            .acker
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| BrokerError::Ack(e.to_string()))
    }
}

/// Publishes JSON payloads to an exchange with an empty routing key.
#[derive(Clone)]
pub struct AmqpPublisher {
    channel: Channel,
}

#[async_trait]
impl LogPublisher for AmqpPublisher {
    async fn publish(&self, destination: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
        let publish_error = |e: lapin::Error| BrokerError::Publish {
            destination: destination.to_string(),
            reason: e.to_string(),
        };

        let confirmation = self
            .channel
            .basic_publish(
                destination,
                "",
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_content_type("application/json".into()),
            )
            .await
            .map_err(publish_error)?
            .await
            .map_err(publish_error)?;
        check_confirmation(destination, &confirmation)
    }
}

/// The publish channel runs in confirm mode; a nack means the broker dropped
/// the message.
fn check_confirmation(destination: &str, confirmation: &Confirmation) -> Result<(), BrokerError> {
    if confirmation.is_nack() {
        return Err(BrokerError::Publish {
            destination: destination.to_string(),
            reason: "broker did not accept the message".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BrokerConfig {
        BrokerConfig {
            host: "broker".to_string(),
            port: 5672,
            username: "guest".to_string(),
            password: "p@ss/word".to_string(),
            vhost: "/".to_string(),
            queue: "lagoon-actions:items".to_string(),
            exchange: "lagoon-actions".to_string(),
        }
    }

    #[test]
    fn test_uri_carries_credentials_without_encoding() {
        let uri = config().uri();
        assert_eq!(uri.authority.host, "broker");
        assert_eq!(uri.authority.port, 5672);
        assert_eq!(uri.authority.userinfo.username, "guest");
        assert_eq!(uri.authority.userinfo.password, "p@ss/word");
        assert_eq!(uri.vhost, "/");
    }

    #[test]
    fn test_nack_is_a_publish_error() {
        let result = check_confirmation("lagoon-logs", &Confirmation::Nack(None));
        assert!(matches!(
            result,
            Err(BrokerError::Publish { destination, .. }) if destination == "lagoon-logs"
        ));
        assert!(check_confirmation("lagoon-logs", &Confirmation::Ack(None)).is_ok());
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("p@ss/word"));
        assert!(rendered.contains("<redacted>"));
    }
}
