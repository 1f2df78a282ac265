//! Broker infrastructure for the workflow trigger handler.
//!
//! Implements the broker-facing ports of [`workflows`] over AMQP 0-9-1
//! (RabbitMQ) using `lapin`:
//!
//! - [`connection`]: bounded-retry bootstrap ([`connect_with_retry`]) and the
//!   background task that drains broker error notifications.
//! - [`consume`]: the single, sequential consumption loop that feeds every
//!   delivery to a [`workflows::MessageHandler`].
//! - [`amqp`]: the `lapin` adapters: connector, topology declaration,
//!   [`workflows::InboundMessage`] for deliveries, and
//!   [`workflows::LogPublisher`] for the forwarding side channel.
//!
//! ## Lifecycle
//!
//! ```text
//! BrokerConnection::establish ──retry──> connected
//!   ├─ error drain task (until close or shutdown)
//!   └─ subscribe(queue, handler) ── one delivery at a time ──> handler.handle
//! shutdown.cancel() ──> loop returns after the in-flight message
//! BrokerConnection::close ──> drain task joined, connection closed
//! ```
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport details, topology, and delivery decoding live
//! here. The `handler` crate sees only the [`workflows`] port traits.

pub mod amqp;
pub mod connection;
pub mod consume;

pub use amqp::{AmqpConnector, AmqpDelivery, AmqpPublisher, AmqpSession, BrokerConfig, BrokerConnection};
pub use connection::{connect_with_retry, spawn_error_drain, Connector, RetrySchedule};
pub use consume::consume;
