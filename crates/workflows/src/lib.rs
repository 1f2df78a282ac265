//! Core domain for the workflow trigger handler.
//!
//! This crate contains every domain concept the handler works with: the
//! lifecycle log events consumed from the broker, the workflows fetched from
//! the remote API, the rule that decides whether one fires for the other, and
//! the error taxonomy shared by all infrastructure crates.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed ([`WorkflowApi`], [`InboundMessage`],
//! [`MessageHandler`], [`LogPublisher`]); infrastructure crates define *how*
//! to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`ProjectId`, `EnvironmentId`, etc.) |
//! | [`types`] | Wire event model and workflow value types |
//! | [`matcher`] | Event-type to trigger-specification matching |
//! | [`lenient`] | Null- and type-tolerant serde field helpers |
//! | [`errors`] | Broker, connection, credential, and API error types |
//! | [`ports`] | Async traits implemented by infrastructure crates |

pub mod errors;
pub mod identifiers;
pub mod lenient;
pub mod matcher;
pub mod ports;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{ApiError, BrokerError, ConnectionError, CredentialError};
pub use identifiers::{AdvancedTaskId, EnvironmentId, EnvironmentName, ProjectId, TaskId};
pub use matcher::{EventMatcher, MatchStrategy};
pub use ports::{InboundMessage, LogPublisher, MessageHandler, WorkflowApi};
pub use types::{EventMetadata, IncomingEvent, TaskInvocation, TriggerSpec, Workflow, WorkflowScope};
