//! Per-message orchestration for the workflow trigger handler.
//!
//! This crate provides [`EventConsumer`], the [`workflows::MessageHandler`]
//! that turns one lifecycle event into zero or more workflow invocations,
//! [`WorkflowInvoker`], which starts one matched workflow, and
//! [`LogForwarder`], the fire-and-forget side channel to the logs exchange.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** The consumer sequences calls between the domain
//! rules in [`workflows`] and the ports ([`workflows::WorkflowApi`],
//! [`workflows::LogPublisher`]). It contains no transport code.
//!
//! ## Per-message flow
//!
//! ```text
//! decode body ──(malformed: empty event)──┐
//!   │                                     │
//! scope present? ──── no ─────────────────┤
//!   │ yes                                 │
//! lookup workflows ── error ──────────────┤
//!   │                                     │
//! for each workflow in order:             │
//!   matches? ── yes ── invoke (errors logged, never abort)
//!   │                                     │
//! acknowledge  <──────────────────────────┘   (exactly once)
//! ```

pub mod consumer;
pub mod forwarder;
pub mod invoker;

pub use consumer::{DispatchOutcome, EventConsumer};
pub use forwarder::{LogForwarder, LOGS_EXCHANGE};
pub use invoker::WorkflowInvoker;
