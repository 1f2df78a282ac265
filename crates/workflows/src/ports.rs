//! Port traits implemented by infrastructure crates.
//!
//! The orchestration code in `handler` depends only on these traits. The
//! `api-client` crate implements [`WorkflowApi`]; the `listener` crate
//! implements [`InboundMessage`] and [`LogPublisher`] over AMQP and drives a
//! [`MessageHandler`].

use async_trait::async_trait;

use crate::{
    AdvancedTaskId, ApiError, BrokerError, EnvironmentId, TaskInvocation, Workflow, WorkflowScope,
};

/// Remote operations on workflows.
///
/// Implementations attach a freshly minted credential to every call and never
/// retry; retry policy belongs to the caller.
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    /// Returns the workflows configured for a project environment, in the
    /// order the API lists them.
    async fn environment_workflows(&self, scope: &WorkflowScope) -> Result<Vec<Workflow>, ApiError>;

    /// Starts an advanced task on an environment.
    async fn invoke_workflow(
        &self,
        environment: EnvironmentId,
        task: AdvancedTaskId,
    ) -> Result<TaskInvocation, ApiError>;
}

/// One delivery taken from the inbound queue.
#[async_trait]
pub trait InboundMessage: Send + Sync {
    /// Raw message body.
    fn body(&self) -> &[u8];

    /// Tells the broker the message is done and may be removed from the queue.
    async fn ack(&self) -> Result<(), BrokerError>;
}

/// Per-message callback registered with the consumer loop.
///
/// Called once per delivery, strictly one at a time, in delivery order. The
/// handler owns acknowledgment.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &dyn InboundMessage);
}

/// Fire-and-forget publishing to a named destination.
#[async_trait]
pub trait LogPublisher: Send + Sync {
    async fn publish(&self, destination: &str, payload: Vec<u8>) -> Result<(), BrokerError>;
}
