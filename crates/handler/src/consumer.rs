//! The per-message event consumer.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, info_span, warn, Instrument};
use workflows::{
    EventMatcher, EventMetadata, InboundMessage, IncomingEvent, MessageHandler, TaskInvocation,
    Workflow, WorkflowApi,
};

use crate::forwarder::LogForwarder;
use crate::invoker::WorkflowInvoker;

/// Event type of the entries forwarded after a successful invocation.
pub const INVOKED_EVENT: &str = "workflow:invoked";

/// What happened to one message before it was acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No project id or environment name; the API was not contacted.
    Skipped,
    /// The workflow lookup failed; nothing was invoked.
    LookupFailed,
    /// Workflows were looked up and every match was attempted.
    Dispatched {
        /// Workflows returned by the lookup.
        workflows: usize,
        /// Workflows whose trigger matched the event type.
        matched: usize,
        /// Matched workflows whose invocation failed.
        failed: usize,
    },
}

/// Turns lifecycle events into workflow invocations.
///
/// Registered with the consumer loop as its [`MessageHandler`]. Each message
/// is processed to completion and acknowledged exactly once, whatever the
/// outcome. Matches are invoked sequentially in the order the API listed them.
pub struct EventConsumer {
    api: Arc<dyn WorkflowApi>,
    invoker: WorkflowInvoker,
    matcher: EventMatcher,
    invocation_logs: Option<LogForwarder>,
}

impl EventConsumer {
    pub fn new(api: Arc<dyn WorkflowApi>, matcher: EventMatcher) -> Self {
        Self {
            invoker: WorkflowInvoker::new(Arc::clone(&api)),
            api,
            matcher,
            invocation_logs: None,
        }
    }

    /// Forwards a [`INVOKED_EVENT`] log entry after every successful invocation.
    pub fn with_invocation_logs(mut self, forwarder: LogForwarder) -> Self {
        self.invocation_logs = Some(forwarder);
        self
    }

    /// Processes one message body. Never fails; acknowledgment is the caller's.
    pub async fn dispatch(&self, body: &[u8]) -> DispatchOutcome {
        let incoming = IncomingEvent::decode(body).unwrap_or_else(|e| {
            warn!(error = %e, "Unable to decode message body, nothing to match");
            IncomingEvent::default()
        });

        let span = info_span!("dispatch", event = %incoming.event, uuid = %incoming.uuid);
        self.dispatch_event(&incoming).instrument(span).await
    }

    async fn dispatch_event(&self, incoming: &IncomingEvent) -> DispatchOutcome {
        let Some(scope) = incoming.scope() else {
            debug!("Event has no project id or environment, skipping workflow lookup");
            return DispatchOutcome::Skipped;
        };

        let workflows = match self.api.environment_workflows(&scope).await {
            Ok(workflows) => workflows,
            Err(e) => {
                warn!(%scope, error = %e, "Failed to look up environment workflows");
                return DispatchOutcome::LookupFailed;
            }
        };

        let mut matched = 0;
        let mut failed = 0;
        for workflow in &workflows {
            if !self
                .matcher
                .matches(&incoming.event, &workflow.advanced_task_details)
            {
                continue;
            }
            matched += 1;
            match self.invoker.invoke(workflow).await {
                Ok(invocation) => self.forward_invocation(incoming, workflow, &invocation),
                Err(_) => failed += 1,
            }
        }

        info!(%scope, workflows = workflows.len(), matched, failed, "Dispatched event");
        DispatchOutcome::Dispatched {
            workflows: workflows.len(),
            matched,
            failed,
        }
    }

    fn forward_invocation(&self, incoming: &IncomingEvent, workflow: &Workflow, invocation: &TaskInvocation) {
        if let Some(forwarder) = &self.invocation_logs {
            forwarder.forward(&invocation_notice(incoming, workflow, invocation));
        }
    }
}

#[async_trait]
impl MessageHandler for EventConsumer {
    async fn handle(&self, message: &dyn InboundMessage) {
        let outcome = self.dispatch(message.body()).await;
        debug!(?outcome, "Acknowledging message");
        if let Err(e) = message.ack().await {
            warn!(error = %e, "Failed to acknowledge message");
        }
    }
}

/// Builds the log entry announcing that `workflow` was started for `incoming`.
fn invocation_notice(
    incoming: &IncomingEvent,
    workflow: &Workflow,
    invocation: &TaskInvocation,
) -> IncomingEvent {
    let meta = EventMetadata {
        environment_id: Some(workflow.environment_id),
        ..incoming.meta.clone().unwrap_or_default()
    };
    IncomingEvent {
        severity: "info".to_string(),
        project: incoming.project.clone(),
        uuid: incoming.uuid.clone(),
        event: INVOKED_EVENT.to_string(),
        meta: Some(meta),
        message: format!(
            "`{}` started advanced task {} on environment {}: {}",
            incoming.event, workflow.advanced_task_id, workflow.environment_id, invocation
        ),
    }
}
