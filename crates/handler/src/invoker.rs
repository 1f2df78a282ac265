//! Starts matched workflows.

use std::sync::Arc;

use tracing::{error, info};
use workflows::{ApiError, TaskInvocation, Workflow, WorkflowApi};

/// Issues the remote "start this task on this environment" call.
///
/// Failures are logged here and handed back to the caller as values; nothing
/// is retried or recorded. A dropped trigger is only visible in the logs.
#[derive(Clone)]
pub struct WorkflowInvoker {
    api: Arc<dyn WorkflowApi>,
}

impl WorkflowInvoker {
    pub fn new(api: Arc<dyn WorkflowApi>) -> Self {
        Self { api }
    }

    pub async fn invoke(&self, workflow: &Workflow) -> Result<TaskInvocation, ApiError> {
        match self
            .api
            .invoke_workflow(workflow.environment_id, workflow.advanced_task_id)
            .await
        {
            Ok(invocation) => {
                info!(
                    environment_id = %workflow.environment_id,
                    advanced_task_id = %workflow.advanced_task_id,
                    %invocation,
                    "Invoked workflow"
                );
                Ok(invocation)
            }
            Err(e) => {
                error!(
                    environment_id = %workflow.environment_id,
                    advanced_task_id = %workflow.advanced_task_id,
                    error = %e,
                    "Failed to invoke workflow"
                );
                Err(e)
            }
        }
    }
}
