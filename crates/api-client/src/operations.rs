//! GraphQL documents and response shapes for the workflow operations.

use serde::Deserialize;
use tracing::debug;
use workflows::lenient::default_on_null;
use workflows::{AdvancedTaskId, EnvironmentId, TaskInvocation, TriggerSpec, Workflow};

/// A named GraphQL document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub document: &'static str,
}

/// Lists the workflows configured on one environment of a project.
///
/// Variables: `project` (Int), `name` (String).
pub const GET_ENVIRONMENT_WORKFLOWS: Operation = Operation {
    name: "getEnvironmentWorkflows",
    document: r#"query getEnvironmentWorkflows($project: Int!, $name: String!) {
  environment: environmentByName(project: $project, name: $name) {
    id
    workflows {
      id
      event
      advancedTaskDefinition {
        ... on AdvancedTaskDefinitionCommand { id }
        ... on AdvancedTaskDefinitionImage { id }
      }
    }
  }
}"#,
};

/// Starts an advanced task on an environment.
///
/// Variables: `advancedTaskDefinition` (Int), `environment` (Int).
pub const INVOKE_WORKFLOW_ON_ENVIRONMENT: Operation = Operation {
    name: "invokeRegisteredTask",
    document: r#"mutation invokeRegisteredTask($advancedTaskDefinition: Int!, $environment: Int!) {
  invokeRegisteredTask(advancedTaskDefinition: $advancedTaskDefinition, environment: $environment) {
    id
    name
    status
  }
}"#,
};

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct EnvironmentWorkflowsData {
    environment: Option<EnvironmentNode>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentNode {
    id: EnvironmentId,
    #[serde(default, deserialize_with = "default_on_null")]
    workflows: Vec<WorkflowNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowNode {
    #[serde(default, deserialize_with = "default_on_null")]
    event: String,
    advanced_task_definition: Option<TaskDefinitionNode>,
}

#[derive(Debug, Deserialize)]
struct TaskDefinitionNode {
    id: AdvancedTaskId,
}

impl EnvironmentWorkflowsData {
    /// Flattens the response into workflows, preserving API order.
    ///
    /// An unknown environment yields no workflows. Entries whose task
    /// definition is missing (deleted, or not visible) are skipped.
    pub(crate) fn into_workflows(self) -> Vec<Workflow> {
        let Some(environment) = self.environment else {
            return Vec::new();
        };
        let environment_id = environment.id;
        environment
            .workflows
            .into_iter()
            .filter_map(|node| match node.advanced_task_definition {
                Some(definition) => Some(Workflow {
                    environment_id,
                    advanced_task_id: definition.id,
                    advanced_task_details: TriggerSpec::new(node.event),
                }),
                None => {
                    debug!(event = %node.event, "Skipping workflow without a task definition");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InvokeRegisteredTaskData {
    pub(crate) invoke_registered_task: TaskInvocation,
}
