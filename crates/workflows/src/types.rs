//! Wire event model and workflow value types.
//!
//! [`IncomingEvent`] mirrors the JSON log entry published by the services that
//! build and deploy environments. Every field is optional on the wire: a field
//! that is missing, `null`, or of the wrong type decodes as empty without
//! affecting its siblings, and serialising an event omits empty fields again,
//! so entries can be forwarded without growing. Only a body that is not a JSON
//! object fails to decode.
//!
//! [`Workflow`] and [`TaskInvocation`] are the remote API's view of what is
//! configured and what was started. They are fetched per event and dropped
//! once the event is acknowledged.

use serde::{Deserialize, Serialize};

use crate::lenient::{default_on_invalid, default_on_null};
use crate::{AdvancedTaskId, EnvironmentId, EnvironmentName, ProjectId, TaskId};

// ---------------------------------------------------------------------------
// Incoming events
// ---------------------------------------------------------------------------

/// A lifecycle log entry received from the inbound queue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomingEvent {
    /// Log severity (`"info"`, `"error"`, ...).
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "String::is_empty")]
    pub severity: String,

    /// Name of the project the event originated from.
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "String::is_empty")]
    pub project: String,

    /// Correlation identifier assigned by the producer.
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "String::is_empty")]
    pub uuid: String,

    /// Event type, e.g. `"deploy:finished"`. Compared against workflow triggers.
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "String::is_empty")]
    pub event: String,

    /// Routing and descriptive metadata.
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub meta: Option<EventMetadata>,

    /// Free-form human-readable message.
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl IncomingEvent {
    /// Decodes a message body.
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Returns the project/environment pair used to look up workflows.
    ///
    /// `None` unless the metadata carries both a project id and a non-empty
    /// environment name. Events without a scope never reach the remote API.
    pub fn scope(&self) -> Option<WorkflowScope> {
        let meta = self.meta.as_ref()?;
        let project_id = meta.project_id?;
        let environment = EnvironmentName::new(meta.environment.clone()?)?;
        Some(WorkflowScope {
            project_id,
            environment,
        })
    }
}

/// Metadata block of an [`IncomingEvent`].
///
/// Only `project_id` and `environment` participate in routing; everything else
/// is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventMetadata {
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub build_name: Option<String>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub build_phase: Option<String>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<EnvironmentId>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub job_status: Option<String>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub log_link: Option<String>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Vec::is_empty")]
    pub monitoring_urls: Vec<String>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<String>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(deserialize_with = "default_on_invalid", skip_serializing_if = "Option::is_none")]
    pub advanced_data: Option<String>,
    #[serde(
        rename = "clusterName",
        deserialize_with = "default_on_invalid",
        skip_serializing_if = "Option::is_none"
    )]
    pub cluster: Option<String>,
}

/// The project/environment pair an event is routed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkflowScope {
    pub project_id: ProjectId,
    pub environment: EnvironmentName,
}

impl std::fmt::Display for WorkflowScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "project {} / environment {}", self.project_id, self.environment)
    }
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

/// The event criterion configured on a workflow ("advanced task details").
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerSpec(String);

impl TriggerSpec {
    /// Creates a trigger specification from its configured text.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the specification as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TriggerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A binding between an environment, an advanced task, and a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    /// Environment the task runs against.
    pub environment_id: EnvironmentId,
    /// Advanced task to start.
    pub advanced_task_id: AdvancedTaskId,
    /// Event criterion this workflow reacts to.
    pub advanced_task_details: TriggerSpec,
}

/// The remote API's answer to a successful workflow invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskInvocation {
    pub id: Option<TaskId>,
    #[serde(deserialize_with = "default_on_null")]
    pub name: String,
    #[serde(deserialize_with = "default_on_null")]
    pub status: String,
}

impl std::fmt::Display for TaskInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "task {id} '{}' ({})", self.name, self.status),
            None => write!(f, "task '{}' ({})", self.name, self.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_requires_project_id_and_environment() {
        let event = IncomingEvent::decode(
            br#"{"event":"deploy:finished","meta":{"projectId":12,"environment":"main"}}"#,
        )
        .unwrap();
        let scope = event.scope().unwrap();
        assert_eq!(scope.project_id, ProjectId::new(12));
        assert_eq!(scope.environment.as_str(), "main");

        let no_project =
            IncomingEvent::decode(br#"{"event":"deploy:finished","meta":{"environment":"main"}}"#)
                .unwrap();
        assert!(no_project.scope().is_none());

        let empty_env =
            IncomingEvent::decode(br#"{"meta":{"projectId":12,"environment":""}}"#).unwrap();
        assert!(empty_env.scope().is_none());

        let no_meta = IncomingEvent::decode(br#"{"event":"deploy:finished"}"#).unwrap();
        assert!(no_meta.scope().is_none());
    }

    #[test]
    fn test_decode_keeps_descriptive_metadata() {
        let event = IncomingEvent::decode(
            br#"{"severity":"info","project":"shop","uuid":"abc","event":"task:finished",
                 "meta":{"projectId":3,"environment":"dev","buildName":"lagoon-build-x1",
                         "routes":["https://a","https://b"],"clusterName":"c1"}}"#,
        )
        .unwrap();
        let meta = event.meta.unwrap();
        assert_eq!(meta.build_name.as_deref(), Some("lagoon-build-x1"));
        assert_eq!(meta.routes.len(), 2);
        assert_eq!(meta.cluster.as_deref(), Some("c1"));
    }

    #[test]
    fn test_serialize_omits_empty_fields() {
        let event = IncomingEvent {
            event: "workflow:invoked".to_string(),
            meta: Some(EventMetadata {
                project_id: Some(ProjectId::new(1)),
                ..EventMetadata::default()
            }),
            ..IncomingEvent::default()
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"event": "workflow:invoked", "meta": {"projectId": 1}})
        );
    }

    #[test]
    fn test_malformed_body_is_a_decode_error() {
        assert!(IncomingEvent::decode(b"{not json").is_err());
        assert!(IncomingEvent::decode(b"[1, 2]").is_err());
    }

    #[test]
    fn test_null_and_mistyped_fields_decode_as_empty() {
        let event = IncomingEvent::decode(
            br#"{"severity":null,"message":null,"event":"deploy:finished",
                 "meta":{"projectId":12,"environment":"main","routes":null,
                         "buildName":5,"monitoringUrls":[1,2],"clusterName":null}}"#,
        )
        .unwrap();
        assert!(event.severity.is_empty());
        assert!(event.message.is_empty());
        let meta = event.meta.as_ref().unwrap();
        assert!(meta.routes.is_empty());
        assert_eq!(meta.build_name, None);
        assert!(meta.monitoring_urls.is_empty());
        assert_eq!(event.scope().map(|s| s.project_id), Some(ProjectId::new(12)));
    }

    #[test]
    fn test_mistyped_project_id_leaves_event_unscoped() {
        let event = IncomingEvent::decode(br#"{"meta":{"projectId":"twelve","environment":"main"}}"#)
            .unwrap();
        assert!(event.scope().is_none());
        assert_eq!(event.meta.unwrap().environment.as_deref(), Some("main"));
    }

    #[test]
    fn test_invocation_tolerates_null_name_and_status() {
        let invocation: TaskInvocation =
            serde_json::from_str(r#"{"id":99,"name":null,"status":null}"#).unwrap();
        assert_eq!(invocation.id, Some(TaskId::new(99)));
        assert!(invocation.name.is_empty());
        assert!(invocation.status.is_empty());
    }
}
