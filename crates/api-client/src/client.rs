//! The workflow API client.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use workflows::{
    AdvancedTaskId, ApiError, EnvironmentId, TaskInvocation, Workflow, WorkflowApi, WorkflowScope,
};

use crate::auth::BearerAuth;
use crate::credentials::{CredentialConfig, TokenMinter};
use crate::operations::{
    EnvironmentWorkflowsData, InvokeRegisteredTaskData, Operation, GET_ENVIRONMENT_WORKFLOWS,
    INVOKE_WORKFLOW_ON_ENVIRONMENT,
};
use crate::transport::{ApiRequest, GraphQlRequest, HttpTransport, Transport};

/// Settings for the production client.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// GraphQL endpoint URL, e.g. `http://api:3000/graphql`.
    pub endpoint: String,
    pub credentials: CredentialConfig,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Runs GraphQL operations through a [`Transport`].
///
/// Construct with [`ApiClient::from_config`] to get the authenticated HTTP
/// stack; tests supply their own transport through [`ApiClient::new`].
#[derive(Debug, Clone)]
pub struct ApiClient<T> {
    transport: T,
}

impl ApiClient<BearerAuth<HttpTransport>> {
    pub fn from_config(config: ApiConfig) -> Result<Self, ApiError> {
        let http = HttpTransport::new(config.endpoint)?;
        let minter = TokenMinter::new(config.credentials);
        Ok(Self::new(BearerAuth::new(http, minter)))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Runs `operation` with `variables` and decodes its `data` member.
    ///
    /// A response carrying GraphQL `errors` fails even if `data` is present.
    pub async fn call<R: DeserializeOwned>(
        &self,
        operation: &Operation,
        variables: serde_json::Value,
    ) -> Result<R, ApiError> {
        let request = ApiRequest {
            body: GraphQlRequest {
                query: operation.document,
                operation_name: operation.name,
                variables,
            },
            authorization: None,
        };

        let document = self.transport.send(request).await?;
        let response: GraphQlResponse =
            serde_json::from_value(document).map_err(|e| ApiError::Decode(e.to_string()))?;

        if !response.errors.is_empty() {
            let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
            return Err(ApiError::GraphQl(messages.join("; ")));
        }

        let data = response
            .data
            .ok_or_else(|| ApiError::Decode(format!("{} returned no data", operation.name)))?;
        serde_json::from_value(data).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl<T: Transport> WorkflowApi for ApiClient<T> {
    async fn environment_workflows(&self, scope: &WorkflowScope) -> Result<Vec<Workflow>, ApiError> {
        let data: EnvironmentWorkflowsData = self
            .call(
                &GET_ENVIRONMENT_WORKFLOWS,
                json!({
                    "project": scope.project_id.as_u64(),
                    "name": scope.environment.as_str(),
                }),
            )
            .await?;
        Ok(data.into_workflows())
    }

    async fn invoke_workflow(
        &self,
        environment: EnvironmentId,
        task: AdvancedTaskId,
    ) -> Result<TaskInvocation, ApiError> {
        let data: InvokeRegisteredTaskData = self
            .call(
                &INVOKE_WORKFLOW_ON_ENVIRONMENT,
                json!({
                    "advancedTaskDefinition": task.as_u64(),
                    "environment": environment.as_u64(),
                }),
            )
            .await?;
        Ok(data.invoke_registered_task)
    }
}
