//! Turbot API client implementation.
//!
//! This module provides the HTTP client for the Turbot GraphQL API.

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{ApiError, Result, TurbotError};

use super::service::TurbotApi;
use super::types::{Grant, SmartFolder, TurbotMetadata, TurbotResource};

/// Path of the GraphQL endpoint below the workspace URL.
const GRAPHQL_PATH: &str = "/api/latest/graphql";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of attempts for transient failures.
const MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Fields fetched for every metadata block.
const METADATA_FIELDS: &str = "turbot { id parentId akas custom profileId resourceId }";

/// Turbot API client.
#[derive(Debug, Clone)]
pub struct TurbotClient {
    /// HTTP client.
    client: Client,
    /// Full GraphQL endpoint URL.
    endpoint: String,
    /// Access key.
    access_key: String,
    /// Secret key.
    secret_key: String,
}

/// GraphQL request structure.
#[derive(Debug, Serialize)]
struct GraphQLRequest {
    query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<Value>,
}

/// GraphQL response structure.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

/// GraphQL error structure.
#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

/// Delay before retry `attempt`, honouring a server-supplied `Retry-After`
/// but never waiting longer than ten base delays.
fn retry_delay_ms(attempt: u32, last_error: Option<&TurbotError>) -> u64 {
    last_error
        .and_then(TurbotError::retry_delay_secs)
        .map_or(RETRY_DELAY_MS * u64::from(attempt), |secs| {
            secs.saturating_mul(1000).min(RETRY_DELAY_MS * 10)
        })
}

/// Builds the GraphQL endpoint for a workspace URL.
#[must_use]
pub fn graphql_endpoint(workspace: &str) -> String {
    let trimmed = workspace.trim_end_matches('/');
    if trimmed.ends_with(GRAPHQL_PATH) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{GRAPHQL_PATH}")
    }
}

/// Re-labels a generic not-found error with the entity kind and reference.
fn not_found_as(err: TurbotError, kind: &str, id: &str) -> TurbotError {
    if err.is_not_found() {
        ApiError::not_found(kind, id).into()
    } else {
        err
    }
}

impl TurbotClient {
    /// Creates a new Turbot API client for a workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(workspace: &str, access_key: &str, secret_key: &str) -> Result<Self> {
        Self::with_timeout(workspace, access_key, secret_key, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(
        workspace: &str,
        access_key: &str,
        secret_key: &str,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: graphql_endpoint(workspace),
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    /// Returns the GraphQL endpoint this client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Executes a GraphQL query.
    async fn execute<T: for<'de> Deserialize<'de>>(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> Result<T> {
        let request = GraphQLRequest {
            query: query.to_string(),
            variables,
        };

        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = retry_delay_ms(attempt, last_error.as_ref());
                debug!("Retry attempt {attempt} of {MAX_RETRIES} in {delay}ms");
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.execute_once::<T>(&request).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if e.is_retryable() {
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ApiError::network("Max retries exceeded").into()))
    }

    /// Executes a single GraphQL request.
    async fn execute_once<T: for<'de> Deserialize<'de>>(
        &self,
        request: &GraphQLRequest,
    ) -> Result<T> {
        trace!("Executing GraphQL query: {}", request.query);

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .basic_auth(&self.access_key, Some(&self.secret_key))
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::network(format!("Request failed: {e}")))?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();
            let retry_after = if retry_after == 0 { 60 } else { retry_after };

            return Err(ApiError::RateLimited {
                retry_after_secs: retry_after,
            }
            .into());
        }

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ApiError::AuthenticationFailed {
                message: String::from("Invalid access key or secret key"),
            }
            .into());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::request(status.as_u16(), body).into());
        }

        let gql_response: GraphQLResponse<T> = response.json().await.map_err(|e| {
            ApiError::InvalidResponse {
                message: format!("Failed to parse response: {e}"),
            }
        })?;

        if let Some(errors) = gql_response.errors.filter(|e| !e.is_empty()) {
            if errors
                .iter()
                .any(|e| e.message.to_ascii_lowercase().contains("not found"))
            {
                return Err(ApiError::not_found("Entity", String::new()).into());
            }
            let message = errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ApiError::request(400, message).into());
        }

        gql_response.data.ok_or_else(|| {
            ApiError::InvalidResponse {
                message: String::from("No data in response"),
            }
            .into()
        })
    }

    /// Validates the credentials by making a test request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for a reason other than
    /// rejected credentials.
    pub async fn validate_credentials(&self) -> Result<bool> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(rename = "resource")]
            _resource: Option<Value>,
        }

        let query = r#"
            query {
                resource(id: "tmod:@turbot/turbot#/") {
                    turbot { id }
                }
            }
        "#;

        match self.execute::<Response>(query, None).await {
            Ok(_) => Ok(true),
            Err(TurbotError::Api(ApiError::AuthenticationFailed { .. })) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Builds a resource query that fetches only the given data properties.
    /// Properties are aliased positionally so any property name is safe.
    fn build_property_query(properties: &BTreeMap<String, String>) -> String {
        let mut selections = String::new();
        for (index, path) in properties.values().enumerate() {
            let escaped = path.replace('\\', "\\\\").replace('"', "\\\"");
            selections.push_str(&format!("property_{index}: get(path: \"{escaped}\")\n"));
        }
        format!(
            "query Resource($id: ID!) {{ resource(id: $id) {{ {selections} {METADATA_FIELDS} }} }}"
        )
    }
}

#[async_trait]
impl TurbotApi for TurbotClient {
    async fn resource_exists(&self, id: &str) -> Result<bool> {
        #[derive(Deserialize)]
        struct Response {
            resource: Option<Value>,
        }

        let query = r"
            query ResourceExists($id: ID!) {
                resource(id: $id) {
                    turbot { id }
                }
            }
        ";

        let variables = serde_json::json!({ "id": id });
        match self.execute::<Response>(query, Some(variables)).await {
            Ok(response) => Ok(response.resource.is_some()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn read_resource(
        &self,
        id: &str,
        properties: Option<BTreeMap<String, String>>,
    ) -> Result<TurbotResource> {
        #[derive(Deserialize)]
        struct Response {
            resource: Option<Value>,
        }

        let variables = serde_json::json!({ "id": id });

        let Some(properties) = properties.filter(|p| !p.is_empty()) else {
            let query = format!(
                "query Resource($id: ID!) {{ resource(id: $id) {{ data {METADATA_FIELDS} }} }}"
            );
            let response: Response = self
                .execute(&query, Some(variables))
                .await
                .map_err(|e| not_found_as(e, "Resource", id))?;
            let value = response
                .resource
                .ok_or_else(|| ApiError::not_found("Resource", id))?;
            return serde_json::from_value(value).map_err(|e| {
                ApiError::InvalidResponse {
                    message: format!("Failed to parse resource: {e}"),
                }
                .into()
            });
        };

        let query = Self::build_property_query(&properties);
        let response: Response = self
            .execute(&query, Some(variables))
            .await
            .map_err(|e| not_found_as(e, "Resource", id))?;
        let Some(Value::Object(mut raw)) = response.resource else {
            return Err(ApiError::not_found("Resource", id).into());
        };

        let turbot: TurbotMetadata = raw
            .remove("turbot")
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ApiError::InvalidResponse {
                message: format!("Failed to parse resource metadata: {e}"),
            })?
            .unwrap_or_default();

        let mut data = Map::new();
        for (index, name) in properties.keys().enumerate() {
            if let Some(value) = raw.remove(&format!("property_{index}")) {
                if !value.is_null() {
                    data.insert(name.clone(), value);
                }
            }
        }

        Ok(TurbotResource { data, turbot })
    }

    async fn create_resource(&self, input: Map<String, Value>) -> Result<TurbotMetadata> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(rename = "createResource")]
            resource: TurbotResource,
        }

        let query = format!(
            "mutation CreateResource($input: CreateResourceInput!) {{ createResource(input: $input) {{ {METADATA_FIELDS} }} }}"
        );

        let variables = serde_json::json!({ "input": input });
        let response: Response = self.execute(&query, Some(variables)).await?;
        Ok(response.resource.turbot)
    }

    async fn update_resource(&self, input: Map<String, Value>) -> Result<TurbotMetadata> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(rename = "updateResource")]
            resource: TurbotResource,
        }

        let id = input
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let query = format!(
            "mutation UpdateResource($input: UpdateResourceInput!) {{ updateResource(input: $input) {{ {METADATA_FIELDS} }} }}"
        );

        let variables = serde_json::json!({ "input": input });
        let response: Response = self
            .execute(&query, Some(variables))
            .await
            .map_err(|e| not_found_as(e, "Resource", &id))?;
        Ok(response.resource.turbot)
    }

    async fn delete_resource(&self, id: &str) -> Result<()> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(rename = "deleteResource")]
            _resource: Option<Value>,
        }

        let query = r"
            mutation DeleteResource($input: DeleteResourceInput!) {
                deleteResource(input: $input) {
                    turbot { id }
                }
            }
        ";

        let variables = serde_json::json!({ "input": { "id": id } });
        let _: Response = self
            .execute(query, Some(variables))
            .await
            .map_err(|e| not_found_as(e, "Resource", id))?;
        Ok(())
    }

    async fn read_update_schema_properties(&self, id: &str) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct Response {
            resource: Option<ResourceType>,
        }
        #[derive(Deserialize)]
        struct ResourceType {
            #[serde(rename = "type")]
            resource_type: Option<UpdateSchema>,
        }
        #[derive(Deserialize)]
        struct UpdateSchema {
            #[serde(rename = "updateSchema")]
            update_schema: Option<Value>,
        }

        let query = r"
            query UpdateSchema($id: ID!) {
                resource(id: $id) {
                    type { updateSchema }
                }
            }
        ";

        let variables = serde_json::json!({ "id": id });
        let response: Response = self
            .execute(query, Some(variables))
            .await
            .map_err(|e| not_found_as(e, "Resource", id))?;

        let schema = response
            .resource
            .and_then(|r| r.resource_type)
            .and_then(|t| t.update_schema);

        let properties = schema
            .as_ref()
            .and_then(|s| s.get("properties"))
            .and_then(Value::as_object)
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default();

        debug!("Update schema for {id} declares {properties:?}");
        Ok(properties)
    }

    async fn get_resource_akas(&self, id: &str) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct Response {
            resource: Option<TurbotResource>,
        }

        let query = r"
            query ResourceAkas($id: ID!) {
                resource(id: $id) {
                    turbot { id akas }
                }
            }
        ";

        let variables = serde_json::json!({ "id": id });
        let response: Response = self
            .execute(query, Some(variables))
            .await
            .map_err(|e| not_found_as(e, "Resource", id))?;

        response
            .resource
            .map(|r| r.turbot.akas)
            .ok_or_else(|| ApiError::not_found("Resource", id).into())
    }

    async fn grant_exists(&self, id: &str) -> Result<bool> {
        match self.read_grant(id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn read_grant(&self, id: &str) -> Result<Grant> {
        #[derive(Deserialize)]
        struct Response {
            grant: Option<Grant>,
        }

        let query = r"
            query Grant($id: ID!) {
                grant(id: $id) {
                    permissionTypeId
                    permissionLevelId
                    turbot { id profileId resourceId }
                }
            }
        ";

        let variables = serde_json::json!({ "id": id });
        let response: Response = self
            .execute(query, Some(variables))
            .await
            .map_err(|e| not_found_as(e, "Grant", id))?;

        response
            .grant
            .ok_or_else(|| ApiError::not_found("Grant", id).into())
    }

    async fn create_grant(&self, input: Map<String, Value>) -> Result<TurbotMetadata> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(rename = "createGrant")]
            grant: Grant,
        }

        let query = r"
            mutation CreateGrant($input: CreateGrantInput!) {
                createGrant(input: $input) {
                    turbot { id profileId resourceId }
                }
            }
        ";

        let variables = serde_json::json!({ "input": input });
        let response: Response = self.execute(query, Some(variables)).await?;
        Ok(response.grant.turbot)
    }

    async fn delete_grant(&self, id: &str) -> Result<()> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(rename = "deleteGrant")]
            _grant: Option<Value>,
        }

        let query = r"
            mutation DeleteGrant($input: DeleteGrantInput!) {
                deleteGrant(input: $input) {
                    turbot { id }
                }
            }
        ";

        let variables = serde_json::json!({ "input": { "id": id } });
        let _: Response = self
            .execute(query, Some(variables))
            .await
            .map_err(|e| not_found_as(e, "Grant", id))?;
        Ok(())
    }

    async fn read_smart_folder(&self, id: &str) -> Result<SmartFolder> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(rename = "smartFolder")]
            smart_folder: Option<SmartFolder>,
        }

        let query = r"
            query SmartFolder($id: ID!) {
                smartFolder(id: $id) {
                    turbot { id akas }
                    attachedResources {
                        items {
                            turbot { id akas }
                        }
                    }
                }
            }
        ";

        let variables = serde_json::json!({ "id": id });
        let response: Response = self
            .execute(query, Some(variables))
            .await
            .map_err(|e| not_found_as(e, "Smart folder", id))?;

        response
            .smart_folder
            .ok_or_else(|| ApiError::not_found("Smart folder", id).into())
    }

    async fn create_smart_folder_attachment(
        &self,
        input: Map<String, Value>,
    ) -> Result<TurbotMetadata> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(rename = "attachSmartFolders")]
            resource: TurbotResource,
        }

        let query = r"
            mutation AttachSmartFolders($input: AttachSmartFoldersInput!) {
                attachSmartFolders(input: $input) {
                    turbot { id akas }
                }
            }
        ";

        let variables = serde_json::json!({ "input": input });
        let response: Response = self.execute(query, Some(variables)).await?;
        Ok(response.resource.turbot)
    }

    async fn delete_smart_folder_attachment(&self, input: Map<String, Value>) -> Result<()> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(rename = "detachSmartFolders")]
            _resource: Option<Value>,
        }

        let query = r"
            mutation DetachSmartFolders($input: DetachSmartFoldersInput!) {
                detachSmartFolders(input: $input) {
                    turbot { id }
                }
            }
        ";

        let variables = serde_json::json!({ "input": input });
        let _: Response = self.execute(query, Some(variables)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_endpoint() {
        assert_eq!(
            graphql_endpoint("https://acme.cloud.turbot.com/"),
            "https://acme.cloud.turbot.com/api/latest/graphql"
        );
        assert_eq!(
            graphql_endpoint("https://acme.cloud.turbot.com/api/latest/graphql"),
            "https://acme.cloud.turbot.com/api/latest/graphql"
        );
    }

    #[test]
    fn test_retry_delay_caps_retry_after() {
        let limited = |secs| TurbotError::from(ApiError::RateLimited { retry_after_secs: secs });

        assert_eq!(retry_delay_ms(1, Some(&limited(2))), 2000);
        assert_eq!(retry_delay_ms(1, Some(&limited(600))), RETRY_DELAY_MS * 10);
        assert_eq!(retry_delay_ms(1, Some(&limited(u64::MAX))), RETRY_DELAY_MS * 10);
        assert_eq!(retry_delay_ms(2, None), RETRY_DELAY_MS * 2);
    }

    #[test]
    fn test_property_query_aliases_positionally() {
        let mut properties = BTreeMap::new();
        properties.insert(String::from("b-prop"), String::from("b-prop"));
        properties.insert(String::from("a"), String::from("a"));

        let query = TurbotClient::build_property_query(&properties);
        assert!(query.contains(r#"property_0: get(path: "a")"#));
        assert!(query.contains(r#"property_1: get(path: "b-prop")"#));
        assert!(query.contains("turbot { id parentId akas custom"));
    }
}
