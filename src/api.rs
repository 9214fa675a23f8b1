//! Bearer-token JSON client for the Pipedream REST API

use anyhow::{Context, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::PipeprobeError;

/// Every response wraps its payload in `data`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// The authenticated user as returned by `GET /users/me`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserDetails {
    pub id: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub orgs: Vec<Org>,
}

/// An organization (workspace) the user belongs to
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Org {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkflowDetails {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub components: Vec<Component>,
}

/// A workflow step, used both in creation requests and in fetched workflows
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Component {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ComponentSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ComponentSource {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSettings {
    pub name: String,
    pub auto_deploy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of `POST /workflows`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateWorkflowRequest {
    pub project_id: String,
    pub org_id: String,
    pub settings: WorkflowSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
}

impl CreateWorkflowRequest {
    pub fn new(project_id: &str, org_id: &str, name: &str) -> Self {
        CreateWorkflowRequest {
            project_id: project_id.to_string(),
            org_id: org_id.to_string(),
            settings: WorkflowSettings {
                name: name.to_string(),
                auto_deploy: true,
                description: None,
            },
            template_id: None,
            components: Vec::new(),
        }
    }

    pub fn description(mut self, description: Option<&str>) -> Self {
        self.settings.description = description.map(str::to_string);
        self
    }

    pub fn template(mut self, template_id: Option<&str>) -> Self {
        self.template_id = template_id.map(str::to_string);
        self
    }

    pub fn component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    id: Option<String>,
}

/// Pick the organization to act in.
///
/// An explicit id must be one of the user's organizations. Without one the
/// first listed organization is used, in the order the API returned them.
pub fn select_org<'a>(user: &'a UserDetails, explicit: Option<&str>) -> Result<&'a Org> {
    if let Some(wanted) = explicit {
        return user.orgs.iter().find(|org| org.id == wanted).ok_or_else(|| {
            let known: Vec<&str> = user.orgs.iter().map(|o| o.id.as_str()).collect();
            anyhow::anyhow!(
                "Organization {} is not one of this user's workspaces ({})",
                wanted,
                known.join(", ")
            )
        });
    }

    let first = user
        .orgs
        .first()
        .ok_or_else(|| PipeprobeError::Remote("No workspace found for the user".to_string()))?;

    if user.orgs.len() > 1 {
        warn!(
            "User belongs to {} workspaces; using the first ({}). Pass --org to choose another.",
            user.orgs.len(),
            first.id
        );
    }
    Ok(first)
}

pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    api_key: String,
}

impl ApiClient {
    pub fn new(base: &Url, api_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pipeprobe/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(ApiClient {
            http,
            base: base.clone(),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/v1/{}",
            self.base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&CreateWorkflowRequest>,
    ) -> Result<T> {
        let url = self.endpoint(path);
        debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipeprobeError::Remote(format!("{url}: {e}")))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PipeprobeError::Remote(format!("{url}: {e}")))?;

        if !status.is_success() {
            return Err(PipeprobeError::Remote(format!(
                "Request failed with status code {}: {}",
                status.as_u16(),
                text
            ))
            .into());
        }

        serde_json::from_str(&text).map_err(|e| {
            PipeprobeError::Remote(format!("Failed to parse response: {e}")).into()
        })
    }

    /// `GET /users/me`
    pub async fn whoami(&self) -> Result<UserDetails> {
        let envelope: Envelope<UserDetails> = self.send(Method::GET, "users/me", &[], None).await?;
        let user = envelope
            .data
            .filter(|u| u.id.is_some())
            .ok_or_else(|| PipeprobeError::Remote("Failed to fetch user details".to_string()))?;
        info!(
            "Authenticated as {}",
            user.email.as_deref().unwrap_or("unknown user")
        );
        Ok(user)
    }

    pub async fn list_project_workflows(
        &self,
        project_id: &str,
        org_id: &str,
    ) -> Result<Vec<WorkflowSummary>> {
        let envelope: Envelope<Vec<WorkflowSummary>> = self
            .send(
                Method::GET,
                &format!("projects/{project_id}/workflows"),
                &[("org_id", org_id)],
                None,
            )
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn get_workflow(&self, workflow_id: &str, org_id: &str) -> Result<WorkflowDetails> {
        let envelope: Envelope<WorkflowDetails> = self
            .send(
                Method::GET,
                &format!("workflows/{workflow_id}"),
                &[("org_id", org_id)],
                None,
            )
            .await?;
        envelope.data.ok_or_else(|| {
            PipeprobeError::Remote(
                "Failed to fetch workflow details - No data returned".to_string(),
            )
            .into()
        })
    }

    /// `POST /workflows`, returning the new workflow's remote identifier
    pub async fn create_workflow(&self, request: &CreateWorkflowRequest) -> Result<String> {
        let envelope: Envelope<CreatedRecord> = self
            .send(Method::POST, "workflows", &[], Some(request))
            .await?;
        envelope
            .data
            .and_then(|record| record.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                PipeprobeError::Remote(
                    "Failed to create workflow: response carried no identifier".to_string(),
                )
                .into()
            })
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;
