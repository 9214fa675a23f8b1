//! Workflow creation, local workflow records and the step/trigger views

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::api::{
    self, ApiClient, Component, ComponentSource, CreateWorkflowRequest, WorkflowDetails,
};
use crate::config::{Endpoints, EnvSource};

pub const DEFAULT_CRON: &str = "0 0 * * *";
pub const WORKFLOWS_DIR: &str = "workflows";
pub const RECORD_FILE_NAME: &str = "workflow.json";

/// How a new workflow gets triggered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSpec {
    /// HTTP webhook; `path` is recorded locally only
    Http { path: String },
    /// Cron schedule
    Schedule { cron: String },
}

impl TriggerSpec {
    /// Build a trigger from command options, falling back to
    /// `DEFAULT_TRIGGER_TYPE` and `DEFAULT_SCHEDULE`.
    ///
    /// Returns `None` when no trigger type is configured, or when the type is
    /// unknown (a warning is logged and the workflow is created without one).
    pub fn resolve(
        trigger_type: Option<&str>,
        path: Option<&str>,
        schedule: Option<&str>,
        env: &dyn EnvSource,
    ) -> Option<TriggerSpec> {
        let kind = trigger_type
            .map(str::to_string)
            .or_else(|| env.var("DEFAULT_TRIGGER_TYPE"))
            .filter(|k| !k.trim().is_empty())?;

        match kind.trim() {
            "http" => Some(TriggerSpec::Http {
                path: path
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(random_path),
            }),
            "schedule" => {
                let cron = schedule
                    .map(str::to_string)
                    .or_else(|| env.var("DEFAULT_SCHEDULE"))
                    .map(|c| c.replace('"', ""))
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_CRON.to_string());
                Some(TriggerSpec::Schedule { cron })
            }
            other => {
                warn!(
                    "Trigger type '{}' not yet implemented. Creating workflow without trigger.",
                    other
                );
                None
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TriggerSpec::Http { .. } => "http",
            TriggerSpec::Schedule { .. } => "schedule",
        }
    }

    /// The `trigger` component sent in the creation request
    pub fn component(&self, workflow_name: &str) -> Component {
        let (app, source) = match self {
            TriggerSpec::Http { .. } => (
                "http",
                ComponentSource {
                    kind: Some("webhook".to_string()),
                    name: Some(format!("{workflow_name} HTTP Webhook")),
                    key: Some("http-webhook".to_string()),
                    ..Default::default()
                },
            ),
            TriggerSpec::Schedule { cron } => (
                "schedule",
                ComponentSource {
                    kind: Some("cron".to_string()),
                    name: Some(format!("{workflow_name} Schedule")),
                    key: Some("schedule".to_string()),
                    cron: Some(cron.clone()),
                    ..Default::default()
                },
            ),
        };

        Component {
            key: Some("trigger".to_string()),
            kind: Some("source".to_string()),
            app: Some(app.to_string()),
            source: Some(source),
            ..Default::default()
        }
    }

    fn record(&self) -> TriggerRecord {
        match self {
            TriggerSpec::Http { path } => TriggerRecord {
                kind: "http".to_string(),
                path: Some(path.clone()),
                schedule: None,
            },
            TriggerSpec::Schedule { cron } => TriggerRecord {
                kind: "schedule".to_string(),
                path: None,
                schedule: Some(cron.clone()),
            },
        }
    }
}

/// 16 lowercase hex characters
pub fn random_path() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn default_workflow_name() -> String {
    format!("Workflow_{}", Utc::now().format("%Y-%m-%d"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRecord {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

/// Contents of `workflows/<id>/workflow.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub project_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

impl WorkflowRecord {
    /// Write `workflow.json` and a placeholder `code.js` under
    /// `<project_dir>/workflows/<id>/`, returning that directory
    pub fn write(&self, project_dir: &Path) -> Result<PathBuf> {
        let dir = project_dir.join(WORKFLOWS_DIR).join(&self.id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let json = serde_json::to_string_pretty(self)?;
        fs::write(dir.join(RECORD_FILE_NAME), json)
            .with_context(|| format!("Failed to write {}", dir.join(RECORD_FILE_NAME).display()))?;

        let placeholder = format!(
            "// Placeholder for workflow code\n// Workflow ID: {}\n// Name: {}\n",
            self.id, self.name
        );
        fs::write(dir.join("code.js"), placeholder)?;

        debug!("Wrote workflow record in {}", dir.display());
        Ok(dir)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("Invalid {}", path.display()))
    }
}

/// What the caller asked for when creating a workflow
#[derive(Debug, Clone, Default)]
pub struct NewWorkflow {
    pub name: Option<String>,
    pub description: Option<String>,
    pub template: Option<String>,
    pub trigger: Option<TriggerSpec>,
}

/// Summary returned by [`create_workflow`]
#[derive(Debug, Clone, Serialize)]
pub struct CreatedWorkflow {
    pub id: String,
    pub name: String,
    pub url: String,
    pub local_dir: PathBuf,
    pub org_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

/// whoami, pick the organization, POST the workflow, then record it locally.
///
/// Nothing is written to disk unless the service returned an identifier.
pub async fn create_workflow(
    client: &ApiClient,
    endpoints: &Endpoints,
    project_id: &str,
    org_override: Option<&str>,
    new: &NewWorkflow,
    project_dir: &Path,
) -> Result<CreatedWorkflow> {
    info!("Fetching user details to determine workspace...");
    let user = client.whoami().await?;
    let org = api::select_org(&user, org_override)?;
    info!("Using workspace (org_id): {}", org.id);

    let name = new
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(default_workflow_name);
    info!("Creating workflow: {}", name);

    let mut request = CreateWorkflowRequest::new(project_id, &org.id, &name)
        .description(new.description.as_deref())
        .template(new.template.as_deref());
    if let Some(trigger) = &new.trigger {
        info!("Configuring {} trigger", trigger.kind());
        request = request.component(trigger.component(&name));
    }

    let id = client.create_workflow(&request).await?;
    info!("Workflow created with ID: {}", id);

    let trigger = new.trigger.as_ref().map(TriggerSpec::record);
    let webhook_url = matches!(new.trigger, Some(TriggerSpec::Http { .. }))
        .then(|| endpoints.webhook_url(&id));

    let record = WorkflowRecord {
        id: id.clone(),
        name: name.clone(),
        created_at: Utc::now(),
        project_id: project_id.to_string(),
        description: new.description.clone().unwrap_or_default(),
        trigger: trigger.clone(),
        webhook_url: webhook_url.clone(),
    };
    let local_dir = record.write(project_dir)?;

    Ok(CreatedWorkflow {
        url: endpoints.workflow_url(&id),
        id,
        name,
        local_dir,
        org_id: org.id.clone(),
        trigger,
        webhook_url,
    })
}

/// Workflow id from an explicit option, a `workflow.json` in `dir`, or the
/// name of `dir` itself when it sits directly under a `workflows` directory
pub fn discover_workflow_id(explicit: Option<&str>, dir: &Path) -> Option<String> {
    if let Some(id) = explicit.filter(|id| !id.trim().is_empty()) {
        return Some(id.to_string());
    }

    let record_path = dir.join(RECORD_FILE_NAME);
    if record_path.is_file() {
        match WorkflowRecord::read(&record_path) {
            Ok(record) if !record.id.is_empty() => {
                info!("Found workflow ID in {}: {}", RECORD_FILE_NAME, record.id);
                return Some(record.id);
            }
            Ok(_) => {}
            Err(e) => debug!("Could not read {}: {:#}", record_path.display(), e),
        }
    }

    let parent_is_workflows = dir
        .parent()
        .and_then(Path::file_name)
        .is_some_and(|name| name == WORKFLOWS_DIR);
    if parent_is_workflows {
        return dir.file_name().map(|n| n.to_string_lossy().into_owned());
    }
    None
}

/// Project identifiers start with `p_` or `proj_`
pub fn looks_like_project_id(id: &str) -> bool {
    id.starts_with("p_") || id.starts_with("proj_")
}

/// Result of resolving which workflow to show
#[derive(Debug)]
pub enum Lookup {
    Found {
        id: String,
        details: WorkflowDetails,
    },
    /// No single workflow could be named; the user should pick one
    Choose {
        project_id: String,
        workflows: Vec<api::WorkflowSummary>,
    },
}

/// Fetch the named workflow, or list a project's workflows when no workflow
/// is named or the given id turns out to be a project.
pub async fn lookup_workflow(
    client: &ApiClient,
    org_id: &str,
    workflow_id: Option<&str>,
    project_id: Option<&str>,
) -> Result<Lookup> {
    let Some(workflow_id) = workflow_id else {
        let project_id = project_id.context(
            "Workflow ID is required. Provide --workflow <id> or run this command from a workflow directory",
        )?;
        info!("No workflow ID provided. Listing workflows in project {}...", project_id);
        let workflows = client.list_project_workflows(project_id, org_id).await?;
        return Ok(Lookup::Choose {
            project_id: project_id.to_string(),
            workflows,
        });
    };

    info!("Fetching details for workflow {}...", workflow_id);
    match client.get_workflow(workflow_id, org_id).await {
        Ok(details) => Ok(Lookup::Found {
            id: workflow_id.to_string(),
            details,
        }),
        Err(e) if looks_like_project_id(workflow_id) => {
            warn!(
                "{} looks like a project ID rather than a workflow ID ({:#}); listing its workflows instead",
                workflow_id, e
            );
            let workflows = client.list_project_workflows(workflow_id, org_id).await?;
            Ok(Lookup::Choose {
                project_id: workflow_id.to_string(),
                workflows,
            })
        }
        Err(e) => Err(e),
    }
}

fn is_trigger_component(component: &Component) -> bool {
    matches!(component.kind.as_deref(), Some("source") | Some("trigger"))
        || component
            .source
            .as_ref()
            .is_some_and(|s| s.kind.is_some())
}

pub fn component_display_name(component: &Component) -> String {
    if let Some(name) = &component.name {
        return name.clone();
    }
    if let Some(name) = component.source.as_ref().and_then(|s| s.name.as_ref()) {
        return name.clone();
    }

    let app = component.app.as_deref().unwrap_or("");
    if let Some(key) = &component.key {
        return format!("{app} {key}").trim().to_string();
    }
    match component.kind.as_deref() {
        Some("source") | Some("trigger") => format!("{app} Trigger").trim().to_string(),
        Some("action") => format!("{app} Action").trim().to_string(),
        _ => "Unnamed Component".to_string(),
    }
}

pub fn component_type_display(component: &Component) -> String {
    if component.kind.as_deref() == Some("source") || component.key.as_deref() == Some("trigger") {
        return "Trigger".to_string();
    }
    if let Some(source) = &component.source {
        return format!("Trigger ({})", source.kind.as_deref().unwrap_or("unknown"));
    }
    match component.kind.as_deref() {
        Some("action") => "Action".to_string(),
        Some("code") => "Code".to_string(),
        Some(other) => other.to_string(),
        None => "Unknown".to_string(),
    }
}

/// One row of `list-steps`
#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub index: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ComponentSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

pub fn step_views(
    details: &WorkflowDetails,
    endpoints: &Endpoints,
    workflow_id: &str,
    detailed: bool,
) -> Vec<StepView> {
    details
        .components
        .iter()
        .enumerate()
        .map(|(i, component)| {
            let kind = component_type_display(component);
            let app = component.app.clone().filter(|a| !a.is_empty());
            let is_trigger = kind.contains("Trigger");

            let webhook_url = (is_trigger && app.as_deref() == Some("http"))
                .then(|| endpoints.webhook_url(workflow_id));
            let schedule = if is_trigger && app.as_deref() == Some("schedule") {
                component.source.as_ref().and_then(|s| s.cron.clone())
            } else {
                None
            };

            StepView {
                index: i + 1,
                name: component_display_name(component),
                kind,
                app,
                webhook_url,
                schedule,
                source: if detailed { component.source.clone() } else { None },
                options: if detailed { component.options.clone() } else { None },
            }
        })
        .collect()
}

/// One row of `list-triggers`
#[derive(Debug, Clone, Serialize)]
pub struct TriggerView {
    pub index: usize,
    pub app: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
}

pub fn trigger_views(
    details: &WorkflowDetails,
    endpoints: &Endpoints,
    workflow_id: &str,
) -> Vec<TriggerView> {
    details
        .components
        .iter()
        .filter(|c| is_trigger_component(c))
        .enumerate()
        .map(|(i, trigger)| {
            let app = trigger.app.clone().unwrap_or_else(|| "unknown".to_string());
            let kind = trigger
                .source
                .as_ref()
                .and_then(|s| s.kind.clone())
                .or_else(|| trigger.kind.clone())
                .unwrap_or_else(|| "unknown".to_string());

            let webhook_url = (app == "http").then(|| endpoints.webhook_url(workflow_id));
            let schedule = (app == "schedule").then(|| {
                trigger
                    .source
                    .as_ref()
                    .and_then(|s| s.cron.clone())
                    .or_else(|| {
                        trigger
                            .options
                            .as_ref()
                            .and_then(|o| o.get("cron"))
                            .and_then(Value::as_str)
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| "unknown".to_string())
            });

            let configuration = match (&trigger.source, &trigger.options) {
                (Some(source), _) => serde_json::to_value(source).ok(),
                (None, Some(options)) => Some(options.clone()),
                (None, None) => None,
            };

            TriggerView {
                index: i + 1,
                app,
                kind,
                webhook_url,
                schedule,
                configuration,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "workflow_test.rs"]
mod workflow_test;
