use anyhow::Result;
use pipeprobe::api::{self, ApiClient, Org, WorkflowSummary};
use pipeprobe::config::{Credential, CredentialResolver, Settings};
use pipeprobe::login::Credentials;
use pipeprobe::workflow::{self, Lookup};
use pipeprobe::{Browser, OutputFormat, RunLog};
use serde::Serialize;
use tracing::warn;

/// Username and password for the browser login flows
pub fn login_credentials(
    resolver: &CredentialResolver,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<Credentials> {
    Ok(Credentials {
        username: resolver.require(Credential::Username, username)?.value,
        password: resolver.require(Credential::Password, password)?.value,
    })
}

/// API client for the configured endpoints, bound to the resolved API key
pub fn api_client(
    settings: &Settings,
    resolver: &CredentialResolver,
    api_key: Option<&str>,
) -> Result<ApiClient> {
    let key = resolver.require(Credential::ApiKey, api_key)?;
    ApiClient::new(&settings.endpoints.api_base, &key.value)
}

/// whoami and organization selection for the listing commands
pub async fn current_org(client: &ApiClient, settings: &Settings) -> Result<Org> {
    let user = client.whoami().await?;
    Ok(api::select_org(&user, settings.org_id.as_deref())?.clone())
}

/// Print `value` as pretty JSON, or hand it to `simple` for the text format
pub fn print_output<T: Serialize>(
    value: &T,
    format: OutputFormat,
    simple: impl FnOnce(&T) -> String,
) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Simple => print!("{}", simple(value)),
    }
    Ok(())
}

/// Close the browser once a flow has finished, keeping an error-state
/// screenshot when it failed. The flow's own error wins over a close error.
pub async fn finish<T>(browser: Browser, log: &RunLog, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        log.log(format!("ERROR: {e:#}"));
        log.save_screenshot(&browser, "error-state").await;
    }
    if let Err(e) = browser.close().await {
        warn!("Failed to close browser: {:#}", e);
    }
    result
}

/// Resolve the workflow for the listing commands: from `--workflow`, the
/// current workflow directory, or by listing the project's workflows
pub async fn lookup_workflow(
    workflow: Option<&str>,
    project: Option<&str>,
    api_key: Option<&str>,
    settings: &Settings,
) -> Result<Lookup> {
    let resolver = settings.resolver();
    let client = api_client(settings, &resolver, api_key)?;
    let workflow_id = workflow::discover_workflow_id(workflow, &settings.workdir);
    let project_id = resolver
        .resolve(Credential::ProjectId, project)
        .map(|r| r.value);

    let org = current_org(&client, settings).await?;
    workflow::lookup_workflow(
        &client,
        &org.id,
        workflow_id.as_deref(),
        project_id.as_deref(),
    )
    .await
}

#[derive(Serialize)]
struct WorkflowChoices<'a> {
    project_id: &'a str,
    workflows: &'a [WorkflowSummary],
    message: &'static str,
}

/// Print a project's workflows when no single workflow was named
pub fn print_workflow_choices(
    project_id: &str,
    workflows: &[WorkflowSummary],
    format: OutputFormat,
) -> Result<()> {
    let choices = WorkflowChoices {
        project_id,
        workflows,
        message: "Please use --workflow <id> to specify which workflow to use.",
    };
    print_output(&choices, format, |c| {
        if c.workflows.is_empty() {
            return format!("No workflows found in project {}.\n", c.project_id);
        }
        let mut out = format!("Available workflows in project {}:\n", c.project_id);
        for (i, wf) in c.workflows.iter().enumerate() {
            out.push_str(&format!(
                "{}. {} ({})\n",
                i + 1,
                wf.name.as_deref().unwrap_or("Unnamed"),
                wf.id
            ));
        }
        out.push_str(&format!("\n{}\n", c.message));
        out
    })
}
