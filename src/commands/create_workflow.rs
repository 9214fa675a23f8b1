use anyhow::Result;
use pipeprobe::config::{Credential, ProcessEnv};
use pipeprobe::project::ConfigFile;
use pipeprobe::workflow::{self, NewWorkflow, TriggerSpec};
use pipeprobe::{OutputFormat, Settings};
use std::path::Path;
use tracing::info;

use crate::commands::utils;

#[allow(clippy::too_many_arguments)]
pub async fn handle_create_workflow(
    project: Option<String>,
    name: Option<String>,
    description: Option<String>,
    template: Option<String>,
    trigger: Option<String>,
    path: Option<String>,
    schedule: Option<String>,
    api_key: Option<String>,
    settings: &Settings,
    format: OutputFormat,
) -> Result<()> {
    let resolver = settings.resolver();
    let client = utils::api_client(settings, &resolver, api_key.as_deref())?;
    let project_id = resolver.require(Credential::ProjectId, project.as_deref())?.value;

    // Records go next to the project's config.ini when there is one
    let project_dir = ConfigFile::find_local(&settings.workdir)
        .and_then(|path| path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| settings.workdir.clone());
    info!("Using project ID: {}", project_id);

    let new = NewWorkflow {
        name,
        description,
        template,
        trigger: TriggerSpec::resolve(
            trigger.as_deref(),
            path.as_deref(),
            schedule.as_deref(),
            &ProcessEnv,
        ),
    };

    let created = workflow::create_workflow(
        &client,
        &settings.endpoints,
        &project_id,
        settings.org_id.as_deref(),
        &new,
        &project_dir,
    )
    .await?;

    utils::print_output(&created, format, |w| {
        let mut out = format!(
            "Workflow \"{}\" created successfully!\n  Workflow ID: {}\n  URL: {}\n  Local directory: {}\n",
            w.name,
            w.id,
            w.url,
            w.local_dir.display()
        );
        if let Some(trigger) = &w.trigger {
            out.push_str(&format!("  Trigger: {}\n", trigger.kind));
        }
        if let Some(schedule) = w.trigger.as_ref().and_then(|t| t.schedule.as_ref()) {
            out.push_str(&format!("  Schedule: {}\n", schedule));
        }
        if let Some(url) = &w.webhook_url {
            out.push_str(&format!("  Webhook URL: {}\n", url));
        }
        out
    })
}
