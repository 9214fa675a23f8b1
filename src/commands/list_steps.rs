use anyhow::Result;
use pipeprobe::workflow::{self, Lookup, StepView};
use pipeprobe::{OutputFormat, Settings};
use serde::Serialize;

use crate::commands::utils;

#[derive(Serialize)]
struct StepListing {
    workflow_id: String,
    name: String,
    url: String,
    steps: Vec<StepView>,
}

pub async fn handle_list_steps(
    workflow: Option<String>,
    project: Option<String>,
    api_key: Option<String>,
    detailed: bool,
    settings: &Settings,
    format: OutputFormat,
) -> Result<()> {
    let lookup = utils::lookup_workflow(
        workflow.as_deref(),
        project.as_deref(),
        api_key.as_deref(),
        settings,
    )
    .await?;

    let (id, details) = match lookup {
        Lookup::Found { id, details } => (id, details),
        Lookup::Choose {
            project_id,
            workflows,
        } => return utils::print_workflow_choices(&project_id, &workflows, format),
    };

    let listing = StepListing {
        name: details.name.clone().unwrap_or_else(|| "Unnamed Workflow".to_string()),
        url: settings.endpoints.workflow_url(&id),
        steps: workflow::step_views(&details, &settings.endpoints, &id, detailed),
        workflow_id: id,
    };

    utils::print_output(&listing, format, |l| {
        let rule = "-".repeat(70);
        let mut out = format!("Workflow: {} ({})\nURL: {}\n", l.name, l.workflow_id, l.url);
        if l.steps.is_empty() {
            out.push_str("\nNo steps found for this workflow.\n");
            return out;
        }

        out.push_str(&format!("\nSteps ({} total):\n{}\n", l.steps.len(), rule));
        for step in &l.steps {
            out.push_str(&format!("{}. {} [{}]\n", step.index, step.name, step.kind));
            if let Some(app) = &step.app {
                out.push_str(&format!("   App: {app}\n"));
            }
            if let Some(url) = &step.webhook_url {
                out.push_str(&format!("   Webhook URL: {url}\n"));
            }
            if let Some(cron) = &step.schedule {
                out.push_str(&format!("   Schedule: {cron}\n"));
            }
            if step.source.is_some() || step.options.is_some() {
                out.push_str("   Details:\n");
            }
            if let Some(source) = &step.source {
                out.push_str(&format!("   Source: {}\n", pretty(source)));
            }
            if let Some(options) = &step.options {
                out.push_str(&format!("   Options: {}\n", pretty(options)));
            }
            out.push_str(&rule);
            out.push('\n');
        }
        out
    })
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
