use anyhow::Result;
use pipeprobe::workflow::{self, Lookup, TriggerView};
use pipeprobe::{OutputFormat, Settings};
use serde::Serialize;

use crate::commands::utils;

#[derive(Serialize)]
struct TriggerListing {
    workflow_id: String,
    name: String,
    triggers: Vec<TriggerView>,
}

pub async fn handle_list_triggers(
    workflow: Option<String>,
    project: Option<String>,
    api_key: Option<String>,
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

    let listing = TriggerListing {
        name: details.name.clone().unwrap_or_else(|| "Unnamed Workflow".to_string()),
        triggers: workflow::trigger_views(&details, &settings.endpoints, &id),
        workflow_id: id,
    };

    utils::print_output(&listing, format, |l| {
        let rule = "-".repeat(50);
        let mut out = format!("Workflow: {} ({})\n", l.name, l.workflow_id);
        if l.triggers.is_empty() {
            out.push_str("No triggers found for this workflow.\n");
            return out;
        }

        out.push_str(&format!("\nTriggers:\n{rule}\n"));
        for trigger in &l.triggers {
            out.push_str(&format!(
                "Trigger #{}: {} ({})\n",
                trigger.index, trigger.app, trigger.kind
            ));
            if let Some(url) = &trigger.webhook_url {
                out.push_str(&format!("Webhook URL: {url}\n"));
            }
            if let Some(cron) = &trigger.schedule {
                out.push_str(&format!("Schedule: {cron}\n"));
            }
            if let Some(config) = &trigger.configuration {
                out.push_str("Configuration:\n");
                out.push_str(&serde_json::to_string_pretty(config).unwrap_or_default());
                out.push('\n');
            }
            out.push_str(&rule);
            out.push('\n');
        }
        out
    })
}
