use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn details(components: Value) -> WorkflowDetails {
    serde_json::from_value(json!({ "id": "p_wf1", "name": "Hooks", "components": components }))
        .unwrap()
}

#[test]
fn test_no_trigger_without_type() {
    assert_eq!(TriggerSpec::resolve(None, None, None, &env(&[])), None);
}

#[test]
fn test_http_trigger_gets_random_path() {
    let trigger = TriggerSpec::resolve(Some("http"), None, None, &env(&[])).unwrap();
    let TriggerSpec::Http { path } = trigger else {
        panic!("expected http trigger");
    };
    assert_eq!(path.len(), 16);
    assert!(path.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_http_trigger_keeps_supplied_path() {
    let trigger = TriggerSpec::resolve(Some("http"), Some("inbound"), None, &env(&[])).unwrap();
    assert_eq!(
        trigger,
        TriggerSpec::Http {
            path: "inbound".to_string()
        }
    );
}

#[test]
fn test_schedule_falls_back_to_environment_and_strips_quotes() {
    let vars = env(&[
        ("DEFAULT_TRIGGER_TYPE", "schedule"),
        ("DEFAULT_SCHEDULE", "\"*/5 * * * *\""),
    ]);
    let trigger = TriggerSpec::resolve(None, None, None, &vars).unwrap();
    assert_eq!(
        trigger,
        TriggerSpec::Schedule {
            cron: "*/5 * * * *".to_string()
        }
    );
}

#[test]
fn test_schedule_default_cron() {
    let trigger = TriggerSpec::resolve(Some("schedule"), None, None, &env(&[])).unwrap();
    assert_eq!(
        trigger,
        TriggerSpec::Schedule {
            cron: DEFAULT_CRON.to_string()
        }
    );
}

#[test]
fn test_unknown_trigger_type_is_dropped() {
    assert_eq!(TriggerSpec::resolve(Some("email"), None, None, &env(&[])), None);
}

#[test]
fn test_trigger_components() {
    let http = TriggerSpec::Http {
        path: "abc".to_string(),
    }
    .component("Inbox");
    assert_eq!(
        serde_json::to_value(&http).unwrap(),
        json!({
            "key": "trigger",
            "type": "source",
            "app": "http",
            "source": { "type": "webhook", "name": "Inbox HTTP Webhook", "key": "http-webhook" }
        })
    );

    let cron = TriggerSpec::Schedule {
        cron: "0 9 * * 1".to_string(),
    }
    .component("Weekly");
    assert_eq!(
        serde_json::to_value(&cron).unwrap()["source"],
        json!({ "type": "cron", "name": "Weekly Schedule", "key": "schedule", "cron": "0 9 * * 1" })
    );
}

#[test]
fn test_record_write_creates_json_and_placeholder() {
    let dir = TempDir::new().unwrap();
    let record = WorkflowRecord {
        id: "p_wf1".to_string(),
        name: "Inbox".to_string(),
        created_at: Utc::now(),
        project_id: "proj_1".to_string(),
        description: String::new(),
        trigger: Some(TriggerRecord {
            kind: "http".to_string(),
            path: Some("abc".to_string()),
            schedule: None,
        }),
        webhook_url: Some("https://webhook.pipedream.com/v1/sources/p_wf1/events".to_string()),
    };

    let written = record.write(dir.path()).unwrap();
    assert_eq!(written, dir.path().join("workflows").join("p_wf1"));

    let read_back = WorkflowRecord::read(&written.join("workflow.json")).unwrap();
    assert_eq!(read_back, record);

    let code = std::fs::read_to_string(written.join("code.js")).unwrap();
    assert!(code.contains("Workflow ID: p_wf1"));
}

#[test]
fn test_discover_prefers_explicit_id() {
    let dir = TempDir::new().unwrap();
    assert_eq!(
        discover_workflow_id(Some("p_given"), dir.path()).as_deref(),
        Some("p_given")
    );
}

#[test]
fn test_discover_reads_local_record() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("workflow.json"),
        json!({
            "id": "p_local",
            "name": "Local",
            "created_at": "2025-01-01T00:00:00Z",
            "project_id": "proj_1"
        })
        .to_string(),
    )
    .unwrap();

    assert_eq!(
        discover_workflow_id(None, dir.path()).as_deref(),
        Some("p_local")
    );
}

#[test]
fn test_discover_uses_directory_under_workflows() {
    let dir = TempDir::new().unwrap();
    let wf_dir = dir.path().join("workflows").join("p_fromdir");
    std::fs::create_dir_all(&wf_dir).unwrap();

    assert_eq!(
        discover_workflow_id(None, &wf_dir).as_deref(),
        Some("p_fromdir")
    );
    assert_eq!(discover_workflow_id(None, dir.path()), None);
}

#[test]
fn test_looks_like_project_id() {
    assert!(looks_like_project_id("proj_abc"));
    assert!(looks_like_project_id("p_abc"));
    assert!(!looks_like_project_id("wf_abc"));
}

#[test]
fn test_step_views_describe_each_component() {
    let details = details(json!([
        { "key": "trigger", "type": "source", "app": "http",
          "source": { "type": "webhook", "name": "Inbox HTTP Webhook" } },
        { "key": "send_mail", "type": "action", "app": "gmail" },
        { "type": "code" },
        { "app": "schedule", "source": { "type": "cron", "cron": "0 0 * * *" } }
    ]));

    let steps = step_views(&details, &Endpoints::default(), "p_wf1", false);
    let summary: Vec<(usize, &str, &str)> = steps
        .iter()
        .map(|s| (s.index, s.name.as_str(), s.kind.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (1, "Inbox HTTP Webhook", "Trigger"),
            (2, "gmail send_mail", "Action"),
            (3, "Unnamed Component", "Code"),
            (4, "Unnamed Component", "Trigger (cron)"),
        ]
    );
    assert_eq!(
        steps[0].webhook_url.as_deref(),
        Some("https://webhook.pipedream.com/v1/sources/p_wf1/events")
    );
    assert_eq!(steps[3].schedule.as_deref(), Some("0 0 * * *"));
    assert!(steps[0].source.is_none());
}

#[test]
fn test_step_views_detailed_carry_source() {
    let details = details(json!([
        { "key": "trigger", "type": "source", "app": "http", "source": { "type": "webhook" },
          "options": { "response": "default" } }
    ]));
    let steps = step_views(&details, &Endpoints::default(), "p_wf1", true);
    assert!(steps[0].source.is_some());
    assert_eq!(steps[0].options, Some(json!({ "response": "default" })));
}

#[test]
fn test_trigger_views_filter_and_describe() {
    let details = details(json!([
        { "key": "trigger", "type": "source", "app": "schedule",
          "source": { "type": "cron", "cron": "0 6 * * *" } },
        { "key": "step_1", "type": "action", "app": "slack" },
        { "type": "trigger", "app": "http" },
        { "type": "trigger", "app": "schedule", "options": { "cron": "*/10 * * * *" } }
    ]));

    let triggers = trigger_views(&details, &Endpoints::default(), "p_wf1");
    assert_eq!(triggers.len(), 3);

    assert_eq!(triggers[0].kind, "cron");
    assert_eq!(triggers[0].schedule.as_deref(), Some("0 6 * * *"));
    assert_eq!(triggers[1].index, 2);
    assert_eq!(triggers[1].kind, "trigger");
    assert!(triggers[1].webhook_url.is_some());
    assert!(triggers[1].configuration.is_none());
    assert_eq!(triggers[2].schedule.as_deref(), Some("*/10 * * * *"));
    assert_eq!(triggers[2].configuration, Some(json!({ "cron": "*/10 * * * *" })));
}

#[test]
fn test_default_workflow_name_has_date() {
    let name = default_workflow_name();
    assert!(name.starts_with("Workflow_"));
    assert_eq!(name.len(), "Workflow_2025-01-01".len());
}
