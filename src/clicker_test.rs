use super::*;

#[test]
fn test_snapshot_script_emits_every_node_field() {
    let node = serde_json::to_value(DomNode::default()).unwrap();
    for field in node.as_object().unwrap().keys() {
        assert!(
            SNAPSHOT_SCRIPT.contains(&format!("{field}:")),
            "snapshot script does not set `{field}`"
        );
    }
}

#[test]
fn test_snapshot_script_marks_provider_and_dialog_blocks() {
    assert!(SNAPSHOT_SCRIPT.contains(r#"[data-provider="google"]"#));
    assert!(SNAPSHOT_SCRIPT.contains(r#"[role="dialog"]"#));
}
