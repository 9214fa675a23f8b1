use super::*;
use crate::types::Rect;
use pretty_assertions::assert_eq;

fn node(index: usize, parent: Option<usize>, tag: &str, text: &str, class: &str) -> DomNode {
    DomNode {
        index,
        parent,
        tag: tag.to_string(),
        text: text.to_string(),
        class_name: class.to_string(),
        visible: true,
        rect: Rect {
            x: 0.0,
            y: 30.0 * index as f64,
            width: 120.0,
            height: 24.0,
        },
        ..Default::default()
    }
}

#[test]
fn test_detect_auth_provider() {
    assert_eq!(
        detect_auth_provider(r#"<script src="https://cdn.AUTH0.com/js/lock.js">"#),
        Some(AuthProvider::Auth0)
    );
    assert_eq!(
        detect_auth_provider("<div data-idp=okta></div> firebase"),
        Some(AuthProvider::Okta)
    );
    assert_eq!(detect_auth_provider("<form><input></form>"), None);
}

#[test]
fn test_login_report_from_script_shape() {
    let report: LoginPageReport = serde_json::from_value(serde_json::json!({
        "title": "Log in",
        "url": "https://pipedream.com/auth/login",
        "forms": [{ "id": null, "action": "/auth", "method": "post", "path": "html > body > form" }],
        "inputs": [{ "tag": "input", "type": "email", "name": "email", "visible": true, "path": "form > input" }],
        "buttons": [],
        "textElements": [
            { "tag": "label", "text": "Email", "forId": "email", "visible": true, "path": "label" },
            { "tag": "p", "text": "Welcome back", "visible": true, "path": "p" },
            { "tag": "h1", "text": "Sign in to Pipedream", "visible": true, "path": "h1" }
        ],
        "emailRelated": [],
        "markup": "<html>firebase</html>"
    }))
    .unwrap();

    let relevant: Vec<&str> = report
        .relevant_text()
        .filter_map(|el| el.text.as_deref())
        .collect();
    assert_eq!(relevant, vec!["Email", "Sign in to Pipedream"]);
    assert_eq!(report.inputs[0].kind.as_deref(), Some("email"));

    let json = serde_json::to_value(&report).unwrap();
    assert!(json.get("markup").is_none());
}

#[test]
fn test_login_report_simple_rendering() {
    let report = LoginPageReport {
        title: "Log in".to_string(),
        url: "https://pipedream.com/auth/login".to_string(),
        auth_provider: Some(AuthProvider::Auth0),
        inputs: vec![ElementInfo {
            tag: "input".to_string(),
            kind: Some("password".to_string()),
            visible: false,
            ..Default::default()
        }],
        ..Default::default()
    };

    let text = report.render_simple();
    assert!(text.contains("Auth Provider: Auth0 detected"));
    assert!(text.contains("[1] input type=password (hidden)"));
    assert!(text.contains("Buttons (0):"));
}

#[test]
fn test_projects_report() {
    let mut plus = node(3, Some(2), "i", "", "i-mdi-plus-thick");
    plus.visible = true;
    let nodes = vec![
        node(0, None, "body", "New project Settings", ""),
        node(1, Some(0), "button", "New project", ""),
        node(2, Some(1), "div", "New project", "h-full flex"),
        plus,
        node(4, Some(2), "span", "New project", "whitespace-nowrap"),
        node(5, Some(0), "button", "Settings", ""),
    ];

    let report = projects_report("https://pipedream.com/@acme/projects", &nodes);

    let labelled: Vec<usize> = report.label_elements.iter().map(|n| n.index).collect();
    assert_eq!(labelled, vec![1, 2, 4]);
    assert_eq!(report.label_elements[2].parent_tag.as_deref(), Some("div"));

    assert_eq!(report.plus_icons.len(), 1);
    assert_eq!(report.buttons.len(), 2);
    let relevant: Vec<usize> = report.relevant_buttons().map(|b| b.index).collect();
    assert_eq!(relevant, vec![1]);
    assert!(report.buttons[0].has_plus_icon);
    assert!(!report.buttons[1].has_plus_icon);

    assert_eq!(report.candidates[0].strategy, locator::Strategy::ExactText);
    assert!(report.render_simple().contains("Total buttons: 2"));
}
