//! Page-structure analyzers for the login and projects pages

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::clicker;
use crate::locator::{self, Candidate, DomNode};
use crate::project::{self, NEW_PROJECT_LABEL, PLUS_ICON_CLASS};
use crate::webdriver::Browser;

const LOGIN_PAGE_SCRIPT: &str = r#"
    const pathOf = (el) => {
        const parts = [];
        while (el && el.nodeType === Node.ELEMENT_NODE) {
            let part = el.nodeName.toLowerCase();
            if (el.id) part += '#' + el.id;
            else if (typeof el.className === 'string' && el.className.trim()) part += '.' + el.className.trim().split(/\s+/).join('.');
            parts.unshift(part);
            el = el.parentElement;
        }
        return parts.join(' > ');
    };
    const visible = (el) => el.offsetParent !== null;
    const describe = (el) => ({
        tag: el.tagName.toLowerCase(),
        type: el.getAttribute('type'),
        id: el.id || null,
        name: el.getAttribute('name'),
        placeholder: el.getAttribute('placeholder'),
        visible: visible(el),
        path: pathOf(el)
    });
    const emailish = '[id*="email" i], [name*="email" i], [placeholder*="email" i], [id*="username" i], [name*="username" i], [placeholder*="username" i]';
    return {
        title: document.title,
        url: window.location.href,
        forms: Array.from(document.querySelectorAll('form')).map(f => ({
            id: f.id || null, action: f.getAttribute('action'), method: f.getAttribute('method'), path: pathOf(f)
        })),
        inputs: Array.from(document.querySelectorAll('input, textarea')).map(describe),
        buttons: Array.from(document.querySelectorAll('button')).map(b => Object.assign(describe(b), { text: b.textContent.trim() })),
        textElements: Array.from(document.querySelectorAll('label, p, h1, h2, h3, h4, h5, h6'))
            .map(el => Object.assign(describe(el), { text: el.textContent.trim(), forId: el.htmlFor || null }))
            .filter(el => el.text !== ''),
        emailRelated: Array.from(document.querySelectorAll(emailish)).map(describe),
        markup: document.documentElement.outerHTML
    };
"#;

/// Third-party identity providers recognizable from page markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthProvider {
    Auth0,
    Okta,
    Firebase,
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthProvider::Auth0 => "Auth0",
            AuthProvider::Okta => "Okta",
            AuthProvider::Firebase => "Firebase",
        };
        write!(f, "{name}")
    }
}

/// First provider mentioned in the markup, checked in a fixed order
pub fn detect_auth_provider(markup: &str) -> Option<AuthProvider> {
    let markup = markup.to_lowercase();
    [
        ("auth0", AuthProvider::Auth0),
        ("okta", AuthProvider::Okta),
        ("firebase", AuthProvider::Firebase),
    ]
    .into_iter()
    .find(|(marker, _)| markup.contains(marker))
    .map(|(_, provider)| provider)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementInfo {
    pub tag: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub for_id: Option<String>,
    pub visible: bool,
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormInfo {
    pub id: Option<String>,
    pub action: Option<String>,
    pub method: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginPageReport {
    pub title: String,
    pub url: String,
    pub auth_provider: Option<AuthProvider>,
    pub forms: Vec<FormInfo>,
    pub inputs: Vec<ElementInfo>,
    pub buttons: Vec<ElementInfo>,
    pub text_elements: Vec<ElementInfo>,
    pub email_related: Vec<ElementInfo>,
    #[serde(skip_serializing)]
    pub markup: String,
}

impl LoginPageReport {
    /// Text elements that mention email, username or signing in
    pub fn relevant_text(&self) -> impl Iterator<Item = &ElementInfo> {
        self.text_elements.iter().filter(|el| {
            let text = el.text.as_deref().unwrap_or_default().to_lowercase();
            ["email", "username", "log in", "sign in"]
                .iter()
                .any(|word| text.contains(word))
        })
    }

    pub fn render_simple(&self) -> String {
        let mut out = String::new();
        let mut line = |s: String| {
            out.push_str(&s);
            out.push('\n');
        };

        line(format!("Page Title: {}", self.title));
        line(format!("URL: {}", self.url));
        line(format!(
            "Auth Provider: {}",
            self.auth_provider
                .map(|p| format!("{p} detected"))
                .unwrap_or_else(|| "No common auth provider detected".to_string())
        ));

        line(format!("\nForms ({}):", self.forms.len()));
        for (i, form) in self.forms.iter().enumerate() {
            line(format!(
                "  [{}] id={} method={} action={}",
                i + 1,
                form.id.as_deref().unwrap_or("-"),
                form.method.as_deref().unwrap_or("-"),
                form.action.as_deref().unwrap_or("-")
            ));
        }

        for (title, items) in [
            ("Inputs", self.inputs.iter().collect::<Vec<_>>()),
            ("Buttons", self.buttons.iter().collect()),
            ("Email-related elements", self.email_related.iter().collect()),
            ("Relevant text", self.relevant_text().collect()),
        ] {
            line(format!("\n{} ({}):", title, items.len()));
            for (i, el) in items.iter().enumerate() {
                line(format!("  [{}] {}", i + 1, summarize(el)));
            }
        }
        out
    }
}

fn summarize(el: &ElementInfo) -> String {
    let mut parts = vec![el.tag.clone()];
    for (key, value) in [
        ("type", &el.kind),
        ("id", &el.id),
        ("name", &el.name),
        ("placeholder", &el.placeholder),
        ("for", &el.for_id),
    ] {
        if let Some(value) = value {
            parts.push(format!("{key}={value}"));
        }
    }
    if let Some(text) = el.text.as_deref().filter(|t| !t.is_empty()) {
        parts.push(format!("\"{text}\""));
    }
    if !el.visible {
        parts.push("(hidden)".to_string());
    }
    parts.join(" ")
}

/// Describe the structure of the page currently loaded in `browser`
pub async fn analyze_login_page(browser: &Browser) -> Result<LoginPageReport> {
    let mut report: LoginPageReport = browser.execute_as(LOGIN_PAGE_SCRIPT, vec![]).await?;
    report.auth_provider = detect_auth_provider(&report.markup);
    Ok(report)
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub index: usize,
    pub tag: String,
    pub text: String,
    pub class_name: String,
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_tag: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ButtonSummary {
    pub index: usize,
    pub text: String,
    pub visible: bool,
    pub has_label_text: bool,
    pub has_plus_icon: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectsPageReport {
    pub url: String,
    pub label: String,
    /// Elements whose whole text is the label
    pub label_elements: Vec<NodeSummary>,
    pub plus_icons: Vec<NodeSummary>,
    pub buttons: Vec<ButtonSummary>,
    /// What the clicker would try, in order
    pub candidates: Vec<Candidate>,
}

impl ProjectsPageReport {
    /// Buttons that carry the label text or the plus icon
    pub fn relevant_buttons(&self) -> impl Iterator<Item = &ButtonSummary> {
        self.buttons.iter().filter(|b| b.has_label_text || b.has_plus_icon)
    }

    pub fn render_simple(&self) -> String {
        let mut out = format!("URL: {}\n", self.url);

        out.push_str(&format!(
            "\nElements with text \"{}\" ({}):\n",
            self.label,
            self.label_elements.len()
        ));
        for node in &self.label_elements {
            out.push_str(&format!(
                "  #{} <{}> parent=<{}> visible={}\n",
                node.index,
                node.tag,
                node.parent_tag.as_deref().unwrap_or("-"),
                node.visible
            ));
        }

        let relevant: Vec<_> = self.relevant_buttons().collect();
        out.push_str(&format!("\nRelevant buttons ({}):\n", relevant.len()));
        for button in relevant {
            out.push_str(&format!(
                "  #{} \"{}\" label_text={} plus_icon={} visible={}\n",
                button.index,
                button.text,
                button.has_label_text,
                button.has_plus_icon,
                button.visible
            ));
        }

        out.push_str(&format!("\nPlus icons ({}):\n", self.plus_icons.len()));
        for node in &self.plus_icons {
            out.push_str(&format!(
                "  #{} <{}> in <{}>\n",
                node.index,
                node.tag,
                node.parent_tag.as_deref().unwrap_or("-")
            ));
        }

        out.push_str(&format!("\nTotal buttons: {}\n", self.buttons.len()));
        for button in self.buttons.iter().take(10) {
            out.push_str(&format!("  \"{}\"\n", button.text));
        }

        out.push_str(&format!("\nClick candidates ({}):\n", self.candidates.len()));
        for (i, candidate) in self.candidates.iter().enumerate() {
            out.push_str(&format!(
                "  [{}] {}: {}\n",
                i + 1,
                candidate.strategy,
                candidate.description
            ));
        }
        out
    }
}

/// Build the projects page report from a DOM snapshot
pub fn projects_report(url: &str, nodes: &[DomNode]) -> ProjectsPageReport {
    let label = locator::normalize(NEW_PROJECT_LABEL);
    let summary = |node: &DomNode| NodeSummary {
        index: node.index,
        tag: node.tag.clone(),
        text: node.text.clone(),
        class_name: node.class_name.clone(),
        visible: node.visible,
        parent_tag: node
            .parent
            .and_then(|p| nodes.get(p))
            .map(|p| p.tag.clone()),
    };

    let plus_icons: Vec<&DomNode> = nodes.iter().filter(|n| n.has_class(PLUS_ICON_CLASS)).collect();

    // Every ancestor of a plus icon "has" the icon
    let mut with_icon = HashSet::new();
    for icon in &plus_icons {
        let mut current = icon.parent;
        while let Some(index) = current {
            if !with_icon.insert(index) {
                break;
            }
            current = nodes.get(index).and_then(|n| n.parent);
        }
    }

    let buttons = nodes
        .iter()
        .filter(|n| n.tag == "button")
        .map(|n| ButtonSummary {
            index: n.index,
            text: n.text.clone(),
            visible: n.visible,
            has_label_text: locator::normalize(&n.text).contains(&label),
            has_plus_icon: with_icon.contains(&n.index),
        })
        .collect();

    ProjectsPageReport {
        url: url.to_string(),
        label: NEW_PROJECT_LABEL.to_string(),
        label_elements: nodes
            .iter()
            .filter(|n| locator::normalize(&n.text) == label)
            .map(summary)
            .collect(),
        plus_icons: plus_icons.into_iter().map(summary).collect(),
        buttons,
        candidates: locator::rank_candidates(nodes, &project::new_project_target()),
    }
}

pub async fn analyze_projects_page(browser: &Browser) -> Result<ProjectsPageReport> {
    let nodes = clicker::snapshot(browser).await?;
    let url = browser.current_url().await?;
    Ok(projects_report(&url, &nodes))
}

#[cfg(test)]
#[path = "analyze_test.rs"]
mod analyze_test;
