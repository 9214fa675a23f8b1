//! Login strategies for the product's web UI
//!
//! Every strategy only fills and submits the login form; success is judged
//! afterwards by [`verify`].

use anyhow::Result;
use fantoccini::key::Key;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::clicker;
use crate::config::Endpoints;
use crate::locator::Target;
use crate::runlog::RunLog;
use crate::types::Rect;
use crate::webdriver::Browser;

/// Pixels below the "Email" label where its input is drawn
pub const EMAIL_FIELD_OFFSET: f64 = 25.0;

/// How long the keyboard pass gets before the value-setting fallback runs
const KEYBOARD_SETTLE: Duration = Duration::from_secs(10);

pub const EMAIL_SELECTORS: &[&str] = &[
    "input[type=\"email\"]",
    "input[name=\"email\"]",
    "input[id=\"email\"]",
    "input[name=\"username\"]",
    "input[id=\"username\"]",
    "input[placeholder*=\"email\" i]",
    "input[placeholder*=\"username\" i]",
    "input:not([type=\"password\"]):not([type=\"hidden\"])",
];

pub const PASSWORD_SELECTORS: &[&str] = &["input[type=\"password\"]", "#password"];

const SUBMIT_SCRIPT: &str = r#"
    const btn = document.querySelector('button[type="submit"], input[type="submit"]');
    if (btn) { btn.click(); return true; }
    return false;
"#;

const FORM_AREA_SCRIPT: &str = r#"
    const el = document.querySelector('form') || document.querySelector('div[role="form"]') || document.body;
    const r = el.getBoundingClientRect();
    return { x: r.left, y: r.top, width: r.width, height: r.height };
"#;

const FOCUS_NEAR_LABEL_SCRIPT: &str = r#"
    const wanted = arguments[0].toLowerCase();
    const label = Array.from(document.querySelectorAll('label'))
        .find(l => l.textContent.trim().toLowerCase() === wanted);
    if (!label) return false;
    let parent = label.parentElement;
    for (let i = 0; i < 5 && parent; i++) {
        const input = parent.querySelector('input:not([type="hidden"])');
        if (input) { input.focus(); input.click(); return true; }
        parent = parent.parentElement;
    }
    return false;
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LoginStrategy {
    /// Click the "Email" label, then the field below it, then type and tab through
    Label,
    /// Click the form area and type with Tab between fields
    Keyboard,
    /// Set field values through selectors on the login page and submit
    Simple,
    /// Same as `simple`, on the sign-in page
    Direct,
    /// Focus an input near the "Email" label, else behave like `label`
    Targeted,
}

pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub success: bool,
    pub strategy: LoginStrategy,
    pub url: String,
    /// URL still looked like a login page but logged-in UI was present
    pub detected_by_probe: bool,
}

/// URLs of the login and sign-in pages
pub fn is_login_url(url: &str) -> bool {
    url.contains("login") || url.contains("signin")
}

/// Run `strategy` against the login page and report whether it worked
pub async fn login(
    browser: &Browser,
    endpoints: &Endpoints,
    credentials: &Credentials,
    strategy: LoginStrategy,
    log: &RunLog,
) -> Result<LoginOutcome> {
    let start_url = match strategy {
        LoginStrategy::Direct => endpoints.signin_url(),
        _ => endpoints.login_url(),
    };
    log.log(format!("Navigating to {start_url}"));
    browser.goto(&start_url).await?;
    log.save_screenshot(browser, "login-page").await;
    let from = browser.current_url().await?;

    match strategy {
        LoginStrategy::Label => label_login(browser, credentials).await?,
        LoginStrategy::Keyboard => keyboard_login(browser, credentials, log).await?,
        LoginStrategy::Simple | LoginStrategy::Direct => {
            fill_and_submit(browser, credentials, log).await?
        }
        LoginStrategy::Targeted => targeted_login(browser, credentials, log).await?,
    }
    log.log("Login form submitted, waiting for navigation...");

    if !browser.wait_for_navigation(&from, browser.timeout()).await?.is_ready() {
        log.log("Navigation timeout - continuing anyway");
    }

    let outcome = verify(browser, strategy).await?;
    log.log(format!("Current URL after login: {}", outcome.url));
    log.save_screenshot(browser, "after-login").await;
    if outcome.detected_by_probe {
        log.log("URL still shows login page but UI elements indicate successful login");
    }
    Ok(outcome)
}

/// Logged in when the URL left the login pages or post-login UI is present
pub async fn verify(browser: &Browser, strategy: LoginStrategy) -> Result<LoginOutcome> {
    let url = browser.current_url().await?;
    if !is_login_url(&url) {
        return Ok(LoginOutcome {
            success: true,
            strategy,
            url,
            detected_by_probe: false,
        });
    }

    let probed = clicker::is_logged_in(browser).await?;
    Ok(LoginOutcome {
        success: probed,
        strategy,
        url,
        detected_by_probe: probed,
    })
}

async fn type_credentials(browser: &Browser, credentials: &Credentials) -> Result<()> {
    browser.type_text(&credentials.username).await?;
    browser.press(Key::Tab).await?;
    browser.type_text(&credentials.password).await?;
    Ok(())
}

async fn label_login(browser: &Browser, credentials: &Credentials) -> Result<()> {
    clicker::focus_below_label(browser, "Email", EMAIL_FIELD_OFFSET).await?;
    type_credentials(browser, credentials).await?;
    browser.press(Key::Tab).await?;
    browser.press(Key::Enter).await
}

async fn keyboard_login(browser: &Browser, credentials: &Credentials, log: &RunLog) -> Result<()> {
    let from = browser.current_url().await?;
    let area: Rect = browser.execute_as(FORM_AREA_SCRIPT, vec![]).await?;
    clicker::click_point(browser, area.center_x(), area.center_y()).await?;
    type_credentials(browser, credentials).await?;
    browser.press(Key::Enter).await?;

    if browser
        .wait_for_navigation(&from, browser.timeout().min(KEYBOARD_SETTLE))
        .await?
        .is_ready()
        && !is_login_url(&browser.current_url().await?)
    {
        return Ok(());
    }

    log.log("Still on login page. Setting field values directly...");
    fill_and_submit(browser, credentials, log).await
}

async fn fill_and_submit(browser: &Browser, credentials: &Credentials, log: &RunLog) -> Result<()> {
    match clicker::set_field_value(browser, EMAIL_SELECTORS, &credentials.username).await? {
        Some(selector) => log.log(format!("Filled email using selector: {selector}")),
        None => log.log("No email field found"),
    }
    match clicker::set_field_value(browser, PASSWORD_SELECTORS, &credentials.password).await? {
        Some(_) => log.log("Filled password field"),
        None => log.log("No password field found"),
    }
    submit(browser, log).await
}

/// Submit button, then a heuristic "Sign in" click, then Enter
async fn submit(browser: &Browser, log: &RunLog) -> Result<()> {
    if browser.execute(SUBMIT_SCRIPT, vec![]).await?.as_bool() == Some(true) {
        log.log("Clicked submit button");
        return Ok(());
    }

    for label in ["Sign in", "Log in", "Continue"] {
        if let Ok(candidate) = clicker::click(browser, &Target::text(label)).await {
            log.log(format!("Clicked '{label}' via {}", candidate.strategy));
            return Ok(());
        }
    }

    log.log("No submit control found, pressing Enter");
    browser.press(Key::Enter).await
}

async fn targeted_login(browser: &Browser, credentials: &Credentials, log: &RunLog) -> Result<()> {
    let focused = browser
        .execute(FOCUS_NEAR_LABEL_SCRIPT, vec![serde_json::json!("Email")])
        .await?
        .as_bool()
        .unwrap_or(false);

    if focused {
        log.log("Focused input near the Email label");
        type_credentials(browser, credentials).await?;
        browser.press(Key::Tab).await?;
        browser.press(Key::Enter).await
    } else {
        debug!("No input near the Email label, clicking below it");
        log.log("Falling back to clicking below the Email label");
        label_login(browser, credentials).await
    }
}

#[cfg(test)]
#[path = "login_test.rs"]
mod login_test;
