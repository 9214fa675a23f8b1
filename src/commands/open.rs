use anyhow::Result;
use pipeprobe::api::ApiClient;
use pipeprobe::config::Credential;
use pipeprobe::login::{self, Credentials, LoginStrategy};
use pipeprobe::{Browser, RunLog, Settings};
use tracing::warn;

use crate::commands::utils;

/// localStorage key the web app reads its API key from
const API_KEY_STORAGE_KEY: &str = "pd_api_key";

pub async fn handle_open(
    project: Option<String>,
    api_key: Option<String>,
    username: Option<String>,
    password: Option<String>,
    settings: &Settings,
) -> Result<()> {
    let resolver = settings.resolver();
    let project_id = resolver.require(Credential::ProjectId, project.as_deref())?.value;
    let project_name = resolver
        .config()
        .and_then(|c| c.get("project", "name"))
        .map(str::to_string);

    let api_key = resolver
        .resolve(Credential::ApiKey, api_key.as_deref())
        .map(|r| r.value);
    let username = resolver
        .resolve(Credential::Username, username.as_deref())
        .map(|r| r.value);
    if api_key.is_none() && username.is_none() {
        resolver.require(Credential::ApiKey, None)?;
    }
    let credentials = match username {
        Some(username) => Some(Credentials {
            username,
            password: resolver.require(Credential::Password, password.as_deref())?.value,
        }),
        None => None,
    };

    let log = RunLog::start(&settings.workdir, "open-project")?;
    log.log(format!(
        "Starting project opening process (Run ID: {})",
        log.run_id()
    ));

    let browser = Browser::launch(settings).await?;
    let result = open_project(
        &browser,
        settings,
        &project_id,
        api_key.as_deref(),
        credentials.as_ref(),
        &log,
    )
    .await;

    let title = match result {
        Ok(title) => title,
        Err(e) => return utils::finish(browser, &log, Err(e)).await,
    };
    let project_name = project_name.or(title).unwrap_or_else(|| "Unknown Project".to_string());

    log.log("Project opened successfully!");
    eprintln!("Project \"{}\" opened successfully!", project_name);
    eprintln!("  Project ID: {}", project_id);
    eprintln!("  Log file: {}", log.path().display());
    eprintln!("  Press Ctrl+C here or close the window when you are done.");

    browser.wait_for_close().await?;
    utils::finish(browser, &log, Ok(())).await
}

/// Authenticate and land on the project page, returning the page title
async fn open_project(
    browser: &Browser,
    settings: &Settings,
    project_id: &str,
    api_key: Option<&str>,
    credentials: Option<&Credentials>,
    log: &RunLog,
) -> Result<Option<String>> {
    let endpoints = &settings.endpoints;
    let project_url = endpoints.workflow_url(project_id);
    log.log(format!("Opening project with ID: {project_id}"));

    let mut opened = false;
    if let Some(key) = api_key {
        log.log("Using API key authentication");
        match open_with_api_key(browser, settings, key, &project_url, log).await {
            Ok(()) => opened = true,
            Err(e) => {
                log.log(format!("API key authentication failed: {e:#}"));
                if credentials.is_none() {
                    anyhow::bail!(
                        "Authentication failed and no username/password fallback available"
                    );
                }
                log.log("Falling back to username/password authentication");
            }
        }
    }

    if !opened && let Some(credentials) = credentials {
        let outcome =
            login::login(browser, endpoints, credentials, LoginStrategy::Label, log).await?;
        if !outcome.success {
            anyhow::bail!("Login failed");
        }
        log.log("Login successful");
        log.log(format!("Navigating to project: {project_id}"));
        browser.goto(&project_url).await?;
        log.save_screenshot(browser, "project-page").await;
    }

    let final_url = browser.current_url().await?;
    log.log(format!("Final URL: {final_url}"));
    if !final_url.contains(project_id) {
        log.log("WARNING: Final URL does not contain the project ID");
    }

    match browser.title().await {
        Ok(title) => {
            let title = title.replace(" | Pipedream", "").trim().to_string();
            Ok(Some(title).filter(|t| !t.is_empty()))
        }
        Err(e) => {
            warn!("Could not read page title: {:#}", e);
            Ok(None)
        }
    }
}

async fn open_with_api_key(
    browser: &Browser,
    settings: &Settings,
    api_key: &str,
    project_url: &str,
    log: &RunLog,
) -> Result<()> {
    let client = ApiClient::new(&settings.endpoints.api_base, api_key)?;
    let user = client.whoami().await?;
    log.log(format!(
        "Authenticated as: {}",
        user.email.as_deref().unwrap_or("unknown user")
    ));

    browser.goto(&settings.endpoints.home_url()).await?;
    browser.set_local_storage(API_KEY_STORAGE_KEY, api_key).await?;
    browser.goto(project_url).await?;
    log.save_screenshot(browser, "project-page").await;

    if login::is_login_url(&browser.current_url().await?) {
        anyhow::bail!("API key authentication failed, redirected to login page");
    }
    Ok(())
}
