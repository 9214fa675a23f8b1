use anyhow::{Context, Result};
use pipeprobe::errors::PipeprobeError;
use pipeprobe::login::{self, Credentials, LoginStrategy};
use pipeprobe::project::{self, ProjectDescriptor};
use pipeprobe::workflow::WORKFLOWS_DIR;
use pipeprobe::{Browser, OutputFormat, RunLog, Settings, clicker};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::commands::utils;

const PROJECT_NAME_SELECTORS: &[&str] = &["textarea[placeholder=\"Project Name\"]", "textarea"];

#[derive(Debug, Serialize)]
pub struct CreatedProject {
    pub name: String,
    pub id: String,
    pub url: String,
    pub directory: PathBuf,
    pub config_file: PathBuf,
    pub run_id: String,
    pub log_file: PathBuf,
}

pub async fn handle_create_project(
    name: Option<String>,
    username: Option<String>,
    password: Option<String>,
    settings: &Settings,
    format: OutputFormat,
) -> Result<()> {
    let resolver = settings.resolver();
    let credentials =
        utils::login_credentials(&resolver, username.as_deref(), password.as_deref())?;
    let name = name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(project::default_project_name);

    let created = create_project(settings, &name, &credentials, None, &settings.workdir).await?;
    utils::print_output(&created, format, |p| {
        format!(
            "Project \"{}\" created successfully!\n  Project ID: {}\n  Directory: {}\n  Config file: {}\n  Log file: {}\n",
            p.name,
            p.id,
            p.directory.display(),
            p.config_file.display(),
            p.log_file.display()
        )
    })
}

/// Log in, create the project through the web UI and record it in
/// `<parent>/<name>/config.ini`.
///
/// The directory is only populated once the new project's id is known.
/// `api_key`, when given, is recorded as `[pipedream] apikey`.
pub async fn create_project(
    settings: &Settings,
    name: &str,
    credentials: &Credentials,
    api_key: Option<&str>,
    parent: &Path,
) -> Result<CreatedProject> {
    let log = RunLog::start(&settings.workdir, "create-project")?;
    log.log(format!(
        "Starting project creation process (Run ID: {})",
        log.run_id()
    ));
    let project_dir = parent.join(name);

    let browser = Browser::launch(settings).await?;
    let result = create_in_browser(&browser, settings, name, credentials, &log).await;
    let (id, url) = utils::finish(browser, &log, result).await?;

    let descriptor =
        ProjectDescriptor::new(name, &id, Some(&credentials.username)).with_api_key(api_key);
    let config_file = descriptor.write(&project_dir)?;
    let workflows = project_dir.join(WORKFLOWS_DIR);
    fs::create_dir_all(&workflows)
        .with_context(|| format!("Failed to create {}", workflows.display()))?;
    log.log(format!("Project configuration saved to {}", config_file.display()));

    Ok(CreatedProject {
        name: name.to_string(),
        id,
        url,
        directory: project_dir,
        config_file,
        run_id: log.run_id().to_string(),
        log_file: log.path().to_path_buf(),
    })
}

async fn create_in_browser(
    browser: &Browser,
    settings: &Settings,
    name: &str,
    credentials: &Credentials,
    log: &RunLog,
) -> Result<(String, String)> {
    log.log("Step 1: Logging in to Pipedream...");
    let outcome = login::login(
        browser,
        &settings.endpoints,
        credentials,
        LoginStrategy::Label,
        log,
    )
    .await?;
    if !outcome.success {
        anyhow::bail!("Login failed. Please check your credentials and try again.");
    }
    log.log("Login successful");

    log.log("Step 2: Navigating to projects page...");
    if !browser.current_url().await?.contains("/projects") {
        browser.goto(&settings.endpoints.projects_url(None)).await?;
    }
    log.save_screenshot(browser, "projects-page").await;

    log.log("Step 3: Opening the new project dialog...");
    let clicked = clicker::click(browser, &project::new_project_target()).await?;
    log.log(format!("Clicked New project via {}", clicked.strategy));
    if !browser
        .wait_for_selector("textarea", settings.timeout)
        .await?
        .is_ready()
    {
        log.log("Project name field did not appear in time");
    }
    log.save_screenshot(browser, "new-project-modal").await;

    log.log(format!("Step 4: Entering project name: {name}"));
    let selector = clicker::set_field_value(browser, PROJECT_NAME_SELECTORS, name)
        .await?
        .ok_or_else(|| PipeprobeError::ElementNotFound("project name field".to_string()))?;
    log.log(format!("Entered project name using selector: {selector}"));
    log.save_screenshot(browser, "project-name-entered").await;

    log.log("Step 5: Creating project...");
    let from = browser.current_url().await?;
    let clicked = clicker::click(browser, &project::create_project_target()).await?;
    log.log(format!("Clicked Create Project via {}", clicked.strategy));

    if !browser
        .wait_for_navigation(&from, settings.timeout)
        .await?
        .is_ready()
    {
        log.log("Navigation timeout - continuing anyway");
    }
    log.save_screenshot(browser, "after-project-creation").await;

    let url = browser.current_url().await?;
    log.log(format!("Current URL after project creation: {url}"));
    let settings_url = if project::extract_project_id(&url).is_none() {
        log.log("Project ID not found in URL, trying settings page...");
        open_settings(browser, settings, log).await?
    } else {
        None
    };

    let id = project::project_id_from_urls(&url, settings_url.as_deref()).with_context(|| {
        format!(
            "Could not determine the new project's ID from {url}; no project files were written"
        )
    })?;
    log.log(format!("Extracted project ID: {id}"));
    Ok((id, url))
}

/// Follow the project's Settings link, returning the URL it leads to
async fn open_settings(
    browser: &Browser,
    settings: &Settings,
    log: &RunLog,
) -> Result<Option<String>> {
    let from = browser.current_url().await?;
    if let Err(e) = clicker::click(browser, &project::settings_target()).await {
        log.log(format!("No Settings link to follow: {e:#}"));
        return Ok(None);
    }
    if !browser
        .wait_for_navigation(&from, settings.timeout)
        .await?
        .is_ready()
    {
        log.log("Settings page did not load in time");
    }
    log.save_screenshot(browser, "project-settings").await;

    let url = browser.current_url().await?;
    log.log(format!("Settings URL: {url}"));
    Ok(Some(url))
}
