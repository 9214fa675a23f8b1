use anyhow::Result;
use pipeprobe::analyze::{self, ProjectsPageReport};
use pipeprobe::login::{self, LoginStrategy};
use pipeprobe::{Browser, OutputFormat, RunLog, Settings};

use crate::commands::utils;

pub async fn handle_analyze_login(settings: &Settings, format: OutputFormat) -> Result<()> {
    let log = RunLog::start(&settings.workdir, "analyze-login")?;
    let browser = Browser::launch(settings).await?;

    let result = async {
        let url = settings.endpoints.login_url();
        log.log(format!("Navigating to {url}"));
        browser.goto(&url).await?;
        log.save_screenshot(&browser, "login-page-analysis").await;
        analyze::analyze_login_page(&browser).await
    }
    .await;
    let report = utils::finish(browser, &log, result).await?;

    log.log(format!(
        "Found {} forms, {} inputs, {} buttons",
        report.forms.len(),
        report.inputs.len(),
        report.buttons.len()
    ));
    utils::print_output(&report, format, |r| r.render_simple())
}

pub async fn handle_analyze_projects(
    username: Option<String>,
    password: Option<String>,
    settings: &Settings,
    format: OutputFormat,
) -> Result<()> {
    let resolver = settings.resolver();
    let credentials =
        utils::login_credentials(&resolver, username.as_deref(), password.as_deref())?;
    let workspace = resolver
        .config()
        .and_then(|c| c.get("pipedream", "workspace"))
        .map(str::to_string);

    let log = RunLog::start(&settings.workdir, "analyze-projects")?;
    let browser = Browser::launch(settings).await?;

    let result: Result<ProjectsPageReport> = async {
        let outcome = login::login(
            &browser,
            &settings.endpoints,
            &credentials,
            LoginStrategy::Label,
            &log,
        )
        .await?;
        if outcome.success {
            log.log("Successfully navigated away from login page.");
        } else {
            log.log("Still on login page. Login may have failed. Will try to continue anyway...");
        }

        let url = settings.endpoints.projects_url(workspace.as_deref());
        log.log(format!("Navigating to projects page: {url}"));
        browser.goto(&url).await?;
        log.save_screenshot(&browser, "projects-page-analysis").await;
        analyze::analyze_projects_page(&browser).await
    }
    .await;
    let report = utils::finish(browser, &log, result).await?;

    log.log(format!(
        "Found {} \"{}\" elements and {} click candidates",
        report.label_elements.len(),
        report.label,
        report.candidates.len()
    ));
    utils::print_output(&report, format, |r| r.render_simple())
}
