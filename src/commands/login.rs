use anyhow::Result;
use pipeprobe::login::{self, LoginStrategy};
use pipeprobe::{Browser, OutputFormat, RunLog, Settings};
use serde::Serialize;
use std::path::PathBuf;

use crate::commands::utils;

#[derive(Serialize)]
struct LoginReport {
    #[serde(flatten)]
    outcome: login::LoginOutcome,
    run_id: String,
    log_file: PathBuf,
}

pub async fn handle_login(
    username: Option<String>,
    password: Option<String>,
    strategy: LoginStrategy,
    settings: &Settings,
    format: OutputFormat,
) -> Result<()> {
    let resolver = settings.resolver();
    let credentials =
        utils::login_credentials(&resolver, username.as_deref(), password.as_deref())?;

    let log = RunLog::start(&settings.workdir, "login")?;
    log.log(format!(
        "Starting login test with {:?} strategy (Run ID: {})",
        strategy,
        log.run_id()
    ));

    let browser = Browser::launch(settings).await?;
    let result = login::login(&browser, &settings.endpoints, &credentials, strategy, &log).await;
    let outcome = utils::finish(browser, &log, result).await?;

    if !outcome.success {
        log.log("Still on login page, login failed");
        anyhow::bail!(
            "Login failed at {}. Please check your credentials and try again. Log file: {}",
            outcome.url,
            log.path().display()
        );
    }
    log.log("Login successful");

    let report = LoginReport {
        outcome,
        run_id: log.run_id().to_string(),
        log_file: log.path().to_path_buf(),
    };
    utils::print_output(&report, format, |r| {
        let via = if r.outcome.detected_by_probe {
            " (detected from page content)"
        } else {
            ""
        };
        format!(
            "Login succeeded with {:?} strategy{}\n  URL: {}\n  Log file: {}\n",
            r.outcome.strategy,
            via,
            r.outcome.url,
            r.log_file.display()
        )
    })
}
