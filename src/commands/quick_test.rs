use anyhow::Result;
use pipeprobe::errors::PipeprobeError;
use pipeprobe::interrupt;
use pipeprobe::{Browser, OutputFormat, RunLog, Settings};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::info;

use crate::commands::utils;

const SMOKE_URL: &str = "https://www.google.com";
const HOLD_TICK: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
pub struct StepResult {
    pub name: String,
    pub url: String,
    pub loaded: bool,
    pub elapsed_ms: u128,
    pub screenshot: Option<String>,
}

#[derive(Debug, Serialize)]
struct QuickTestReport {
    browser: String,
    run_id: String,
    steps: Vec<StepResult>,
}

/// Open a browser, load two pages and optionally keep the window around
/// for `hold` seconds to check it stays open
pub async fn handle_quick_test(hold: u64, settings: &Settings, format: OutputFormat) -> Result<()> {
    let log = RunLog::start(&settings.workdir, "quick-test")?;
    log.log("Starting quick browser test");

    let browser = Browser::launch(settings).await?;
    log.log("Browser opened successfully");

    let result = async {
        let mut steps = Vec::new();
        for (name, url) in [
            ("smoke-page", SMOKE_URL.to_string()),
            ("pipedream-home", settings.endpoints.home_url()),
        ] {
            steps.push(load(&browser, &log, name, &url).await?);
        }
        if hold > 0 {
            hold_open(&browser, &log, Duration::from_secs(hold)).await?;
        }
        Ok::<_, anyhow::Error>(steps)
    }
    .await;
    let steps = utils::finish(browser, &log, result).await?;
    log.log("Browser closed successfully");

    let report = QuickTestReport {
        browser: format!("{:?}", settings.browser).to_lowercase(),
        run_id: log.run_id().to_string(),
        steps,
    };
    utils::print_output(&report, format, |r| {
        let mut out = format!("Quick test with {} (Run ID: {})\n", r.browser, r.run_id);
        for step in &r.steps {
            out.push_str(&format!(
                "  {} {} in {}ms{}\n",
                if step.loaded { "loaded" } else { "slow" },
                step.url,
                step.elapsed_ms,
                step.screenshot
                    .as_ref()
                    .map(|s| format!(" ({s})"))
                    .unwrap_or_default()
            ));
        }
        out
    })
}

async fn load(browser: &Browser, log: &RunLog, name: &str, url: &str) -> Result<StepResult> {
    log.log(format!("Navigating to {url}..."));
    let started = Instant::now();
    let loaded = browser.goto(url).await?.is_ready();
    let elapsed_ms = started.elapsed().as_millis();
    log.log(format!("{url} loaded in {elapsed_ms}ms"));

    let screenshot = log
        .save_screenshot(browser, name)
        .await
        .map(|p| p.display().to_string());
    Ok(StepResult {
        name: name.to_string(),
        url: url.to_string(),
        loaded,
        elapsed_ms,
        screenshot,
    })
}

async fn hold_open(browser: &Browser, log: &RunLog, hold: Duration) -> Result<()> {
    log.log(format!("Keeping browser open for {} seconds...", hold.as_secs()));
    let started = Instant::now();

    while let Some(pause) = next_pause(hold, started.elapsed()) {
        tokio::select! {
            _ = interrupt::interrupted() => return Err(PipeprobeError::Interrupted.into()),
            _ = tokio::time::sleep(pause) => {
                // Touch the session so a vanished window shows up as an error
                browser.current_url().await?;
                info!("Still running... {} seconds elapsed", started.elapsed().as_secs());
            }
        }
    }
    Ok(())
}

/// Sleep before the next liveness check, or `None` once `hold` has passed
pub fn next_pause(hold: Duration, elapsed: Duration) -> Option<Duration> {
    let remaining = hold.checked_sub(elapsed).filter(|r| !r.is_zero())?;
    Some(remaining.min(HOLD_TICK))
}
