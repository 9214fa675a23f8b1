use anyhow::{Context, Result};
use fantoccini::key::Key;
use fantoccini::{Client, ClientBuilder, Locator};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::future::Future;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::errors::PipeprobeError;
use crate::interrupt;
use crate::types::{ViewportSize, WaitOutcome};
use crate::webdriver_manager::GLOBAL_WEBDRIVER_MANAGER;

/// Interval between readiness checks
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Supported browser types
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    /// Mozilla Firefox via geckodriver
    Firefox,
    /// Google Chrome/Chromium via chromedriver
    #[value(alias = "chromium")]
    Chrome,
}

impl BrowserType {
    pub fn driver_binary(self) -> &'static str {
        match self {
            BrowserType::Firefox => "geckodriver",
            BrowserType::Chrome => "chromedriver",
        }
    }

    pub fn standard_port(self) -> u16 {
        match self {
            BrowserType::Firefox => 4444,
            BrowserType::Chrome => 9515,
        }
    }

    /// Session capabilities for this browser
    pub fn capabilities(
        self,
        headless: bool,
        viewport: Option<&ViewportSize>,
        profile_dir: Option<&std::path::Path>,
    ) -> serde_json::Map<String, Value> {
        let mut caps = serde_json::Map::new();
        match self {
            BrowserType::Firefox => {
                let mut args = Vec::new();
                if headless {
                    args.push("--headless".to_string());
                }
                if let Some(vp) = viewport {
                    args.push(format!("--width={}", vp.width));
                    args.push(format!("--height={}", vp.height));
                }
                caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
            }
            BrowserType::Chrome => {
                let mut args = vec!["--no-sandbox".to_string()];
                if headless {
                    args.push("--headless=new".to_string());
                    args.push("--disable-gpu".to_string());
                    args.push("--disable-dev-shm-usage".to_string());
                } else {
                    args.push("--start-maximized".to_string());
                }
                if let Some(vp) = viewport {
                    args.push(format!("--window-size={},{}", vp.width, vp.height));
                }
                if let Some(dir) = profile_dir {
                    args.push(format!("--user-data-dir={}", dir.display()));
                }
                caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
            }
        }
        caps
    }
}

/// Poll `check` until it returns true or `timeout` elapses.
///
/// Ctrl-C cancels the wait with [`PipeprobeError::Interrupted`].
pub async fn poll_until<F, Fut>(timeout: Duration, mut check: F) -> Result<WaitOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    let poll = async {
        loop {
            if check().await {
                return WaitOutcome::Ready;
            }
            if Instant::now() >= deadline {
                return WaitOutcome::TimedOut;
            }
            sleep(POLL_INTERVAL).await;
        }
    };

    tokio::select! {
        outcome = poll => Ok(outcome),
        _ = interrupt::interrupted() => Err(PipeprobeError::Interrupted.into()),
    }
}

/// One WebDriver session
pub struct Browser {
    client: Client,
    browser_type: BrowserType,
    timeout: Duration,
    // Chrome profile directory, removed when the browser is dropped
    _profile: Option<TempDir>,
}

impl Browser {
    /// Start (or reuse) the driver and open a session configured from `settings`
    pub async fn launch(settings: &Settings) -> Result<Self> {
        let browser_type = settings.browser;
        info!("Launching {:?} browser", browser_type);

        let webdriver_url = GLOBAL_WEBDRIVER_MANAGER
            .ensure_driver(browser_type)
            .await
            .map_err(|e| PipeprobeError::WebDriverFailed(format!("{e:#}")))?;

        // Chrome refuses to share a profile directory between sessions
        let profile = match browser_type {
            BrowserType::Chrome => Some(
                tempfile::Builder::new()
                    .prefix("pipeprobe-chrome-")
                    .tempdir()?,
            ),
            BrowserType::Firefox => None,
        };

        let caps = browser_type.capabilities(
            settings.headless,
            settings.viewport.as_ref(),
            profile.as_ref().map(TempDir::path),
        );

        debug!("Connecting to WebDriver at {}", webdriver_url);
        let client = match ClientBuilder::rustls()
            .capabilities(caps.clone())
            .connect(&webdriver_url)
            .await
        {
            Ok(client) => client,
            Err(e)
                if e.to_string().contains("session not created")
                    || e.to_string().contains("Session is already started") =>
            {
                info!("WebDriver appears to be in a bad state, restarting it");
                GLOBAL_WEBDRIVER_MANAGER.restart(browser_type);
                let url = GLOBAL_WEBDRIVER_MANAGER
                    .ensure_driver(browser_type)
                    .await
                    .map_err(|e| PipeprobeError::WebDriverFailed(format!("{e:#}")))?;
                ClientBuilder::rustls()
                    .capabilities(caps)
                    .connect(&url)
                    .await
                    .map_err(|e| {
                        PipeprobeError::WebDriverFailed(format!(
                            "Failed to connect to WebDriver after restart: {e}"
                        ))
                    })?
            }
            Err(e) => {
                return Err(PipeprobeError::WebDriverFailed(format!(
                    "Failed to connect to WebDriver at {webdriver_url}: {e}"
                ))
                .into());
            }
        };

        if let Some(vp) = &settings.viewport {
            debug!("Setting viewport to {}x{}", vp.width, vp.height);
            if let Err(e) = client.set_window_size(vp.width, vp.height).await {
                debug!("Could not set window size: {}", e);
            }
        }

        Ok(Browser {
            client,
            browser_type,
            timeout: settings.timeout,
            _profile: profile,
        })
    }

    pub fn browser_type(&self) -> BrowserType {
        self.browser_type
    }

    /// Upper bound for waits issued through this session
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Navigate and wait for `document.readyState == "complete"`.
    ///
    /// A slow page is logged and tolerated; the outcome says which it was.
    pub async fn goto(&self, url: &str) -> Result<WaitOutcome> {
        info!("Navigating to {}", url);
        self.client
            .goto(url)
            .await
            .with_context(|| format!("Failed to navigate to {url}"))?;

        let outcome = self.wait_for_ready().await?;
        if !outcome.is_ready() {
            warn!("Page did not finish loading within {:?}; continuing", self.timeout);
        }
        Ok(outcome)
    }

    pub async fn current_url(&self) -> Result<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    pub async fn title(&self) -> Result<String> {
        Ok(self.client.title().await?)
    }

    pub async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.client
            .execute(script, args)
            .await
            .context("Failed to execute script")
    }

    /// Run a script and deserialize what it returns
    pub async fn execute_as<T: DeserializeOwned>(
        &self,
        script: &str,
        args: Vec<Value>,
    ) -> Result<T> {
        let value = self.execute(script, args).await?;
        serde_json::from_value(value).context("Unexpected script result")
    }

    /// PNG of the visible page
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        self.client
            .screenshot()
            .await
            .context("Failed to take screenshot")
    }

    /// Send text to whatever element has focus
    pub async fn type_text(&self, text: &str) -> Result<()> {
        let focused = self
            .client
            .active_element()
            .await
            .context("No focused element to type into")?;
        focused.send_keys(text).await?;
        Ok(())
    }

    pub async fn press(&self, key: Key) -> Result<()> {
        self.type_text(&char::from(key).to_string()).await
    }

    pub async fn set_local_storage(&self, key: &str, value: &str) -> Result<()> {
        self.execute(
            "localStorage.setItem(arguments[0], arguments[1]);",
            vec![json!(key), json!(value)],
        )
        .await?;
        Ok(())
    }

    /// Poll a script until it returns a truthy value
    pub async fn wait_until(&self, script: &str, timeout: Duration) -> Result<WaitOutcome> {
        poll_until(timeout, move || async move {
            match self.client.execute(script, vec![]).await {
                Ok(value) => truthy(&value),
                Err(e) => {
                    debug!("Readiness probe failed: {}", e);
                    false
                }
            }
        })
        .await
    }

    pub async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<WaitOutcome> {
        poll_until(timeout, move || async move {
            self.client.find(Locator::Css(selector)).await.is_ok()
        })
        .await
    }

    /// Wait until the URL differs from `from_url` and the new page is loaded
    pub async fn wait_for_navigation(
        &self,
        from_url: &str,
        timeout: Duration,
    ) -> Result<WaitOutcome> {
        let started = Instant::now();
        let moved = poll_until(timeout, move || async move {
            self.client
                .current_url()
                .await
                .map(|url| url.as_str() != from_url)
                .unwrap_or(false)
        })
        .await?;
        if !moved.is_ready() {
            return Ok(moved);
        }

        let remaining = timeout.saturating_sub(started.elapsed());
        self.wait_until("return document.readyState === 'complete';", remaining)
            .await
    }

    pub async fn wait_for_ready(&self) -> Result<WaitOutcome> {
        self.wait_until("return document.readyState === 'complete';", self.timeout)
            .await
    }

    /// Block until the user presses Ctrl-C or closes the window
    pub async fn wait_for_close(&self) -> Result<()> {
        loop {
            tokio::select! {
                _ = interrupt::interrupted() => return Ok(()),
                _ = sleep(Duration::from_secs(1)) => {
                    if self.client.windows().await.map(|w| w.is_empty()).unwrap_or(true) {
                        info!("Browser window closed");
                        return Ok(());
                    }
                }
            }
        }
    }

    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
#[path = "webdriver_test.rs"]
mod webdriver_test;
