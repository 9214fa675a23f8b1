use anyhow::{Context, Result};
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

use crate::types::WaitOutcome;
use crate::webdriver::{BrowserType, poll_until};

/// How long a freshly spawned driver gets to answer `/status`
const DRIVER_START_TIMEOUT: Duration = Duration::from_secs(10);

/// Starts geckodriver/chromedriver on demand and stops what it started
pub struct WebDriverManager {
    processes: Mutex<Vec<DriverProcess>>,
}

struct DriverProcess {
    browser_type: BrowserType,
    child: Child,
    port: u16,
    url: String,
}

impl Default for WebDriverManager {
    fn default() -> Self {
        Self {
            processes: Mutex::new(Vec::new()),
        }
    }
}

impl WebDriverManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn processes(&self) -> MutexGuard<'_, Vec<DriverProcess>> {
        self.processes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the URL of a ready driver for `browser_type`, starting one if needed
    pub async fn ensure_driver(&self, browser_type: BrowserType) -> Result<String> {
        let managed: Vec<String> = self
            .processes()
            .iter()
            .filter(|p| p.browser_type == browser_type)
            .map(|p| p.url.clone())
            .collect();
        for url in managed {
            if Self::is_driver_ready(&url).await {
                debug!("Using managed WebDriver at {}", url);
                return Ok(url);
            }
        }

        let standard = format!("http://localhost:{}", browser_type.standard_port());
        if Self::is_driver_ready(&standard).await {
            debug!("Found external WebDriver at {}", standard);
            return Ok(standard);
        }

        info!("WebDriver not detected, starting {}", browser_type.driver_binary());
        self.start_driver(browser_type).await
    }

    async fn start_driver(&self, browser_type: BrowserType) -> Result<String> {
        let binary = browser_type.driver_binary();
        if !Self::command_exists(binary) {
            anyhow::bail!(
                "{} not found in PATH. Please install it:\n\
                  macOS: brew install {}\n\
                  Linux: Download from the official releases page",
                binary,
                binary
            );
        }

        let port = Self::find_free_port(browser_type)?;
        let mut cmd = Command::new(binary);
        cmd.arg(format!("--port={port}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // New process group so the browser children die with the driver
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd
            .spawn()
            .with_context(|| format!("Failed to start {binary}"))?;
        let url = format!("http://localhost:{port}");
        info!("Starting {} on port {}", binary, port);

        self.processes().push(DriverProcess {
            browser_type,
            child,
            port,
            url: url.clone(),
        });

        let status_url = url.as_str();
        let outcome =
            poll_until(DRIVER_START_TIMEOUT, move || Self::is_driver_ready(status_url)).await?;
        if outcome == WaitOutcome::Ready {
            info!("{} ready on port {}", binary, port);
            return Ok(url);
        }

        self.stop_port(port);
        anyhow::bail!("{binary} failed to start within {DRIVER_START_TIMEOUT:?}")
    }

    pub fn command_exists(command: &str) -> bool {
        let finder = if cfg!(windows) { "where" } else { "which" };
        Command::new(finder)
            .arg(command)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// The browser's standard port if free, else the next two, else any
    pub fn find_free_port(browser_type: BrowserType) -> Result<u16> {
        let standard = browser_type.standard_port();
        for port in standard..standard + 3 {
            if !Self::is_port_in_use(port) {
                return Ok(port);
            }
            debug!("Port {} is in use", port);
        }

        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        Ok(listener.local_addr()?.port())
    }

    pub fn is_port_in_use(port: u16) -> bool {
        std::net::TcpListener::bind(("127.0.0.1", port)).is_err()
    }

    /// `GET /status` answers with `value.ready == true`
    pub async fn is_driver_ready(url: &str) -> bool {
        let response = reqwest::Client::new()
            .get(format!("{url}/status"))
            .timeout(Duration::from_secs(1))
            .send()
            .await;

        match response {
            Ok(response) => response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body.pointer("/value/ready").and_then(|r| r.as_bool()))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    fn stop_port(&self, port: u16) {
        let mut processes = self.processes();
        if let Some(index) = processes.iter().position(|p| p.port == port) {
            let mut process = processes.remove(index);
            Self::kill(&mut process);
        }
    }

    /// Kill every driver this manager started
    pub fn stop_all(&self) {
        let mut processes = self.processes();
        for process in processes.iter_mut() {
            Self::kill(process);
        }
        processes.clear();
    }

    /// Kill one managed driver so the next `ensure_driver` starts afresh
    pub fn restart(&self, browser_type: BrowserType) {
        let mut processes = self.processes();
        processes.retain_mut(|p| {
            if p.browser_type == browser_type {
                Self::kill(p);
                false
            } else {
                true
            }
        });
    }

    fn kill(process: &mut DriverProcess) {
        debug!("Stopping WebDriver on port {}", process.port);

        #[cfg(unix)]
        {
            let pgid = process.child.id();
            if let Err(e) = Command::new("kill")
                .args(["-TERM", &format!("-{pgid}")])
                .output()
            {
                debug!("Failed to signal process group {}: {}", pgid, e);
            }
        }

        let _ = process.child.kill();
        let _ = process.child.wait();
    }
}

impl Drop for WebDriverManager {
    fn drop(&mut self) {
        self.stop_all();
    }
}

lazy_static::lazy_static! {
    pub static ref GLOBAL_WEBDRIVER_MANAGER: WebDriverManager = WebDriverManager::new();
}

#[cfg(test)]
#[path = "webdriver_manager_test.rs"]
mod webdriver_manager_test;
