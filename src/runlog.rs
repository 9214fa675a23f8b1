//! Per-run progress log and screenshots
//!
//! Layout under the run root:
//!
//! ```text
//! logs/<command>-<run_id>.log
//! logs/screens/<run_id>/<name>.png
//! ```

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::webdriver::Browser;

pub struct RunLog {
    run_id: String,
    path: PathBuf,
    screens_dir: PathBuf,
}

impl RunLog {
    /// First 8 hex characters of a fresh v4 UUID
    pub fn new_run_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
    }

    /// Start a new run, creating `logs/` and the screenshot directory
    pub fn start(root: &Path, command: &str) -> Result<Self> {
        Self::resume(root, command, &Self::new_run_id())
    }

    /// Reopen an existing run; lines are appended after what is already there
    pub fn resume(root: &Path, command: &str, run_id: &str) -> Result<Self> {
        let logs = root.join("logs");
        let screens_dir = logs.join("screens").join(run_id);
        fs::create_dir_all(&screens_dir)
            .with_context(|| format!("Failed to create {}", screens_dir.display()))?;

        Ok(RunLog {
            run_id: run_id.to_string(),
            path: logs.join(format!("{command}-{run_id}.log")),
            screens_dir,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn screens_dir(&self) -> &Path {
        &self.screens_dir
    }

    /// Append one `[timestamp] message` line and mirror it to tracing
    pub fn log(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!("{}", message);

        let line = format!("[{}] {}\n", Utc::now().to_rfc3339(), message);
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(e) = written {
            warn!("Error writing to log {}: {}", self.path.display(), e);
        }
    }

    pub fn write_screenshot(&self, name: &str, png: &[u8]) -> Result<PathBuf> {
        let path = self.screens_dir.join(format!("{name}.png"));
        fs::write(&path, png).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Capture the current page; failures are logged and never fatal
    pub async fn save_screenshot(&self, browser: &Browser, name: &str) -> Option<PathBuf> {
        let saved = match browser.screenshot().await {
            Ok(png) => self.write_screenshot(name, &png),
            Err(e) => Err(e),
        };

        match saved {
            Ok(path) => {
                self.log(format!("Screenshot saved: {name}.png"));
                Some(path)
            }
            Err(e) => {
                self.log(format!("Error saving screenshot: {e:#}"));
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "runlog_test.rs"]
mod runlog_test;
