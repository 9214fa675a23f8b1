//! # pipeprobe
#![allow(clippy::uninlined_format_args)]
//!
//! CLI tool that drives a WebDriver browser and the REST API of Pipedream to
//! log in, create projects, inspect page structure and create or list
//! workflows.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Log in with a visible browser
//! pipeprobe login --username me@example.com --password secret
//!
//! # Create a project through the web UI (writes ./my-project/config.ini)
//! pipeprobe create-project my-project
//!
//! # Inspect the login page without logging in
//! pipeprobe analyze-login --headless --format simple
//!
//! # Create a workflow with an HTTP trigger from inside a project directory
//! cd my-project && pipeprobe create-workflow --name "Orders" --trigger http
//!
//! # List a workflow's steps and triggers
//! pipeprobe list-steps --workflow p_abc123 --detailed
//! pipeprobe list-triggers --workflow p_abc123 --format simple
//! ```
//!
//! Credentials come from flags, then environment variables (a `.env` file is
//! loaded first), then `config.ini` in the working directory or its parents,
//! then `~/.config/pipeprobe/config.ini`.
//!
//! ## Library Usage
//!
//! ```no_run
//! use pipeprobe::{Browser, Settings};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Settings::new(std::env::current_dir()?);
//! let browser = Browser::launch(&settings).await?;
//! browser.goto(&settings.endpoints.login_url()).await?;
//! let report = pipeprobe::analyze::analyze_login_page(&browser).await?;
//! println!("{} inputs", report.inputs.len());
//! browser.close().await?;
//! # Ok(())
//! # }
//! ```

/// Page-structure reports for the login and projects pages
pub mod analyze;

/// REST API client and payload types
pub mod api;

/// Heuristic clicking and form-field helpers
pub mod clicker;

/// Settings, endpoints and credential resolution
pub mod config;

pub mod errors;

/// Ctrl-C state shared by every wait
pub mod interrupt;

/// Ranking of click candidates from a DOM snapshot
pub mod locator;

/// Login strategies
pub mod login;

/// Project descriptor (`config.ini`)
pub mod project;

/// Per-run log file and screenshots
pub mod runlog;

pub mod types;

/// WebDriver browser control and automation
pub mod webdriver;

/// Automatic WebDriver process management
pub mod webdriver_manager;

/// Workflow creation, lookup and listing views
pub mod workflow;

pub use config::{Credential, CredentialResolver, Endpoints, Settings};
pub use errors::PipeprobeError;
pub use runlog::RunLog;
pub use types::{OutputFormat, ViewportSize};
pub use webdriver::{Browser, BrowserType};
