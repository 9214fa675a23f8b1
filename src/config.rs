//! Run settings and credential resolution
//!
//! Every command receives a [`Settings`] built once in `main`; credentials are
//! looked up through a [`CredentialResolver`] with the precedence
//! explicit option > environment variable > `config.ini` > missing.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::errors::PipeprobeError;
use crate::project::ConfigFile;
use crate::types::ViewportSize;
use crate::webdriver::BrowserType;

pub const DEFAULT_API_BASE: &str = "https://api.pipedream.com";
pub const DEFAULT_WEB_BASE: &str = "https://pipedream.com";
pub const DEFAULT_WEBHOOK_BASE: &str = "https://webhook.pipedream.com";

/// Read access to environment variables
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment (after `.env` has been loaded)
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Hosts the tool talks to
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub api_base: Url,
    pub web_base: Url,
    pub webhook_base: Url,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            api_base: Url::parse(DEFAULT_API_BASE).expect("static url"),
            web_base: Url::parse(DEFAULT_WEB_BASE).expect("static url"),
            webhook_base: Url::parse(DEFAULT_WEBHOOK_BASE).expect("static url"),
        }
    }
}

impl Endpoints {
    /// Defaults overridden by `PIPEPROBE_API_BASE`, `PIPEPROBE_WEB_BASE`, `PIPEPROBE_WEBHOOK_BASE`
    pub fn from_env(env: &dyn EnvSource) -> Result<Self> {
        let mut endpoints = Endpoints::default();
        let overrides = [
            ("PIPEPROBE_API_BASE", &mut endpoints.api_base),
            ("PIPEPROBE_WEB_BASE", &mut endpoints.web_base),
            ("PIPEPROBE_WEBHOOK_BASE", &mut endpoints.webhook_base),
        ];
        for (key, slot) in overrides {
            if let Some(value) = non_empty(env.var(key)) {
                *slot = Url::parse(&value).with_context(|| format!("Invalid URL in {key}"))?;
            }
        }
        Ok(endpoints)
    }

    fn web(&self, path: &str) -> String {
        format!("{}/{}", self.web_base.as_str().trim_end_matches('/'), path)
    }

    pub fn login_url(&self) -> String {
        self.web("auth/login")
    }

    pub fn signin_url(&self) -> String {
        self.web("auth/signin")
    }

    /// Projects listing, scoped to a workspace slug when one is known
    pub fn projects_url(&self, workspace: Option<&str>) -> String {
        match workspace {
            Some(slug) => self.web(&format!("@{}/projects", slug.trim_start_matches('@'))),
            None => self.web("projects"),
        }
    }

    pub fn workflow_url(&self, id: &str) -> String {
        self.web(&format!("workflows/{id}"))
    }

    pub fn webhook_url(&self, workflow_id: &str) -> String {
        format!(
            "{}/v1/sources/{}/events",
            self.webhook_base.as_str().trim_end_matches('/'),
            workflow_id
        )
    }

    pub fn home_url(&self) -> String {
        self.web_base.as_str().to_string()
    }
}

/// Everything a command needs to know about how to run
#[derive(Debug, Clone)]
pub struct Settings {
    pub browser: BrowserType,
    pub headless: bool,
    pub viewport: Option<ViewportSize>,
    /// Upper bound for every readiness wait
    pub timeout: Duration,
    /// Explicit organization to act in; `None` means first listed
    pub org_id: Option<String>,
    pub endpoints: Endpoints,
    /// Directory the command operates in (project root, log root)
    pub workdir: PathBuf,
}

impl Settings {
    pub fn new(workdir: PathBuf) -> Self {
        Settings {
            browser: BrowserType::Chrome,
            headless: false,
            viewport: None,
            timeout: Duration::from_secs(30),
            org_id: None,
            endpoints: Endpoints::default(),
            workdir,
        }
    }

    /// Credential resolver bound to the process environment and the local config
    pub fn resolver(&self) -> CredentialResolver<'static> {
        CredentialResolver::from_workdir(&ProcessEnv, &self.workdir)
    }
}

/// Secrets and identifiers the commands need
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    ApiKey,
    Username,
    Password,
    ProjectId,
    OrgId,
}

impl Credential {
    pub fn env_key(self) -> &'static str {
        match self {
            Credential::ApiKey => "PIPEDREAM_API_KEY",
            Credential::Username => "PIPEDREAM_USERNAME",
            Credential::Password => "PIPEDREAM_PASSWORD",
            Credential::ProjectId => "PROJECT_ID",
            Credential::OrgId => "PIPEDREAM_ORG_ID",
        }
    }

    /// `(section, key)` pairs consulted in `config.ini`, in order
    fn config_keys(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Credential::ApiKey => &[("pipedream", "apikey"), ("api", "key")],
            Credential::Username => &[("pipedream", "username")],
            Credential::Password => &[],
            Credential::ProjectId => &[("project", "id")],
            Credential::OrgId => &[("pipedream", "org_id")],
        }
    }

    fn label(self) -> &'static str {
        match self {
            Credential::ApiKey => "API key",
            Credential::Username => "Username",
            Credential::Password => "Password",
            Credential::ProjectId => "Project ID",
            Credential::OrgId => "Organization ID",
        }
    }

    fn hint(self) -> String {
        let flag = match self {
            Credential::ApiKey => "--api-key",
            Credential::Username => "--username",
            Credential::Password => "--password",
            Credential::ProjectId => "--project",
            Credential::OrgId => "--org",
        };
        let mut hint = format!("{flag} or {}", self.env_key());
        if let Some((section, key)) = self.config_keys().first() {
            hint.push_str(&format!(" or [{section}] {key} in config.ini"));
        }
        hint
    }
}

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Option,
    Environment,
    ConfigFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    pub source: CredentialSource,
}

pub struct CredentialResolver<'a> {
    env: &'a dyn EnvSource,
    config: Option<ConfigFile>,
}

impl<'a> CredentialResolver<'a> {
    pub fn new(env: &'a dyn EnvSource, config: Option<ConfigFile>) -> Self {
        CredentialResolver { env, config }
    }

    pub fn from_workdir(env: &'a dyn EnvSource, workdir: &Path) -> Self {
        Self::new(env, ConfigFile::discover(workdir))
    }

    pub fn config(&self) -> Option<&ConfigFile> {
        self.config.as_ref()
    }

    pub fn resolve(&self, credential: Credential, explicit: Option<&str>) -> Option<Resolved> {
        if let Some(value) = non_empty(explicit.map(str::to_string)) {
            return Some(Resolved {
                value,
                source: CredentialSource::Option,
            });
        }

        if let Some(value) = non_empty(self.env.var(credential.env_key())) {
            return Some(Resolved {
                value,
                source: CredentialSource::Environment,
            });
        }

        let config = self.config.as_ref()?;
        credential
            .config_keys()
            .iter()
            .find_map(|(section, key)| config.get(section, key))
            .map(|value| {
                debug!(
                    "{} taken from {}",
                    credential.label(),
                    config.path().display()
                );
                Resolved {
                    value: value.to_string(),
                    source: CredentialSource::ConfigFile,
                }
            })
    }

    /// Like [`resolve`](Self::resolve) but missing is a `MissingCredential` error
    pub fn require(&self, credential: Credential, explicit: Option<&str>) -> Result<Resolved> {
        self.resolve(credential, explicit).ok_or_else(|| {
            PipeprobeError::missing(credential.label(), &credential.hint()).into()
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
