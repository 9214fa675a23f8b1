//! Project descriptor (`config.ini`) management

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ini::Ini;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::locator::Target;

pub const CONFIG_FILE_NAME: &str = "config.ini";

lazy_static::lazy_static! {
    static ref PROJECT_ID_PATTERN: Regex =
        Regex::new(r"proj_[a-zA-Z0-9]+").expect("static regex");
}

/// A project created on the remote service and recorded locally
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectDescriptor {
    /// Project name as typed into the creation dialog
    pub name: String,
    /// Remote identifier issued by the service
    pub id: String,
    /// When the project was created
    pub created_at: DateTime<Utc>,
    /// Account that owns the project
    pub username: Option<String>,
    /// API key recorded for later REST commands run in the project
    pub api_key: Option<String>,
}

impl ProjectDescriptor {
    pub fn new(name: &str, id: &str, username: Option<&str>) -> Self {
        ProjectDescriptor {
            name: name.to_string(),
            id: id.to_string(),
            created_at: Utc::now(),
            username: username.map(str::to_string),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<&str>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty()).map(str::to_string);
        self
    }

    /// Write `config.ini` into `dir`, returning its path
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let mut conf = Ini::new();
        conf.with_section(Some("project"))
            .set("name", self.name.as_str())
            .set("id", self.id.as_str())
            .set("created_at", self.created_at.to_rfc3339());
        if let Some(username) = &self.username {
            conf.with_section(Some("pipedream"))
                .set("username", username.as_str());
        }
        if let Some(api_key) = &self.api_key {
            conf.with_section(Some("pipedream"))
                .set("apikey", api_key.as_str());
        }

        let path = dir.join(CONFIG_FILE_NAME);
        conf.write_to_file(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Wrote project descriptor {}", path.display());
        Ok(path)
    }

    /// Read a descriptor back from a `config.ini` file
    pub fn read(path: &Path) -> Result<Self> {
        let config = ConfigFile::load(path)?;
        let id = config
            .get("project", "id")
            .with_context(|| format!("{} has no [project] id", path.display()))?;
        let name = config.get("project", "name").unwrap_or("Unknown Project");
        let created_at = config
            .get("project", "created_at")
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(ProjectDescriptor {
            name: name.to_string(),
            id: id.to_string(),
            created_at,
            username: config.get("pipedream", "username").map(str::to_string),
            api_key: config.get("pipedream", "apikey").map(str::to_string),
        })
    }
}

/// Parsed `config.ini`, used both as project descriptor and credential fallback
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    ini: Ini,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let ini = Ini::load_from_file(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(ConfigFile {
            path: path.to_path_buf(),
            ini,
        })
    }

    /// Look for `config.ini` in `dir`, then in its parent directory
    pub fn find_local(dir: &Path) -> Option<PathBuf> {
        let candidates = std::iter::once(dir).chain(dir.parent());
        for candidate in candidates {
            let path = candidate.join(CONFIG_FILE_NAME);
            if path.is_file() {
                debug!("Found {}", path.display());
                return Some(path);
            }
        }
        None
    }

    /// Local lookup, then the user-level `~/.config/pipeprobe/config.ini`
    pub fn discover(dir: &Path) -> Option<Self> {
        let path = Self::find_local(dir).or_else(|| {
            let user = dirs::config_dir()?.join("pipeprobe").join(CONFIG_FILE_NAME);
            user.is_file().then_some(user)
        })?;

        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                debug!("Ignoring unreadable config: {:#}", e);
                None
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.ini
            .get_from(Some(section), key)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Extract the first `proj_...` identifier from a URL
pub fn extract_project_id(url: &str) -> Option<String> {
    PROJECT_ID_PATTERN
        .find(url)
        .map(|m| m.as_str().to_string())
}

/// Project id from the URL shown after creation, else from the URL of the
/// project's settings page when that could be opened
pub fn project_id_from_urls(created_url: &str, settings_url: Option<&str>) -> Option<String> {
    extract_project_id(created_url).or_else(|| settings_url.and_then(extract_project_id))
}

/// Name used when the caller does not supply one
pub fn default_project_name() -> String {
    format!("Project_{}", Utc::now().format("%Y-%m-%d"))
}

/// Class list of the content wrapper inside the dialog's create button
pub const CREATE_BUTTON_FINGERPRINT: &str =
    "h-full flex items-center justify-center w-full gap-x-1.5";
pub const PLUS_ICON_CLASS: &str = "i-mdi-plus-thick";
pub const NEW_PROJECT_LABEL: &str = "New project";
pub const SETTINGS_LABEL: &str = "Settings";

/// The projects page control that opens the new-project dialog
pub fn new_project_target() -> Target {
    Target::text(NEW_PROJECT_LABEL).with_icon(PLUS_ICON_CLASS)
}

/// The dialog button that submits the new project
pub fn create_project_target() -> Target {
    Target::text("Create Project")
        .with_class_fingerprint(CREATE_BUTTON_FINGERPRINT)
        .with_dialog_submit()
}

/// The project's Settings link, whose URL carries the project id
pub fn settings_target() -> Target {
    Target::text(SETTINGS_LABEL)
}

#[cfg(test)]
#[path = "project_test.rs"]
mod project_test;
