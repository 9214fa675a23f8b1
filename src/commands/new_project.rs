use anyhow::{Context, Result};
use inquire::{InquireError, Password, PasswordDisplayMode, Text};
use pipeprobe::config::Credential;
use pipeprobe::errors::PipeprobeError;
use pipeprobe::login::Credentials;
use pipeprobe::{OutputFormat, Settings, project};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::commands::create_project;
use crate::commands::utils;

pub const ENV_FILE_NAME: &str = ".env";

/// Values written to a new project's `.env`
#[derive(Debug, Clone, PartialEq)]
pub struct EnvFile {
    pub username: String,
    pub password: String,
    pub api_key: String,
    pub project_name: String,
}

impl EnvFile {
    pub fn render(&self) -> String {
        format!(
            "{}={}\n{}={}\n{}={}\nPROJECT_NAME={}\n",
            Credential::Username.env_key(),
            self.username,
            Credential::Password.env_key(),
            self.password,
            Credential::ApiKey.env_key(),
            self.api_key,
            self.project_name
        )
    }

    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(ENV_FILE_NAME);
        fs::write(&path, self.render())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Record the project id once the remote project exists
pub fn append_project_id(env_path: &Path, project_id: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .append(true)
        .open(env_path)
        .with_context(|| format!("Failed to open {}", env_path.display()))?;
    writeln!(file, "{}={}", Credential::ProjectId.env_key(), project_id)?;
    Ok(())
}

fn prompt_error(err: InquireError) -> anyhow::Error {
    match err {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            PipeprobeError::Interrupted.into()
        }
        other => anyhow::anyhow!("Prompt failed: {}", other),
    }
}

fn text(message: &str, default: Option<&str>) -> Result<String> {
    let mut prompt = Text::new(message);
    if let Some(default) = default.filter(|d| !d.is_empty()) {
        prompt = prompt.with_default(default);
    }
    prompt.prompt().map(|v| v.trim().to_string()).map_err(prompt_error)
}

pub async fn handle_new_project(settings: &Settings, format: OutputFormat) -> Result<()> {
    let resolver = settings.resolver();
    let known = |credential| resolver.resolve(credential, None).map(|r| r.value);

    let project_name = text("Project name:", Some(project::default_project_name().as_str()))?;
    let default_path = settings.workdir.display().to_string();
    let project_path = PathBuf::from(text("Project path:", Some(default_path.as_str()))?);
    let username = text("Pipedream username:", known(Credential::Username).as_deref())?;
    let password = Password::new("Pipedream password:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .map_err(prompt_error)?;
    let api_key = text("Pipedream API key:", known(Credential::ApiKey).as_deref())?;

    if username.is_empty() {
        return Err(PipeprobeError::missing("Username", "the username prompt").into());
    }
    if password.is_empty() {
        return Err(PipeprobeError::missing("Password", "the password prompt").into());
    }

    let project_dir = project_path.join(&project_name);
    let env = EnvFile {
        username: username.clone(),
        password: password.clone(),
        api_key: api_key.clone(),
        project_name: project_name.clone(),
    };
    let env_path = env.write(&project_dir)?;
    eprintln!("Created project directory at {}", project_dir.display());

    let credentials = Credentials { username, password };
    let created = create_project::create_project(
        settings,
        &project_name,
        &credentials,
        Some(api_key.as_str()),
        &project_path,
    )
    .await?;
    append_project_id(&env_path, &created.id)?;

    utils::print_output(&created, format, |p| {
        format!(
            "Project \"{}\" created successfully!\n  Project ID: {}\n  Directory: {}\n  Next: cd {} && pipeprobe create-workflow\n",
            p.name,
            p.id,
            p.directory.display(),
            p.directory.display()
        )
    })
}
