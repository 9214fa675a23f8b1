#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use pipeprobe::config::{Credential, Endpoints, ProcessEnv};
use pipeprobe::errors::PipeprobeError;
use pipeprobe::interrupt;
use pipeprobe::login::LoginStrategy;
use pipeprobe::webdriver_manager::GLOBAL_WEBDRIVER_MANAGER;
use pipeprobe::{BrowserType, OutputFormat, Settings, ViewportSize};
use serde_json::json;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

const EXIT_SUCCESS: i32 = 0;

#[derive(Parser)]
#[command(name = "pipeprobe")]
#[command(version, about = "Drive Pipedream from the command line", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Browser to drive
    #[arg(long, global = true, value_enum, default_value = "chrome")]
    browser: BrowserType,

    /// Run the browser without a window
    #[arg(long, global = true)]
    headless: bool,

    /// Window size (WIDTHxHEIGHT, e.g., 1920x1080)
    #[arg(long, global = true)]
    viewport: Option<String>,

    /// Upper bound in seconds for every page wait
    #[arg(long, global = true, default_value = "30")]
    timeout: u64,

    /// Organization (workspace) id; defaults to the account's first one
    #[arg(long, global = true)]
    org: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    format: OutputFormat,
}

/// Account credentials for the browser login flows
#[derive(Args)]
struct LoginArgs {
    /// Pipedream username/email
    #[arg(short, long)]
    username: Option<String>,

    /// Pipedream password
    #[arg(short, long)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a Pipedream project in the browser
    Open {
        /// Project ID to open (defaults to config.ini)
        #[arg(short, long)]
        project: Option<String>,

        /// Pipedream API key
        #[arg(short = 'k', long, alias = "apiKey")]
        api_key: Option<String>,

        /// Username/email, used if the API key does not work
        #[arg(short, long)]
        username: Option<String>,

        /// Password, used if the API key does not work
        #[arg(short = 'w', long)]
        password: Option<String>,
    },

    /// Create a project directory interactively, then the project on Pipedream
    NewProject,

    /// Log in and create a new Pipedream project
    CreateProject {
        /// Project name
        #[arg(short, long)]
        name: Option<String>,

        #[command(flatten)]
        login: LoginArgs,
    },

    /// Test login to Pipedream
    Login {
        #[command(flatten)]
        login: LoginArgs,

        /// How to fill in the login form
        #[arg(long, value_enum, default_value = "keyboard")]
        strategy: LoginStrategy,
    },

    /// Log in by setting field values directly
    LoginSimple {
        #[command(flatten)]
        login: LoginArgs,
    },

    /// Log in on the sign-in page
    LoginDirect {
        #[command(flatten)]
        login: LoginArgs,
    },

    /// Log in by focusing the input next to the Email label
    LoginTargeted {
        #[command(flatten)]
        login: LoginArgs,
    },

    /// Report the structure of the login page
    AnalyzeLogin,

    /// Log in and report the structure of the projects page
    AnalyzeProjects {
        #[command(flatten)]
        login: LoginArgs,
    },

    /// Open a browser and load a couple of pages
    QuickTest {
        /// Keep the browser open for this many seconds afterwards
        #[arg(long, default_value = "0")]
        hold: u64,
    },

    /// Create a new workflow in a Pipedream project
    CreateWorkflow {
        /// Project ID (optional if in a project directory)
        #[arg(short, long)]
        project: Option<String>,

        /// Workflow name
        #[arg(short, long)]
        name: Option<String>,

        /// Template ID to use
        #[arg(short, long)]
        template: Option<String>,

        /// Workflow description
        #[arg(short, long)]
        description: Option<String>,

        /// Trigger type (http or schedule); defaults to DEFAULT_TRIGGER_TYPE
        #[arg(long)]
        trigger: Option<String>,

        /// Path recorded for an HTTP trigger (random if omitted)
        #[arg(long)]
        path: Option<String>,

        /// Cron expression for a schedule trigger
        #[arg(long)]
        schedule: Option<String>,

        /// Pipedream API key (optional if in .env)
        #[arg(short = 'k', long, alias = "apiKey")]
        api_key: Option<String>,
    },

    /// List the steps of a workflow
    ListSteps {
        /// Workflow ID (optional inside a workflow directory)
        #[arg(short, long)]
        workflow: Option<String>,

        /// Project whose workflows are listed when no workflow is given
        #[arg(short, long)]
        project: Option<String>,

        /// Pipedream API key (optional if in .env)
        #[arg(short = 'k', long, alias = "apiKey")]
        api_key: Option<String>,

        /// Include each step's source and options
        #[arg(long)]
        detailed: bool,
    },

    /// List the triggers of a workflow
    ListTriggers {
        /// Workflow ID (optional inside a workflow directory)
        #[arg(short, long)]
        workflow: Option<String>,

        /// Project whose workflows are listed when no workflow is given
        #[arg(short, long)]
        project: Option<String>,

        /// Pipedream API key (optional if in .env)
        #[arg(short = 'k', long, alias = "apiKey")]
        api_key: Option<String>,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    // Ctrl-C outside any wait still ends the command, so cleanup below runs
    let result = match interrupt::install() {
        Ok(()) => tokio::select! {
            result = run() => result,
            _ = interrupt::abandoned() => Err(PipeprobeError::Interrupted.into()),
        },
        Err(e) => Err(e),
    };

    // Always clean up WebDriver processes before exiting
    GLOBAL_WEBDRIVER_MANAGER.stop_all();

    match result {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(err) => {
            let err: PipeprobeError = err.into();

            // JSON on stdout for programmatic consumption
            let error_json = json!({
                "error": true,
                "message": err.to_string(),
                "exit_code": err.exit_code()
            });
            println!(
                "{}",
                serde_json::to_string(&error_json).unwrap_or_else(|_| "{}".to_string())
            );

            eprintln!("Error: {}", err);
            std::process::exit(err.exit_code());
        }
    }
}

fn settings_from(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::new(std::env::current_dir()?);
    settings.browser = cli.browser;
    settings.headless = cli.headless;
    settings.viewport = cli
        .viewport
        .as_deref()
        .map(ViewportSize::parse)
        .transpose()?;
    settings.timeout = Duration::from_secs(cli.timeout);
    settings.endpoints = Endpoints::from_env(&ProcessEnv)?;
    settings.org_id = settings
        .resolver()
        .resolve(Credential::OrgId, cli.org.as_deref())
        .map(|r| r.value);
    Ok(settings)
}

async fn run() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipeprobe=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    // A missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = settings_from(&cli)?;
    let format = cli.format;

    match cli.command {
        Commands::Open {
            project,
            api_key,
            username,
            password,
        } => commands::open::handle_open(project, api_key, username, password, &settings).await?,
        Commands::NewProject => {
            commands::new_project::handle_new_project(&settings, format).await?
        }
        Commands::CreateProject { name, login } => {
            commands::create_project::handle_create_project(
                name,
                login.username,
                login.password,
                &settings,
                format,
            )
            .await?
        }
        Commands::Login { login, strategy } => {
            commands::login::handle_login(
                login.username,
                login.password,
                strategy,
                &settings,
                format,
            )
            .await?
        }
        Commands::LoginSimple { login } => {
            commands::login::handle_login(
                login.username,
                login.password,
                LoginStrategy::Simple,
                &settings,
                format,
            )
            .await?
        }
        Commands::LoginDirect { login } => {
            commands::login::handle_login(
                login.username,
                login.password,
                LoginStrategy::Direct,
                &settings,
                format,
            )
            .await?
        }
        Commands::LoginTargeted { login } => {
            commands::login::handle_login(
                login.username,
                login.password,
                LoginStrategy::Targeted,
                &settings,
                format,
            )
            .await?
        }
        Commands::AnalyzeLogin => commands::analyze::handle_analyze_login(&settings, format).await?,
        Commands::AnalyzeProjects { login } => {
            commands::analyze::handle_analyze_projects(
                login.username,
                login.password,
                &settings,
                format,
            )
            .await?
        }
        Commands::QuickTest { hold } => {
            commands::quick_test::handle_quick_test(hold, &settings, format).await?
        }
        Commands::CreateWorkflow {
            project,
            name,
            template,
            description,
            trigger,
            path,
            schedule,
            api_key,
        } => {
            commands::create_workflow::handle_create_workflow(
                project,
                name,
                description,
                template,
                trigger,
                path,
                schedule,
                api_key,
                &settings,
                format,
            )
            .await?
        }
        Commands::ListSteps {
            workflow,
            project,
            api_key,
            detailed,
        } => {
            commands::list_steps::handle_list_steps(
                workflow, project, api_key, detailed, &settings, format,
            )
            .await?
        }
        Commands::ListTriggers {
            workflow,
            project,
            api_key,
        } => {
            commands::list_triggers::handle_list_triggers(
                workflow, project, api_key, &settings, format,
            )
            .await?
        }
        Commands::Version => commands::version::handle_version(format).await?,
    }

    Ok(())
}
