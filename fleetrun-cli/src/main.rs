use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;

use commands::{
    handle_approvals_command, handle_instances_command, handle_playbooks_command,
    handle_runs_command, handle_templates_command, handle_triggers_command, ApprovalsCommand,
    CliContext, InstancesCommand, PlaybooksCommand, RunsCommand, TemplatesCommand,
    TriggersCommand,
};
use config::CliOverrides;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "fleetrun")]
#[command(version = VERSION)]
#[command(about = "Fleetrun - playbook run orchestration client")]
#[command(long_about = r#"
Fleetrun drives automated remote-execution runs of configuration playbooks
against fleets of hosts: submit runs, tail their logs live, review and decide
approval gates, and manage event triggers, templates and instances.

Server address, token and project are read from ~/.config/fleetrun/config.toml
and FLEETRUN_* environment variables; --server/--token/--project override both.
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(long, global = true, help = "Backend base URL")]
    server: Option<String>,

    #[arg(long, global = true, help = "Bearer token")]
    token: Option<String>,

    #[arg(long, global = true, help = "Project id (tenant scope)")]
    project: Option<i64>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Submit, inspect and tail playbook runs")]
    Runs {
        #[command(subcommand)]
        action: RunsCommand,
    },

    #[command(about = "Review and decide approval gates")]
    Approvals {
        #[command(subcommand)]
        action: ApprovalsCommand,
    },

    #[command(about = "Manage event triggers")]
    Triggers {
        #[command(subcommand)]
        action: TriggersCommand,
    },

    #[command(about = "Manage playbooks and webhook tokens")]
    Playbooks {
        #[command(subcommand)]
        action: PlaybooksCommand,
    },

    #[command(about = "List variable templates")]
    Templates {
        #[command(subcommand)]
        action: TemplatesCommand,
    },

    #[command(about = "Manage and run template instances")]
    Instances {
        #[command(subcommand)]
        action: InstancesCommand,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let overrides = CliOverrides {
        server: cli.server,
        token: cli.token,
        project: cli.project,
    };
    let mut ctx = CliContext::connect(overrides)?;

    match cli.command {
        Commands::Runs { action } => handle_runs_command(&mut ctx, action).await,
        Commands::Approvals { action } => handle_approvals_command(&mut ctx, action).await,
        Commands::Triggers { action } => handle_triggers_command(&mut ctx, action).await,
        Commands::Playbooks { action } => handle_playbooks_command(&mut ctx, action).await,
        Commands::Templates { action } => handle_templates_command(&mut ctx, action).await,
        Commands::Instances { action } => handle_instances_command(&mut ctx, action).await,
    }
}
