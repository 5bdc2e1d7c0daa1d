use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use fleetrun_core::{validate_playbook_content, PlaybookWriteRequest};
use std::path::PathBuf;

use super::{confirm, CliContext};

#[derive(Subcommand)]
pub enum PlaybooksCommand {
    #[command(about = "List playbooks with run counts")]
    List {
        #[arg(
            short,
            long,
            default_value = "text",
            help = "Output format (text, json)"
        )]
        format: String,
    },

    #[command(about = "Show one playbook")]
    Show {
        #[arg(help = "Playbook id")]
        playbook_id: i64,

        #[arg(long, help = "Print the stored content")]
        content: bool,
    },

    #[command(about = "Create a playbook from a YAML file")]
    Create {
        #[arg(help = "Playbook name")]
        name: String,

        #[arg(long, help = "Path to the YAML content file")]
        file: PathBuf,

        #[arg(short, long, help = "Description")]
        description: Option<String>,
    },

    #[command(about = "Replace a playbook's content from a YAML file")]
    Update {
        #[arg(help = "Playbook id")]
        playbook_id: i64,

        #[arg(long, help = "Path to the YAML content file")]
        file: PathBuf,
    },

    #[command(about = "Delete a playbook")]
    Delete {
        #[arg(help = "Playbook id")]
        playbook_id: i64,

        #[arg(short, long, help = "Skip the confirmation prompt")]
        yes: bool,
    },

    #[command(about = "Show or rotate the webhook token")]
    WebhookToken {
        #[arg(help = "Playbook id")]
        playbook_id: i64,

        #[arg(long, help = "Issue a new token, invalidating the old one")]
        rotate: bool,
    },
}

pub async fn handle_playbooks_command(ctx: &mut CliContext, cmd: PlaybooksCommand) -> Result<()> {
    match cmd {
        PlaybooksCommand::List { format } => cmd_playbooks_list(ctx, &format).await,
        PlaybooksCommand::Show {
            playbook_id,
            content,
        } => cmd_playbooks_show(ctx, playbook_id, content).await,
        PlaybooksCommand::Create {
            name,
            file,
            description,
        } => cmd_playbooks_create(ctx, name, file, description).await,
        PlaybooksCommand::Update { playbook_id, file } => {
            cmd_playbooks_update(ctx, playbook_id, file).await
        }
        PlaybooksCommand::Delete { playbook_id, yes } => {
            cmd_playbooks_delete(ctx, playbook_id, yes).await
        }
        PlaybooksCommand::WebhookToken {
            playbook_id,
            rotate,
        } => cmd_playbooks_webhook_token(ctx, playbook_id, rotate).await,
    }
}

async fn cmd_playbooks_list(ctx: &mut CliContext, format: &str) -> Result<()> {
    ctx.refresh().await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(ctx.store.playbooks())?);
        return Ok(());
    }

    if ctx.store.playbooks().is_empty() {
        println!("{}", "No playbooks found.".yellow());
        return Ok(());
    }

    let run_counts = ctx.store.runs_by_playbook();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("ID").fg(Color::White),
            Cell::new("Name").fg(Color::White),
            Cell::new("Runs").fg(Color::White),
            Cell::new("Schedule").fg(Color::White),
            Cell::new("Updated").fg(Color::White),
        ]);

    for playbook in ctx.store.playbooks() {
        let schedule = playbook
            .schedule
            .as_ref()
            .filter(|s| s.enabled)
            .map(|s| s.value.clone())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(playbook.id),
            Cell::new(&playbook.name),
            Cell::new(run_counts.get(&playbook.id).copied().unwrap_or(0)),
            Cell::new(schedule),
            Cell::new(
                playbook
                    .updated_at
                    .unwrap_or(playbook.created_at)
                    .format("%Y-%m-%d %H:%M")
                    .to_string(),
            ),
        ]);
    }

    println!("{table}");
    Ok(())
}

async fn cmd_playbooks_show(ctx: &mut CliContext, playbook_id: i64, content: bool) -> Result<()> {
    let playbook = ctx.api.get_playbook(playbook_id).await?;

    println!("{}", playbook.name.cyan().bold());
    if let Some(description) = &playbook.description {
        println!("  {description}");
    }
    println!("  variables: {}", serde_json::to_string(&playbook.variables)?);
    if let Some(schedule) = &playbook.schedule {
        println!(
            "  schedule:  {} ({}, enabled: {})",
            schedule.value,
            serde_json::to_value(schedule.schedule_type)?
                .as_str()
                .unwrap_or_default(),
            schedule.enabled
        );
    }
    if content {
        if let Some(text) = &playbook.stored_content {
            println!();
            println!("{text}");
        }
    }
    Ok(())
}

async fn cmd_playbooks_create(
    ctx: &mut CliContext,
    name: String,
    file: PathBuf,
    description: Option<String>,
) -> Result<()> {
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("reading {}", file.display()))?;
    validate_playbook_content(&content)?;

    let request = PlaybookWriteRequest {
        name,
        description,
        stored_content: Some(content),
        ..Default::default()
    };
    let playbook = ctx.api.create_playbook(&request).await?;
    println!(
        "{} playbook {} created (id {})",
        "✓".green().bold(),
        playbook.name,
        playbook.id
    );
    Ok(())
}

async fn cmd_playbooks_update(ctx: &mut CliContext, playbook_id: i64, file: PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("reading {}", file.display()))?;
    validate_playbook_content(&content)?;

    let existing = ctx.api.get_playbook(playbook_id).await?;
    let request = PlaybookWriteRequest {
        name: existing.name,
        description: existing.description,
        stored_content: Some(content),
        repo_path: existing.repo_path,
        variables: existing.variables,
        schedule: existing.schedule,
    };
    ctx.api.update_playbook(playbook_id, &request).await?;
    println!("{} playbook {} updated", "✓".green().bold(), playbook_id);
    Ok(())
}

async fn cmd_playbooks_delete(ctx: &mut CliContext, playbook_id: i64, yes: bool) -> Result<()> {
    if !confirm(&format!("Delete playbook {playbook_id}?"), yes)? {
        println!("{}", "Cancelled.".yellow());
        return Ok(());
    }
    // Integrity constraints (referencing runs/triggers) are server-enforced;
    // a refusal comes back as an application error.
    ctx.api.delete_playbook(playbook_id).await?;
    println!("{} playbook {} deleted", "✓".green().bold(), playbook_id);
    Ok(())
}

async fn cmd_playbooks_webhook_token(
    ctx: &mut CliContext,
    playbook_id: i64,
    rotate: bool,
) -> Result<()> {
    let token = if rotate {
        ctx.api.rotate_webhook_token(playbook_id).await?
    } else {
        ctx.api.get_webhook_token(playbook_id).await?
    };
    if rotate {
        println!("{} token rotated", "✓".green().bold());
    }
    println!("  token: {}", token.token);
    println!("  path:  {}", token.url_path);
    Ok(())
}
