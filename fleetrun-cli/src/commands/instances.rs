use anyhow::{anyhow, Result};
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use fleetrun_core::RunCreateRequest;

use super::CliContext;

#[derive(Subcommand)]
pub enum InstancesCommand {
    #[command(about = "List template instances")]
    List {
        #[arg(
            short,
            long,
            default_value = "text",
            help = "Output format (text, json)"
        )]
        format: String,
    },

    #[command(about = "Submit a run from an instance's values and targets")]
    Run {
        #[arg(help = "Instance id")]
        instance_id: i64,

        #[arg(help = "Playbook id to run against")]
        playbook_id: i64,

        #[arg(long, help = "Check mode, no changes applied")]
        dry_run: bool,
    },
}

pub async fn handle_instances_command(ctx: &mut CliContext, cmd: InstancesCommand) -> Result<()> {
    match cmd {
        InstancesCommand::List { format } => cmd_instances_list(ctx, &format).await,
        InstancesCommand::Run {
            instance_id,
            playbook_id,
            dry_run,
        } => cmd_instances_run(ctx, instance_id, playbook_id, dry_run).await,
    }
}

async fn cmd_instances_list(ctx: &mut CliContext, format: &str) -> Result<()> {
    ctx.refresh().await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(ctx.store.instances())?);
        return Ok(());
    }

    if ctx.store.instances().is_empty() {
        println!("{}", "No instances found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("ID").fg(Color::White),
            Cell::new("Name").fg(Color::White),
            Cell::new("Template").fg(Color::White),
            Cell::new("Hosts").fg(Color::White),
            Cell::new("Groups").fg(Color::White),
        ]);

    for instance in ctx.store.instances() {
        let template = ctx
            .store
            .templates()
            .iter()
            .find(|t| t.id == instance.template_id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| format!("#{}", instance.template_id));
        table.add_row(vec![
            Cell::new(instance.id),
            Cell::new(&instance.name),
            Cell::new(template),
            Cell::new(instance.host_ids.len()),
            Cell::new(instance.group_ids.len()),
        ]);
    }

    println!("{table}");
    Ok(())
}

async fn cmd_instances_run(
    ctx: &mut CliContext,
    instance_id: i64,
    playbook_id: i64,
    dry_run: bool,
) -> Result<()> {
    ctx.refresh().await?;

    let instance = ctx
        .store
        .instances()
        .iter()
        .find(|i| i.id == instance_id)
        .ok_or_else(|| anyhow!("instance {instance_id} not found"))?
        .clone();
    let template = ctx
        .store
        .templates()
        .iter()
        .find(|t| t.id == instance.template_id)
        .ok_or_else(|| anyhow!("template {} not found", instance.template_id))?;

    let request = RunCreateRequest {
        host_ids: instance.host_ids.clone(),
        group_ids: instance.group_ids.clone(),
        extra_vars: instance.effective_vars(template),
        dry_run,
    };
    let run = ctx.api.submit_run(playbook_id, &request).await?;
    println!(
        "{} run {} submitted from instance '{}'",
        "✓".green().bold(),
        run.id,
        instance.name
    );
    Ok(())
}
