use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

use super::CliContext;

#[derive(Subcommand)]
pub enum TemplatesCommand {
    #[command(about = "List variable templates")]
    List {
        #[arg(
            short,
            long,
            default_value = "text",
            help = "Output format (text, json)"
        )]
        format: String,
    },
}

pub async fn handle_templates_command(ctx: &mut CliContext, cmd: TemplatesCommand) -> Result<()> {
    match cmd {
        TemplatesCommand::List { format } => cmd_templates_list(ctx, &format).await,
    }
}

async fn cmd_templates_list(ctx: &mut CliContext, format: &str) -> Result<()> {
    ctx.refresh().await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(ctx.store.templates())?);
        return Ok(());
    }

    if ctx.store.templates().is_empty() {
        println!("{}", "No templates found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("ID").fg(Color::White),
            Cell::new("Name").fg(Color::White),
            Cell::new("Defaults").fg(Color::White),
            Cell::new("Instances").fg(Color::White),
        ]);

    for template in ctx.store.templates() {
        let instance_count = ctx
            .store
            .instances()
            .iter()
            .filter(|i| i.template_id == template.id)
            .count();
        table.add_row(vec![
            Cell::new(template.id),
            Cell::new(&template.name),
            Cell::new(serde_json::to_string(&template.vars_defaults)?),
            Cell::new(instance_count),
        ]);
    }

    println!("{table}");
    Ok(())
}
