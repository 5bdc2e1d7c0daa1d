use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use fleetrun_core::{
    parse_extra_vars, validate_trigger_filters, view, TriggerEvent, TriggerWriteRequest,
};

use super::{confirm, print_page_footer, selection_from_ids, CliContext, ListArgs};

#[derive(Subcommand)]
pub enum TriggersCommand {
    #[command(about = "List event triggers")]
    List {
        #[command(flatten)]
        args: ListArgs,
    },

    #[command(about = "Create a trigger")]
    Create {
        #[arg(help = "Target playbook id")]
        playbook_id: i64,

        #[arg(value_parser = parse_event, help = "host_created, host_tags_changed or secret_rotated")]
        event: TriggerEvent,

        #[arg(long, default_value = "", help = "Filter predicate as a JSON object")]
        filters: String,

        #[arg(long, default_value = "", help = "Extra variables as a JSON object")]
        extra_vars: String,

        #[arg(long, help = "Create disabled")]
        disabled: bool,
    },

    #[command(about = "Enable triggers, best-effort")]
    Enable {
        #[arg(value_delimiter = ',', help = "Trigger ids")]
        trigger_ids: Vec<i64>,
    },

    #[command(about = "Disable triggers, best-effort")]
    Disable {
        #[arg(value_delimiter = ',', help = "Trigger ids")]
        trigger_ids: Vec<i64>,
    },

    #[command(about = "Delete triggers, best-effort")]
    Delete {
        #[arg(value_delimiter = ',', help = "Trigger ids")]
        trigger_ids: Vec<i64>,

        #[arg(short, long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
}

fn parse_event(raw: &str) -> Result<TriggerEvent, String> {
    match raw {
        "host_created" => Ok(TriggerEvent::HostCreated),
        "host_tags_changed" => Ok(TriggerEvent::HostTagsChanged),
        "secret_rotated" => Ok(TriggerEvent::SecretRotated),
        other => Err(format!("unknown event type '{other}'")),
    }
}

pub async fn handle_triggers_command(ctx: &mut CliContext, cmd: TriggersCommand) -> Result<()> {
    match cmd {
        TriggersCommand::List { args } => cmd_triggers_list(ctx, &args).await,
        TriggersCommand::Create {
            playbook_id,
            event,
            filters,
            extra_vars,
            disabled,
        } => cmd_triggers_create(ctx, playbook_id, event, &filters, &extra_vars, disabled).await,
        TriggersCommand::Enable { trigger_ids } => cmd_triggers_toggle(ctx, trigger_ids, true).await,
        TriggersCommand::Disable { trigger_ids } => {
            cmd_triggers_toggle(ctx, trigger_ids, false).await
        }
        TriggersCommand::Delete { trigger_ids, yes } => {
            cmd_triggers_delete(ctx, trigger_ids, yes).await
        }
    }
}

async fn cmd_triggers_list(ctx: &mut CliContext, args: &ListArgs) -> Result<()> {
    ctx.refresh().await?;

    let query = args.query();
    let page = view(ctx.store.triggers(), &query);

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&page.page_items)?);
        return Ok(());
    }

    if page.page_items.is_empty() {
        println!("{}", "No triggers found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("ID").fg(Color::White),
            Cell::new("Playbook").fg(Color::White),
            Cell::new("Event").fg(Color::White),
            Cell::new("Enabled").fg(Color::White),
            Cell::new("Filters").fg(Color::White),
        ]);

    for trigger in &page.page_items {
        let playbook = ctx
            .store
            .playbook_by_id(trigger.playbook_id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("#{}", trigger.playbook_id));
        let enabled = if trigger.enabled {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(trigger.id),
            Cell::new(playbook),
            Cell::new(trigger.event.to_string()),
            enabled,
            Cell::new(serde_json::to_string(&trigger.filters)?),
        ]);
    }

    println!("{table}");
    print_page_footer(&page);
    Ok(())
}

async fn cmd_triggers_create(
    ctx: &mut CliContext,
    playbook_id: i64,
    event: TriggerEvent,
    filters: &str,
    extra_vars: &str,
    disabled: bool,
) -> Result<()> {
    let filters = parse_extra_vars(filters)?;
    validate_trigger_filters(event, &filters)?;
    let extra_vars = parse_extra_vars(extra_vars)?;

    let request = TriggerWriteRequest {
        playbook_id,
        event,
        enabled: !disabled,
        filters,
        extra_vars,
    };
    let trigger = ctx.api.create_trigger(&request).await?;
    println!(
        "{} trigger {} created for {}",
        "✓".green().bold(),
        trigger.id,
        trigger.event
    );
    Ok(())
}

async fn cmd_triggers_toggle(
    ctx: &mut CliContext,
    trigger_ids: Vec<i64>,
    enabled: bool,
) -> Result<()> {
    ctx.refresh().await?;
    let mut selection = selection_from_ids(ctx.store.triggers(), &trigger_ids);

    let outcome = ctx
        .workflow
        .bulk_set_triggers_enabled(&ctx.api, &mut ctx.store, &mut selection, enabled)
        .await?;

    let verb = if enabled { "enable" } else { "disable" };
    let notice = outcome.notice(verb);
    if outcome.failed == 0 {
        println!("{} {notice}", "✓".green().bold());
    } else {
        println!("{} {notice}", "!".yellow().bold());
    }
    Ok(())
}

async fn cmd_triggers_delete(ctx: &mut CliContext, trigger_ids: Vec<i64>, yes: bool) -> Result<()> {
    ctx.refresh().await?;
    let mut selection = selection_from_ids(ctx.store.triggers(), &trigger_ids);

    if !confirm(&format!("Delete {} triggers?", selection.len()), yes)? {
        println!("{}", "Cancelled.".yellow());
        return Ok(());
    }

    let outcome = ctx
        .workflow
        .bulk_delete_triggers(&ctx.api, &mut ctx.store, &mut selection)
        .await?;

    let notice = outcome.notice("delete");
    if outcome.failed == 0 {
        println!("{} {notice}", "✓".green().bold());
    } else {
        println!("{} {notice}", "!".yellow().bold());
    }
    Ok(())
}
