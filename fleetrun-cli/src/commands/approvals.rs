use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use fleetrun_core::{view, ApprovalStatus, DecisionOutcome};

use super::{confirm, print_page_footer, selection_from_ids, CliContext, ListArgs};

#[derive(Subcommand)]
pub enum ApprovalsCommand {
    #[command(about = "List approval gates")]
    List {
        #[command(flatten)]
        args: ListArgs,
    },

    #[command(about = "Show the parameter diff an approval authorizes")]
    Diff {
        #[arg(help = "Approval id")]
        approval_id: i64,
    },

    #[command(about = "Decide one approval")]
    Decide {
        #[arg(help = "Approval id")]
        approval_id: i64,

        #[arg(value_parser = parse_outcome, help = "approved or rejected")]
        outcome: DecisionOutcome,

        #[arg(short, long, help = "Reason recorded with the decision")]
        reason: Option<String>,
    },

    #[command(about = "Decide several approvals, best-effort")]
    BulkDecide {
        #[arg(value_delimiter = ',', help = "Approval ids")]
        approval_ids: Vec<i64>,

        #[arg(long, value_parser = parse_outcome, help = "approved or rejected")]
        outcome: DecisionOutcome,

        #[arg(short, long, help = "Reason recorded with every decision")]
        reason: Option<String>,

        #[arg(short, long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
}

fn parse_outcome(raw: &str) -> Result<DecisionOutcome, String> {
    match raw {
        "approved" | "approve" => Ok(DecisionOutcome::Approved),
        "rejected" | "reject" => Ok(DecisionOutcome::Rejected),
        other => Err(format!("expected 'approved' or 'rejected', got '{other}'")),
    }
}

pub async fn handle_approvals_command(ctx: &mut CliContext, cmd: ApprovalsCommand) -> Result<()> {
    match cmd {
        ApprovalsCommand::List { args } => cmd_approvals_list(ctx, &args).await,
        ApprovalsCommand::Diff { approval_id } => cmd_approvals_diff(ctx, approval_id).await,
        ApprovalsCommand::Decide {
            approval_id,
            outcome,
            reason,
        } => cmd_approvals_decide(ctx, approval_id, outcome, reason).await,
        ApprovalsCommand::BulkDecide {
            approval_ids,
            outcome,
            reason,
            yes,
        } => cmd_approvals_bulk(ctx, approval_ids, outcome, reason, yes).await,
    }
}

fn status_cell(status: ApprovalStatus) -> Cell {
    let color = match status {
        ApprovalStatus::Pending => Color::Yellow,
        ApprovalStatus::Approved => Color::Green,
        ApprovalStatus::Rejected => Color::Red,
    };
    Cell::new(status.to_string()).fg(color)
}

async fn cmd_approvals_list(ctx: &mut CliContext, args: &ListArgs) -> Result<()> {
    ctx.refresh().await?;

    let query = args.query();
    let page = view(ctx.store.approvals(), &query);

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&page.page_items)?);
        return Ok(());
    }

    if page.page_items.is_empty() {
        println!("{}", "No approvals found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("ID").fg(Color::White),
            Cell::new("Run").fg(Color::White),
            Cell::new("Status").fg(Color::White),
            Cell::new("Reason").fg(Color::White),
            Cell::new("Requested").fg(Color::White),
            Cell::new("Decided").fg(Color::White),
        ]);

    for approval in &page.page_items {
        table.add_row(vec![
            Cell::new(approval.id),
            Cell::new(approval.run_id),
            status_cell(approval.status),
            Cell::new(approval.reason.as_deref().unwrap_or("-")),
            Cell::new(approval.created_at.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(
                approval
                    .decided_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }

    println!("{table}");
    print_page_footer(&page);
    Ok(())
}

async fn cmd_approvals_diff(ctx: &mut CliContext, approval_id: i64) -> Result<()> {
    ctx.refresh().await?;

    let approval = ctx
        .store
        .approval_by_id(approval_id)
        .ok_or_else(|| anyhow::anyhow!("approval {approval_id} not found"))?
        .clone();
    let run = ctx
        .store
        .run_by_id(approval.run_id)
        .ok_or_else(|| anyhow::anyhow!("run {} not found", approval.run_id))?;

    let modal = ctx.session.open_diff(
        approval.id,
        run.id,
        &run.params_before(),
        &run.params_after(),
    );

    println!(
        "{}",
        format!("Approval #{} audits run #{}", approval.id, run.id)
            .cyan()
            .bold()
    );
    if modal.result.is_empty() {
        println!("{}", "No parameter changes.".dimmed());
    }
    for (key, value) in &modal.result.added {
        println!("  {} {key} = {value}", "+".green().bold());
    }
    for (key, value) in &modal.result.removed {
        println!("  {} {key} = {value}", "-".red().bold());
    }
    for (key, change) in &modal.result.changed {
        println!(
            "  {} {key}: {} {} {}",
            "~".yellow().bold(),
            change.before,
            "→".dimmed(),
            change.after
        );
    }

    ctx.session.close_diff();
    Ok(())
}

async fn cmd_approvals_decide(
    ctx: &mut CliContext,
    approval_id: i64,
    outcome: DecisionOutcome,
    reason: Option<String>,
) -> Result<()> {
    ctx.refresh().await?;
    let approval = ctx
        .store
        .approval_by_id(approval_id)
        .ok_or_else(|| anyhow::anyhow!("approval {approval_id} not found"))?
        .clone();

    ctx.workflow
        .decide(&ctx.api, &mut ctx.store, &approval, outcome, reason)
        .await?;
    println!("{} approval {} {}", "✓".green().bold(), approval_id, outcome);
    Ok(())
}

async fn cmd_approvals_bulk(
    ctx: &mut CliContext,
    approval_ids: Vec<i64>,
    outcome: DecisionOutcome,
    reason: Option<String>,
    yes: bool,
) -> Result<()> {
    ctx.refresh().await?;

    let mut selection = selection_from_ids(ctx.store.approvals(), &approval_ids);
    if !confirm(
        &format!("Mark {} approvals as {}?", selection.len(), outcome),
        yes,
    )? {
        println!("{}", "Cancelled.".yellow());
        return Ok(());
    }

    let outcome_counts = ctx
        .workflow
        .bulk_decide(&ctx.api, &mut ctx.store, &mut selection, outcome, reason)
        .await?;

    // Exactly one aggregate notice, never one per item.
    let notice = outcome_counts.notice("decide");
    if outcome_counts.failed == 0 {
        println!("{} {notice}", "✓".green().bold());
    } else {
        println!("{} {notice}", "!".yellow().bold());
    }
    Ok(())
}
