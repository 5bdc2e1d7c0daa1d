use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use fleetrun_core::{parse_extra_vars, view, Run, RunCreateRequest, RunStatus, TailEvent};

use super::{print_page_footer, CliContext, ListArgs};

#[derive(Subcommand)]
pub enum RunsCommand {
    #[command(about = "List runs with effective statuses")]
    List {
        #[command(flatten)]
        args: ListArgs,
    },

    #[command(about = "Show one run, including its stored log")]
    Show {
        #[arg(help = "Run id")]
        run_id: i64,

        #[arg(long, help = "Print the full log text")]
        logs: bool,
    },

    #[command(about = "Submit a run of a playbook")]
    Submit {
        #[arg(help = "Playbook id")]
        playbook_id: i64,

        #[arg(long, value_delimiter = ',', help = "Explicit target host ids")]
        host_ids: Vec<i64>,

        #[arg(long, value_delimiter = ',', help = "Target group ids")]
        group_ids: Vec<i64>,

        #[arg(long, default_value = "", help = "Extra variables as a JSON object")]
        extra_vars: String,

        #[arg(long, help = "Check mode, no changes applied")]
        dry_run: bool,
    },

    #[command(about = "Tail the live log stream of a run")]
    Logs {
        #[arg(help = "Run id")]
        run_id: i64,
    },

    #[command(about = "List artifacts of a run with download URLs")]
    Artifacts {
        #[arg(help = "Run id")]
        run_id: i64,
    },
}

pub async fn handle_runs_command(ctx: &mut CliContext, cmd: RunsCommand) -> Result<()> {
    match cmd {
        RunsCommand::List { args } => cmd_runs_list(ctx, &args).await,
        RunsCommand::Show { run_id, logs } => cmd_runs_show(ctx, run_id, logs).await,
        RunsCommand::Submit {
            playbook_id,
            host_ids,
            group_ids,
            extra_vars,
            dry_run,
        } => cmd_runs_submit(ctx, playbook_id, host_ids, group_ids, &extra_vars, dry_run).await,
        RunsCommand::Logs { run_id } => cmd_runs_logs(ctx, run_id).await,
        RunsCommand::Artifacts { run_id } => cmd_runs_artifacts(ctx, run_id).await,
    }
}

fn status_cell(status: RunStatus) -> Cell {
    let color = match status {
        RunStatus::Pending => Color::Yellow,
        RunStatus::Running => Color::Cyan,
        RunStatus::Success => Color::Green,
        RunStatus::Failed => Color::Red,
    };
    Cell::new(status.to_string()).fg(color)
}

async fn cmd_runs_list(ctx: &mut CliContext, args: &ListArgs) -> Result<()> {
    ctx.refresh().await?;

    let query = args.query();
    let page = view(ctx.store.runs(), &query);

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&page.page_items)?);
        return Ok(());
    }

    if page.page_items.is_empty() {
        println!("{}", "No runs found.".yellow());
        return Ok(());
    }

    let by_playbook = ctx.store.runs_by_playbook();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("ID").fg(Color::White),
            Cell::new("Playbook").fg(Color::White),
            Cell::new("Status").fg(Color::White),
            Cell::new("Triggered By").fg(Color::White),
            Cell::new("Hosts").fg(Color::White),
            Cell::new("Created").fg(Color::White),
        ]);

    for run in &page.page_items {
        let playbook = ctx
            .store
            .playbook_by_id(run.playbook_id)
            .map(|p| {
                let count = by_playbook.get(&p.id).copied().unwrap_or(0);
                format!("{} ({count} runs)", p.name)
            })
            .unwrap_or_else(|| format!("#{}", run.playbook_id));
        let hosts = run
            .resolved_host_count()
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(run.id),
            Cell::new(playbook),
            status_cell(run.effective_status()),
            Cell::new(&run.triggered_by),
            Cell::new(hosts),
            Cell::new(run.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }

    println!("{table}");
    print_page_footer(&page);
    Ok(())
}

async fn cmd_runs_show(ctx: &mut CliContext, run_id: i64, logs: bool) -> Result<()> {
    let run: Run = ctx.api.get_run(run_id).await?;

    println!("{}", format!("Run #{}", run.id).cyan().bold());
    println!("  playbook:  {}", run.playbook_id);
    println!("  status:    {}", run.effective_status());
    if run.effective_status() != run.status {
        println!("  execution: {} (awaiting approval)", run.status);
    }
    println!("  trigger:   {}", run.triggered_by);
    println!("  created:   {}", run.created_at);
    if let Some(started) = run.started_at {
        println!("  started:   {started}");
    }
    if let Some(finished) = run.finished_at {
        println!("  finished:  {finished}");
    }
    if let Some(seconds) = run.duration_seconds() {
        println!("  duration:  {seconds}s");
    }

    if logs {
        println!();
        println!("{}", run.logs);
    }
    Ok(())
}

async fn cmd_runs_submit(
    ctx: &mut CliContext,
    playbook_id: i64,
    host_ids: Vec<i64>,
    group_ids: Vec<i64>,
    extra_vars: &str,
    dry_run: bool,
) -> Result<()> {
    // Validation failures block the action before any request goes out.
    let extra_vars = parse_extra_vars(extra_vars)?;
    let request = RunCreateRequest {
        host_ids,
        group_ids,
        extra_vars,
        dry_run,
    };

    let run = ctx.api.submit_run(playbook_id, &request).await?;
    println!(
        "{} run {} submitted ({})",
        "✓".green().bold(),
        run.id,
        run.effective_status()
    );
    if run.effective_status() == RunStatus::Pending && run.is_gated() {
        println!(
            "{}",
            "This run is approval-gated and will not start until decided.".yellow()
        );
    }
    Ok(())
}

async fn cmd_runs_logs(ctx: &mut CliContext, run_id: i64) -> Result<()> {
    use std::io::Write;

    let stream = ctx.streams.open(&ctx.api, run_id).await?;
    let mut printed = 0;

    loop {
        match stream.next_event().await {
            Ok(Some(TailEvent::Appended)) => {
                let log = stream.log();
                print!("{}", &log[printed..]);
                printed = log.len();
                std::io::stdout().flush()?;
            }
            Ok(Some(TailEvent::Done(status))) => {
                println!();
                println!("{} run finished: {status}", "✓".green().bold());
                break;
            }
            Ok(None) => {
                println!();
                println!(
                    "{}",
                    "Stream closed; full log remains available via 'runs show --logs'.".dimmed()
                );
                break;
            }
            Err(e) => {
                // One notice, no automatic reconnect.
                println!("{} {}", "✗".red().bold(), e);
                break;
            }
        }
    }

    ctx.streams.close();
    Ok(())
}

async fn cmd_runs_artifacts(ctx: &mut CliContext, run_id: i64) -> Result<()> {
    let artifacts = ctx.api.list_artifacts(run_id).await?;
    if artifacts.is_empty() {
        println!("{}", "No artifacts.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Name").fg(Color::White),
            Cell::new("Size").fg(Color::White),
            Cell::new("Download URL").fg(Color::White),
        ]);
    for artifact in &artifacts {
        table.add_row(vec![
            Cell::new(&artifact.name),
            Cell::new(artifact.size),
            Cell::new(ctx.api.artifact_url(run_id, &artifact.name)),
        ]);
    }
    println!("{table}");
    Ok(())
}
