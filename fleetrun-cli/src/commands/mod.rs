mod approvals;
mod instances;
mod playbooks;
mod runs;
mod templates;
mod triggers;

pub use approvals::{handle_approvals_command, ApprovalsCommand};
pub use instances::{handle_instances_command, InstancesCommand};
pub use playbooks::{handle_playbooks_command, PlaybooksCommand};
pub use runs::{handle_runs_command, RunsCommand};
pub use templates::{handle_templates_command, TemplatesCommand};
pub use triggers::{handle_triggers_command, TriggersCommand};

use anyhow::Result;
use colored::Colorize;
use fleetrun_core::{
    ApiClient, ApprovalWorkflow, Selection, SessionState, SortDirection, Store, StreamManager,
    TableQuery, Viewable,
};
use std::io::Write;

use crate::config::{resolve, resolve_role, CliOverrides};

/// Everything a command handler needs: the HTTP collaborator, the store,
/// the single allowed stream, and session-scoped state.
pub struct CliContext {
    pub api: ApiClient,
    pub store: Store,
    pub streams: StreamManager,
    pub session: SessionState,
    pub workflow: ApprovalWorkflow,
}

impl CliContext {
    pub fn connect(overrides: CliOverrides) -> Result<Self> {
        let config = resolve(&overrides)?;
        let api = ApiClient::new(&config.server)?;
        Ok(Self {
            api,
            store: Store::new(),
            streams: StreamManager::new(),
            session: SessionState::new(),
            workflow: ApprovalWorkflow::new(resolve_role()),
        })
    }

    pub async fn refresh(&mut self) -> Result<()> {
        self.store.refresh_all(&self.api).await?;
        Ok(())
    }
}

/// Shared list-view flags, mapped straight onto the core table query.
#[derive(Debug, Clone, clap::Args)]
pub struct ListArgs {
    #[arg(short, long, default_value = "", help = "Free-text filter")]
    pub search: String,

    #[arg(long, help = "Categorical filter (status or event type)")]
    pub filter: Option<String>,

    #[arg(long, default_value = "1", help = "Page (1-based)")]
    pub page: usize,

    #[arg(long, default_value = "25", help = "Items per page")]
    pub page_size: usize,

    #[arg(long, help = "Sort oldest first")]
    pub ascending: bool,

    #[arg(
        short,
        long,
        default_value = "text",
        help = "Output format (text, json)"
    )]
    pub format: String,
}

impl ListArgs {
    pub fn query(&self) -> TableQuery {
        TableQuery {
            search: self.search.clone(),
            category: self.filter.clone(),
            direction: if self.ascending {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            },
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Footer line under every table: page window and filtered count.
pub fn print_page_footer<T>(page: &fleetrun_core::ViewPage<T>) {
    println!(
        "{}",
        format!(
            "page {}/{} ({} items)",
            page.page, page.total_pages, page.filtered_count
        )
        .dimmed()
    );
}

/// Build a selection over explicitly listed ids, validated against the
/// current collection so stale ids drop out.
pub fn selection_from_ids<T: Viewable>(items: &[T], ids: &[i64]) -> Selection {
    let query = TableQuery::default();
    let mut selection = Selection::new();
    for id in ids {
        if items.iter().any(|item| item.entity_id() == *id) {
            selection.toggle(*id, &query, items.len());
        }
    }
    selection
}

/// Confirmation collaborator: `--yes` skips the prompt, otherwise ask on
/// stdin. Declining is not an error, just a no-op.
pub fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    print!("{} [y/N] ", prompt.yellow());
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
