//! Session-scoped interactive state.
//!
//! Everything the view layer mutates lives in one explicit struct instead of
//! ambient component state: per-tab table queries, selection sets, and the
//! open parameter-diff payload. Reset rules are tied to the two invalidation
//! events: a filter change clears that tab's selection, a project change
//! clears everything and closes the live stream.

use serde_json::Value;

use crate::diff::{diff, DiffResult};
use crate::store::Store;
use crate::stream::StreamManager;
use crate::view::{Selection, TableQuery};

/// The tabs of the orchestration surface that carry table state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Runs,
    Approvals,
    Triggers,
}

/// Table state for one tab: query plus selection.
#[derive(Debug, Clone, Default)]
pub struct TabState {
    pub query: TableQuery,
    pub selection: Selection,
}

impl TabState {
    /// Apply a new query. Any filter or page-size change invalidates the
    /// selection; moving between pages alone does not.
    pub fn set_query(&mut self, query: TableQuery, collection_len: usize) {
        self.query = query;
        self.selection.revalidate(&self.query, collection_len);
    }
}

/// Open parameter-diff modal: which approval it audits and the computed
/// diff between the parameters before and after the change.
#[derive(Debug, Clone)]
pub struct DiffModal {
    pub approval_id: i64,
    pub run_id: i64,
    pub result: DiffResult,
}

/// Aggregate session state, passed explicitly to each operation.
#[derive(Default)]
pub struct SessionState {
    pub runs: TabState,
    pub approvals: TabState,
    pub triggers: TabState,
    pub diff_modal: Option<DiffModal>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tab_mut(&mut self, tab: Tab) -> &mut TabState {
        match tab {
            Tab::Runs => &mut self.runs,
            Tab::Approvals => &mut self.approvals,
            Tab::Triggers => &mut self.triggers,
        }
    }

    /// Open the diff modal for an approval, auditing what the decision
    /// would authorize.
    pub fn open_diff(
        &mut self,
        approval_id: i64,
        run_id: i64,
        before: &Value,
        after: &Value,
    ) -> &DiffModal {
        self.diff_modal.insert(DiffModal {
            approval_id,
            run_id,
            result: diff(before, after),
        })
    }

    pub fn close_diff(&mut self) {
        self.diff_modal = None;
    }

    /// Project switch: the one authoritative cancellation signal. Closes
    /// the live stream and discards its buffer, drops every selection and
    /// open modal, and invalidates the store cache — all before the next
    /// refresh is issued.
    pub fn on_project_changed(&mut self, store: &mut Store, streams: &mut StreamManager) {
        streams.on_project_changed();
        self.runs = TabState::default();
        self.approvals = TabState::default();
        self.triggers = TabState::default();
        self.diff_modal = None;
        store.invalidate();
    }
}
