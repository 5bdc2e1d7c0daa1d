//! Fleetrun core: client-side orchestration of playbook runs, approvals and
//! live log tailing against a remote execution backend.

pub mod api;
pub mod config;
pub mod diff;
pub mod error;
pub mod models;
pub mod session;
pub mod store;
pub mod stream;
pub mod view;
pub mod workflow;

pub use api::{ApiClient, ApiDecide, ApiRead, ApiTriggerWrite};
pub use config::{default_config_path, FleetrunConfig, LoggingConfig, ServerConfig};
pub use diff::{canonical_string, diff, structurally_equal, Change, DiffResult};
pub use error::{ErrorCategory, FleetrunError, FleetrunResult};
pub use models::{
    parse_extra_vars, validate_playbook_content, validate_trigger_filters, Approval,
    ApprovalDecisionRequest, ApprovalStatus, DecisionOutcome, Instance, Playbook,
    PlaybookWriteRequest, Run, RunArtifact, RunCreateRequest, RunStatus, Schedule, ScheduleType,
    Template, Trigger, TriggerEvent, TriggerWriteRequest, WebhookToken,
};
pub use session::{DiffModal, SessionState, Tab, TabState};
pub use store::{Snapshot, Store};
pub use stream::{
    unescape_chunk, LogStream, LogTail, SseEvent, SseParser, StreamManager, StreamState, TailEvent,
};
pub use view::{total_pages, view, Selection, SortDirection, TableQuery, ViewPage, Viewable};
pub use workflow::{ApprovalWorkflow, BatchOutcome, Role};
