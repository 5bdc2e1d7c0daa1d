mod approval;
mod playbook;
mod run;
mod template;
mod trigger;

pub use approval::{Approval, ApprovalDecisionRequest, ApprovalStatus, DecisionOutcome};
pub use playbook::{
    parse_extra_vars, validate_playbook_content, Playbook, PlaybookWriteRequest, Schedule,
    ScheduleType, WebhookToken,
};
pub use run::{Run, RunArtifact, RunCreateRequest, RunStatus};
pub use template::{Instance, Template};
pub use trigger::{validate_trigger_filters, Trigger, TriggerEvent, TriggerWriteRequest};
