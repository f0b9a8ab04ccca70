//! CLI commands.

pub mod certificate;

pub use certificate::{
    issue_certificate, plan_issuance, AgentStatus, Collaborators, IssueReport, IssueTarget,
};
