//! Shared output helpers.

use crate::commands::{AgentStatus, IssueReport};
use crate::writer::Artifact;

const ICON_GOOD: &str = "✔";
const ICON_BAD: &str = "✖";

/// `✔ Label: value`
#[must_use]
pub fn format_selected(label: &str, value: &str) -> String {
    format!("{ICON_GOOD} {label}: {value}")
}

/// `✖ Label: reason`
#[must_use]
pub fn format_failed(label: &str, reason: &str) -> String {
    format!("{ICON_BAD} {label}: {reason}")
}

fn artifact_line(artifact: &Artifact) -> String {
    format_selected(artifact.label, &artifact.path.display().to_string())
}

/// Summary lines: main artifacts, agent status, then add-user artifacts.
#[must_use]
pub fn render_report(report: &IssueReport) -> Vec<String> {
    let mut lines: Vec<String> = report.artifacts.iter().map(artifact_line).collect();

    match &report.agent {
        AgentStatus::Added => lines.push(format_selected("SSH Agent", "yes")),
        AgentStatus::Failed(reason) => lines.push(format_failed("SSH Agent", reason)),
        AgentStatus::Skipped => {}
    }

    lines.extend(report.provisioner_artifacts.iter().map(artifact_line));
    lines
}
