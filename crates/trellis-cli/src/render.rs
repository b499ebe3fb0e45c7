//! Plain-text rendering of replay reports and network layouts

use crate::scenario::{ReplayReport, StepOutcome};
use std::fmt::Write;
use trellis_core::rete_network::NodeSummary;

pub fn replay_text(report: &ReplayReport) -> String {
    let mut out = String::new();
    for step in &report.steps {
        out.push_str(&step_line(step));
        out.push('\n');
    }
    out.push('\n');
    let _ = writeln!(out, "Active matches: {}", report.active.len());
    for activation in &report.active {
        let _ = writeln!(out, "  {activation}");
    }
    out.push('\n');
    let _ = write!(out, "{}", report.stats);
    out
}

pub fn step_line(step: &StepOutcome) -> String {
    let mut line = format!("[{}] {} {} ({})", step.step, step.op, step.id, step.handle);
    if let Some(error) = &step.error {
        let _ = write!(line, ": error: {error}");
        return line;
    }
    if step.activated.is_empty() && step.deactivated.is_empty() {
        line.push_str(": no change");
    } else {
        line.push(':');
        for activation in &step.deactivated {
            let _ = write!(line, " -{activation}");
        }
        for activation in &step.activated {
            let _ = write!(line, " +{activation}");
        }
    }
    line
}

pub fn layout_text(summaries: &[NodeSummary]) -> String {
    let mut out = String::from("=== Network Layout ===\n");
    for summary in summaries {
        let _ = write!(
            out,
            "{:>5} {:<18} {}",
            summary.node.to_string(),
            summary.kind.to_string(),
            summary.description
        );
        if let Some(rule) = &summary.rule {
            let _ = write!(out, " [{rule}]");
        }
        if summary.indexed {
            let _ = write!(out, " (indexed on {})", summary.index_count);
        }
        out.push('\n');
    }
    out
}
