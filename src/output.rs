use crate::event::EventInsertion;
use crate::placement::PlacementDecision;
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Second-resolution run stamp, e.g. `20261018_142501`.
pub fn run_timestamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    now.format("%Y%m%d_%H%M%S").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub image: PathBuf,
    pub explanation: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path, timestamp: &str) -> Self {
        Self {
            image: dir.join(format!("blueprint_{timestamp}.png")),
            explanation: dir.join(format!("explanation_{timestamp}.txt")),
        }
    }
}

/// Reasoning, connections, grid cell and label, as printed to the console.
pub fn explanation_summary(decision: &PlacementDecision, insertion: &EventInsertion) -> String {
    let mut text = decision.reasoning.clone();
    text.push_str("\n\nConnected nodes: ");
    text.push_str(&insertion.linked.join(", "));
    if !insertion.ignored.is_empty() {
        text.push_str("\nIgnored connections: ");
        text.push_str(&insertion.ignored.join(", "));
    }
    text.push_str(&format!(
        "\nGrid position: ({}, {})\nLabel: {}",
        decision.grid_col, decision.grid_row, decision.label
    ));
    text
}

/// Full explanation file contents.
pub fn explanation_document(
    event: &str,
    decision: &PlacementDecision,
    insertion: &EventInsertion,
    search_summary: &str,
) -> String {
    format!(
        "Event: {event}\nNode: {}\nCategory: {}\n\n{}\n\nSearch context:\n{search_summary}\n",
        insertion.id,
        decision.category,
        explanation_summary(decision, insertion)
    )
}
