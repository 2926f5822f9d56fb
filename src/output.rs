//! CLI output formatting.
//!
//! # Information-First Display
//!
//! The primary line for every entity is its identity (image name, action
//! position and kind); sizes and paths follow as indented context lines.
//!
//! # Output Format
//!
//! ## Process
//!
//! ```text
//! cat.jpg (100x80 .jpg)
//!     001 crop 50x40 at 10,10 → 50x40 .jpg
//!     002 resize to 25x20 → 25x20 .jpg
//!     003 convert to png → 25x20 .png
//! Saved proc_4f1c9a0e5b7d2c8836e1a0b9f3d4c5e6.png
//!     Reference: /processed/proc_4f1c9a0e5b7d2c8836e1a0b9f3d4c5e6.png
//! ```
//!
//! ## Check
//!
//! ```text
//! cat.jpg (2 actions)
//!     001 crop 50x40 at 10,10
//!     002 convert to png
//! ```
//!
//! ## Errors
//!
//! ```text
//! Error (out_of_range, 400)
//!     failed to perform action crop (#0): ...
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::imaging::ActionParams;
use crate::pipeline::AppliedStep;
use crate::process::{ProcessError, ProcessReport};

/// Format a 0-based step index as a 1-based, 3-digit zero-padded position.
fn format_index(index: usize) -> String {
    format!("{:0>3}", index + 1)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn format_size((width, height): (u32, u32)) -> String {
    format!("{width}x{height}")
}

fn step_line(step: &AppliedStep) -> String {
    format!(
        "{}{} {} {} → {} {}",
        indent(1),
        format_index(step.index),
        step.kind,
        step.description,
        format_size(step.dimensions),
        step.extension
    )
}

/// Format the report of a successful request.
pub fn format_process_report(report: &ProcessReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({} {})",
        report.image_name,
        format_size(report.source_dimensions),
        report.source_extension
    )];
    lines.extend(report.steps.iter().map(step_line));
    lines.push(format!("Saved {}", report.name));
    lines.push(format!("{}Reference: {}", indent(1), report.reference));
    lines
}

pub fn print_process_report(report: &ProcessReport) {
    for line in format_process_report(report) {
        println!("{}", line);
    }
}

/// Format a dry-run plan: the decoded actions without an image.
pub fn format_plan(image_name: &str, plan: &[ActionParams]) -> Vec<String> {
    let count = match plan.len() {
        1 => "1 action".to_string(),
        n => format!("{n} actions"),
    };
    let mut lines = vec![format!("{} ({})", image_name, count)];
    for (index, params) in plan.iter().enumerate() {
        lines.push(format!(
            "{}{} {} {}",
            indent(1),
            format_index(index),
            params.kind(),
            params.describe()
        ));
    }
    lines
}

pub fn print_plan(image_name: &str, plan: &[ActionParams]) {
    for line in format_plan(image_name, plan) {
        println!("{}", line);
    }
}

/// Format a failed request with its category and status code.
pub fn format_process_error(err: &ProcessError) -> Vec<String> {
    let category = err.category();
    let category_name = serde_json::to_value(category)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    vec![
        format!("Error ({}, {})", category_name, category.status_code()),
        format!("{}{}", indent(1), err),
    ]
}

pub fn print_process_error(err: &ProcessError) {
    for line in format_process_error(err) {
        println!("{}", line);
    }
}
