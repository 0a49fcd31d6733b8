//! Console reporting of build cycles

use std::time::Duration;

use colored::Colorize;
use tracing::debug;

use crate::engine::CycleResult;
use crate::target::TargetKind;
use crate::utils::format_duration;

/// Print the outcome of one cycle: statistics on stdout, errors on stderr
pub fn cycle(kind: TargetKind, result: &CycleResult, elapsed: Option<Duration>) {
    match result {
        CycleResult::Success { summary } => {
            println!("{}", summary);
            eprintln!("{}", success_line(kind, elapsed));
        }
        CycleResult::Failure { error } => {
            debug!("{} cycle failed", kind);
            eprintln!("{}", failure_line(kind));
            eprintln!("{}", error);
        }
    }
}

fn success_line(kind: TargetKind, elapsed: Option<Duration>) -> String {
    let timing = elapsed
        .map(|d| format!(" in {}", format_duration(d)))
        .unwrap_or_default();

    format!(
        "{} {}{}",
        "✓".green().bold(),
        format!("{} built", kind).bold(),
        timing.dimmed()
    )
}

fn failure_line(kind: TargetKind) -> String {
    format!("{} {}", "✗".red().bold(), format!("{} build failed", kind).red())
}
