//! Operator-facing terminal output.
//!
//! Pure formatting helpers are kept separate from the printing functions so
//! they can be tested.

use console::style;

use crate::config::Config;
use crate::orchestration::{ArtifactReport, PassReport, Preview};
use crate::publish::Persisted;
use crate::reconcile::Outcome;
use crate::warning::SyncWarning;

const RULE_WIDTH: usize = 50;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

pub fn display_warning(warning: &SyncWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// Startup banner with what is being watched.
pub fn display_banner(config: &Config) {
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("{}", style("version-sync").bold());
    println!(
        "Watching {} ({}/{}) every {} seconds",
        config.source.repo_path.display(),
        config.source.remote,
        config.source.reference_branch,
        config.interval_secs
    );
    println!("Press Ctrl+C to stop");
    println!("{}", "=".repeat(RULE_WIDTH));
}

pub fn display_pass_start(pass: usize) {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    println!("\n[{}] Pass {}", style(timestamp).dim(), pass);
    println!("{}", "-".repeat(RULE_WIDTH));
}

pub fn display_pass_report(report: &PassReport) {
    for warning in &report.warnings {
        display_warning(warning);
    }

    display_status(&format!(
        "{} at {} -> {}",
        report.commit.short_id(),
        report.commit.committed_at.format("%Y-%m-%d %H:%M %:z"),
        style(&report.version).bold()
    ));

    print_artifact(&report.marker);
    if let Some(manifest) = &report.manifest {
        print_artifact(manifest);
    }
}

fn print_artifact(report: &ArtifactReport) {
    let line = describe_artifact(report);
    match (&report.outcome, &report.persisted) {
        (_, Persisted::Committed { pushed: false, .. }) => display_status(&line),
        (_, Persisted::Resent { pushed: true }) => display_success(&line),
        (Outcome::Changed { .. }, _) => display_success(&line),
        _ => display_status(&line),
    }
}

/// One-line summary of what happened to an artifact.
pub fn describe_artifact(report: &ArtifactReport) -> String {
    let path = report.path.display();
    let change = match &report.outcome {
        Outcome::Unchanged => format!("{} already up to date", path),
        Outcome::Changed { old: Some(old) } => format!("{} updated from {}", path, old),
        Outcome::Changed { old: None } => format!("{} created", path),
    };

    match &report.persisted {
        Persisted::Skipped => change,
        Persisted::Resent { pushed: true } => format!("{}, earlier commits pushed", change),
        Persisted::Resent { pushed: false } => format!("{}, earlier commits still unpushed", change),
        Persisted::Committed {
            commit,
            pushed: true,
        } => format!("{}, committed {} and pushed", change, short(commit)),
        Persisted::Committed {
            commit,
            pushed: false,
        } => format!("{}, committed {} (not pushed)", change, short(commit)),
    }
}

pub fn display_preview(preview: &Preview) {
    for warning in &preview.warnings {
        display_warning(warning);
    }

    display_status("Dry run, nothing will be written:");
    display_status(&format!(
        "{} -> {}",
        preview.commit.short_id(),
        style(&preview.version).bold()
    ));

    for artifact in &preview.artifacts {
        let current = artifact.current.as_deref().unwrap_or("(none)");
        if artifact.stale {
            display_success(&format!(
                "{} would change: {} -> {}",
                artifact.path.display(),
                current,
                preview.version
            ));
        } else {
            display_status(&format!("{} up to date", artifact.path.display()));
        }
    }
}

pub fn display_shutdown() {
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("Stopped by user.");
    println!("{}", "=".repeat(RULE_WIDTH));
}

fn short(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn report(outcome: Outcome, persisted: Persisted) -> ArtifactReport {
        ArtifactReport {
            path: PathBuf::from("hype_maps"),
            outcome,
            persisted,
        }
    }

    #[test]
    fn test_describe_unchanged() {
        let line = describe_artifact(&report(Outcome::Unchanged, Persisted::Skipped));
        assert_eq!(line, "hype_maps already up to date");
    }

    #[test]
    fn test_describe_committed_and_pushed() {
        let line = describe_artifact(&report(
            Outcome::Changed {
                old: Some("HYPE-05.03-14.30-OLDHASH".to_string()),
            },
            Persisted::Committed {
                commit: "0123456789abcdef".to_string(),
                pushed: true,
            },
        ));
        assert_eq!(
            line,
            "hype_maps updated from HYPE-05.03-14.30-OLDHASH, committed 0123456 and pushed"
        );
    }

    #[test]
    fn test_describe_created_not_pushed() {
        let line = describe_artifact(&report(
            Outcome::Changed { old: None },
            Persisted::Committed {
                commit: "abc".to_string(),
                pushed: false,
            },
        ));
        assert_eq!(line, "hype_maps created, committed abc (not pushed)");
    }

    #[test]
    fn test_display_functions() {
        // Visual verification test - output is printed
        display_error("test error");
        display_success("test success");
        display_status("test status");
        display_shutdown();
    }
}
