//! `sync` command and end-of-command flush reporting.

use anyhow::Result;
use competence_types::sync::{FlushOutcome, SyncStatus};
use console::style;
use serde_json::json;

use crate::state::Session;

fn outcome_label(outcome: &FlushOutcome) -> &'static str {
    match outcome {
        FlushOutcome::Clean => "clean",
        FlushOutcome::Synced => "synced",
        FlushOutcome::LocalOnly => "local_only",
        FlushOutcome::Failed(_) => "failed",
    }
}

fn print_status(status: &SyncStatus) {
    let state = if status.local_only {
        style("local only").dim()
    } else if status.dirty {
        style("pending upload").yellow()
    } else {
        style("up to date").green()
    };
    println!("  {} {}", style("Status:").bold(), state);
    if status.retry_count > 0 {
        println!(
            "  {} {}",
            style("Failed attempts:").bold(),
            style(status.retry_count).red()
        );
    }
}

/// Push the current sheet now.
pub async fn sync(session: &Session, json: bool) -> Result<()> {
    let outcome = session.flush().await;
    let status = session.status();

    if json {
        let error = match &outcome {
            FlushOutcome::Failed(err) => Some(err.to_string()),
            _ => None,
        };
        println!("{}", serde_json::to_string_pretty(&json!({
            "character_id": session.character_id(),
            "outcome": outcome_label(&outcome),
            "error": error,
            "status": status,
        }))?);
        return Ok(());
    }

    println!();
    match &outcome {
        FlushOutcome::Synced => println!("  {} Sheet uploaded", style("✓").green().bold()),
        FlushOutcome::Clean => println!("  {} Nothing to upload", style("✓").green().bold()),
        FlushOutcome::LocalOnly => println!(
            "  {} No active character; the sheet is kept on this machine only",
            style("i").blue().bold()
        ),
        FlushOutcome::Failed(err) => println!("  {} Upload failed: {err}", style("✗").red().bold()),
    }
    print_status(&status);
    println!();
    Ok(())
}

/// Report the final flush done when the session closes. Only failures are
/// worth a line; they go to stderr so JSON output stays parseable.
pub fn report_close(outcome: &FlushOutcome, json: bool) {
    let FlushOutcome::Failed(err) = outcome else {
        return;
    };
    if json {
        eprintln!("{}", json!({ "warning": "upload_failed", "error": err.to_string() }));
    } else {
        eprintln!(
            "  {} Changes are saved locally but could not be uploaded: {err}",
            style("!").yellow().bold()
        );
    }
}
