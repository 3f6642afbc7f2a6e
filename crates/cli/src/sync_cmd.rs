use anyhow::{Context, Result, bail};
use std::collections::BTreeSet;

use campcook_daemon::{SyncError, SyncReport, health};

use crate::context::{Ctx, confirm};
use crate::output;

pub fn run_status(ctx: &Ctx) -> Result<()> {
    match ctx.store().active_team()? {
        Some(_) => {
            let session = ctx.session()?;
            output::print_record(session.record());
            println!();
            output::print_sync_line(ctx.store(), &session.team_id())?;
        }
        None => println!("No active team. Start with `campcook team set`."),
    }
    match ctx.config.server.endpoint() {
        Ok(endpoint) => println!("collector: {endpoint}"),
        Err(e) => println!("collector: invalid ({e})"),
    }
    let pending = ctx.store().pending_teams()?;
    if !pending.is_empty() {
        println!("{} team(s) waiting to sync.", pending.len());
    }
    Ok(())
}

pub async fn run_sync(ctx: &Ctx, all: bool, dry_run: bool) -> Result<()> {
    let teams: BTreeSet<String> = if all {
        ctx.store().team_ids()?
    } else {
        let session = ctx.session()?;
        BTreeSet::from([session.team_id()])
    };
    if teams.is_empty() {
        println!("Nothing stored.");
        return Ok(());
    }

    if dry_run {
        for team_id in &teams {
            let request = ctx.engine.build_request(team_id)?;
            let hash = request.content_hash()?;
            println!("# {team_id} sha256={hash}");
            println!(
                "{}",
                serde_json::to_string_pretty(&request).context("encode submission")?
            );
        }
        return Ok(());
    }

    let mut failures = 0usize;
    for team_id in &teams {
        ctx.store().mark_pending(team_id)?;
        match ctx.engine.attempt_sync(team_id).await {
            Ok(report) => print_report(&report),
            Err(SyncError::NothingToSync(_)) => {
                ctx.store().clear_pending(team_id)?;
                println!("{team_id}: nothing stored");
            }
            Err(SyncError::InProgress(_)) => {
                println!("{team_id}: already being synced by another campcook process");
            }
            Err(e) => {
                failures += 1;
                println!("{team_id}: still pending ({e})");
            }
        }
    }
    if failures > 0 {
        bail!("{failures} team(s) could not be synced; they stay queued");
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    let state = if report.cleared {
        "synced"
    } else {
        "submitted, newer changes still pending"
    };
    println!(
        "{}: {state} ({} media uploaded)",
        report.team_id,
        report.uploaded.len()
    );
    for reference in &report.missing {
        println!("  missing file: {reference}");
    }
    for (reference, err) in &report.failed {
        println!("  upload failed: {reference}: {err}");
    }
    if let Some(message) = &report.response.message {
        println!("  collector: {message}");
    }
}

pub fn run_pending(ctx: &Ctx) -> Result<()> {
    let state = ctx.store().sync_state()?;
    if state.pending.is_empty() {
        println!("Nothing pending.");
        return Ok(());
    }
    for (team_id, entry) in &state.pending {
        let mut line = format!(
            "{team_id}  since {}  attempts {}",
            output::format_time(entry.marked_at),
            entry.attempts
        );
        if let Some(err) = &entry.last_error {
            line.push_str(&format!("  last error: {err}"));
        }
        println!("{line}");
    }
    Ok(())
}

pub async fn run_probe(ctx: &Ctx) -> Result<()> {
    let client = ctx.remote.client()?;
    let status = health::probe(client)
        .await
        .with_context(|| format!("probe {}", client.base_url()))?;
    println!(
        "{}: {}",
        client.base_url(),
        status.status.as_deref().unwrap_or("unknown")
    );
    if let Some(students) = status.students {
        println!("  students: {students}");
    }
    if let Some(timestamp) = &status.timestamp {
        println!("  server time: {timestamp}");
    }
    Ok(())
}

pub fn run_reset(ctx: &Ctx, all: bool, yes: bool) -> Result<()> {
    if all {
        if !confirm("Delete every stored team, record and sync marker?", yes)? {
            return Ok(());
        }
        let removed = ctx.store().clear_all()?;
        println!("Removed {removed} stored document(s).");
        return Ok(());
    }
    let session = ctx.session()?;
    let prompt = format!(
        "Delete all data and media files for {}?",
        session.team_id()
    );
    if !confirm(&prompt, yes)? {
        return Ok(());
    }
    let team_id = session.team_id();
    let files = session.discard()?;
    println!("Removed {team_id} ({files} media file(s)).");
    Ok(())
}
