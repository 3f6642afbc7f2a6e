use anyhow::Result;
use chrono::{DateTime, Local, TimeDelta, Utc};

use campcook_core::stage::rating_label;
use campcook_core::{ActivityRecord, ALL_STAGES, Stage, StageRecord, TeamInfo};
use campcook_local_store::LocalStore;

pub fn print_team(team: &TeamInfo) {
    println!("team:    {}", team.team_id());
    println!("         {}", team.display_name());
    println!(
        "members: {} ({})",
        team.member_count,
        team.member_names_joined()
    );
}

/// Stage marker in the status table.
fn stage_mark(record: &ActivityRecord, stage: Stage) -> &'static str {
    match record.stage(stage) {
        Some(r) if r.is_completed() => "done",
        Some(_) if record.current_stage() == stage && !record.is_finished() => "now",
        Some(_) => "open",
        None => "-",
    }
}

fn stage_line(record: &ActivityRecord, stage: Stage) -> String {
    let mark = stage_mark(record, stage);
    let Some(stage_record) = record.stage(stage) else {
        return format!("  {} {:<16} {mark}", stage.order(), stage.display_name());
    };
    let quota = stage_record.quota();
    let mut line = format!(
        "  {} {:<16} {:<4} photos {}/{} videos {}/{}",
        stage.order(),
        stage.display_name(),
        mark,
        quota.photos,
        quota.photos + quota.missing_photos,
        quota.videos,
        quota.videos + quota.missing_videos,
    );
    if stage_record.rating() > 0 {
        line.push_str(&format!("  rated {}", rating_label(stage_record.rating())));
    }
    if !stage_record.tags().is_empty() {
        line.push_str(&format!("  tags {}", stage_record.tags().len()));
    }
    if let Some(duration) = stage_record.duration() {
        line.push_str(&format!("  {}", format_duration(duration)));
    }
    line
}

pub fn print_record(record: &ActivityRecord) {
    print_team(record.team_info());
    println!(
        "started: {}",
        format_time(record.started_at())
    );
    match record.ended_at() {
        Some(ended) => println!(
            "ended:   {} ({})",
            format_time(ended),
            format_duration(record.total_duration(Utc::now()))
        ),
        None => println!(
            "stage:   {} ({} of {} complete)",
            record.current_stage().display_name(),
            record.completed_count(),
            ALL_STAGES.len()
        ),
    }
    if let Some(rating) = record.overall_rating() {
        println!("rating:  {rating:.1}");
    }
    println!();
    for stage in ALL_STAGES {
        println!("{}", stage_line(record, stage));
    }
    if !record.superseded().is_empty() {
        println!("  ({} reopened stage record(s) kept)", record.superseded().len());
    }
    if let Some(current) = record.current().filter(|_| !record.is_finished()) {
        print_stage_detail(current);
    }
}

fn print_stage_detail(stage_record: &StageRecord) {
    let stage = stage_record.stage();
    println!();
    println!("{}: {}", stage.display_name(), stage.description());
    println!("  hint: {}", stage.hint());
    for (index, item) in stage_record.media().iter().enumerate() {
        let flag = if item.file_exists() { "" } else { "  (file missing)" };
        println!("  [{index}] {} {}{flag}", item.kind(), item.reference());
    }
    if !stage_record.notes().is_empty() {
        println!("  notes:   {}", stage_record.notes());
    }
    if !stage_record.problem_notes().is_empty() {
        println!("  improve: {}", stage_record.problem_notes());
    }
}

/// One line on where the team's sync stands.
pub fn print_sync_line(store: &LocalStore, team_id: &str) -> Result<()> {
    match store.pending_entry(team_id)? {
        Some(entry) => {
            let mut line = format!("sync: pending since {}", format_time(entry.marked_at));
            if entry.attempts > 0 {
                line.push_str(&format!(", {} failed attempt(s)", entry.attempts));
            }
            if let Some(err) = &entry.last_error {
                line.push_str(&format!(": {err}"));
            }
            println!("{line}");
        }
        None => match store.last_synced(team_id)? {
            Some(synced) => println!("sync: up to date ({})", format_time(synced.synced_at)),
            None => println!("sync: never synced"),
        },
    }
    Ok(())
}

pub fn format_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_duration(duration: TimeDelta) -> String {
    let secs = duration.num_seconds().max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h{m:02}m")
    } else if m > 0 {
        format!("{m}m{s:02}s")
    } else {
        format!("{s}s")
    }
}
