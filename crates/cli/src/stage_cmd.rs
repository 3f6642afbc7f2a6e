use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

use campcook_core::stage::rating_label;
use campcook_core::{ActivityRecord, Advance, MediaItem, MediaKind, Stage};

use crate::context::{Ctx, confirm};

pub fn parse_stage(raw: &str) -> Result<Stage, String> {
    Stage::parse(raw).ok_or_else(|| {
        format!("unknown stage {raw:?}: use 1-7 or a name such as fire-making")
    })
}

fn parse_kind(raw: &str) -> Result<MediaKind, String> {
    MediaKind::parse(raw).ok_or_else(|| format!("unknown media kind {raw:?}: photo or video"))
}

#[derive(Debug, Subcommand)]
pub enum StageAction {
    /// Make a stage current. Skipping ahead or going back asks first
    Start {
        #[arg(value_parser = parse_stage)]
        stage: Stage,
        #[arg(long)]
        yes: bool,
    },
    /// Mark the current stage complete without moving on
    Complete,
    /// Complete the current stage and start the next one
    Next,
    /// Reopen a completed stage for amendment
    Reopen {
        #[arg(value_parser = parse_stage)]
        stage: Stage,
        #[arg(long)]
        yes: bool,
    },
    /// End the activity without completing the remaining stages
    Abandon {
        #[arg(long)]
        yes: bool,
    },
}

/// Stage selector shared by the per-stage commands; defaults to the current stage.
#[derive(Debug, Args)]
pub struct StageSel {
    #[arg(long, value_parser = parse_stage)]
    pub stage: Option<Stage>,
}

impl StageSel {
    fn resolve(&self, record: &ActivityRecord) -> Stage {
        self.stage.unwrap_or_else(|| record.current_stage())
    }
}

#[derive(Debug, Subcommand)]
pub enum MediaAction {
    /// Attach a captured photo or video
    Add {
        path: PathBuf,
        /// photo or video; guessed from the extension when omitted
        #[arg(long, value_parser = parse_kind)]
        kind: Option<MediaKind>,
        #[command(flatten)]
        sel: StageSel,
    },
    /// Remove the item at INDEX (see `campcook status`) and delete its file
    Rm {
        index: usize,
        #[command(flatten)]
        sel: StageSel,
    },
}

/// Whether moving to `target` leaves the normal one-step order.
pub fn is_out_of_order(record: &ActivityRecord, target: Stage) -> bool {
    let current = record.current_stage();
    target != current && current.next() != Some(target)
}

pub async fn run_stage(ctx: &Ctx, action: StageAction) -> Result<()> {
    let mut session = ctx.session()?;
    match action {
        StageAction::Start { stage, yes } => {
            let record = session.record();
            if is_out_of_order(record, stage) {
                let prompt = format!(
                    "Jump from {} to {}?",
                    record.current_stage().display_name(),
                    stage.display_name()
                );
                if !confirm(&prompt, yes)? {
                    println!("Staying on {}.", record.current_stage().display_name());
                    return Ok(());
                }
            }
            session.start_stage(stage)?;
            if session.record().stage(stage).is_some_and(|r| r.is_completed()) {
                println!(
                    "{} is already complete; use `campcook stage reopen` to amend it.",
                    stage.display_name()
                );
            } else {
                println!("Now on {}.", stage.display_name());
            }
        }
        StageAction::Complete => {
            let stage = session.record().current_stage();
            if session.complete_current_stage()? {
                println!("{} complete.", stage.display_name());
            } else {
                println!("{} was already complete.", stage.display_name());
            }
        }
        StageAction::Next => {
            if let Some(quota) = session.record().current().map(|r| r.quota()) {
                if !quota.is_met() {
                    println!(
                        "Note: {} photo(s) and {} video(s) short of the suggested amount.",
                        quota.missing_photos, quota.missing_videos
                    );
                }
            }
            match session.move_to_next()? {
                Advance::Started(stage) => println!("Now on {}.", stage.display_name()),
                Advance::Finished => println!("Activity finished."),
            }
        }
        StageAction::Reopen { stage, yes } => {
            let prompt = format!("Reopen {} for amendment?", stage.display_name());
            if !confirm(&prompt, yes)? {
                return Ok(());
            }
            session.reopen_stage(stage)?;
            println!("Reopened {}.", stage.display_name());
        }
        StageAction::Abandon { yes } => {
            if !confirm("End the activity now?", yes)? {
                return Ok(());
            }
            if session.abandon()? {
                println!("Activity ended.");
            } else {
                println!("Activity had already ended.");
            }
        }
    }
    ctx.settle(&session.team_id()).await
}

pub async fn run_rate(ctx: &Ctx, rating: u8, sel: StageSel) -> Result<()> {
    let mut session = ctx.session()?;
    let stage = sel.resolve(session.record());
    session.record_rating(stage, rating)?;
    println!("{}: {}", stage.display_name(), rating_label(rating));
    ctx.settle(&session.team_id()).await
}

pub async fn run_tag(ctx: &Ctx, tag: &str, off: bool, sel: StageSel) -> Result<()> {
    let mut session = ctx.session()?;
    let stage = sel.resolve(session.record());
    if !stage.is_known_tag(tag) {
        println!("Note: {tag:?} is not in the {} tag list.", stage.display_name());
    }
    let changed = session.toggle_tag(stage, tag, !off)?;
    if changed {
        println!("{} tag {tag:?}.", if off { "Removed" } else { "Added" });
    } else {
        println!("Tag {tag:?} unchanged.");
    }
    ctx.settle(&session.team_id()).await
}

pub async fn run_note(
    ctx: &Ctx,
    text: &str,
    problem: bool,
    overall: bool,
    sel: StageSel,
) -> Result<()> {
    let mut session = ctx.session()?;
    if overall {
        session.set_overall_notes(text)?;
        println!("Overall notes saved.");
    } else {
        let stage = sel.resolve(session.record());
        if problem {
            session.set_problem_notes(stage, text)?;
        } else {
            session.set_notes(stage, text)?;
        }
        println!("Notes saved for {}.", stage.display_name());
    }
    ctx.settle(&session.team_id()).await
}

pub async fn run_media(ctx: &Ctx, action: MediaAction) -> Result<()> {
    let mut session = ctx.session()?;
    match action {
        MediaAction::Add { path, kind, sel } => {
            let path = std::fs::canonicalize(&path)
                .with_context(|| format!("media file {}", path.display()))?;
            let kind = kind.unwrap_or_else(|| guess_kind(&path));
            let stage = sel.resolve(session.record());
            let item = MediaItem::new(path.to_string_lossy(), kind);
            let index = session.add_media(stage, item)?;
            println!("Added {kind} [{index}] to {}.", stage.display_name());
        }
        MediaAction::Rm { index, sel } => {
            let stage = sel.resolve(session.record());
            let removed = session.remove_media(stage, index)?;
            println!(
                "Removed {}{}.",
                removed.item.reference(),
                if removed.file_removed { "" } else { " (file was not deleted)" }
            );
        }
    }
    ctx.settle(&session.team_id()).await
}

fn guess_kind(path: &std::path::Path) -> MediaKind {
    let probe = MediaItem::new(path.to_string_lossy(), MediaKind::Photo);
    if probe.mime_type().starts_with("video/") {
        MediaKind::Video
    } else {
        MediaKind::Photo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campcook_core::testing;

    #[test]
    fn only_the_next_stage_is_in_order() {
        let record = ActivityRecord::start(testing::team_info("T1"));
        assert!(!is_out_of_order(&record, Stage::Preparation));
        assert!(!is_out_of_order(&record, Stage::FireMaking));
        assert!(is_out_of_order(&record, Stage::Showcase));

        let mut later = record.clone();
        later.start_stage(Stage::Cleaning);
        assert!(is_out_of_order(&later, Stage::Preparation));
        assert!(!is_out_of_order(&later, Stage::Overall));
    }

    #[test]
    fn stage_argument_accepts_names_and_numbers() {
        assert_eq!(parse_stage("2"), Ok(Stage::FireMaking));
        assert_eq!(parse_stage("cooking-dishes"), Ok(Stage::CookingDishes));
        assert!(parse_stage("dessert").is_err());
    }

    #[test]
    fn kind_is_guessed_from_extension() {
        assert_eq!(guess_kind(std::path::Path::new("/m/clip.mp4")), MediaKind::Video);
        assert_eq!(guess_kind(std::path::Path::new("/m/pic.jpg")), MediaKind::Photo);
    }
}
