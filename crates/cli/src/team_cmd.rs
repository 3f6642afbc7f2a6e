use anyhow::{Result, bail};
use clap::{Args, Subcommand};

use campcook_core::team::split_member_names;
use campcook_core::{DivisionRole, EvaluationData, Stage, StageEvaluation, SummaryData, TeamInfo};
use campcook_daemon::TeamSession;

use crate::context::Ctx;
use crate::output;
use crate::stage_cmd::parse_stage;

#[derive(Debug, Subcommand)]
pub enum TeamAction {
    /// Register the team at this stove and make it the active team
    Set(TeamArgs),
    /// Show the active team and its progress
    Show,
}

#[derive(Debug, Args)]
pub struct TeamArgs {
    #[arg(long)]
    pub school: String,
    #[arg(long)]
    pub grade: String,
    #[arg(long = "class")]
    pub class_name: String,
    #[arg(long)]
    pub stove: String,
    /// Member names, separated by commas or 、
    #[arg(long)]
    pub members: String,
    /// Head count when not every member is named
    #[arg(long)]
    pub member_count: Option<u32>,
}

impl TeamArgs {
    pub fn team_info(&self) -> Result<TeamInfo> {
        let member_names = split_member_names(&self.members);
        let team = TeamInfo {
            school: self.school.trim().to_string(),
            grade: self.grade.trim().to_string(),
            class_name: self.class_name.trim().to_string(),
            stove_number: self.stove.trim().to_string(),
            member_count: self
                .member_count
                .unwrap_or(member_names.len() as u32),
            member_names,
        };
        if !team.is_valid() {
            bail!("school, grade, class, stove and at least one member are required");
        }
        Ok(team)
    }
}

#[derive(Debug, Subcommand)]
pub enum DivisionAction {
    /// Assign roles; unspecified roles keep their current holder
    Set {
        #[arg(long)]
        leader: Option<String>,
        #[arg(long)]
        cooking: Option<String>,
        #[arg(long)]
        soup_rice: Option<String>,
        #[arg(long)]
        fire: Option<String>,
        #[arg(long)]
        hygiene: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SummaryAction {
    /// Write the post-activity reflection
    Set {
        #[arg(long)]
        answer1: Option<String>,
        #[arg(long)]
        answer2: Option<String>,
        #[arg(long)]
        answer3: Option<String>,
        /// Photo for answer 1 (repeatable)
        #[arg(long = "photo1")]
        photos1: Vec<String>,
        #[arg(long = "photo2")]
        photos2: Vec<String>,
        #[arg(long = "photo3")]
        photos3: Vec<String>,
    },
}

#[derive(Debug, Args)]
pub struct EvaluateArgs {
    /// Stage name or order number
    #[arg(value_parser = parse_stage)]
    pub stage: Stage,
    /// Positive tag (repeatable)
    #[arg(long = "good")]
    pub positive: Vec<String>,
    /// Improvement tag (repeatable)
    #[arg(long = "improve")]
    pub improvement: Vec<String>,
    #[arg(long, default_value = "")]
    pub comment: String,
}

pub async fn run_team(ctx: &Ctx, action: TeamAction) -> Result<()> {
    match action {
        TeamAction::Set(args) => {
            let team = args.team_info()?;
            let session = TeamSession::open(ctx.engine.clone(), team)?;
            println!("Active team: {}", session.team_id());
            output::print_record(session.record());
            ctx.settle(&session.team_id()).await
        }
        TeamAction::Show => {
            let session = ctx.session()?;
            output::print_record(session.record());
            output::print_sync_line(ctx.store(), &session.team_id())
        }
    }
}

pub async fn run_division(ctx: &Ctx, action: DivisionAction) -> Result<()> {
    let DivisionAction::Set {
        leader,
        cooking,
        soup_rice,
        fire,
        hygiene,
    } = action;
    let session = ctx.session()?;
    let team_id = session.team_id();
    let mut division = ctx.store().load_division(&team_id)?.unwrap_or_default();
    let updates = [
        (DivisionRole::Leader, leader),
        (DivisionRole::Cooking, cooking),
        (DivisionRole::SoupRice, soup_rice),
        (DivisionRole::Fire, fire),
        (DivisionRole::Hygiene, hygiene),
    ];
    for (role, who) in updates {
        if let Some(who) = who {
            division.set(role, who.trim());
        }
    }
    session.save_division(&division)?;
    match division.assigned() {
        Some(roles) => {
            for (role, who) in roles {
                println!("{role}: {who}");
            }
        }
        None => println!("No roles assigned."),
    }
    ctx.settle(&team_id).await
}

pub async fn run_summary(ctx: &Ctx, action: SummaryAction) -> Result<()> {
    let SummaryAction::Set {
        answer1,
        answer2,
        answer3,
        photos1,
        photos2,
        photos3,
    } = action;
    let session = ctx.session()?;
    let team_id = session.team_id();
    let mut summary: SummaryData = ctx.store().load_summary(&team_id)?.unwrap_or_default();
    if let Some(text) = answer1 {
        summary.answer1 = text;
    }
    if let Some(text) = answer2 {
        summary.answer2 = text;
    }
    if let Some(text) = answer3 {
        summary.answer3 = text;
    }
    summary.photos1.extend(photos1);
    summary.photos2.extend(photos2);
    summary.photos3.extend(photos3);
    session.save_summary(&summary)?;
    println!("Summary saved.");
    ctx.settle(&team_id).await
}

/// Instructor evaluation. Stored locally only; it is not part of the
/// team's submission.
pub fn run_evaluate(ctx: &Ctx, args: EvaluateArgs) -> Result<()> {
    let session = ctx.session()?;
    let team = session.record().team_info();
    let team_id = team.team_id();
    let mut evaluation = ctx
        .store()
        .load_evaluation(&team_id)?
        .unwrap_or_else(|| EvaluationData::new(&team_id, team.display_name()));
    evaluation.set(
        args.stage,
        StageEvaluation {
            positive_tags: args.positive,
            improvement_tags: args.improvement,
            comment: args.comment,
        },
    );
    ctx.store().save_evaluation(&evaluation)?;
    println!(
        "Evaluated {} ({}).",
        args.stage.display_name(),
        if evaluation.is_all_stages_evaluated() {
            "all stages evaluated"
        } else {
            "more stages to go"
        }
    );
    Ok(())
}
