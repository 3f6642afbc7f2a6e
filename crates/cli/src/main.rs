mod config_cmd;
mod context;
mod output;
mod stage_cmd;
mod sync_cmd;
mod team_cmd;

use clap::{Parser, Subcommand};

use context::Ctx;
use stage_cmd::{MediaAction, StageAction, StageSel};
use team_cmd::{DivisionAction, EvaluateArgs, SummaryAction, TeamAction};

#[derive(Parser)]
#[command(
    name = "campcook",
    version,
    about = "campcook CLI - record camp cooking stages offline and sync them to the collector"
)]
struct Cli {
    /// Save and queue changes without waiting for the sync to finish
    #[arg(long, global = true)]
    no_wait: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register or show the active team
    Team {
        #[command(subcommand)]
        action: TeamAction,
    },
    /// Assign team roles
    Division {
        #[command(subcommand)]
        action: DivisionAction,
    },
    /// Move through the activity's stages
    Stage {
        #[command(subcommand)]
        action: StageAction,
    },
    /// Self-rate a stage from 0 (not rated) to 5
    Rate {
        rating: u8,
        #[command(flatten)]
        sel: StageSel,
    },
    /// Add (or with --off remove) a tag on a stage
    Tag {
        tag: String,
        #[arg(long)]
        off: bool,
        #[command(flatten)]
        sel: StageSel,
    },
    /// Write stage notes, improvement notes or the overall notes
    Note {
        text: String,
        /// Write the "what to improve" notes instead
        #[arg(long, conflicts_with = "overall")]
        problem: bool,
        /// Write the activity-wide notes
        #[arg(long)]
        overall: bool,
        #[command(flatten)]
        sel: StageSel,
    },
    /// Attach or remove photos and videos
    Media {
        #[command(subcommand)]
        action: MediaAction,
    },
    /// Post-activity reflection
    Summary {
        #[command(subcommand)]
        action: SummaryAction,
    },
    /// Record an instructor evaluation for a stage
    Evaluate(EvaluateArgs),
    /// Show the active team's progress and sync state
    Status,
    /// Sync now and report the outcome
    Sync {
        /// Every stored team, not just the active one
        #[arg(long)]
        all: bool,
        /// Print the submission instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
    /// List teams waiting to sync
    Pending,
    /// Check that the collector is reachable
    Probe,
    /// Delete the active team's data and media (or everything with --all)
    Reset {
        #[arg(long)]
        all: bool,
        #[arg(long)]
        yes: bool,
    },
    /// Show or update configuration
    Config {
        #[command(subcommand)]
        action: config_cmd::ConfigAction,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = match cli.command {
        Commands::Config { action } => return config_cmd::run(action),
        command => command,
    };

    let ctx = Ctx::load(!cli.no_wait)?;
    match command {
        Commands::Team { action } => team_cmd::run_team(&ctx, action).await,
        Commands::Division { action } => team_cmd::run_division(&ctx, action).await,
        Commands::Stage { action } => stage_cmd::run_stage(&ctx, action).await,
        Commands::Rate { rating, sel } => stage_cmd::run_rate(&ctx, rating, sel).await,
        Commands::Tag { tag, off, sel } => stage_cmd::run_tag(&ctx, &tag, off, sel).await,
        Commands::Note {
            text,
            problem,
            overall,
            sel,
        } => stage_cmd::run_note(&ctx, &text, problem, overall, sel).await,
        Commands::Media { action } => stage_cmd::run_media(&ctx, action).await,
        Commands::Summary { action } => team_cmd::run_summary(&ctx, action).await,
        Commands::Evaluate(args) => team_cmd::run_evaluate(&ctx, args),
        Commands::Status => sync_cmd::run_status(&ctx),
        Commands::Sync { all, dry_run } => sync_cmd::run_sync(&ctx, all, dry_run).await,
        Commands::Pending => sync_cmd::run_pending(&ctx),
        Commands::Probe => sync_cmd::run_probe(&ctx).await,
        Commands::Reset { all, yes } => sync_cmd::run_reset(&ctx, all, yes),
        Commands::Config { action } => config_cmd::run(action),
    }
}
