mod commands;
mod notify;
mod parse;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use groupcal_core::{CalendarMonth, GroupCalConfig, Notifier, Role};
use tracing_subscriber::EnvFilter;

use crate::commands::Context;
use crate::commands::event::NewEventArgs;
use crate::notify::TerminalNotifier;

#[derive(Parser)]
#[command(name = "groupcal")]
#[command(about = "Shared group schedules with recurring events")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and inspect schedules
    Schedule {
        #[command(subcommand)]
        action: ScheduleCommand,
    },
    /// Manage who can see and edit a schedule
    Member {
        #[command(subcommand)]
        action: MemberCommand,
    },
    /// Create, list and delete events
    Event {
        #[command(subcommand)]
        action: EventCommand,
    },
    /// Show a month grid
    Calendar {
        /// Schedule id (defaults to default_schedule)
        #[arg(short, long)]
        schedule: Option<String>,

        /// Month to show (YYYY-MM, defaults to this month)
        #[arg(short, long)]
        month: Option<CalendarMonth>,
    },
    /// Follow a schedule's events until Ctrl-C
    Watch {
        /// Schedule id (defaults to default_schedule)
        #[arg(short, long)]
        schedule: Option<String>,

        /// Only follow this month (YYYY-MM)
        #[arg(short, long)]
        month: Option<CalendarMonth>,
    },
    /// Show config and data paths
    Config,
}

#[derive(Subcommand)]
enum ScheduleCommand {
    New {
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Make this the default schedule
        #[arg(long)]
        default: bool,
    },
    /// Schedules you own, newest first
    List,
    Show {
        /// Schedule id (defaults to default_schedule)
        schedule: Option<String>,
    },
}

#[derive(Subcommand)]
enum MemberCommand {
    Add {
        /// Email the user signed up with
        email: String,

        /// admin, editor or viewer
        #[arg(short, long, default_value = "viewer")]
        role: Role,

        #[arg(short, long)]
        schedule: Option<String>,
    },
    Remove {
        member_id: String,

        #[arg(short, long)]
        schedule: Option<String>,
    },
    List {
        #[arg(short, long)]
        schedule: Option<String>,
    },
}

#[derive(Subcommand)]
enum EventCommand {
    New(NewEventArgs),
    List {
        #[arg(short, long)]
        schedule: Option<String>,

        /// Only this month (YYYY-MM)
        #[arg(short, long)]
        month: Option<CalendarMonth>,
    },
    Delete {
        event_id: String,

        #[arg(short, long)]
        schedule: Option<String>,

        /// Delete every event in the recurring series
        #[arg(long, conflicts_with = "only_this")]
        series: bool,

        /// Delete only this occurrence of a recurring event
        #[arg(long)]
        only_this: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        TerminalNotifier.error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = GroupCalConfig::load()?;

    // Showing paths must work before an identity is configured.
    match cli.command {
        Commands::Config => commands::config::run(&config),
        command => dispatch(&Context::load(config).await?, command).await,
    }
}

async fn dispatch(ctx: &Context, command: Commands) -> Result<()> {
    match command {
        Commands::Schedule { action } => match action {
            ScheduleCommand::New {
                title,
                description,
                default,
            } => commands::schedule::new(ctx, &title, description.as_deref(), default).await,
            ScheduleCommand::List => commands::schedule::list(ctx).await,
            ScheduleCommand::Show { schedule } => {
                commands::schedule::show(ctx, schedule.as_deref()).await
            }
        },
        Commands::Member { action } => match action {
            MemberCommand::Add {
                email,
                role,
                schedule,
            } => commands::member::add(ctx, schedule.as_deref(), &email, role).await,
            MemberCommand::Remove {
                member_id,
                schedule,
            } => commands::member::remove(ctx, schedule.as_deref(), &member_id).await,
            MemberCommand::List { schedule } => {
                commands::member::list(ctx, schedule.as_deref()).await
            }
        },
        Commands::Event { action } => match action {
            EventCommand::New(args) => commands::event::new(ctx, args).await,
            EventCommand::List { schedule, month } => {
                commands::event::list(ctx, schedule.as_deref(), month).await
            }
            EventCommand::Delete {
                event_id,
                schedule,
                series,
                only_this,
            } => {
                commands::event::delete(ctx, schedule.as_deref(), &event_id, series, only_this)
                    .await
            }
        },
        Commands::Calendar { schedule, month } => {
            commands::calendar::run(ctx, schedule.as_deref(), month).await
        }
        Commands::Watch { schedule, month } => {
            commands::watch::run(ctx, schedule.as_deref(), month).await
        }
        Commands::Config => commands::config::run(&ctx.config),
    }
}
