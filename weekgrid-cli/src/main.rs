use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Weekday};
use clap::{Parser, Subcommand};
use weekgrid_core::calendar;
use weekgrid_core::{
    matrix_view, Category, CleanupPolicy, EisenhowerCategory, GridView, MemoryStore, Planner,
    Priority, ScheduleStats, Store, TaskDraft, TaskEdit,
};
use weekgrid_gen::{generate_schedule, improve_goals, Generated, OfflineGenerator};

mod config;
mod llm;
mod render;
mod state;

#[derive(Parser, Debug)]
#[command(
    name = "weekgrid",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("WEEKGRID_BUILD_SHA"), ")"),
    about = "Weekly hour-grid planner"
)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage ~/.weekgrid/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate this week's schedule from goals and lay it onto the grid
    Generate {
        /// What you want to get done this week
        #[arg(long)]
        goals: String,

        /// Replace an existing schedule for this week
        #[arg(long)]
        replace: bool,

        /// Skip the generation service and use the built-in schedule
        #[arg(long)]
        offline: bool,

        /// Override the configured cleanup policy when replacing
        #[arg(long, value_parser = parse_policy)]
        cleanup: Option<CleanupPolicy>,
    },

    /// Rewrite goals into a clearer generation prompt
    ImproveGoals {
        #[arg(long)]
        goals: String,
    },

    /// Show the week grid
    Grid,

    /// Show tasks by Eisenhower quadrant
    Matrix,

    /// Show schedule counters
    Stats,

    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    Slot {
        #[command(subcommand)]
        command: SlotCommand,
    },

    Schedule {
        #[command(subcommand)]
        command: ScheduleCommand,
    },

    /// Show the change history, oldest first
    History {
        /// Only the last N entries
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// List tasks
    List,

    /// Create a task in an empty grid cell
    Add {
        #[arg(long, value_parser = parse_day)]
        day: Weekday,
        /// Hour of day, 0-23 (3 is not on the grid)
        #[arg(long)]
        hour: u32,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
        #[arg(long, value_parser = parse_eisenhower)]
        eisenhower: Option<EisenhowerCategory>,
        /// Hours
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Change task fields
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
        #[arg(long, value_parser = parse_eisenhower)]
        eisenhower: Option<EisenhowerCategory>,
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Toggle completion
    Done { id: String },

    /// Delete a task; its slots stay, empty
    Delete { id: String },

    /// Move a task to quadrant 1-4
    Quadrant { id: String, quadrant: u8 },
}

#[derive(Subcommand, Debug)]
enum SlotCommand {
    /// List this week's slots
    List,

    /// Move the task in FROM into the empty slot TO
    Move { from: String, to: String },

    /// Merge a slot with the slot right after it
    MergeNext { id: String },

    /// Merge adjacent slots of one day
    Merge {
        #[arg(required = true, num_args = 2..)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ScheduleCommand {
    /// List weekly schedules, newest first
    List,

    /// Delete a schedule and its slots
    Delete {
        id: String,
        #[arg(long, value_parser = parse_policy)]
        cleanup: Option<CleanupPolicy>,
    },
}

fn parse_day(s: &str) -> Result<Weekday, String> {
    calendar::parse_weekday(s)
        .or_else(|| s.parse::<Weekday>().ok())
        .ok_or_else(|| format!("unknown weekday: {s}"))
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    Priority::parse(&s.to_lowercase()).ok_or_else(|| format!("priority must be high, medium or low, got {s}"))
}

fn parse_category(s: &str) -> Result<Category, String> {
    Category::ALL
        .into_iter()
        .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| format!("unknown category: {s}"))
}

fn parse_eisenhower(s: &str) -> Result<EisenhowerCategory, String> {
    EisenhowerCategory::parse(&s.to_lowercase()).ok_or_else(|| format!("unknown eisenhower category: {s}"))
}

fn parse_policy(s: &str) -> Result<CleanupPolicy, String> {
    s.parse()
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::Config { command } = &cli.command {
        match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let cfg = config::load_config()?;
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        }
        return Ok(());
    }

    let cfg = config::load_config()?;
    let today = cfg.today()?;
    let store_path = state::store_path()?;
    let mut store = state::load_store(&store_path)?;
    let user_id = state::ensure_user(&mut store, &cfg.user.email, &cfg.user.name)?;
    let mut planner = Planner::new(store, user_id);

    let changed = run(cli.command, &cfg, today, &mut planner).await?;
    if changed {
        state::save_store(&store_path, planner.store())?;
    }
    Ok(())
}

/// Returns whether the store changed.
async fn run(
    command: Command,
    cfg: &config::Config,
    today: NaiveDate,
    planner: &mut Planner<MemoryStore>,
) -> Result<bool> {
    match command {
        Command::Config { .. } => Ok(false),

        Command::Generate { goals, replace, offline, cleanup } => {
            if goals.trim().is_empty() {
                bail!("--goals must not be empty");
            }
            if !replace {
                if let Some(existing) = planner.schedule_for_week(today)? {
                    bail!(
                        "a schedule for the week of {} already exists ({}); pass --replace to regenerate",
                        existing.week_start,
                        existing.id
                    );
                }
            }

            let Generated { schedule, fallback } = if offline {
                generate_schedule(&OfflineGenerator, &goals, today).await?
            } else {
                let client = llm::gemini_client(cfg)?;
                generate_schedule(&client, &goals, today).await?
            };
            if let Some(reason) = &fallback {
                if !offline {
                    eprintln!("Generation unusable ({reason}); using the built-in schedule.");
                }
            }

            let policy = cleanup.unwrap_or(cfg.cleanup.policy);
            let installed = planner.install_schedule(&goals, &schedule, fallback, today, replace, policy)?;
            for report in &installed.replaced {
                println!("{}", render::cleanup(report));
            }
            let r = &installed.reconciliation;
            println!(
                "Schedule {} for the week of {}: {} tasks, {} slots ({} new tasks, {} new slots)",
                installed.schedule.id,
                installed.schedule.week_start,
                installed.task_count(),
                r.slots.len(),
                r.created_tasks,
                r.created_slots
            );
            Ok(true)
        }

        Command::ImproveGoals { goals } => {
            let client = llm::gemini_client(cfg)?;
            println!("{}", improve_goals(&client, &goals).await?);
            Ok(false)
        }

        Command::Grid => {
            let slots = planner.week_slots(today)?;
            let tasks = planner.tasks()?;
            print!("{}", render::grid(&GridView::build(today, &slots, &tasks)));
            println!("\n{}", render::stats(&ScheduleStats::from_slots(&slots, &tasks)));
            Ok(false)
        }

        Command::Matrix => {
            print!("{}", render::matrix(&matrix_view(&planner.tasks()?)));
            Ok(false)
        }

        Command::Stats => {
            let slots = planner.week_slots(today)?;
            let tasks = planner.tasks()?;
            println!("{}", render::stats(&ScheduleStats::from_slots(&slots, &tasks)));
            Ok(false)
        }

        Command::Task { command } => run_task(command, today, planner),
        Command::Slot { command } => run_slot(command, today, planner),

        Command::Schedule { command } => match command {
            ScheduleCommand::List => {
                for s in planner.schedules()? {
                    println!("{}", render::schedule_line(&s));
                }
                Ok(false)
            }
            ScheduleCommand::Delete { id, cleanup } => {
                let policy = cleanup.unwrap_or(cfg.cleanup.policy);
                let report = planner.delete_schedule(&id, policy)?;
                println!("{}", render::cleanup(&report));
                Ok(true)
            }
        },

        Command::History { limit } => {
            let entries = planner.history()?;
            let skip = limit.map_or(0, |n| entries.len().saturating_sub(n));
            print!("{}", render::history(&entries[skip..]));
            Ok(false)
        }
    }
}

fn run_task(command: TaskCommand, today: NaiveDate, planner: &mut Planner<MemoryStore>) -> Result<bool> {
    match command {
        TaskCommand::List => {
            for t in planner.tasks()? {
                println!("{}", render::task_line(&t));
            }
            Ok(false)
        }
        TaskCommand::Add { day, hour, title, description, priority, category, eisenhower, duration } => {
            let mut draft = TaskDraft::new(title).with_description(description);
            if let Some(p) = priority {
                draft = draft.with_priority(p);
            }
            if let Some(c) = category {
                draft = draft.with_category(c);
            }
            if let Some(e) = eisenhower {
                draft = draft.with_eisenhower(e);
            }
            if let Some(d) = duration {
                draft = draft.with_duration(d);
            }
            let (task, slot) = planner.create_task_in_cell(today, day, hour, draft)?;
            println!("{}", render::slot_line(&slot, Some(&task)));
            Ok(true)
        }
        TaskCommand::Edit { id, title, description, priority, category, eisenhower, duration } => {
            let edit = TaskEdit {
                title,
                description,
                priority,
                category,
                eisenhower_category: eisenhower,
                duration,
            };
            if edit.is_empty() {
                bail!("nothing to change; pass at least one field");
            }
            let task = planner.edit_task(&id, &edit)?;
            println!("{}", render::task_line(&task));
            Ok(true)
        }
        TaskCommand::Done { id } => {
            let task = planner.toggle_completion(&id)?;
            println!("{}", render::task_line(&task));
            Ok(true)
        }
        TaskCommand::Delete { id } => {
            let task = planner.delete_task(&id)?;
            println!("Deleted {} {}", task.id, task.title);
            Ok(true)
        }
        TaskCommand::Quadrant { id, quadrant } => {
            let task = planner.move_to_quadrant(&id, quadrant)?;
            println!("{}", render::task_line(&task));
            Ok(true)
        }
    }
}

fn run_slot(command: SlotCommand, today: NaiveDate, planner: &mut Planner<MemoryStore>) -> Result<bool> {
    match command {
        SlotCommand::List => {
            let tasks = planner.tasks()?;
            for s in planner.week_slots(today)? {
                let task = s.task_id.as_deref().and_then(|id| tasks.iter().find(|t| t.id == id));
                println!("{}", render::slot_line(&s, task));
            }
            Ok(false)
        }
        SlotCommand::Move { from, to } => {
            let (_, target) = planner.move_task(&from, &to)?;
            let task = match target.task_id.as_deref() {
                Some(id) => Some(planner.store().get_task(id)?),
                None => None,
            };
            println!("{}", render::slot_line(&target, task.as_ref()));
            Ok(true)
        }
        SlotCommand::MergeNext { id } => {
            let plan = planner.merge_with_next(&id)?;
            print_merge(planner, &plan)?;
            Ok(true)
        }
        SlotCommand::Merge { ids } => {
            let plan = planner.merge_slots(&ids)?;
            print_merge(planner, &plan)?;
            Ok(true)
        }
    }
}

fn print_merge(planner: &Planner<MemoryStore>, plan: &weekgrid_core::MergePlan) -> Result<()> {
    let task = match plan.survivor.task_id.as_deref() {
        Some(id) => Some(planner.store().get_task(id)?),
        None => None,
    };
    println!("{}", render::slot_line(&plan.survivor, task.as_ref()));
    if !plan.displaced_tasks.is_empty() {
        println!("Unslotted: {}", plan.displaced_tasks.join(", "));
    }
    Ok(())
}
