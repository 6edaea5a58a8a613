use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cad", about = concat!("cadence v", env!("CARGO_PKG_VERSION"), " - tasks that come back around"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different project directory
    #[arg(short = 'C', long = "project-dir", global = true)]
    pub project_dir: Option<String>,

    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long, global = true)]
    pub today: Option<String>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new cadence project in the current directory
    Init(InitArgs),
    /// Add a task
    Add(AddArgs),
    /// List all tasks with their next due date
    List(ListArgs),
    /// Show task details and completion history
    Show(ShowArgs),
    /// Show what is due on a date (default: today)
    Agenda(AgendaArgs),
    /// Toggle today's completion of a task
    Toggle(IdArgs),
    /// Complete a task's pending occurrence and roll it forward
    Done(IdArgs),
    /// Print a task's next due date
    Next(IdArgs),
    /// Edit a task's title, due date or recurrence
    Edit(EditArgs),
    /// Delete a task (ends a recurring series)
    Rm(IdArgs),
    /// Set a config value (schedule.month_mode, ids.prefix)
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Project name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// How months are stepped: thirty-days or calendar
    #[arg(long, default_value = "thirty-days")]
    pub month_mode: String,
    /// Prefix for task IDs
    #[arg(long, default_value = "T")]
    pub prefix: String,
    /// Rewrite the config even if .cadence/ already exists
    #[arg(long)]
    pub force: bool,
}

/// Recurrence options shared by `add` and `edit`
#[derive(Args, Default)]
pub struct RepeatArgs {
    /// none, daily, weekly, monthly or custom
    #[arg(long)]
    pub repeat: Option<String>,
    /// Interval for custom recurrence
    #[arg(long)]
    pub interval: Option<u32>,
    /// Interval unit for custom recurrence: days, weeks or months
    #[arg(long)]
    pub unit: Option<String>,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// Due date (YYYY-MM-DD); first occurrence for recurring tasks
    #[arg(long)]
    pub due: Option<String>,
    #[command(flatten)]
    pub repeat: RepeatArgs,
}

#[derive(Args)]
pub struct ListArgs {
    /// Filter by recurrence (none, daily, weekly, monthly, custom, recurring)
    #[arg(long)]
    pub repeat: Option<String>,
    /// Filter titles by regex
    #[arg(long = "match")]
    pub pattern: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Task ID
    pub id: String,
    /// Also list this many upcoming occurrences
    #[arg(long, default_value = "0")]
    pub upcoming: usize,
    /// List every occurrence from today through this date instead
    #[arg(long, conflicts_with = "upcoming")]
    pub until: Option<String>,
}

#[derive(Args)]
pub struct AgendaArgs {
    /// Date to show (YYYY-MM-DD, default: today)
    pub date: Option<String>,
}

#[derive(Args)]
pub struct IdArgs {
    /// Task ID
    pub id: String,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID
    pub id: String,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New due date (YYYY-MM-DD), or "none" to clear it
    #[arg(long)]
    pub due: Option<String>,
    #[command(flatten)]
    pub repeat: RepeatArgs,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Config key
    pub key: String,
    /// New value
    pub value: String,
}
