mod init;
pub use init::cmd_init;

use std::cell::RefCell;
use std::error::Error;
use std::path::PathBuf;
use std::rc::Rc;

use chrono::{Local, NaiveDate};
use regex::Regex;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::lock::BookLock;
use crate::io::project_io::{self, DATA_DIR, ProjectError};
use crate::model::book::Change;
use crate::model::project::Project;
use crate::model::recurrence::{MonthMode, Recurrence};
use crate::ops::schedule::Schedule;
use crate::ops::{agenda, completion, task_ops};

pub type CmdResult<T = ()> = Result<T, Box<dyn Error>>;

/// Per-invocation settings shared by every command
pub struct Context {
    pub json: bool,
    /// Directory project discovery starts from
    pub start: PathBuf,
    pub today: NaiveDate,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> CmdResult<Context> {
        let start = match cli.project_dir {
            Some(ref dir) => std::fs::canonicalize(dir)
                .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?,
            None => std::env::current_dir()?,
        };
        let today = match cli.today {
            Some(ref s) => parse_date_arg(s)?,
            None => Local::now().date_naive(),
        };
        Ok(Context {
            json: cli.json,
            start,
            today,
        })
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let ctx = Context::from_cli(&cli)?;
    log::debug!("today is {}, starting from {}", ctx.today, ctx.start.display());

    match cli.command {
        Commands::Init(args) => cmd_init(&ctx, args),

        // Read commands
        Commands::List(args) => cmd_list(&ctx, args),
        Commands::Show(args) => cmd_show(&ctx, args),
        Commands::Agenda(args) => cmd_agenda(&ctx, args),
        Commands::Next(args) => cmd_next(&ctx, args),

        // Write commands
        Commands::Add(args) => cmd_add(&ctx, args),
        Commands::Toggle(args) => cmd_toggle(&ctx, args),
        Commands::Done(args) => cmd_done(&ctx, args),
        Commands::Edit(args) => cmd_edit(&ctx, args),
        Commands::Rm(args) => cmd_rm(&ctx, args),
        Commands::Config(args) => cmd_config(&ctx, args),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_project(ctx: &Context) -> Result<Project, ProjectError> {
    let root = project_io::discover_project(&ctx.start)?;
    project_io::load_project(&root)
}

fn schedule_for(project: &Project) -> Schedule {
    let schedule = Schedule::new(project.config.schedule.month_mode);
    log::trace!("months step as {}", schedule.month_mode().as_str());
    schedule
}

/// Lock the book, load it, run `edit`, and save only if the book changed.
fn write_book<R>(ctx: &Context, edit: impl FnOnce(&mut Project, &Schedule) -> CmdResult<R>) -> CmdResult<R> {
    let root = project_io::discover_project(&ctx.start)?;
    let _lock = BookLock::acquire_default(&root.join(DATA_DIR))?;
    let mut project = project_io::load_project(&root)?;

    let changes: Rc<RefCell<Vec<Change>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&changes);
    project.book.subscribe(move |change| {
        log::debug!("{}: {:?}", change.task_id(), change);
        sink.borrow_mut().push(change.clone());
    });

    let schedule = schedule_for(&project);
    let result = edit(&mut project, &schedule)?;

    let count = changes.borrow().len();
    if count > 0 {
        project_io::save_book(&project.data_dir, &project.book)?;
        log::info!("saved {} change(s)", count);
    }
    Ok(result)
}

/// Turn `--repeat/--interval/--unit` into a rule. `None` when no option was given.
fn recurrence_from_args(args: &RepeatArgs) -> CmdResult<Option<Recurrence>> {
    let kind = match (&args.repeat, args.interval, &args.unit) {
        (Some(kind), _, _) => kind.as_str(),
        (None, None, None) => return Ok(None),
        // --interval/--unit alone imply a custom rule
        (None, _, _) => "custom",
    };
    Ok(Some(task_ops::parse_recurrence(kind, args.interval, args.unit.as_deref())?))
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(ctx: &Context, args: ListArgs) -> CmdResult {
    let project = load_project(ctx)?;
    let schedule = schedule_for(&project);
    let filter = agenda::TaskFilter {
        repeat: args.repeat.map(|r| r.to_ascii_lowercase()),
        pattern: args.pattern.as_deref().map(Regex::new).transpose()?,
    };

    let log = project.book.log();
    let views: Vec<TaskView> = agenda::filter_tasks(&project.book, &filter)
        .into_iter()
        .map(|t| task_view(t, log, &schedule, ctx.today))
        .collect();

    if ctx.json {
        let tasks: Vec<TaskJson> = views.iter().map(task_to_json).collect();
        return print_json(&tasks);
    }
    if views.is_empty() {
        println!("no tasks");
    }
    for view in &views {
        println!("{}", format_task_line(view));
    }
    Ok(())
}

fn cmd_show(ctx: &Context, args: ShowArgs) -> CmdResult {
    let project = load_project(ctx)?;
    let schedule = schedule_for(&project);
    let log = project.book.log();
    let task = task_ops::find_task(&project.book, &args.id)?;

    let view = task_view(task, log, &schedule, ctx.today);
    let history: Vec<_> = log.history(&task.id).collect();
    let upcoming: Vec<NaiveDate> = match args.until {
        Some(ref s) => schedule.occurrences_between(task, ctx.today, parse_date_arg(s)?),
        None => schedule.upcoming(task, ctx.today).take(args.upcoming).collect(),
    };

    if ctx.json {
        return print_json(&TaskDetailJson {
            task: task_to_json(&view),
            created: task.created,
            completions: completion::completions(task, log),
            history: history.into_iter().cloned().collect(),
            upcoming,
        });
    }
    for line in format_task_detail(&view, &history, &upcoming) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_agenda(ctx: &Context, args: AgendaArgs) -> CmdResult {
    let project = load_project(ctx)?;
    let schedule = schedule_for(&project);
    let date = match args.date {
        Some(ref s) => parse_date_arg(s)?,
        None => ctx.today,
    };
    let log = project.book.log();
    let due = agenda::agenda(&project.book, &schedule, date);
    let overdue = agenda::overdue(&project.book, date);

    if ctx.json {
        return print_json(&AgendaJson {
            date,
            due: due
                .iter()
                .map(|e| AgendaItemJson {
                    id: e.task.id.clone(),
                    title: e.task.title.clone(),
                    recurrence: e.task.recurrence.kind().to_string(),
                    completed: e.completed,
                })
                .collect(),
            overdue: overdue
                .iter()
                .map(|t| task_to_json(&task_view(t, log, &schedule, date)))
                .collect(),
        });
    }

    println!("== {} ==", date.format("%a %Y-%m-%d"));
    if due.is_empty() {
        println!("nothing due");
    }
    for entry in &due {
        let mut view = task_view(entry.task, log, &schedule, date);
        view.completed = entry.completed;
        println!("{}", format_task_line(&view));
    }
    if !overdue.is_empty() {
        println!();
        println!("-- Overdue --");
        for task in overdue {
            println!("{}", format_task_line(&task_view(task, log, &schedule, date)));
        }
    }
    Ok(())
}

fn cmd_next(ctx: &Context, args: IdArgs) -> CmdResult {
    let project = load_project(ctx)?;
    let schedule = schedule_for(&project);
    let task = task_ops::find_task(&project.book, &args.id)?;
    let next = completion::next_due(&schedule, task, project.book.log(), ctx.today);

    if ctx.json {
        return print_json(&NextJson {
            id: task.id.clone(),
            next_due: next,
        });
    }
    match next {
        Some(d) => println!("{}", d),
        None => println!("none"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(ctx: &Context, args: AddArgs) -> CmdResult {
    let due_date = args.due.as_deref().map(parse_date_arg).transpose()?;
    let recurrence = recurrence_from_args(&args.repeat)?.unwrap_or_default();

    let id = write_book(ctx, |project, _| {
        let new = task_ops::NewTask {
            title: args.title,
            due_date,
            recurrence,
        };
        let prefix = project.config.ids.prefix.clone();
        Ok(task_ops::add_task(&mut project.book, new, &prefix, ctx.today)?)
    })?;
    println!("{}", id);
    Ok(())
}

fn cmd_toggle(ctx: &Context, args: IdArgs) -> CmdResult {
    let (completed, recurring) = write_book(ctx, |project, _| {
        let completed = completion::toggle_completion(&mut project.book, &args.id, ctx.today)?;
        let recurring = project.book.get(&args.id).is_some_and(|t| t.is_recurring());
        Ok((completed, recurring))
    })?;

    if ctx.json {
        return print_json(&ToggleJson {
            id: args.id,
            date: ctx.today,
            completed,
        });
    }
    let what = if completed { "done" } else { "reopened" };
    if recurring {
        println!("{} {} for {}", args.id, what, ctx.today);
    } else {
        println!("{} {}", args.id, what);
    }
    Ok(())
}

fn cmd_done(ctx: &Context, args: IdArgs) -> CmdResult {
    let advance = write_book(ctx, |project, schedule| {
        Ok(completion::complete_and_advance(&mut project.book, schedule, &args.id, ctx.today)?)
    })?;

    if ctx.json {
        return print_json(&advance);
    }
    match (advance.completed, advance.next_due) {
        (Some(done), Some(next)) => println!("{} completed {}, next due {}", advance.task, done, next),
        (None, Some(next)) => println!("{} completed, next due {}", advance.task, next),
        (Some(done), None) => println!("{} completed {}", advance.task, done),
        (None, None) => println!("{} completed", advance.task),
    }
    Ok(())
}

fn cmd_edit(ctx: &Context, args: EditArgs) -> CmdResult {
    let due = match args.due.as_deref() {
        None => None,
        Some("none") => Some(None),
        Some(s) => Some(Some(parse_date_arg(s)?)),
    };
    let recurrence = recurrence_from_args(&args.repeat)?;
    if args.title.is_none() && due.is_none() && recurrence.is_none() {
        return Err("nothing to change (use --title, --due or --repeat)".into());
    }

    write_book(ctx, |project, _| {
        let book = &mut project.book;
        let task = task_ops::find_task(book, &args.id)?;
        if due.is_some() || recurrence.is_some() {
            let due_date = due.unwrap_or(task.due_date);
            let recurrence = recurrence.unwrap_or_else(|| task.recurrence.clone());
            task_ops::edit_schedule(book, &args.id, due_date, recurrence)?;
        }
        if let Some(title) = args.title {
            task_ops::edit_title(book, &args.id, title)?;
        }
        Ok(())
    })?;
    println!("{} updated", args.id);
    Ok(())
}

fn cmd_rm(ctx: &Context, args: IdArgs) -> CmdResult {
    let task = write_book(ctx, |project, _| Ok(task_ops::delete_task(&mut project.book, &args.id)?))?;
    println!("{} deleted ({})", task.id, task.title);
    Ok(())
}

fn cmd_config(ctx: &Context, args: ConfigArgs) -> CmdResult {
    let root = project_io::discover_project(&ctx.start)?;
    let data_dir = root.join(DATA_DIR);
    let _lock = BookLock::acquire_default(&data_dir)?;
    let mut doc = config_io::read_config_doc(&data_dir)?;

    match args.key.as_str() {
        "schedule.month_mode" | "month_mode" => {
            let mode = MonthMode::parse_mode(&args.value).ok_or_else(|| {
                format!("unknown month mode '{}' (expected: thirty-days, calendar)", args.value)
            })?;
            config_io::set_month_mode(&mut doc, mode);
        }
        "ids.prefix" | "prefix" => {
            init::validate_prefix(&args.value)?;
            config_io::set_id_prefix(&mut doc, &args.value);
        }
        other => {
            return Err(format!("unknown config key '{}' (expected: schedule.month_mode, ids.prefix)", other).into());
        }
    }

    config_io::write_config(&data_dir, &doc)?;
    println!("{} = {}", args.key, args.value);
    Ok(())
}
