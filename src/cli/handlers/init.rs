use std::fs;

use super::{CmdResult, Context};
use crate::cli::commands::InitArgs;
use crate::io::project_io::{self, BOOK_FILE, CONFIG_FILE, DATA_DIR, ProjectError};
use crate::model::book::TaskBook;
use crate::model::recurrence::MonthMode;

const CONFIG_TEMPLATE: &str = r##"[project]
name = "{name}"

[schedule]
# How monthly and "every N months" tasks are stepped:
#   "thirty-days"  every month is exactly 30 days after the previous one
#   "calendar"     same day of the month, clamped to the month's last day
month_mode = "{month_mode}"

[ids]
# New tasks are numbered {prefix}-001, {prefix}-002, ...
prefix = "{prefix}"
"##;

/// Validate that an ID prefix is short uppercase alphanumeric.
pub(super) fn validate_prefix(prefix: &str) -> Result<(), String> {
    if prefix.is_empty() || prefix.len() > 8 {
        return Err(format!("invalid prefix \"{}\": use 1 to 8 characters", prefix));
    }
    if !prefix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err(format!(
            "invalid prefix \"{}\": use uppercase letters and digits (e.g. \"HOME\")",
            prefix
        ));
    }
    Ok(())
}

/// Infer a project name from a directory name: replace hyphens with spaces, title-case.
fn infer_name(dir_name: &str) -> String {
    dir_name
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    upper + chars.as_str()
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_config(name: &str, month_mode: MonthMode, prefix: &str) -> String {
    CONFIG_TEMPLATE
        .replace("{name}", &name.replace('\\', "\\\\").replace('"', "\\\""))
        .replace("{month_mode}", month_mode.as_str())
        .replace("{prefix}", prefix)
}

pub fn cmd_init(ctx: &Context, args: InitArgs) -> CmdResult {
    let root = ctx.start.clone();
    let data_dir = root.join(DATA_DIR);
    let config_path = data_dir.join(CONFIG_FILE);

    if config_path.exists() && !args.force {
        return Err(ProjectError::AlreadyInitialized(data_dir).into());
    }

    let month_mode = MonthMode::parse_mode(&args.month_mode).ok_or_else(|| {
        format!(
            "unknown month mode '{}' (expected: thirty-days, calendar)",
            args.month_mode
        )
    })?;
    validate_prefix(&args.prefix)?;

    let name = match args.name {
        Some(name) => name,
        None => root
            .file_name()
            .and_then(|n| n.to_str())
            .map(infer_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Tasks".to_string()),
    };

    fs::create_dir_all(&data_dir)?;
    project_io::atomic_write(&config_path, render_config(&name, month_mode, &args.prefix).as_bytes())?;

    // Never clobber an existing book, even with --force
    if !data_dir.join(BOOK_FILE).exists() {
        project_io::save_book(&data_dir, &TaskBook::new())?;
    }

    log::info!("initialized {} in {}", name, data_dir.display());
    println!("Initialized cadence project \"{}\" in {}", name, data_dir.display());
    Ok(())
}
