use std::path::PathBuf;

use super::book::TaskBook;
use super::config::ProjectConfig;

/// A fully loaded cadence project
#[derive(Debug)]
pub struct Project {
    /// Root directory of the project (parent of `.cadence/`)
    pub root: PathBuf,
    /// Path to the `.cadence/` directory
    pub data_dir: PathBuf,
    /// Parsed config.toml
    pub config: ProjectConfig,
    /// Tasks and completion history from tasks.json
    pub book: TaskBook,
}
