use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::model::book::{BookFile, TaskBook};
use crate::model::project::Project;

/// Name of the data directory inside a project root
pub const DATA_DIR: &str = ".cadence";
/// Config file inside the data directory
pub const CONFIG_FILE: &str = "config.toml";
/// Task book inside the data directory
pub const BOOK_FILE: &str = "tasks.json";

/// Error type for project I/O operations
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("not a cadence project: no .cadence/ directory found (run `cad init`)")]
    NotAProject,
    #[error("already initialized: {0} exists (use --force to overwrite the config)")]
    AlreadyInitialized(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    ConfigParseError(#[from] toml::de::Error),
    #[error("could not edit config.toml: {0}")]
    ConfigEditError(#[from] toml_edit::TomlError),
    #[error("could not parse {path}: {source}")]
    BookParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not serialize task book: {0}")]
    BookSerializeError(#[from] serde_json::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Discover the project by walking up from the given directory, looking for
/// a `.cadence/` subdirectory with a config file.
pub fn discover_project(start: &Path) -> Result<PathBuf, ProjectError> {
    let mut current = start.to_path_buf();
    loop {
        let data_dir = current.join(DATA_DIR);
        if data_dir.is_dir() && data_dir.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ProjectError::NotAProject);
        }
    }
}

/// Load config and task book from the given root directory.
pub fn load_project(root: &Path) -> Result<Project, ProjectError> {
    let data_dir = root.join(DATA_DIR);
    if !data_dir.is_dir() {
        return Err(ProjectError::NotAProject);
    }

    let config = crate::io::config_io::read_config(&data_dir)?;
    let book = load_book(&data_dir)?;
    log::debug!(
        "loaded project {:?} from {}: {} tasks, {} completion events",
        config.project.name,
        root.display(),
        book.len(),
        book.log().len()
    );

    Ok(Project {
        root: root.to_path_buf(),
        data_dir,
        config,
        book,
    })
}

/// Read tasks.json. A missing file is an empty book.
pub fn load_book(data_dir: &Path) -> Result<TaskBook, ProjectError> {
    let path = data_dir.join(BOOK_FILE);
    if !path.exists() {
        return Ok(TaskBook::new());
    }
    let text = fs::read_to_string(&path).map_err(|e| ProjectError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    if text.trim().is_empty() {
        return Ok(TaskBook::new());
    }
    let file: BookFile =
        serde_json::from_str(&text).map_err(|e| ProjectError::BookParseError { path, source: e })?;
    let book = TaskBook::from_file(file);
    if book.log().is_empty() {
        log::debug!("loaded {} tasks, no completions", book.len());
    } else {
        log::debug!("loaded {} tasks, {} completion events", book.len(), book.log().len());
    }
    Ok(book)
}

/// Write the task book back to disk
pub fn save_book(data_dir: &Path, book: &TaskBook) -> Result<(), ProjectError> {
    let path = data_dir.join(BOOK_FILE);
    let mut content = serde_json::to_string_pretty(&book.to_file())?;
    content.push('\n');
    atomic_write(&path, content.as_bytes()).map_err(|e| ProjectError::WriteError {
        path: path.clone(),
        source: e,
    })?;
    log::debug!("saved {} tasks to {}", book.len(), path.display());
    Ok(())
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
