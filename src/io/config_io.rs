use std::fs;
use std::path::Path;

use crate::io::project_io::{CONFIG_FILE, ProjectError, atomic_write};
use crate::model::config::ProjectConfig;
use crate::model::recurrence::MonthMode;

/// Read and parse config.toml from the data directory
pub fn read_config(data_dir: &Path) -> Result<ProjectConfig, ProjectError> {
    let config_path = data_dir.join(CONFIG_FILE);
    let config_text = fs::read_to_string(&config_path).map_err(|e| ProjectError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    Ok(toml::from_str(&config_text)?)
}

/// Read config.toml as an editable document that keeps comments and layout
pub fn read_config_doc(data_dir: &Path) -> Result<toml_edit::DocumentMut, ProjectError> {
    let config_path = data_dir.join(CONFIG_FILE);
    let config_text = fs::read_to_string(&config_path).map_err(|e| ProjectError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    Ok(config_text.parse()?)
}

/// Write the config document back to disk, preserving formatting.
///
/// The document is parsed as a `ProjectConfig` first so an edit can never
/// leave behind a config that fails to load.
pub fn write_config(data_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ProjectError> {
    let text = doc.to_string();
    toml::from_str::<ProjectConfig>(&text)?;
    let config_path = data_dir.join(CONFIG_FILE);
    atomic_write(&config_path, text.as_bytes()).map_err(|e| ProjectError::WriteError {
        path: config_path,
        source: e,
    })?;
    Ok(())
}

fn ensure_table(doc: &mut toml_edit::DocumentMut, name: &str) {
    if !doc.contains_key(name) {
        doc[name] = toml_edit::Item::Table(toml_edit::Table::new());
    }
}

/// Update `schedule.month_mode`
pub fn set_month_mode(doc: &mut toml_edit::DocumentMut, mode: MonthMode) {
    ensure_table(doc, "schedule");
    doc["schedule"]["month_mode"] = toml_edit::value(mode.as_str());
}

/// Update `ids.prefix`
pub fn set_id_prefix(doc: &mut toml_edit::DocumentMut, prefix: &str) {
    ensure_table(doc, "ids");
    doc["ids"]["prefix"] = toml_edit::value(prefix);
}
