use std::path::{Path, PathBuf};

use super::basic::SError;

pub fn env_var_non_empty(name: &str) -> bool {
    match std::env::var(name) {
        Ok(v) => !v.is_empty(),
        Err(_) => false,
    }
}

/// Resolves (and creates, if needed) the app data directory, and returns
/// the path of fname within it.
pub fn home_dir_file_path(fname: &Path) -> Result<PathBuf, SError> {
    let home = dirs::home_dir().ok_or("Could not determine home directory")?;
    let app_dir = home.join(".b3notes");
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir).map_err(|e| {
            format!("Failed to create {}: {}", app_dir.display(), e)
        })?;
    }
    Ok(app_dir.join(fname))
}
