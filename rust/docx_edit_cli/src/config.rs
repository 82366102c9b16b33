use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const DEFAULT_PROJECT_DIR: &str = ".docx-projects";
pub const PROJECT_DIR_ENV: &str = "DOCX_EDIT_PROJECT_DIR";

/// Directory holding all projects: the explicit `--project-dir` (or its
/// environment variable), otherwise `.docx-projects` under the current
/// directory.
pub fn projects_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(dir) => Ok(dir.to_path_buf()),
        None => {
            let cwd = std::env::current_dir().context("resolve current directory")?;
            Ok(cwd.join(DEFAULT_PROJECT_DIR))
        }
    }
}

/// Log filter for a `-v` count; `None` defers to `RUST_LOG`.
pub fn verbosity_filter(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        _ => Some("debug"),
    }
}
