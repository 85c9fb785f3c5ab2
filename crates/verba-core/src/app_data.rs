//! Where Verba keeps its own state: the config file that remembers the
//! corpus artifact path, models, and prompt settings.
//!
//! Source documents and built artifacts stay wherever the user put them;
//! nothing under this directory is required to rebuild a corpus.

use std::path::PathBuf;

/// Platform app-data directory for Verba (e.g. `~/Library/Application
/// Support/Verba/` on macOS, `~/.local/share/verba` on Linux). Created on
/// first use; `None` when the platform gives us no home to resolve against.
pub fn app_data_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("app", "Verba", "Verba")?
        .data_local_dir()
        .to_path_buf();
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}
