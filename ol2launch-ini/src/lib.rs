// ABOUTME: Line-oriented patch engine for the game's plain-text INI files.
// ABOUTME: Exposes ConfigFile for search/replace/insert, plus Setting and Binding built on top of it.

mod binding;
mod file;
mod setting;

use std::path::PathBuf;

pub use binding::{Binding, ParsedBinding};
pub use file::{ConfigFile, Edit, LineEnding};
pub use setting::Setting;

/// Errors raised while reading, validating, or writing config files.
#[derive(Debug, thiserror::Error)]
pub enum IniError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid setting key {0:?}: must end with '='")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, IniError>;

/// True when every term occurs in `line`, ignoring case.
/// An empty term list matches every line.
pub(crate) fn matches_all(line: &str, terms: &[String]) -> bool {
    let line = line.to_lowercase();
    terms.iter().all(|term| line.contains(term.as_str()))
}

/// Lower-case search terms once so repeated scans don't redo it per line.
pub(crate) fn lowered(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| t.to_lowercase()).collect()
}
