// ABOUTME: In-memory line buffer over a config file with case-insensitive search/replace/insert.
// ABOUTME: Preserves line endings and untouched lines; writes back only when something changed.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{IniError, Result, lowered, matches_all};

/// Line terminator style detected on read and re-emitted on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Outcome of `ConfigFile::replace_or_add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    /// An existing line at this index was rewritten.
    Replaced(usize),
    /// No line matched; the new line was appended at this index.
    Appended(usize),
    /// The matching line already had the requested content.
    Unchanged(usize),
}

#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    lines: Vec<String>,
    ending: LineEnding,
    trailing_newline: bool,
    dirty: bool,
}

impl ConfigFile {
    /// Read a file from disk. A missing file is reported as `IniError::NotFound`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        match fs::read_to_string(&path) {
            Ok(text) => {
                tracing::debug!("Read {}", path.display());
                Ok(Self::parse(path, &text))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(IniError::NotFound(path)),
            Err(source) => Err(IniError::Io { path, source }),
        }
    }

    /// Build a file from text already in memory.
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Self {
        let ending = LineEnding::detect(text);
        let trailing_newline = text.is_empty() || text.ends_with('\n');
        let body = text.strip_suffix('\n').unwrap_or(text);
        let lines = if text.is_empty() {
            Vec::new()
        } else {
            body.split('\n')
                .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
                .collect()
        };
        Self {
            path: path.into(),
            lines,
            ending,
            trailing_newline,
            dirty: false,
        }
    }

    /// An empty file that will be created on first save.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self::parse(path, "")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn line_ending(&self) -> LineEnding {
        self.ending
    }

    /// The raw (untrimmed) line at `index`.
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// First line containing every term (case-insensitive), trimmed.
    pub fn find_line(&self, terms: &[&str]) -> Option<(usize, &str)> {
        let terms = lowered(terms);
        self.lines
            .iter()
            .enumerate()
            .find(|(_, line)| matches_all(line, &terms))
            .map(|(i, line)| (i, line.trim()))
    }

    /// Every line containing every term (case-insensitive), trimmed.
    pub fn find_lines(&self, terms: &[&str]) -> Vec<&str> {
        let terms = lowered(terms);
        self.lines
            .iter()
            .filter(|line| matches_all(line, &terms))
            .map(|line| line.trim())
            .collect()
    }

    /// Overwrite the line at `index`. Returns false if the index is out of range.
    pub fn replace_index(&mut self, index: usize, new_line: impl Into<String>) -> bool {
        let new_line = new_line.into();
        match self.lines.get_mut(index) {
            Some(line) => {
                if *line != new_line {
                    tracing::info!(
                        "Replaced {:?} by {:?} in {}",
                        line.trim(),
                        new_line,
                        self.path.display()
                    );
                    *line = new_line;
                    self.dirty = true;
                }
                true
            }
            None => false,
        }
    }

    /// Replace the first matching line. Returns false when nothing matched.
    pub fn replace_line(&mut self, new_line: impl Into<String>, terms: &[&str]) -> bool {
        match self.find_line(terms).map(|(i, _)| i) {
            Some(index) => self.replace_index(index, new_line),
            None => false,
        }
    }

    /// Replace the first matching line, or append `new_line` if none matches.
    /// Applying the same edit twice leaves the file unchanged the second time.
    pub fn replace_or_add(&mut self, new_line: impl Into<String>, terms: &[&str]) -> Edit {
        let new_line = new_line.into();
        match self.find_line(terms).map(|(i, _)| i) {
            Some(index) if self.lines[index] == new_line => Edit::Unchanged(index),
            Some(index) => {
                self.replace_index(index, new_line);
                Edit::Replaced(index)
            }
            None => {
                tracing::info!("Added {:?} in {}", new_line, self.path.display());
                self.lines.push(new_line);
                self.dirty = true;
                Edit::Appended(self.lines.len() - 1)
            }
        }
    }

    /// Remove every line containing every term. Returns how many were removed.
    pub fn delete_lines(&mut self, terms: &[&str]) -> usize {
        let lowered_terms = lowered(terms);
        let before = self.lines.len();
        self.lines.retain(|line| !matches_all(line, &lowered_terms));
        let removed = before - self.lines.len();
        if removed > 0 {
            tracing::info!(
                "Deleted {removed} line(s) containing {terms:?} in {}",
                self.path.display()
            );
            self.dirty = true;
        }
        removed
    }

    /// Make `other` hold exactly this file's content. `other` keeps its own path.
    pub fn copy_to(&self, other: &mut ConfigFile) {
        if other.lines != self.lines
            || other.ending != self.ending
            || other.trailing_newline != self.trailing_newline
        {
            other.lines = self.lines.clone();
            other.ending = self.ending;
            other.trailing_newline = self.trailing_newline;
            other.dirty = true;
        }
    }

    /// Render the buffer exactly as it would be written.
    pub fn render(&self) -> String {
        let mut out = self.lines.join(self.ending.as_str());
        if self.trailing_newline && !self.lines.is_empty() {
            out.push_str(self.ending.as_str());
        }
        out
    }

    /// Write to disk if anything changed since the last read or save.
    /// Returns whether a write happened.
    pub fn save(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        let path = self.path.clone();
        self.save_to(&path)?;
        self.dirty = false;
        tracing::info!("Updated lines written in {}", self.path.display());
        Ok(true)
    }

    /// Unconditionally write the buffer to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let io_err = |source| IniError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, self.render()).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSTEM_SETTINGS: &str = "[SystemSettings]\r\nSyncInterval=1\r\nUseBorderlessFullscreen=False\r\n";

    #[test]
    fn parse_detects_crlf_and_round_trips() {
        let file = ConfigFile::parse("x.ini", SYSTEM_SETTINGS);
        assert_eq!(file.line_ending(), LineEnding::CrLf);
        assert_eq!(file.len(), 3);
        assert_eq!(file.render(), SYSTEM_SETTINGS);
    }

    #[test]
    fn parse_keeps_missing_trailing_newline() {
        let file = ConfigFile::parse("x.ini", "a\nb");
        assert_eq!(file.render(), "a\nb");
    }

    #[test]
    fn find_line_trims_and_ignores_case() {
        let file = ConfigFile::parse("x.ini", "  SyncInterval=1  \n");
        assert_eq!(file.find_line(&["syncinterval="]), Some((0, "SyncInterval=1")));
        assert_eq!(file.find_line(&["missing"]), None);
    }

    #[test]
    fn find_lines_returns_all_matches() {
        let file = ConfigFile::parse("x.ini", "a=1\nb=2\na=3\n");
        assert_eq!(file.find_lines(&["a="]), vec!["a=1", "a=3"]);
    }

    #[test]
    fn replace_line_touches_only_first_match() {
        let mut file = ConfigFile::parse("x.ini", "a=1\na=2\n");
        assert!(file.replace_line("a=9", &["a="]));
        assert_eq!(file.render(), "a=9\na=2\n");
        assert!(file.is_dirty());
    }

    #[test]
    fn replace_index_out_of_range_is_noop() {
        let mut file = ConfigFile::parse("x.ini", "a=1\n");
        assert!(!file.replace_index(5, "b"));
        assert!(!file.is_dirty());
    }

    #[test]
    fn replace_or_add_appends_then_is_idempotent() {
        let mut file = ConfigFile::parse("x.ini", "[Section]\n");
        assert_eq!(file.replace_or_add("Key=1", &["Key="]), Edit::Appended(1));
        let once = file.render();
        assert_eq!(file.replace_or_add("Key=1", &["Key="]), Edit::Unchanged(1));
        assert_eq!(file.render(), once);
        assert_eq!(file.replace_or_add("Key=2", &["Key="]), Edit::Replaced(1));
        assert_eq!(file.render(), "[Section]\nKey=2\n");
    }

    #[test]
    fn append_to_file_without_trailing_newline_starts_a_new_line() {
        let mut file = ConfigFile::parse("x.ini", "a=1");
        file.replace_or_add("b=2", &["b="]);
        assert_eq!(file.render(), "a=1\nb=2");
    }

    #[test]
    fn delete_lines_removes_every_match() {
        let mut file = ConfigFile::parse("x.ini", "keep\nDrop me\ndrop too\n");
        assert_eq!(file.delete_lines(&["drop"]), 2);
        assert_eq!(file.render(), "keep\n");
        assert_eq!(file.delete_lines(&["drop"]), 0);
    }

    #[test]
    fn copy_to_transfers_content_and_marks_target_dirty() {
        let source = ConfigFile::parse("a.ini", SYSTEM_SETTINGS);
        let mut target = ConfigFile::empty("b.ini");
        source.copy_to(&mut target);
        assert!(target.is_dirty());
        assert_eq!(target.path(), Path::new("b.ini"));
        assert_eq!(target.render(), SYSTEM_SETTINGS);
    }

    #[test]
    fn open_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigFile::open(dir.path().join("nope.ini")).unwrap_err();
        assert!(matches!(err, IniError::NotFound(_)));
    }

    #[test]
    fn save_only_writes_when_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Config").join("DefaultGame.ini");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "SprintDelay=2\r\n").unwrap();

        let mut file = ConfigFile::open(&path).unwrap();
        assert!(!file.save().unwrap());

        file.replace_line("SprintDelay=0", &["SprintDelay="]);
        assert!(file.save().unwrap());
        assert!(!file.is_dirty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "SprintDelay=0\r\n");
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("new.ini");
        let mut file = ConfigFile::empty(&path);
        file.replace_or_add("x=1", &["x="]);
        file.save().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x=1\n");
    }
}
