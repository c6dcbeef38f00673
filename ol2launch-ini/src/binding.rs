// ABOUTME: UE3 `.Bindings=(Name="Key",Command="...")` lines: parse, format, load, save, and remove.
// ABOUTME: A disabled binding stays in the file commented out with a `;-` prefix so it can be restored.

use crate::{ConfigFile, Edit};

const BINDINGS_PREFIX: &str = ".Bindings=(";
const DISABLED_PREFIX: &str = ";-";

/// Fields extracted from a single bindings line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBinding {
    pub key: String,
    pub command: String,
    pub disabled: bool,
}

/// A console command bound (or not yet bound) to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    command: String,
    description: String,
    key: Option<String>,
    disabled: bool,
}

impl Binding {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
            key: None,
            disabled: false,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = Some(key.into());
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn toggle_disabled(&mut self) {
        self.disabled = !self.disabled;
    }

    /// Parse a bindings line. Any leading `;` (optionally followed by `-`) marks it disabled.
    pub fn parse_line(line: &str) -> Option<ParsedBinding> {
        let line = line.trim();
        let (disabled, body) = match line.strip_prefix(';') {
            Some(rest) => (true, rest.strip_prefix('-').unwrap_or(rest).trim_start()),
            None => (false, line),
        };
        if !body.to_ascii_lowercase().starts_with(&BINDINGS_PREFIX.to_ascii_lowercase()) {
            return None;
        }
        Some(ParsedBinding {
            key: quoted_field(body, "Name=")?,
            command: quoted_field(body, "Command=")?,
            disabled,
        })
    }

    /// Format the line this binding is stored as.
    pub fn to_line(&self) -> String {
        let prefix = if self.disabled { DISABLED_PREFIX } else { "" };
        format!(
            "{prefix}{BINDINGS_PREFIX}Name=\"{}\",Command=\"{}\")",
            self.key.as_deref().unwrap_or_default(),
            self.command
        )
    }

    fn command_term(&self) -> String {
        format!("Command=\"{}\"", self.command)
    }

    /// Read key and disabled state from the file. Resets both when the command isn't bound.
    pub fn load(&mut self, file: &ConfigFile) {
        let term = self.command_term();
        let parsed = file
            .find_line(&[BINDINGS_PREFIX, term.as_str()])
            .and_then(|(_, line)| Self::parse_line(line));
        match parsed {
            Some(parsed) => {
                self.key = Some(parsed.key).filter(|k| !k.is_empty());
                self.disabled = parsed.disabled;
            }
            None => {
                self.key = None;
                self.disabled = false;
            }
        }
    }

    /// Write the binding back, replacing an existing line for the same command.
    /// Returns None when there is no key to write.
    pub fn save(&self, file: &mut ConfigFile) -> Option<Edit> {
        if self.key.is_none() {
            tracing::debug!("Skipping unbound command {:?}", self.command);
            return None;
        }
        let term = self.command_term();
        Some(file.replace_or_add(self.to_line(), &[BINDINGS_PREFIX, term.as_str()]))
    }

    /// Delete every line binding this command.
    pub fn remove(&self, file: &mut ConfigFile) -> usize {
        let term = self.command_term();
        file.delete_lines(&[BINDINGS_PREFIX, term.as_str()])
    }
}

/// Value of `field"..."` in `body`, matching the field name case-insensitively.
fn quoted_field(body: &str, field: &str) -> Option<String> {
    let lower = body.to_ascii_lowercase();
    let start = lower.find(&format!("{}\"", field.to_ascii_lowercase()))? + field.len() + 1;
    let len = body[start..].find('"')?;
    Some(body[start..start + len].to_string())
}
