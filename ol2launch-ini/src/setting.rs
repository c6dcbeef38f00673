// ABOUTME: A two-state `Key=value` entry that can be read, toggled, enabled, or disabled in a ConfigFile.
// ABOUTME: Values compare case-insensitively; the text before the key on the line is preserved on write.

use crate::{ConfigFile, IniError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    name: String,
    key: String,
    enabled_value: String,
    disabled_value: String,
}

impl Setting {
    /// Create a setting. `key` must include the trailing `=` (e.g. `SyncInterval=`).
    pub fn new(
        name: impl Into<String>,
        key: impl Into<String>,
        enabled_value: &str,
        disabled_value: &str,
    ) -> Result<Self> {
        let key = key.into();
        if !key.ends_with('=') {
            return Err(IniError::InvalidKey(key));
        }
        Ok(Self {
            name: name.into(),
            key,
            enabled_value: enabled_value.to_lowercase(),
            disabled_value: disabled_value.to_lowercase(),
        })
    }

    /// A `true`/`false` setting.
    pub fn boolean(name: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        Self::new(name, key, "true", "false")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn enabled_value(&self) -> &str {
        &self.enabled_value
    }

    pub fn disabled_value(&self) -> &str {
        &self.disabled_value
    }

    /// Current value, lower-cased, or None when the key is absent.
    pub fn value(&self, file: &ConfigFile) -> Option<String> {
        file.find_line(&[self.key.as_str()]).map(|(_, line)| value_of(line))
    }

    pub fn is_enabled(&self, file: &ConfigFile) -> bool {
        self.value(file).is_some_and(|v| v == self.enabled_value)
    }

    /// Flip between the enabled and disabled value.
    /// An unrecognised current value becomes the enabled value.
    /// Returns false without touching the file when the key is absent.
    pub fn toggle(&self, file: &mut ConfigFile) -> bool {
        let Some(current) = self.value(file) else {
            tracing::warn!("{} not found in {}", self.key, file.path().display());
            return false;
        };
        let next = if current == self.enabled_value {
            self.disabled_value.clone()
        } else {
            self.enabled_value.clone()
        };
        self.write_value(file, &next)
    }

    /// Enable if not already enabled. Returns whether the file changed.
    pub fn enable(&self, file: &mut ConfigFile) -> bool {
        if self.is_enabled(file) {
            return false;
        }
        let value = self.enabled_value.clone();
        self.write_value(file, &value)
    }

    /// Disable if currently enabled. Returns whether the file changed.
    pub fn disable(&self, file: &mut ConfigFile) -> bool {
        if !self.is_enabled(file) {
            return false;
        }
        let value = self.disabled_value.clone();
        self.write_value(file, &value)
    }

    pub fn set_state(&self, file: &mut ConfigFile, enabled: bool) -> bool {
        if enabled {
            self.enable(file)
        } else {
            self.disable(file)
        }
    }

    fn write_value(&self, file: &mut ConfigFile, value: &str) -> bool {
        let Some((index, _)) = file.find_line(&[self.key.as_str()]) else {
            return false;
        };
        let new_line = match file.line(index) {
            Some(raw) => {
                let lower = raw.to_ascii_lowercase();
                match lower.find(&self.key.to_ascii_lowercase()) {
                    Some(pos) => format!("{}{value}", &raw[..pos + self.key.len()]),
                    None => format!("{}{value}", self.key),
                }
            }
            None => return false,
        };
        file.replace_index(index, new_line)
    }
}

fn value_of(line: &str) -> String {
    line.rsplit('=').next().unwrap_or_default().trim().to_lowercase()
}
