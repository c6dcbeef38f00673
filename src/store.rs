// ABOUTME: Caches opened game config files by path so settings sharing a file see each other's edits.
// ABOUTME: FileSetting pairs a Setting with the file it lives in and routes reads/writes through the store.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::{Path, PathBuf};

use ol2launch_ini::{ConfigFile, IniError, Setting};

#[derive(Debug, Default)]
pub struct ConfigStore {
    files: BTreeMap<PathBuf, ConfigFile>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow a file, reading it from disk on first use.
    pub fn file(&mut self, path: &Path) -> Result<&ConfigFile, IniError> {
        Ok(self.file_mut(path)?)
    }

    pub fn file_mut(&mut self, path: &Path) -> Result<&mut ConfigFile, IniError> {
        match self.files.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(ConfigFile::open(path)?)),
        }
    }

    /// Write every modified file. Returns how many were written.
    pub fn flush(&mut self) -> Result<usize, IniError> {
        let mut written = 0;
        for file in self.files.values_mut() {
            if file.save()? {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Every file that has been opened through the store.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }
}

/// A setting bound to the config file that holds it.
#[derive(Debug, Clone)]
pub struct FileSetting {
    pub setting: Setting,
    pub file: PathBuf,
}

impl FileSetting {
    pub fn new(setting: Setting, file: impl Into<PathBuf>) -> Self {
        Self {
            setting,
            file: file.into(),
        }
    }

    pub fn name(&self) -> &str {
        self.setting.name()
    }

    pub fn is_enabled(&self, store: &mut ConfigStore) -> Result<bool, IniError> {
        Ok(self.setting.is_enabled(store.file(&self.file)?))
    }

    pub fn enable(&self, store: &mut ConfigStore) -> Result<bool, IniError> {
        Ok(self.setting.enable(store.file_mut(&self.file)?))
    }

    pub fn disable(&self, store: &mut ConfigStore) -> Result<bool, IniError> {
        Ok(self.setting.disable(store.file_mut(&self.file)?))
    }

    pub fn toggle(&self, store: &mut ConfigStore) -> Result<bool, IniError> {
        Ok(self.setting.toggle(store.file_mut(&self.file)?))
    }
}
