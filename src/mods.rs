// ABOUTME: File-copy mods: installs a source tree into the game, removes it again, and checks presence.
// ABOUTME: Replacement mods swap files with pristine originals and verify installs by SHA-256.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ol2launch_ini::IniError;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::store::{ConfigStore, FileSetting};

/// Where a mod's files come from and where they go.
#[derive(Debug, Clone)]
pub struct ModFiles {
    pub source: PathBuf,
    pub install: PathBuf,
}

/// Counts from a single install or uninstall pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub copied: usize,
    pub removed: usize,
    pub missing: usize,
    pub failed: usize,
    pub settings_changed: usize,
}

impl InstallReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// A mod made of loose files, game settings, or both.
#[derive(Debug, Clone)]
pub struct Mod {
    name: String,
    description: String,
    files: Option<ModFiles>,
    settings: Vec<FileSetting>,
}

impl Mod {
    pub fn new(
        name: impl Into<String>,
        files: Option<ModFiles>,
        settings: Vec<FileSetting>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            files,
            settings,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn files(&self) -> Option<&ModFiles> {
        self.files.as_ref()
    }

    /// `(relative path, absolute source path)` for every file under the source tree.
    pub fn source_files(&self) -> Vec<(PathBuf, PathBuf)> {
        let Some(files) = &self.files else {
            return Vec::new();
        };
        if !files.source.is_dir() {
            tracing::warn!(
                "Source directory '{}' for mod '{}' not found",
                files.source.display(),
                self.name
            );
            return Vec::new();
        }
        WalkDir::new(&files.source)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(
                        "Skipping unreadable entry in '{}': {e}",
                        files.source.display()
                    );
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let relative = entry.path().strip_prefix(&files.source).ok()?.to_path_buf();
                Some((relative, entry.into_path()))
            })
            .collect()
    }

    /// Copy every source file into the install directory, then enable the mod's settings.
    pub fn install(&self, store: &mut ConfigStore) -> Result<InstallReport, IniError> {
        tracing::info!("Installing mod '{}'...", self.name);
        let mut report = InstallReport::default();

        if let Some(files) = &self.files {
            for (relative, source) in self.source_files() {
                let destination = files.install.join(&relative);
                match copy_file(&source, &destination) {
                    Ok(()) => {
                        tracing::info!("Copied '{}'", relative.display());
                        report.copied += 1;
                    }
                    Err(e) => {
                        tracing::error!("Could not copy '{}': {e}", source.display());
                        report.failed += 1;
                    }
                }
            }
        }

        for setting in &self.settings {
            if setting.enable(store)? {
                report.settings_changed += 1;
            }
        }
        Ok(report)
    }

    /// Remove the installed counterpart of every source file, then disable the mod's settings.
    pub fn uninstall(&self, store: &mut ConfigStore) -> Result<InstallReport, IniError> {
        tracing::info!("Uninstalling mod '{}'...", self.name);
        let mut report = InstallReport::default();

        if let Some(files) = &self.files {
            for (relative, _) in self.source_files() {
                let destination = files.install.join(&relative);
                match fs::remove_file(&destination) {
                    Ok(()) => {
                        tracing::info!("Removed '{}'", relative.display());
                        report.removed += 1;
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        tracing::warn!("File not found: '{}'", relative.display());
                        report.missing += 1;
                    }
                    Err(e) => {
                        tracing::error!("Could not remove '{}': {e}", destination.display());
                        report.failed += 1;
                    }
                }
            }
        }

        for setting in &self.settings {
            if setting.disable(store)? {
                report.settings_changed += 1;
            }
        }
        Ok(report)
    }

    /// All source files are present in the install directory and all settings are enabled.
    pub fn is_installed(&self, store: &mut ConfigStore) -> Result<bool, IniError> {
        if let Some(files) = &self.files {
            let all_present = self
                .source_files()
                .iter()
                .all(|(relative, _)| files.install.join(relative).exists());
            if !all_present {
                return Ok(false);
            }
        }
        for setting in &self.settings {
            if !setting.is_enabled(store)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn toggle(&self, store: &mut ConfigStore) -> Result<InstallReport, IniError> {
        if self.is_installed(store)? {
            self.uninstall(store)
        } else {
            self.install(store)
        }
    }
}

/// A mod that overwrites existing game files. Uninstalling copies the originals back.
#[derive(Debug, Clone)]
pub struct ReplacementMod {
    name: String,
    description: String,
    modded: Mod,
    original: Mod,
    settings: Vec<FileSetting>,
}

impl ReplacementMod {
    pub fn new(
        name: impl Into<String>,
        modded_source: impl Into<PathBuf>,
        original_source: impl Into<PathBuf>,
        install: impl Into<PathBuf>,
        settings: Vec<FileSetting>,
    ) -> Self {
        let name = name.into();
        let install = install.into();
        Self {
            modded: Mod::new(
                format!("modded_{name}"),
                Some(ModFiles {
                    source: modded_source.into(),
                    install: install.clone(),
                }),
                Vec::new(),
            ),
            original: Mod::new(
                format!("original_{name}"),
                Some(ModFiles {
                    source: original_source.into(),
                    install,
                }),
                Vec::new(),
            ),
            name,
            description: String::new(),
            settings,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn install(&self, store: &mut ConfigStore) -> Result<InstallReport, IniError> {
        tracing::info!("Installing replacement mod '{}'...", self.name);
        let mut report = self.modded.install(store)?;
        for setting in &self.settings {
            if setting.enable(store)? {
                report.settings_changed += 1;
            }
        }
        Ok(report)
    }

    pub fn uninstall(&self, store: &mut ConfigStore) -> Result<InstallReport, IniError> {
        tracing::info!("Uninstalling replacement mod '{}'...", self.name);
        let mut report = self.original.install(store)?;
        for setting in &self.settings {
            if setting.disable(store)? {
                report.settings_changed += 1;
            }
        }
        Ok(report)
    }

    /// Every installed file matches the modded copy byte-for-byte and every setting is enabled.
    pub fn is_installed(&self, store: &mut ConfigStore) -> Result<bool, IniError> {
        if let Some(files) = self.modded.files() {
            for (relative, source) in self.modded.source_files() {
                let installed = files.install.join(&relative);
                let matches = match (file_sha256(&source), file_sha256(&installed)) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                };
                if !matches {
                    return Ok(false);
                }
            }
        }
        for setting in &self.settings {
            if !setting.is_enabled(store)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn toggle(&self, store: &mut ConfigStore) -> Result<InstallReport, IniError> {
        if self.is_installed(store)? {
            self.uninstall(store)
        } else {
            self.install(store)
        }
    }
}

/// Either kind of user-facing mod.
#[derive(Debug, Clone)]
pub enum ModEntry {
    Files(Mod),
    Replacement(ReplacementMod),
}

impl ModEntry {
    pub fn name(&self) -> &str {
        match self {
            ModEntry::Files(m) => m.name(),
            ModEntry::Replacement(m) => m.name(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            ModEntry::Files(m) => m.description(),
            ModEntry::Replacement(m) => m.description(),
        }
    }

    pub fn install(&self, store: &mut ConfigStore) -> Result<InstallReport, IniError> {
        match self {
            ModEntry::Files(m) => m.install(store),
            ModEntry::Replacement(m) => m.install(store),
        }
    }

    pub fn uninstall(&self, store: &mut ConfigStore) -> Result<InstallReport, IniError> {
        match self {
            ModEntry::Files(m) => m.uninstall(store),
            ModEntry::Replacement(m) => m.uninstall(store),
        }
    }

    pub fn is_installed(&self, store: &mut ConfigStore) -> Result<bool, IniError> {
        match self {
            ModEntry::Files(m) => m.is_installed(store),
            ModEntry::Replacement(m) => m.is_installed(store),
        }
    }

    pub fn toggle(&self, store: &mut ConfigStore) -> Result<InstallReport, IniError> {
        match self {
            ModEntry::Files(m) => m.toggle(store),
            ModEntry::Replacement(m) => m.toggle(store),
        }
    }
}

fn copy_file(source: &Path, destination: &Path) -> io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, destination)?;
    Ok(())
}

/// SHA-256 of a file's contents, or None if it can't be read.
fn file_sha256(path: &Path) -> Option<[u8; 32]> {
    let mut file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::error!("Couldn't calculate the hash of {}: {e}", path.display());
            return None;
        }
    };
    let mut hasher = Sha256::new();
    if let Err(e) = io::copy(&mut file, &mut hasher) {
        tracing::error!("Couldn't calculate the hash of {}: {e}", path.display());
        return None;
    }
    Some(hasher.finalize().into())
}
