// ABOUTME: Validates the Outlast II install folder and resolves the config, mod, and binary paths inside it.
// ABOUTME: Shared by the old patch check, which expects the same directory layout.

use std::path::{Path, PathBuf};

type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level directories every Outlast II install has.
pub const REQUIRED_DIRS: &[&str] = &["OLGame", "Binaries", "Engine"];

/// Which of `REQUIRED_DIRS` are missing under `root`.
pub fn missing_dirs(root: &Path) -> Vec<&'static str> {
    REQUIRED_DIRS
        .iter()
        .copied()
        .filter(|dir| !root.join(dir).is_dir())
        .collect()
}

#[derive(Debug, Clone)]
pub struct GameDir {
    root: PathBuf,
}

impl GameDir {
    /// Accept `root` only if it looks like the game folder.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, DynError> {
        let root = root.into();
        let missing = missing_dirs(&root);
        if !missing.is_empty() {
            return Err(format!(
                "{} is not the Outlast II game folder (missing {}). \
                 Run the launcher from the game folder or pass --game-dir.",
                root.display(),
                missing.join(", ")
            )
            .into());
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("OLGame").join("Config")
    }

    pub fn game_ini(&self) -> PathBuf {
        self.config_dir().join("DefaultGame.ini")
    }

    pub fn engine_ini(&self) -> PathBuf {
        self.config_dir().join("DefaultEngine.ini")
    }

    pub fn system_settings_ini(&self) -> PathBuf {
        self.config_dir().join("DefaultSystemSettings.ini")
    }

    pub fn input_ini(&self) -> PathBuf {
        self.config_dir().join("DefaultInput.ini")
    }

    pub fn base_engine_ini(&self) -> PathBuf {
        self.root.join("Engine").join("Config").join("BaseEngine.ini")
    }

    pub fn base_input_ini(&self) -> PathBuf {
        self.root.join("Engine").join("Config").join("BaseInput.ini")
    }

    /// Where loose mod files are installed.
    pub fn mods_dir(&self) -> PathBuf {
        self.root.join("Mods")
    }

    pub fn win64_dir(&self) -> PathBuf {
        self.root.join("Binaries").join("Win64")
    }

    pub fn executable(&self) -> PathBuf {
        self.win64_dir().join("Outlast2.exe")
    }

    /// `path` relative to the game root, if it lives inside it.
    pub fn relative<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.root).ok()
    }

    /// Resolve a possibly-relative path from the launcher config against the game root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[cfg(test)]
pub(crate) fn fake_game_dir(root: &Path) -> GameDir {
    for dir in REQUIRED_DIRS {
        std::fs::create_dir_all(root.join(dir)).unwrap();
    }
    std::fs::create_dir_all(root.join("OLGame").join("Config")).unwrap();
    std::fs::create_dir_all(root.join("Engine").join("Config")).unwrap();
    GameDir::new(root).unwrap()
}
