// ABOUTME: Loads the launcher's own TOML configuration from the game folder and saves it back.
// ABOUTME: Imports the legacy LauncherConfig.ini (configparser format) on first run after upgrading.

use configparser::ini::Ini;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

type DynError = Box<dyn std::error::Error + Send + Sync>;

pub const CONFIG_FILE_NAME: &str = "LauncherConfig.toml";
pub const LEGACY_CONFIG_FILE_NAME: &str = "LauncherConfig.ini";
const LEGACY_LAUNCHER_SECTION: &str = "Launcher Settings";

pub const DEFAULT_FEED_URL: &str =
    "https://api.github.com/repos/HayaiNeko/BetterOutlast2Launcher/releases";
pub const DEFAULT_EXECUTABLE_NAME: &str = "BetterOutlast2Launcher.exe";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub launcher: LauncherConfig,
    #[serde(default)]
    pub old_patch: OldPatchConfig,
    #[serde(default)]
    pub update: UpdateConfig,
    /// Extra user-declared mods shown alongside the built-in ones.
    #[serde(default, rename = "mods", skip_serializing_if = "Vec::is_empty")]
    pub custom_mods: Vec<CustomModConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LauncherConfig {
    #[serde(default)]
    pub close_on_launch: bool,
    #[serde(default = "default_check_for_updates")]
    pub check_for_updates: bool,
    /// Folder holding the bundled mod sources, relative to the game root unless absolute.
    #[serde(default = "default_mods_source")]
    pub mods_source: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OldPatchConfig {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Launcher version that last ran against this game folder.
    #[serde(default)]
    pub version: String,
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    #[serde(default = "default_executable_name")]
    pub executable_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomModConfig {
    pub name: String,
    pub source: PathBuf,
    pub install: PathBuf,
    /// Pristine copies of the files `source` overwrites. Makes this a replacement mod.
    #[serde(default)]
    pub original: Option<PathBuf>,
    #[serde(default)]
    pub description: String,
}

fn default_check_for_updates() -> bool {
    true
}

fn default_mods_source() -> PathBuf {
    PathBuf::from("Launcher").join("Mods")
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_executable_name() -> String {
    DEFAULT_EXECUTABLE_NAME.to_string()
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            close_on_launch: false,
            check_for_updates: default_check_for_updates(),
            mods_source: default_mods_source(),
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            version: String::new(),
            feed_url: default_feed_url(),
            executable_name: default_executable_name(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            launcher: LauncherConfig::default(),
            old_patch: OldPatchConfig::default(),
            update: UpdateConfig::default(),
            custom_mods: Vec::new(),
        }
    }
}

impl Config {
    /// True once any launcher config (new or legacy) exists in the game folder.
    pub fn exists(game_root: &Path) -> bool {
        Self::path_for(game_root).exists() || game_root.join(LEGACY_CONFIG_FILE_NAME).exists()
    }

    /// Load configuration for a game folder.
    /// Falls back to the legacy INI if only that exists, then to defaults.
    pub fn load(game_root: &Path) -> Result<Self, DynError> {
        let config_path = Self::path_for(game_root);
        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            return Self::load_from_str(&contents);
        }

        let legacy_path = game_root.join(LEGACY_CONFIG_FILE_NAME);
        if legacy_path.exists() {
            let contents = std::fs::read_to_string(&legacy_path)?;
            tracing::info!("Migrating legacy config from {}", legacy_path.display());
            return Self::from_legacy_ini(&contents);
        }

        Ok(Config::default())
    }

    fn load_from_str(contents: &str) -> Result<Self, DynError> {
        Ok(toml::from_str(contents)?)
    }

    /// Read the `[Launcher Settings]`, `[OldPatch]`, and `[Update]` sections written by
    /// older launcher versions. Unknown sections and keys are ignored.
    fn from_legacy_ini(contents: &str) -> Result<Self, DynError> {
        let mut ini = Ini::new();
        ini.read(contents.to_string())?;
        let mut config = Config::default();

        for (key, field) in [
            ("close on launch", &mut config.launcher.close_on_launch),
            ("check for updates", &mut config.launcher.check_for_updates),
        ] {
            match ini.getboolcoerce(LEGACY_LAUNCHER_SECTION, key) {
                Ok(Some(value)) => *field = value,
                Ok(None) => {}
                Err(e) => tracing::warn!("Ignoring legacy config entry '{key}': {e}"),
            }
        }
        if let Some(path) = ini.get("OldPatch", "path") {
            config.old_patch.path = path;
        }
        if let Some(version) = ini.get("Update", "version") {
            config.update.version = version;
        }

        Ok(config)
    }

    /// Config file location, respecting the OL2LAUNCH_CONFIG env var override.
    pub fn path_for(game_root: &Path) -> PathBuf {
        if let Ok(override_path) = std::env::var("OL2LAUNCH_CONFIG") {
            return PathBuf::from(override_path);
        }
        game_root.join(CONFIG_FILE_NAME)
    }

    pub fn save(&self, game_root: &Path) -> Result<(), DynError> {
        let config_path = Self::path_for(game_root);
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)?;
        tracing::info!("Configuration saved to {}", config_path.display());
        Ok(())
    }

    /// Update one `[launcher]` or `[old_patch]` value from a `section.key` name.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "close_on_launch" | "launcher.close_on_launch" => {
                self.launcher.close_on_launch = parse_bool(value)?;
            }
            "check_for_updates" | "launcher.check_for_updates" => {
                self.launcher.check_for_updates = parse_bool(value)?;
            }
            "mods_source" | "launcher.mods_source" => {
                self.launcher.mods_source = PathBuf::from(value);
            }
            "old_patch.path" => self.old_patch.path = value.to_string(),
            "update.feed_url" => self.update.feed_url = value.to_string(),
            "update.executable_name" => self.update.executable_name = value.to_string(),
            other => return Err(format!("Unknown config key: {other}")),
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Ok(true),
        "0" | "no" | "false" | "off" => Ok(false),
        _ => Err(format!("Expected true or false, got {value:?}")),
    }
}
