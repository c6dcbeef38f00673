// ABOUTME: Ties the game folder, launcher config, catalog, and config-file cache together.
// ABOUTME: Applies first-launch defaults, prepares launch-with mods, and starts either patch.

use std::path::PathBuf;

use ol2launch_ini::Binding;

use crate::catalog::{self, BindingGroup, Catalog, GroupedBinding};
use crate::config::Config;
use crate::keys;
use crate::mods::InstallReport;
use crate::old_patch;
use crate::paths::GameDir;
use crate::store::ConfigStore;

type DynError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Patch {
    Latest,
    Old,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Enable,
    Disable,
    Toggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModKind {
    LaunchWith,
    Display,
}

#[derive(Debug, Clone)]
pub struct SettingStatus {
    pub name: String,
    pub tooltip: &'static str,
    /// None when the setting's file is missing.
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ModStatus {
    pub name: String,
    pub description: String,
    pub kind: ModKind,
    pub installed: bool,
}

pub struct Launcher {
    game: GameDir,
    config: Config,
    catalog: Catalog,
    store: ConfigStore,
    version: String,
}

impl Launcher {
    /// Load everything for `game`.
    /// Applies first-launch defaults when no launcher config exists yet.
    pub fn open(game: GameDir, version: &str) -> Result<Self, DynError> {
        let first_launch = !Config::exists(game.root());
        let config = Config::load(game.root())?;
        let catalog = Catalog::new(&game, &config)?;
        let mut launcher = Self {
            game,
            config,
            catalog,
            store: ConfigStore::new(),
            version: version.to_string(),
        };
        if first_launch {
            launcher.first_launch()?;
        }
        Ok(launcher)
    }

    fn first_launch(&mut self) -> Result<(), DynError> {
        tracing::info!("First launch: applying recommended settings");
        if let Some(helper) = self.catalog.display_mod(catalog::SPEEDRUN_HELPER) {
            let report = helper.install(&mut self.store)?;
            if !report.is_clean() {
                tracing::warn!("Speedrun Helper installed with {} failures", report.failed);
            }
        }
        let defaults = [
            (catalog::STEAM, false),
            (catalog::VSYNC, false),
            (catalog::BORDERLESS, true),
            (catalog::PAUSE_ON_FOCUS_LOSS, false),
        ];
        for (name, enabled) in defaults {
            let Some(entry) = self.catalog.display_setting(name) else {
                continue;
            };
            let result = if enabled {
                entry.setting.enable(&mut self.store)
            } else {
                entry.setting.disable(&mut self.store)
            };
            if let Err(e) = result {
                tracing::warn!("Could not apply default for {name}: {e}");
            }
        }
        self.store.flush()?;
        self.config.save(self.game.root())?;
        Ok(())
    }

    pub fn game(&self) -> &GameDir {
        &self.game
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn save_config(&self) -> Result<(), DynError> {
        self.config.save(self.game.root())
    }

    pub fn settings(&mut self) -> Vec<SettingStatus> {
        self.catalog
            .display_settings
            .iter()
            .map(|entry| {
                let name = entry.name().to_string();
                let enabled = match entry.setting.is_enabled(&mut self.store) {
                    Ok(enabled) => Some(enabled),
                    Err(e) => {
                        tracing::warn!("{name}: {e}");
                        None
                    }
                };
                SettingStatus {
                    name,
                    tooltip: entry.tooltip,
                    enabled,
                }
            })
            .collect()
    }

    /// Returns whether the setting's state changed.
    pub fn change_setting(&mut self, name: &str, change: Change) -> Result<bool, DynError> {
        let entry = self
            .catalog
            .display_setting(name)
            .ok_or_else(|| format!("Unknown setting: {name}"))?;
        let changed = match change {
            Change::Enable => entry.setting.enable(&mut self.store)?,
            Change::Disable => entry.setting.disable(&mut self.store)?,
            Change::Toggle => entry.setting.toggle(&mut self.store)?,
        };
        self.store.flush()?;
        Ok(changed)
    }

    pub fn mods(&mut self) -> Result<Vec<ModStatus>, DynError> {
        let mut statuses = Vec::new();
        for m in &self.catalog.launch_mods {
            statuses.push(ModStatus {
                name: m.name().to_string(),
                description: m.description().to_string(),
                kind: ModKind::LaunchWith,
                installed: m.is_installed(&mut self.store)?,
            });
        }
        for m in &self.catalog.display_mods {
            statuses.push(ModStatus {
                name: m.name().to_string(),
                description: m.description().to_string(),
                kind: ModKind::Display,
                installed: m.is_installed(&mut self.store)?,
            });
        }
        Ok(statuses)
    }

    pub fn change_mod(&mut self, name: &str, change: Change) -> Result<InstallReport, DynError> {
        let report = if let Some(m) = self.catalog.display_mod(name) {
            match change {
                Change::Enable => m.install(&mut self.store)?,
                Change::Disable => m.uninstall(&mut self.store)?,
                Change::Toggle => m.toggle(&mut self.store)?,
            }
        } else if let Some(m) = self.catalog.launch_mod(name) {
            match change {
                Change::Enable => m.install(&mut self.store)?,
                Change::Disable => m.uninstall(&mut self.store)?,
                Change::Toggle => m.toggle(&mut self.store)?,
            }
        } else {
            return Err(format!("Unknown mod: {name}").into());
        };
        self.store.flush()?;
        Ok(report)
    }

    pub fn bindings(&mut self) -> Result<Vec<GroupedBinding>, DynError> {
        let input = self.store.file(&self.catalog.input_ini)?;
        Ok(self.catalog.load_bindings(input))
    }

    fn find_binding(&mut self, command: &str) -> Result<Binding, DynError> {
        self.bindings()?
            .into_iter()
            .map(|grouped| grouped.binding)
            .find(|b| b.command().eq_ignore_ascii_case(command.trim()))
            .ok_or_else(|| format!("No binding for command: {command}").into())
    }

    fn save_binding(&mut self, binding: &Binding) -> Result<(), DynError> {
        let input_ini: PathBuf = self.catalog.input_ini.clone();
        let input = self.store.file_mut(&input_ini)?;
        if let Some(edit) = binding.save(input) {
            tracing::debug!("Binding {:?}: {edit:?}", binding.command());
        }
        self.store.flush()?;
        Ok(())
    }

    /// Bind `command` to `key`. Accepts key names or hex virtual-key codes.
    pub fn set_binding_key(&mut self, command: &str, key: &str) -> Result<Binding, DynError> {
        let key = keys::resolve(key).ok_or_else(|| format!("Unknown key: {key}"))?;
        let mut binding = self.find_binding(command)?;
        binding.set_key(key);
        self.save_binding(&binding)?;
        Ok(binding)
    }

    pub fn set_binding_disabled(
        &mut self,
        command: &str,
        disabled: bool,
    ) -> Result<Binding, DynError> {
        let mut binding = self.find_binding(command)?;
        if binding.key().is_none() {
            return Err(format!("{command} is not bound to a key").into());
        }
        binding.set_disabled(disabled);
        self.save_binding(&binding)?;
        Ok(binding)
    }

    /// Add optional preset `number` (1-based) bound to `key`.
    pub fn add_preset(&mut self, number: usize, key: &str) -> Result<Binding, DynError> {
        let (command, description) = number
            .checked_sub(1)
            .and_then(|i| catalog::OPTIONAL_PRESETS.get(i))
            .ok_or_else(|| {
                format!(
                    "Preset must be between 1 and {}",
                    catalog::OPTIONAL_PRESETS.len()
                )
            })?;
        let key = keys::resolve(key).ok_or_else(|| format!("Unknown key: {key}"))?;
        let mut binding = Binding::new(*command, *description);
        binding.set_key(key);
        self.save_binding(&binding)?;
        Ok(binding)
    }

    pub fn add_fps_binding(&mut self, fps: u32, key: &str) -> Result<Binding, DynError> {
        if fps == 0 {
            return Err("FPS limit must be above zero".into());
        }
        let key = keys::resolve(key).ok_or_else(|| format!("Unknown key: {key}"))?;
        let mut binding = catalog::fps_binding(fps);
        binding.set_key(key);
        self.save_binding(&binding)?;
        Ok(binding)
    }

    /// Remove an optional or FPS binding. Fixed bindings can only be disabled.
    pub fn remove_binding(&mut self, command: &str) -> Result<usize, DynError> {
        let grouped = self
            .bindings()?
            .into_iter()
            .find(|g| g.binding.command().eq_ignore_ascii_case(command.trim()))
            .ok_or_else(|| format!("No binding for command: {command}"))?;
        if !matches!(grouped.group, BindingGroup::Optional | BindingGroup::Fps) {
            return Err(format!(
                "{command} is a {} binding; disable it instead",
                grouped.group.label()
            )
            .into());
        }
        let input_ini = self.catalog.input_ini.clone();
        let removed = grouped.binding.remove(self.store.file_mut(&input_ini)?);
        self.store.flush()?;
        Ok(removed)
    }

    /// Install the selected launch-with mods and uninstall the rest.
    /// The old patch gets no launch-with mods.
    pub fn prepare_launch(&mut self, patch: Patch, selected: &[String]) -> Result<(), DynError> {
        for name in selected {
            if self.catalog.launch_mod(name).is_none() {
                return Err(format!("Unknown launch mod: {name}").into());
            }
        }
        let selected: &[String] = match patch {
            Patch::Latest => selected,
            Patch::Old => {
                if !selected.is_empty() {
                    tracing::warn!("Launch-with mods are not available for the old patch");
                }
                &[]
            }
        };
        let is_selected =
            |name: &str| selected.iter().any(|s| s.eq_ignore_ascii_case(name));

        for m in &self.catalog.launch_mods {
            if !is_selected(m.name()) {
                m.uninstall(&mut self.store)?;
            }
        }
        for m in &self.catalog.launch_mods {
            if is_selected(m.name()) {
                m.install(&mut self.store)?;
            }
        }
        if is_selected(catalog::NO_CPK) {
            self.catalog.sprint_delay.enable(&mut self.store)?;
        }
        self.store.flush()?;
        Ok(())
    }

    /// Start the game. Returns true when the launcher should exit afterwards.
    pub fn launch(&mut self, patch: Patch, selected: &[String]) -> Result<bool, DynError> {
        let old_root = match patch {
            Patch::Latest => None,
            Patch::Old => Some(self.old_patch_root()?),
        };
        self.prepare_launch(patch, selected)?;
        match old_root {
            None => {
                let report = self.catalog.mod_loader.install(&mut self.store)?;
                if !report.is_clean() {
                    tracing::warn!("ModLoader installed with {} failures", report.failed);
                }
                self.store.flush()?;
                std::process::Command::new(self.game.executable())
                    .current_dir(self.game.root())
                    .spawn()
                    .map_err(|e| format!("Error launching Outlast II: {e}"))?;
                tracing::info!("Launching Outlast II...");
            }
            Some(path) => {
                let managed = self.catalog.managed_files();
                old_patch::launch(&self.game, &path, &mut self.store, &managed)?;
            }
        }
        Ok(self.config.launcher.close_on_launch)
    }

    /// The configured or detected old patch folder, checked before anything is changed.
    fn old_patch_root(&mut self) -> Result<PathBuf, DynError> {
        let (path, changed) = old_patch::resolve(&mut self.config, &self.game);
        if changed {
            self.save_config()?;
        }
        let path = path.ok_or(
            "Old Patch not found. Download it with the Steam console \
             (`old-patch steam-command`) or set it with `old-patch set`.",
        )?;
        if !old_patch::is_valid(&path) {
            return Err(format!(
                "Old Patch folder {} is missing or invalid. Set it with `old-patch set`.",
                path.display()
            )
            .into());
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE_NAME;
    use crate::paths::fake_game_dir;
    use std::fs;
    use std::path::Path;

    fn seed_game(root: &Path) -> GameDir {
        let game = fake_game_dir(root);
        fs::write(game.engine_ini(), "[Engine]\nbRelaunchInSteam=true\n").unwrap();
        fs::write(
            game.system_settings_ini(),
            "SyncInterval=1\nUseBorderlessFullscreen=false\n",
        )
        .unwrap();
        fs::write(game.base_engine_ini(), "bPauseOnLossOfFocus=true\n").unwrap();
        fs::write(game.base_input_ini(), "bEnableMouseSmoothing=true\n").unwrap();
        fs::write(game.game_ini(), "StaminaMaxStamina=100\nSprintDelay=2\n").unwrap();
        fs::write(game.input_ini(), "[Engine.PlayerInput]\n").unwrap();

        let mods = root.join("Launcher").join("Mods");
        for name in ["No CPK", "Cutscene Skip", "Speedrun Helper"] {
            fs::create_dir_all(mods.join(name)).unwrap();
            fs::write(mods.join(name).join(format!("{name}.u")), name).unwrap();
        }
        game
    }

    fn open(root: &Path) -> Launcher {
        Launcher::open(seed_game(root), "1.1.4").unwrap()
    }

    fn reopen(root: &Path) -> Launcher {
        Launcher::open(GameDir::new(root).unwrap(), "1.1.4").unwrap()
    }

    /// A valid old patch folder with no executable, so launching fails only at the spawn.
    fn fake_old_patch(root: &Path) {
        for dir in crate::paths::REQUIRED_DIRS {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        fs::write(root.join("Outlast2.bat"), "").unwrap();
    }

    #[test]
    fn first_launch_applies_recommended_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = open(dir.path());

        assert!(dir.path().join(CONFIG_FILE_NAME).exists());
        assert!(dir.path().join("Mods/Speedrun Helper.u").exists());
        let settings = launcher.settings();
        let enabled = |name: &str| {
            settings
                .iter()
                .find(|s| s.name == name)
                .and_then(|s| s.enabled)
        };
        assert_eq!(enabled(catalog::STEAM), Some(false));
        assert_eq!(enabled(catalog::VSYNC), Some(false));
        assert_eq!(enabled(catalog::BORDERLESS), Some(true));
        assert_eq!(enabled(catalog::PAUSE_ON_FOCUS_LOSS), Some(false));
        assert_eq!(enabled(catalog::MOUSE_SMOOTHING), Some(true));
        assert_eq!(
            fs::read_to_string(launcher.game().engine_ini()).unwrap(),
            "[Engine]\nbRelaunchInSteam=false\n"
        );
    }

    #[test]
    fn second_open_skips_first_launch() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = open(dir.path());
        fs::write(launcher.game().engine_ini(), "bRelaunchInSteam=true\n").unwrap();
        let mut again = Launcher::open(GameDir::new(dir.path()).unwrap(), "1.1.4").unwrap();
        let steam = again
            .settings()
            .into_iter()
            .find(|s| s.name == catalog::STEAM)
            .unwrap();
        assert_eq!(steam.enabled, Some(true));
    }

    #[test]
    fn change_setting_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = open(dir.path());
        assert!(launcher.change_setting("mouse smoothing", Change::Toggle).unwrap());
        assert_eq!(
            fs::read_to_string(launcher.game().base_input_ini()).unwrap(),
            "bEnableMouseSmoothing=false\n"
        );
        assert!(!launcher.change_setting("Mouse Smoothing", Change::Disable).unwrap());
        assert!(launcher.change_setting("Gamma", Change::Enable).is_err());
    }

    #[test]
    fn prepare_launch_installs_selection_and_restores_sprint_delay() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = open(dir.path());
        let selected = vec!["No CPK".to_string(), "No Stamina".to_string()];
        launcher.prepare_launch(Patch::Latest, &selected).unwrap();

        assert!(dir.path().join("Mods/No CPK.u").exists());
        assert!(!dir.path().join("Mods/Cutscene Skip.u").exists());
        assert_eq!(
            fs::read_to_string(launcher.game().game_ini()).unwrap(),
            "StaminaMaxStamina=-1\nSprintDelay=2\n"
        );

        launcher
            .prepare_launch(Patch::Latest, &["No Stamina".to_string()])
            .unwrap();
        assert!(!dir.path().join("Mods/No CPK.u").exists());
        assert_eq!(
            fs::read_to_string(launcher.game().game_ini()).unwrap(),
            "StaminaMaxStamina=-1\nSprintDelay=0\n"
        );
    }

    #[test]
    fn prepare_launch_for_old_patch_clears_launch_mods() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = open(dir.path());
        launcher
            .prepare_launch(Patch::Latest, &["Cutscene Skip".to_string()])
            .unwrap();
        assert!(dir.path().join("Mods/Cutscene Skip.u").exists());
        launcher
            .prepare_launch(Patch::Old, &["Cutscene Skip".to_string()])
            .unwrap();
        assert!(!dir.path().join("Mods/Cutscene Skip.u").exists());
    }

    #[test]
    fn prepare_launch_rejects_unknown_mod_before_changes() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = open(dir.path());
        launcher
            .prepare_launch(Patch::Latest, &["No CPK".to_string()])
            .unwrap();
        let err = launcher
            .prepare_launch(Patch::Latest, &["Speedrun Helper".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("Unknown launch mod"));
        assert!(dir.path().join("Mods/No CPK.u").exists());
    }

    #[test]
    fn mods_report_kinds_and_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = open(dir.path());
        let mods = launcher.mods().unwrap();
        let helper = mods.iter().find(|m| m.name == catalog::SPEEDRUN_HELPER).unwrap();
        assert_eq!(helper.kind, ModKind::Display);
        assert!(helper.installed);

        let report = launcher.change_mod("speedrun helper", Change::Disable).unwrap();
        assert_eq!(report.removed, 1);
        assert!(launcher.change_mod("Nope", Change::Toggle).is_err());
    }

    #[test]
    fn bindings_can_be_set_disabled_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = open(dir.path());

        launcher.set_binding_key("BOL ToggleFreeCam", "f1").unwrap();
        launcher.set_binding_disabled("bol togglefreecam", true).unwrap();
        launcher.add_preset(6, "0x4C").unwrap();
        launcher.add_fps_binding(60, "F7").unwrap();

        assert_eq!(
            fs::read_to_string(launcher.game().input_ini()).unwrap(),
            "[Engine.PlayerInput]\n\
             ;-.Bindings=(Name=\"F1\",Command=\"BOL ToggleFreeCam\")\n\
             .Bindings=(Name=\"L\",Command=\"DisplayAll OLHero Location\")\n\
             .Bindings=(Name=\"F7\",Command=\"Set Engine MaxSmoothedFrameRate 60\")\n"
        );

        assert!(launcher.remove_binding("BOL ToggleFreeCam").is_err());
        assert_eq!(launcher.remove_binding("Set Engine MaxSmoothedFrameRate 60").unwrap(), 1);
        assert!(launcher.set_binding_key("BOL ToggleGodMode", "NotAKey").is_err());
        assert!(launcher.set_binding_disabled("BOL ToggleGodMode", true).is_err());
        assert!(launcher.add_preset(0, "F1").is_err());
        assert!(launcher.add_preset(10, "F1").is_err());
    }

    #[test]
    fn settings_report_missing_file_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let game = open(dir.path()).game().clone();
        fs::remove_file(game.base_input_ini()).unwrap();
        let mut launcher = reopen(dir.path());
        let smoothing = launcher
            .settings()
            .into_iter()
            .find(|s| s.name == catalog::MOUSE_SMOOTHING)
            .unwrap();
        assert_eq!(smoothing.enabled, None);
    }

    #[test]
    fn latest_launch_installs_mod_loader() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = open(dir.path());
        let loader = dir.path().join("Mods").join(catalog::MOD_LOADER);
        fs::create_dir_all(&loader).unwrap();
        fs::write(loader.join("ModLoader.dll"), "loader").unwrap();

        // The fake folder has no Outlast2.exe, so the spawn fails after the install.
        let err = launcher.launch(Patch::Latest, &[]).unwrap_err();
        assert!(err.to_string().contains("Error launching"));
        assert_eq!(
            fs::read_to_string(dir.path().join("Binaries/Win64/ModLoader.dll")).unwrap(),
            "loader"
        );
    }

    #[test]
    fn old_launch_syncs_changes_made_in_earlier_runs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("game");
        let old = dir.path().join("old");
        fake_old_patch(&old);
        {
            let mut first = open(&root);
            first.set_binding_key("BOL ToggleFreeCam", "F1").unwrap();
        }

        let mut launcher = reopen(&root);
        launcher.config_mut().old_patch.path = old.display().to_string();
        let err = launcher.launch(Patch::Old, &[]).unwrap_err();
        assert!(err.to_string().contains("Error launching"));

        let game = launcher.game().clone();
        for (source, relative) in [
            (game.system_settings_ini(), "OLGame/Config/DefaultSystemSettings.ini"),
            (game.input_ini(), "OLGame/Config/DefaultInput.ini"),
            (game.base_engine_ini(), "Engine/Config/BaseEngine.ini"),
            (game.base_input_ini(), "Engine/Config/BaseInput.ini"),
            (game.game_ini(), "OLGame/Config/DefaultGame.ini"),
        ] {
            assert_eq!(
                fs::read_to_string(old.join(relative)).unwrap(),
                fs::read_to_string(source).unwrap(),
                "{relative} not synced"
            );
        }
        assert!(
            fs::read_to_string(old.join("OLGame/Config/DefaultInput.ini"))
                .unwrap()
                .contains("Command=\"BOL ToggleFreeCam\"")
        );
        assert_eq!(
            fs::read_to_string(old.join("OLGame/Config/DefaultEngine.ini")).unwrap(),
            "[Engine]\nbRelaunchInSteam=false\n"
        );
    }

    #[test]
    fn old_launch_without_valid_folder_leaves_install_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = open(dir.path());
        launcher
            .prepare_launch(Patch::Latest, &["Cutscene Skip".to_string()])
            .unwrap();
        assert!(dir.path().join("Mods/Cutscene Skip.u").exists());

        assert!(launcher.launch(Patch::Old, &[]).is_err());
        assert!(dir.path().join("Mods/Cutscene Skip.u").exists());

        launcher.config_mut().old_patch.path = dir.path().join("nowhere").display().to_string();
        let err = launcher.launch(Patch::Old, &[]).unwrap_err();
        assert!(err.to_string().contains("missing or invalid"));
        assert!(dir.path().join("Mods/Cutscene Skip.u").exists());
    }
}
