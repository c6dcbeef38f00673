// ABOUTME: The launcher's fixed content: displayed settings, internal stamina settings, bindings, and mods.
// ABOUTME: Everything here is bound to concrete files inside one game folder.

use std::path::PathBuf;

use ol2launch_ini::{Binding, ConfigFile, IniError, Setting};

use crate::config::Config;
use crate::mods::{Mod, ModEntry, ModFiles, ReplacementMod};
use crate::paths::GameDir;
use crate::store::FileSetting;

pub const STEAM: &str = "Launch with Steam";
pub const VSYNC: &str = "Vsync";
pub const BORDERLESS: &str = "Borderless Windowed";
pub const PAUSE_ON_FOCUS_LOSS: &str = "Pause on Loss of Focus";
pub const MOUSE_SMOOTHING: &str = "Mouse Smoothing";

pub const NO_CPK: &str = "No CPK";
pub const NO_STAMINA: &str = "No Stamina";
pub const CUTSCENE_SKIP: &str = "Cutscene Skip";
pub const SPEEDRUN_HELPER: &str = "Speedrun Helper";
pub const MOD_LOADER: &str = "ModLoader";

pub const FPS_COMMAND_PREFIX: &str = "Set Engine MaxSmoothedFrameRate";

/// Bindings offered on demand, as `(command, description)`.
pub const OPTIONAL_PRESETS: &[(&str, &str)] = &[
    ("Set OLGame CurrentCheckpointName None", "Set Checkpoint to None"),
    ("Set OLHero StaminaMaxStamina -1", "Enable Infinite Stamina"),
    (
        "Set OLHero StaminaMaxStamina -1 | Set OLHero SprintDelay 0",
        "Enable No Stamina Settings",
    ),
    (
        "Set OLHero StaminaMaxStamina 100 | Set OLHero SprintDelay 2",
        "Disable No Stamina Settings",
    ),
    (
        "DisplayAll OLHero StaminaMaxStamina | Displayall OLHero SprintDelay",
        "Show Stamina/SprintDelay",
    ),
    ("DisplayAll OLHero Location", "Show Location"),
    ("DisplayAll OLHero Velocity", "Show Velocity"),
    ("nxvis collision", "Show Collision"),
    (
        "Set OLGame CurrentCheckpointName None | StreamMap minefacility_persistent",
        "Judges Skip",
    ),
];

const MISC_BINDINGS: &[(&str, &str)] = &[
    ("DisplayAll OLHero Rotation", "Show Rotation"),
    ("Set OLGame DifficultyMode EDMO_Insane", "Set Difficulty to Insane"),
];

const SPEEDRUN_HELPER_BINDINGS: &[(&str, &str)] = &[
    ("BOL ToggleFreeCam", "Toggle Freecam"),
    ("BOL TeleportToFreeCam", "Teleport to Freecam"),
    ("BOL ToggleGodMode", "Toggle GodMode"),
];

const SPEEDRUN_HELPER_TOOLTIP: &str = "Speedrun Helper allows you to:\n\
    Set Checkpoints with Ctrl + F1-F4, and TP to them with F1-F4.\n\
    Use the commands Toggle Freecam, TP to Freecam and GodMode.\n\
    You can setup the bindings for Speedrun Helper commands with the launcher.";

/// A game setting shown to the user.
#[derive(Debug, Clone)]
pub struct DisplaySetting {
    pub setting: FileSetting,
    pub tooltip: &'static str,
}

impl DisplaySetting {
    pub fn name(&self) -> &str {
        self.setting.name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingGroup {
    Misc,
    SpeedrunHelper,
    Optional,
    Fps,
}

impl BindingGroup {
    pub fn label(self) -> &'static str {
        match self {
            BindingGroup::Misc => "Misc",
            BindingGroup::SpeedrunHelper => "Speedrun Helper",
            BindingGroup::Optional => "Optional",
            BindingGroup::Fps => "FPS Limit",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroupedBinding {
    pub group: BindingGroup,
    pub binding: Binding,
}

/// Binding that caps the frame rate at `fps`.
pub fn fps_binding(fps: u32) -> Binding {
    Binding::new(
        format!("{FPS_COMMAND_PREFIX} {fps}"),
        format!("Limit FPS to {fps}"),
    )
}

/// The FPS value of a frame-rate binding command, if it is one.
/// Only the form `fps_binding` writes is accepted: one space, then the plain number.
pub fn fps_value(command: &str) -> Option<u32> {
    let command = command.trim();
    let prefix = command.get(..FPS_COMMAND_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(FPS_COMMAND_PREFIX) {
        return None;
    }
    let digits = command[FPS_COMMAND_PREFIX.len()..].strip_prefix(' ')?;
    let fps: u32 = digits.parse().ok()?;
    (fps.to_string() == digits).then_some(fps)
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub display_settings: Vec<DisplaySetting>,
    /// Restores the sprint delay that "No Stamina" zeroes.
    pub sprint_delay: FileSetting,
    pub mod_loader: Mod,
    /// Chosen per launch.
    pub launch_mods: Vec<Mod>,
    /// Installed and removed explicitly by the user.
    pub display_mods: Vec<ModEntry>,
    pub game_ini: PathBuf,
    pub input_ini: PathBuf,
}

impl Catalog {
    pub fn new(game: &GameDir, config: &Config) -> Result<Self, IniError> {
        let game_ini = game.game_ini();
        let system_settings = game.system_settings_ini();
        let mods_source = game.resolve(&config.launcher.mods_source);

        let display_settings = vec![
            DisplaySetting {
                setting: FileSetting::new(
                    Setting::boolean(STEAM, "bRelaunchInSteam=")?,
                    game.engine_ini(),
                ),
                tooltip: "Launches the game with Steam.\nDisabled is recommended.",
            },
            DisplaySetting {
                setting: FileSetting::new(
                    Setting::new(VSYNC, "SyncInterval=", "1", "0")?,
                    &system_settings,
                ),
                tooltip: "Enabling Vsync renders max framerate changes impossible.\n\
                          Disabled is recommended",
            },
            DisplaySetting {
                setting: FileSetting::new(
                    Setting::boolean(BORDERLESS, "UseBorderlessFullscreen=")?,
                    &system_settings,
                ),
                tooltip: "Enables Borderless Windowed.\n\
                          Recommended for less laggy alt tabs and to see your livesplit.",
            },
            DisplaySetting {
                setting: FileSetting::new(
                    Setting::boolean(PAUSE_ON_FOCUS_LOSS, "bPauseOnLossOfFocus=")?,
                    game.base_engine_ini(),
                ),
                tooltip: "If disabled, game will not be paused during alt tabs.",
            },
            DisplaySetting {
                setting: FileSetting::new(
                    Setting::boolean(MOUSE_SMOOTHING, "bEnableMouseSmoothing=")?,
                    game.base_input_ini(),
                ),
                tooltip: "Changes how the mouse input is processed. Normally enabled by default",
            },
        ];

        let stamina_off = FileSetting::new(
            Setting::new("StaminaOff", "StaminaMaxStamina=", "-1", "100")?,
            &game_ini,
        );
        let sprint_delay_off = FileSetting::new(
            Setting::new("SprintDelayOff", "SprintDelay=", "0", "2")?,
            &game_ini,
        );
        let sprint_delay = FileSetting::new(
            Setting::new("SprintDelay", "SprintDelay=", "2", "0")?,
            &game_ini,
        );

        let into_mods = |name: &str| ModFiles {
            source: mods_source.join(name),
            install: game.mods_dir(),
        };

        let mod_loader = Mod::new(
            MOD_LOADER,
            Some(ModFiles {
                source: game.mods_dir().join(MOD_LOADER),
                install: game.win64_dir(),
            }),
            Vec::new(),
        );

        let launch_mods = vec![
            Mod::new(NO_CPK, Some(into_mods(NO_CPK)), Vec::new())
                .with_description("Disables checkpoint killing."),
            Mod::new(
                NO_STAMINA,
                None,
                vec![stamina_off, sprint_delay_off],
            )
            .with_description("Disables stamina, and sprint delay unless No CPK is selected."),
            Mod::new(CUTSCENE_SKIP, Some(into_mods(CUTSCENE_SKIP)), Vec::new())
                .with_description("Allows you to skip cutscenes with S+Q."),
        ];

        let mut display_mods = vec![ModEntry::Files(
            Mod::new(SPEEDRUN_HELPER, Some(into_mods(SPEEDRUN_HELPER)), Vec::new())
                .with_description(SPEEDRUN_HELPER_TOOLTIP),
        )];
        for custom in &config.custom_mods {
            let source = game.resolve(&custom.source);
            let install = game.resolve(&custom.install);
            let entry = match &custom.original {
                Some(original) => ModEntry::Replacement(
                    ReplacementMod::new(
                        &custom.name,
                        source,
                        game.resolve(original),
                        install,
                        Vec::new(),
                    )
                    .with_description(&custom.description),
                ),
                None => ModEntry::Files(
                    Mod::new(&custom.name, Some(ModFiles { source, install }), Vec::new())
                        .with_description(&custom.description),
                ),
            };
            display_mods.push(entry);
        }

        Ok(Self {
            display_settings,
            sprint_delay,
            mod_loader,
            launch_mods,
            display_mods,
            game_ini,
            input_ini: game.input_ini(),
        })
    }

    /// Every config file the launcher edits, each listed once.
    pub fn managed_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .display_settings
            .iter()
            .map(|entry| entry.setting.file.clone())
            .collect();
        files.push(self.game_ini.clone());
        files.push(self.input_ini.clone());
        files.sort();
        files.dedup();
        files
    }

    pub fn display_setting(&self, name: &str) -> Option<&DisplaySetting> {
        self.display_settings
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }

    pub fn launch_mod(&self, name: &str) -> Option<&Mod> {
        self.launch_mods
            .iter()
            .find(|m| m.name().eq_ignore_ascii_case(name))
    }

    pub fn display_mod(&self, name: &str) -> Option<&ModEntry> {
        self.display_mods
            .iter()
            .find(|m| m.name().eq_ignore_ascii_case(name))
    }

    /// Every binding worth showing: the fixed ones, any optional presets already in the
    /// file, and every frame-rate binding the file contains.
    pub fn load_bindings(&self, input: &ConfigFile) -> Vec<GroupedBinding> {
        let fixed = MISC_BINDINGS
            .iter()
            .map(|entry| (BindingGroup::Misc, entry))
            .chain(
                SPEEDRUN_HELPER_BINDINGS
                    .iter()
                    .map(|entry| (BindingGroup::SpeedrunHelper, entry)),
            );

        let mut bindings: Vec<GroupedBinding> = fixed
            .map(|(group, (command, description))| {
                let mut binding = Binding::new(*command, *description);
                binding.load(input);
                GroupedBinding { group, binding }
            })
            .collect();

        for (command, description) in OPTIONAL_PRESETS {
            let mut binding = Binding::new(*command, *description);
            binding.load(input);
            if binding.key().is_some() {
                bindings.push(GroupedBinding {
                    group: BindingGroup::Optional,
                    binding,
                });
            }
        }

        let mut fps_values: Vec<u32> = input
            .find_lines(&[".Bindings=(", FPS_COMMAND_PREFIX])
            .into_iter()
            .filter_map(Binding::parse_line)
            .filter_map(|parsed| fps_value(&parsed.command))
            .collect();
        fps_values.sort_unstable();
        fps_values.dedup();
        for fps in fps_values {
            let mut binding = fps_binding(fps);
            binding.load(input);
            bindings.push(GroupedBinding {
                group: BindingGroup::Fps,
                binding,
            });
        }

        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CustomModConfig;
    use crate::paths::fake_game_dir;

    #[test]
    fn catalog_binds_settings_to_game_files() {
        let dir = tempfile::tempdir().unwrap();
        let game = fake_game_dir(dir.path());
        let catalog = Catalog::new(&game, &Config::default()).unwrap();

        let steam = catalog.display_setting("launch with steam").unwrap();
        assert_eq!(steam.setting.file, game.engine_ini());
        let borderless = catalog.display_setting(BORDERLESS).unwrap();
        assert_eq!(borderless.setting.file, game.system_settings_ini());
        assert_eq!(catalog.display_settings.len(), 5);
        assert!(catalog.display_setting("Fullscreen").is_none());
    }

    #[test]
    fn mods_source_resolves_against_game_root() {
        let dir = tempfile::tempdir().unwrap();
        let game = fake_game_dir(dir.path());
        let catalog = Catalog::new(&game, &Config::default()).unwrap();
        let no_cpk = catalog.launch_mod(NO_CPK).unwrap().files().unwrap();
        assert_eq!(no_cpk.source, dir.path().join("Launcher/Mods/No CPK"));
        assert_eq!(no_cpk.install, game.mods_dir());
        assert!(catalog.launch_mod(NO_STAMINA).unwrap().files().is_none());
    }

    #[test]
    fn custom_mods_become_display_mods() {
        let dir = tempfile::tempdir().unwrap();
        let game = fake_game_dir(dir.path());
        let mut config = Config::default();
        config.custom_mods.push(CustomModConfig {
            name: "Retexture".into(),
            source: "Launcher/Retexture".into(),
            install: "OLGame/CookedPCConsole".into(),
            original: Some("Launcher/Retexture.orig".into()),
            description: String::new(),
        });
        config.custom_mods.push(CustomModConfig {
            name: "Extra".into(),
            source: "Launcher/Extra".into(),
            install: "Mods".into(),
            original: None,
            description: "extra files".into(),
        });
        let catalog = Catalog::new(&game, &config).unwrap();
        assert!(matches!(catalog.display_mod("retexture"), Some(ModEntry::Replacement(_))));
        assert!(matches!(catalog.display_mod("Extra"), Some(ModEntry::Files(_))));
        assert!(catalog.display_mod(SPEEDRUN_HELPER).is_some());
    }

    #[test]
    fn fps_value_parses_only_frame_rate_commands() {
        assert_eq!(fps_value("Set Engine MaxSmoothedFrameRate 60"), Some(60));
        assert_eq!(fps_value("set engine maxsmoothedframerate 144"), Some(144));
        assert_eq!(fps_value("Set Engine MaxSmoothedFrameRate"), None);
        assert_eq!(fps_value("BOL ToggleGodMode"), None);
    }

    #[test]
    fn fps_value_rejects_forms_fps_binding_would_not_write() {
        assert_eq!(fps_value("Set Engine MaxSmoothedFrameRate60"), None);
        assert_eq!(fps_value("Set Engine MaxSmoothedFrameRate 060"), None);
        assert_eq!(fps_value("Set Engine MaxSmoothedFrameRate  60"), None);
        assert_eq!(fps_value("Set Engine MaxSmoothedFrameRate +60"), None);
        let command = fps_binding(60).command().to_string();
        assert_eq!(fps_value(&command), Some(60));
    }

    #[test]
    fn managed_files_cover_settings_game_and_input() {
        let dir = tempfile::tempdir().unwrap();
        let game = fake_game_dir(dir.path());
        let catalog = Catalog::new(&game, &Config::default()).unwrap();
        let files = catalog.managed_files();
        assert_eq!(files.len(), 6);
        for path in [
            game.engine_ini(),
            game.system_settings_ini(),
            game.base_engine_ini(),
            game.base_input_ini(),
            game.game_ini(),
            game.input_ini(),
        ] {
            assert!(files.contains(&path), "{} not managed", path.display());
        }
    }

    #[test]
    fn load_bindings_includes_present_presets_and_fps() {
        let dir = tempfile::tempdir().unwrap();
        let game = fake_game_dir(dir.path());
        let catalog = Catalog::new(&game, &Config::default()).unwrap();
        let input = ConfigFile::parse(
            game.input_ini(),
            "[Engine.PlayerInput]\n\
             .Bindings=(Name=\"F1\",Command=\"BOL ToggleFreeCam\")\n\
             .Bindings=(Name=\"L\",Command=\"DisplayAll OLHero Location\")\n\
             ;-.Bindings=(Name=\"F7\",Command=\"Set Engine MaxSmoothedFrameRate 60\")\n\
             .Bindings=(Name=\"F8\",Command=\"Set Engine MaxSmoothedFrameRate 30\")\n",
        );
        let bindings = catalog.load_bindings(&input);

        let fixed = bindings
            .iter()
            .filter(|b| matches!(b.group, BindingGroup::Misc | BindingGroup::SpeedrunHelper))
            .count();
        assert_eq!(fixed, 5);

        let optional: Vec<_> = bindings
            .iter()
            .filter(|b| b.group == BindingGroup::Optional)
            .map(|b| b.binding.description())
            .collect();
        assert_eq!(optional, vec!["Show Location"]);

        let fps: Vec<_> = bindings.iter().filter(|b| b.group == BindingGroup::Fps).collect();
        assert_eq!(fps.len(), 2);
        assert_eq!(fps[0].binding.command(), "Set Engine MaxSmoothedFrameRate 30");
        assert_eq!(fps[1].binding.key(), Some("F7"));
        assert!(fps[1].binding.is_disabled());
    }
}
