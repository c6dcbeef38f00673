// ABOUTME: Locates and launches the May 2017 "old patch" install that Steam downloads as a depot.
// ABOUTME: Mirrors the launcher's config edits into it before starting, with Steam relaunch turned off.

use std::path::{Path, PathBuf};

use ol2launch_ini::{ConfigFile, IniError, Setting};

use crate::config::Config;
use crate::paths::{self, GameDir};
use crate::store::ConfigStore;

type DynError = Box<dyn std::error::Error + Send + Sync>;

pub const APP_ID: u32 = 414700;
pub const DEPOT_ID: u32 = 414701;
/// Manifest from 10 May 2017.
pub const MANIFEST_ID: u64 = 7085410466650398118;

pub const STEAM_CONSOLE_URI: &str = "steam://open/console";

/// Command to paste into the Steam console to fetch the old patch.
pub fn steam_download_command() -> String {
    format!("download_depot {APP_ID} {DEPOT_ID} {MANIFEST_ID}")
}

/// Structured like an Outlast II folder, with the launch script the depot ships.
pub fn is_valid(path: &Path) -> bool {
    path.is_dir() && path.join("Outlast2.bat").is_file() && paths::missing_dirs(path).is_empty()
}

/// Where `download_depot` puts the files, relative to `steamapps/common/Outlast 2`.
pub fn default_location(game: &GameDir) -> Option<PathBuf> {
    let steamapps = game.root().parent()?.parent()?;
    Some(
        steamapps
            .join("content")
            .join(format!("app_{APP_ID}"))
            .join(format!("depot_{DEPOT_ID}")),
    )
}

pub fn detect(game: &GameDir) -> Option<PathBuf> {
    default_location(game).filter(|path| is_valid(path))
}

/// The configured path, or a detected one which is then stored in `config`.
/// Returns true in the second element when `config` changed.
pub fn resolve(config: &mut Config, game: &GameDir) -> (Option<PathBuf>, bool) {
    if !config.old_patch.path.is_empty() {
        return (Some(PathBuf::from(&config.old_patch.path)), false);
    }
    match detect(game) {
        Some(found) => {
            tracing::info!("Detected old patch at {}", found.display());
            config.old_patch.path = found.display().to_string();
            (Some(found), true)
        }
        None => (None, false),
    }
}

pub fn set_path(config: &mut Config, path: &Path) -> Result<(), DynError> {
    if !is_valid(path) {
        return Err(format!("{} is not a valid Old Patch folder.", path.display()).into());
    }
    config.old_patch.path = path.display().to_string();
    tracing::info!("Old Patch path saved: {}", path.display());
    Ok(())
}

/// Copy `managed` and every other config file the store has opened into the same place
/// under `old_root`. Managed files missing from the game folder are skipped.
/// Returns how many target files were written.
pub fn sync_from(
    game: &GameDir,
    store: &mut ConfigStore,
    managed: &[PathBuf],
    old_root: &Path,
) -> Result<usize, DynError> {
    for path in managed {
        match store.file(path) {
            Ok(_) => {}
            Err(IniError::NotFound(_)) => {
                tracing::debug!("Not syncing {} (missing)", path.display());
            }
            Err(e) => return Err(e.into()),
        }
    }
    let touched: Vec<PathBuf> = store.paths().map(Path::to_path_buf).collect();
    let mut synced = 0;
    for path in touched {
        let Some(relative) = game.relative(&path) else {
            tracing::debug!("Not syncing {} (outside the game folder)", path.display());
            continue;
        };
        let target_path = old_root.join(relative);
        let mut target = match ConfigFile::open(&target_path) {
            Ok(file) => file,
            Err(IniError::NotFound(_)) => ConfigFile::empty(&target_path),
            Err(e) => return Err(e.into()),
        };
        store.file(&path)?.copy_to(&mut target);
        if target.save()? {
            tracing::info!("Synced {}", relative.display());
            synced += 1;
        }
    }
    Ok(synced)
}

/// Sync config files, force Steam relaunch off, and start the old patch executable.
pub fn launch(
    game: &GameDir,
    old_root: &Path,
    store: &mut ConfigStore,
    managed: &[PathBuf],
) -> Result<(), DynError> {
    if !is_valid(old_root) {
        return Err(format!(
            "Old Patch folder {} is missing or invalid. Set it with `old-patch set`.",
            old_root.display()
        )
        .into());
    }

    sync_from(game, store, managed, old_root)?;

    let engine_ini = old_root.join("OLGame").join("Config").join("DefaultEngine.ini");
    let mut engine = ConfigFile::open(&engine_ini)?;
    Setting::boolean("Launch with Steam", "bRelaunchInSteam=")?.disable(&mut engine);
    engine.save()?;

    let win64 = old_root.join("Binaries").join("Win64");
    std::process::Command::new(win64.join("Outlast2.exe"))
        .current_dir(&win64)
        .spawn()
        .map_err(|e| format!("Error launching Outlast II (old patch): {e}"))?;
    tracing::info!("Launching Outlast II (old patch)...");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::fake_game_dir;
    use crate::store::FileSetting;

    fn fake_old_patch(root: &Path) {
        for dir in paths::REQUIRED_DIRS {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        std::fs::write(root.join("Outlast2.bat"), "").unwrap();
    }

    /// `<tmp>/steamapps/common/Outlast 2` as the game folder.
    fn steam_layout(tmp: &Path) -> GameDir {
        fake_game_dir(&tmp.join("steamapps").join("common").join("Outlast 2"))
    }

    #[test]
    fn download_command_uses_depot_ids() {
        assert_eq!(
            steam_download_command(),
            "download_depot 414700 414701 7085410466650398118"
        );
    }

    #[test]
    fn is_valid_requires_bat_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_valid(dir.path()));
        fake_old_patch(dir.path());
        assert!(is_valid(dir.path()));
        std::fs::remove_file(dir.path().join("Outlast2.bat")).unwrap();
        assert!(!is_valid(dir.path()));
    }

    #[test]
    fn resolve_detects_depot_and_stores_it() {
        let dir = tempfile::tempdir().unwrap();
        let game = steam_layout(dir.path());
        let depot = dir.path().join("steamapps/content/app_414700/depot_414701");
        let mut config = Config::default();

        assert_eq!(resolve(&mut config, &game), (None, false));

        fake_old_patch(&depot);
        let (found, changed) = resolve(&mut config, &game);
        assert_eq!(found, Some(depot.clone()));
        assert!(changed);
        assert_eq!(config.old_patch.path, depot.display().to_string());
        assert_eq!(resolve(&mut config, &game), (Some(depot), false));
    }

    #[test]
    fn set_path_rejects_invalid_folder() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        assert!(set_path(&mut config, dir.path()).is_err());
        assert!(config.old_patch.path.is_empty());
        fake_old_patch(dir.path());
        set_path(&mut config, dir.path()).unwrap();
        assert_eq!(config.old_patch.path, dir.path().display().to_string());
    }

    #[test]
    fn sync_copies_touched_files_to_same_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let game = fake_game_dir(&dir.path().join("game"));
        let old = dir.path().join("old");
        fake_old_patch(&old);
        std::fs::write(game.system_settings_ini(), "SyncInterval=1\n").unwrap();

        let mut store = ConfigStore::new();
        let vsync = FileSetting::new(
            Setting::new("Vsync", "SyncInterval=", "1", "0").unwrap(),
            game.system_settings_ini(),
        );
        vsync.disable(&mut store).unwrap();

        assert_eq!(sync_from(&game, &mut store, &[], &old).unwrap(), 1);
        assert_eq!(
            std::fs::read_to_string(old.join("OLGame/Config/DefaultSystemSettings.ini")).unwrap(),
            "SyncInterval=0\n"
        );
        assert_eq!(sync_from(&game, &mut store, &[], &old).unwrap(), 0);
    }

    #[test]
    fn sync_copies_managed_files_not_yet_opened() {
        let dir = tempfile::tempdir().unwrap();
        let game = fake_game_dir(&dir.path().join("game"));
        let old = dir.path().join("old");
        fake_old_patch(&old);
        std::fs::write(game.input_ini(), "[Engine.PlayerInput]\n").unwrap();
        std::fs::write(old.join("OLGame/Config/DefaultInput.ini"), "stale\n").unwrap();

        let mut store = ConfigStore::new();
        let managed = [game.input_ini(), game.game_ini()];
        assert_eq!(sync_from(&game, &mut store, &managed, &old).unwrap(), 1);
        assert_eq!(
            std::fs::read_to_string(old.join("OLGame/Config/DefaultInput.ini")).unwrap(),
            "[Engine.PlayerInput]\n"
        );
        assert!(!old.join("OLGame/Config/DefaultGame.ini").exists());
    }

    #[test]
    fn launch_turns_steam_relaunch_off_in_old_patch() {
        let dir = tempfile::tempdir().unwrap();
        let game = fake_game_dir(&dir.path().join("game"));
        let old = dir.path().join("old");
        fake_old_patch(&old);
        let engine_ini = old.join("OLGame/Config/DefaultEngine.ini");
        std::fs::create_dir_all(engine_ini.parent().unwrap()).unwrap();
        std::fs::write(&engine_ini, "[Engine]\nbRelaunchInSteam=true\n").unwrap();

        let mut store = ConfigStore::new();
        // No Outlast2.exe in the fake folder, so only the spawn fails.
        let err = launch(&game, &old, &mut store, &[]).unwrap_err();
        assert!(err.to_string().contains("Error launching"));
        assert_eq!(
            std::fs::read_to_string(&engine_ini).unwrap(),
            "[Engine]\nbRelaunchInSteam=false\n"
        );
    }

    #[test]
    fn launch_rejects_invalid_folder_before_touching_anything() {
        let dir = tempfile::tempdir().unwrap();
        let game = fake_game_dir(&dir.path().join("game"));
        let mut store = ConfigStore::new();
        let err = launch(&game, &dir.path().join("missing"), &mut store, &[]).unwrap_err();
        assert!(err.to_string().contains("invalid"));
    }
}
