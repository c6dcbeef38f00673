// ABOUTME: Command-line front end: argument definitions and the dispatch for each subcommand.
// ABOUTME: Prints listings to stdout; progress and diagnostics go through tracing to stderr.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::catalog;
use crate::keys;
use crate::launcher::{Change, Launcher, ModKind, Patch};
use crate::mods::InstallReport;
use crate::old_patch;
use crate::paths::GameDir;
use crate::update::{self, UpdateCheck, Updater};

type DynError = Box<dyn std::error::Error + Send + Sync>;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "ol2launch", version, about = "Better Outlast II Launcher")]
pub struct Cli {
    /// Outlast II install folder. Defaults to the current directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub game_dir: Option<PathBuf>,

    /// Skip confirmations and run non-interactively.
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show settings, mods, and the old patch location.
    Status,
    /// Game settings.
    Settings {
        #[command(subcommand)]
        action: Option<ToggleAction>,
    },
    /// Mods installed from the launcher's mod folder.
    Mods {
        #[command(subcommand)]
        action: Option<ToggleAction>,
    },
    /// Console command key bindings.
    Bindings {
        #[command(subcommand)]
        action: Option<BindingsAction>,
    },
    /// Start the game.
    Launch {
        /// Launch the May 2017 patch instead of the latest one.
        #[arg(long)]
        old_patch: bool,
        /// Launch-with mod to enable for this run. Repeatable.
        #[arg(long = "with", value_name = "MOD")]
        with: Vec<String>,
    },
    /// Locate or download the old patch.
    OldPatch {
        #[command(subcommand)]
        action: Option<OldPatchAction>,
    },
    /// Launcher configuration.
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
    /// Check for and install a newer launcher.
    Update {
        #[arg(long)]
        check_only: bool,
    },
}

#[derive(Subcommand)]
pub enum ToggleAction {
    List,
    Enable { name: String },
    Disable { name: String },
    Toggle { name: String },
}

#[derive(Subcommand)]
pub enum BindingsAction {
    List,
    /// Bind a command to a key (name or hex virtual-key code).
    Set { command: String, key: String },
    Enable { command: String },
    Disable { command: String },
    /// List the optional presets.
    Presets,
    /// Add optional preset NUMBER bound to KEY.
    AddPreset { number: usize, key: String },
    /// Remove an optional or FPS binding.
    Remove { command: String },
    /// Add a binding that limits the frame rate.
    AddFps { fps: u32, key: String },
    /// List accepted key names.
    Keys,
}

#[derive(Subcommand)]
pub enum OldPatchAction {
    Show,
    Set { path: PathBuf },
    Detect,
    /// Print the Steam console command that downloads the old patch.
    SteamCommand,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    Show,
    Set { key: String, value: String },
}

pub async fn run(cli: Cli) -> Result<(), DynError> {
    let root = match cli.game_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let game = GameDir::new(root)?;
    let mut launcher = Launcher::open(game, VERSION)?;

    if update::record_version(launcher.config_mut(), VERSION) {
        println!("Launcher updated to {VERSION}.");
    }
    launcher.save_config()?;
    if let Ok(exe) = std::env::current_exe() {
        update::cleanup_previous(&exe);
    }

    match cli.command.unwrap_or(Command::Status) {
        Command::Status => {
            notify_update(&launcher).await;
            print_status(&mut launcher)?;
        }
        Command::Settings { action } => {
            settings(&mut launcher, action.unwrap_or(ToggleAction::List))?
        }
        Command::Mods { action } => mods(&mut launcher, action.unwrap_or(ToggleAction::List))?,
        Command::Bindings { action } => {
            bindings(&mut launcher, action.unwrap_or(BindingsAction::List))?
        }
        Command::Launch { old_patch, with } => {
            notify_update(&launcher).await;
            let patch = if old_patch { Patch::Old } else { Patch::Latest };
            let close = launcher.launch(patch, &with)?;
            if !close && !cli.yes {
                wait_for_enter()?;
            }
        }
        Command::OldPatch { action } => {
            old_patch_command(&mut launcher, action.unwrap_or(OldPatchAction::Show))?
        }
        Command::Config { action } => {
            config_command(&mut launcher, action.unwrap_or(ConfigAction::Show))?
        }
        Command::Update { check_only } => update_command(&launcher, check_only, cli.yes).await?,
    }
    Ok(())
}

fn on_off(enabled: Option<bool>) -> &'static str {
    match enabled {
        Some(true) => "on",
        Some(false) => "off",
        None => "missing",
    }
}

fn print_status(launcher: &mut Launcher) -> Result<(), DynError> {
    println!("Better Outlast II Launcher {}", launcher.version());
    println!("Game folder: {}", launcher.game().root().display());
    let old = &launcher.config().old_patch.path;
    println!(
        "Old patch:   {}",
        if old.is_empty() { "No path defined" } else { old.as_str() }
    );
    println!();
    print_settings(launcher);
    println!();
    print_mods(launcher, false)?;
    Ok(())
}

fn print_settings(launcher: &mut Launcher) {
    println!("Settings:");
    for status in launcher.settings() {
        println!("  [{:>7}] {}", on_off(status.enabled), status.name);
    }
}

fn print_mods(launcher: &mut Launcher, descriptions: bool) -> Result<(), DynError> {
    println!("Mods:");
    for status in launcher.mods()? {
        let kind = match status.kind {
            ModKind::LaunchWith => "launch-with",
            ModKind::Display => "installed",
        };
        println!(
            "  [{:>7}] {} ({kind})",
            on_off(Some(status.installed)),
            status.name
        );
        if descriptions && !status.description.is_empty() {
            println!("            {}", status.description.replace('\n', "\n            "));
        }
    }
    Ok(())
}

fn report(name: &str, report: &InstallReport) {
    println!(
        "{name}: {} copied, {} removed, {} settings changed",
        report.copied, report.removed, report.settings_changed
    );
    if !report.is_clean() {
        println!("  {} files failed; see the log above", report.failed);
    }
}

fn change_of(action: &ToggleAction) -> Option<(Change, &str)> {
    match action {
        ToggleAction::List => None,
        ToggleAction::Enable { name } => Some((Change::Enable, name.as_str())),
        ToggleAction::Disable { name } => Some((Change::Disable, name.as_str())),
        ToggleAction::Toggle { name } => Some((Change::Toggle, name.as_str())),
    }
}

fn settings(launcher: &mut Launcher, action: ToggleAction) -> Result<(), DynError> {
    match change_of(&action) {
        None => {
            for status in launcher.settings() {
                println!("[{:>7}] {}", on_off(status.enabled), status.name);
                println!("          {}", status.tooltip.replace('\n', "\n          "));
            }
        }
        Some((change, name)) => {
            if launcher.change_setting(name, change)? {
                println!("{name} updated.");
            } else {
                println!("{name} unchanged.");
            }
        }
    }
    Ok(())
}

fn mods(launcher: &mut Launcher, action: ToggleAction) -> Result<(), DynError> {
    match change_of(&action) {
        None => {
            print_mods(launcher, true)?;
            println!();
            println!("Launch-with mods are applied with `launch --with MOD`.");
        }
        Some((change, name)) => {
            let result = launcher.change_mod(name, change)?;
            report(name, &result);
        }
    }
    Ok(())
}

fn bindings(launcher: &mut Launcher, action: BindingsAction) -> Result<(), DynError> {
    match action {
        BindingsAction::List => {
            let mut group = None;
            for grouped in launcher.bindings()? {
                if group != Some(grouped.group) {
                    println!("{}:", grouped.group.label());
                    group = Some(grouped.group);
                }
                let b = &grouped.binding;
                let state = if b.is_disabled() { "disabled" } else { "enabled" };
                println!(
                    "  {:<28} {:<18} {state:<8} {}",
                    b.description(),
                    b.key().unwrap_or("-"),
                    b.command()
                );
            }
        }
        BindingsAction::Set { command, key } => {
            let b = launcher.set_binding_key(&command, &key)?;
            println!("{} bound to {}.", b.command(), b.key().unwrap_or_default());
        }
        BindingsAction::Enable { command } => {
            launcher.set_binding_disabled(&command, false)?;
            println!("{command} enabled.");
        }
        BindingsAction::Disable { command } => {
            launcher.set_binding_disabled(&command, true)?;
            println!("{command} disabled.");
        }
        BindingsAction::Presets => {
            for (i, (command, description)) in catalog::OPTIONAL_PRESETS.iter().enumerate() {
                println!("{:>2}. {description:<28} {command}", i + 1);
            }
        }
        BindingsAction::AddPreset { number, key } => {
            let b = launcher.add_preset(number, &key)?;
            println!("{} bound to {}.", b.description(), b.key().unwrap_or_default());
        }
        BindingsAction::Remove { command } => {
            let removed = launcher.remove_binding(&command)?;
            println!("Removed {removed} line(s) for {command}.");
        }
        BindingsAction::AddFps { fps, key } => {
            let b = launcher.add_fps_binding(fps, &key)?;
            println!("{} bound to {}.", b.description(), b.key().unwrap_or_default());
        }
        BindingsAction::Keys => {
            for name in keys::all_names() {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn old_patch_command(launcher: &mut Launcher, action: OldPatchAction) -> Result<(), DynError> {
    match action {
        OldPatchAction::Show => {
            let path = &launcher.config().old_patch.path;
            if path.is_empty() {
                println!("No path defined");
            } else {
                let valid = old_patch::is_valid(std::path::Path::new(path));
                println!("{path}{}", if valid { "" } else { " (invalid)" });
            }
        }
        OldPatchAction::Set { path } => {
            old_patch::set_path(launcher.config_mut(), &path)?;
            launcher.save_config()?;
            println!("Old Patch path saved: {}", path.display());
        }
        OldPatchAction::Detect => {
            let Some(found) = old_patch::detect(launcher.game()) else {
                let expected = old_patch::default_location(launcher.game());
                println!(
                    "Old patch not found{}.",
                    expected
                        .map(|p| format!(" at {}", p.display()))
                        .unwrap_or_default()
                );
                return Ok(());
            };
            launcher.config_mut().old_patch.path = found.display().to_string();
            launcher.save_config()?;
            println!("Old Patch path saved: {}", found.display());
        }
        OldPatchAction::SteamCommand => {
            println!("Open the Steam console ({}) and run:", old_patch::STEAM_CONSOLE_URI);
            println!();
            println!("    {}", old_patch::steam_download_command());
        }
    }
    Ok(())
}

fn config_command(launcher: &mut Launcher, action: ConfigAction) -> Result<(), DynError> {
    match action {
        ConfigAction::Show => print!("{}", toml::to_string_pretty(launcher.config())?),
        ConfigAction::Set { key, value } => {
            launcher.config_mut().set_value(&key, &value)?;
            launcher.save_config()?;
            println!("{key} = {value}");
        }
    }
    Ok(())
}

/// Tell the user about a newer release. Failures only get logged.
async fn notify_update(launcher: &Launcher) {
    if !launcher.config().launcher.check_for_updates {
        return;
    }
    let check = match Updater::new(launcher.config(), VERSION) {
        Ok(updater) => updater.check().await,
        Err(e) => Err(e),
    };
    match check {
        Ok(UpdateCheck::Available { tag, .. }) => {
            println!("A new version ({tag}) is available. Run `ol2launch update` to install it.");
        }
        Ok(UpdateCheck::UpToDate) => tracing::debug!("Launcher is up to date"),
        Err(e) => tracing::warn!("Update check failed: {e}"),
    }
}

async fn update_command(launcher: &Launcher, check_only: bool, yes: bool) -> Result<(), DynError> {
    let updater = Updater::new(launcher.config(), VERSION)?;
    let (tag, url) = match updater.check().await? {
        UpdateCheck::UpToDate => {
            println!("The launcher is already up-to-date ({VERSION}).");
            return Ok(());
        }
        UpdateCheck::Available { tag, url } => (tag, url),
    };
    println!("A new version ({tag}) is available.");
    if check_only {
        return Ok(());
    }
    if !yes && !confirm("Do you want to update?")? {
        println!("Update skipped.");
        return Ok(());
    }

    let current_exe = std::env::current_exe()?;
    let dir = current_exe
        .parent()
        .ok_or("could not get parent directory")?;
    let download = dir.join(format!("temp_{}", updater.executable_name()));
    updater.download(&url, &download).await?;
    update::apply_update(&download, &current_exe)?;
    println!("Updated to {tag}. Restart the launcher to use it.");
    Ok(())
}

fn confirm(question: &str) -> Result<bool, DynError> {
    print!("{question} [Y/n] ");
    std::io::stdout().flush()?;
    let mut response = String::new();
    std::io::stdin().read_line(&mut response)?;
    let response = response.trim().to_lowercase();
    Ok(response == "y" || response.is_empty())
}

fn wait_for_enter() -> Result<(), DynError> {
    println!();
    print!("Press enter or close this window to finish.");
    std::io::stdout().flush()?;
    std::io::stdin().read_line(&mut String::new())?;
    Ok(())
}
