use std::path::PathBuf;

use clap::Parser;
use lectern::prelude::*;

/// Present a slide deck with keyboard navigation and an optional,
/// synchronized presenter window.
#[derive(Debug, Parser)]
#[command(name = "talks", version)]
struct Args {
    /// Deck to open; defaults to the first deck in the manifest
    deck: Option<String>,

    /// 1-based slide to start on
    slide: Option<u32>,

    /// Deck manifest (YAML)
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Open the presenter window alongside the main window
    #[arg(long)]
    presenter: bool,

    /// Settings file; defaults to the user config directory
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    save_settings: bool,
}

fn main() {
    let args = Args::parse();

    let settings = load_settings(&args).unwrap_or_else(|err| {
        eprintln!("talks settings failed: {}", err);
        std::process::exit(1);
    });

    if args.save_settings {
        if let Err(err) = persist_settings(&args, &settings) {
            eprintln!("talks settings failed: {}", err);
            std::process::exit(1);
        }
    }

    let options = RunOptions {
        deck: args.deck,
        slide: args.slide,
        settings,
    };

    if let Err(err) = run(options) {
        eprintln!("talks runtime failed: {}", err);
        std::process::exit(1);
    }
}

fn settings_path(args: &Args) -> Option<PathBuf> {
    args.settings.clone().or_else(storage::settings_path)
}

fn load_settings(args: &Args) -> Result<Settings, String> {
    let path = settings_path(args);

    let mut settings = match path {
        Some(path) => storage::load_settings_or_default(&path)
            .map_err(|err| format!("{}: {}", path.display(), err))?,
        None => Settings::default(),
    };

    if let Some(manifest) = &args.manifest {
        settings.manifest = manifest.clone();
    }

    if args.presenter {
        settings.presenter = true;
    }

    Ok(settings)
}

fn persist_settings(args: &Args, settings: &Settings) -> Result<(), String> {
    let path = settings_path(args)
        .ok_or_else(|| "no config directory for settings".to_string())?;

    storage::save_settings(&path, settings)
        .map_err(|err| format!("{}: {}", path.display(), err))?;

    println!("saved settings to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn scratch_settings(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("talks-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir.join("settings.yml")
    }

    #[test]
    fn flags_override_missing_settings_file() {
        let path = scratch_settings("overrides");
        let args = Args::parse_from([
            "talks",
            "intro",
            "3",
            "--manifest",
            "other.yml",
            "--presenter",
            "--settings",
            path.to_str().unwrap(),
        ]);

        let settings = load_settings(&args).unwrap();

        assert_eq!(args.deck.as_deref(), Some("intro"));
        assert_eq!(args.slide, Some(3));
        assert_eq!(settings.manifest, PathBuf::from("other.yml"));
        assert!(settings.presenter);
        assert!(settings.watch_manifest);
    }

    #[test]
    fn saved_settings_are_loaded_next_time() {
        let path = scratch_settings("save");
        let first = Args::parse_from([
            "talks",
            "--presenter",
            "--save-settings",
            "--settings",
            path.to_str().unwrap(),
        ]);
        assert!(first.save_settings);

        let settings = load_settings(&first).unwrap();
        persist_settings(&first, &settings).unwrap();

        let second =
            Args::parse_from(["talks", "--settings", path.to_str().unwrap()]);
        assert!(load_settings(&second).unwrap().presenter);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
