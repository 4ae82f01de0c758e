use std::error::Error;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use directories_next::BaseDirs;

use super::settings::Settings;

pub fn config_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|base| base.config_dir().join("Lectern"))
}

pub fn settings_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("settings.yml"))
}

pub fn save_settings(
    path: &Path,
    settings: &Settings,
) -> Result<(), Box<dyn Error>> {
    let yaml = settings.to_yaml()?;
    if let Some(parent_dir) = path.parent() {
        fs::create_dir_all(parent_dir)?;
    }
    fs::write(path, yaml)?;
    Ok(())
}

pub fn load_settings(path: &Path) -> Result<Settings, Box<dyn Error>> {
    let source = fs::read_to_string(path)?;
    Ok(Settings::from_yaml(&source)?)
}

/// Missing file means defaults; anything else unreadable is an error.
pub fn load_settings_or_default(
    path: &Path,
) -> Result<Settings, Box<dyn Error>> {
    match load_settings(path) {
        Ok(settings) => Ok(settings),
        Err(err) => {
            if err
                .downcast_ref::<std::io::Error>()
                .is_some_and(|e| e.kind() == ErrorKind::NotFound)
            {
                Ok(Settings::default())
            } else {
                Err(err)
            }
        }
    }
}
