use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_yml::Value;
use yaml_merge_keys::merge_keys_serde_yml;

use crate::keys::{ARROW_LEFT, ARROW_RIGHT, KeyBindings};

pub const DEFAULT_MANIFEST: &str = "decks.yml";
pub const DEFAULT_PRESENTER_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub manifest: PathBuf,
    pub presenter: bool,
    pub presenter_url: String,
    pub advance_keys: Vec<String>,
    pub retreat_keys: Vec<String>,
    pub watch_manifest: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from(DEFAULT_MANIFEST),
            presenter: false,
            presenter_url: DEFAULT_PRESENTER_URL.to_string(),
            advance_keys: vec![ARROW_RIGHT.to_string()],
            retreat_keys: vec![ARROW_LEFT.to_string()],
            watch_manifest: true,
        }
    }
}

impl Settings {
    pub fn from_yaml(source: &str) -> Result<Self, String> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: Value = serde_yml::from_str(source)
            .map_err(|err| format!("failed to parse settings: {}", err))?;

        let merged = merge_keys_serde_yml(raw).map_err(|err| {
            format!("failed to process YAML merge keys in settings: {}", err)
        })?;

        serde_yml::from_value(merged)
            .map_err(|err| format!("failed to decode settings: {}", err))
    }

    pub fn to_yaml(&self) -> Result<String, String> {
        serde_yml::to_string(self)
            .map_err(|err| format!("failed to serialize settings: {}", err))
    }

    pub fn key_bindings(&self) -> KeyBindings {
        KeyBindings {
            advance: self.advance_keys.clone(),
            retreat: self.retreat_keys.clone(),
        }
    }
}
