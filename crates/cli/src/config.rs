//! Runtime settings: built-in defaults, then `docai-overlay.toml` (or the file
//! passed with `--config`), then `DOCAI_OVERLAY_*` environment variables.

use anyhow::{Context, Result};
use doc_model::{Category, CategorySet};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = "docai-overlay.toml";
pub const ENV_PREFIX: &str = "DOCAI_OVERLAY_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_level: String,
    pub show_labels: bool,
    pub default_zoom_percent: u16,
    pub filters: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_owned(),
            show_labels: true,
            default_zoom_percent: 100,
            filters: Category::DRAW_ORDER
                .iter()
                .map(|category| category.as_str().to_owned())
                .collect(),
        }
    }
}

impl Settings {
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let file = config_file.unwrap_or_else(|| Path::new(CONFIG_FILE));

        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_file {
            if !path.is_file() {
                anyhow::bail!("config file does not exist: {}", path.display());
            }
        }

        Self::figment(config_file).extract().context("invalid configuration")
    }

    pub fn filter_set(&self) -> Result<CategorySet> {
        parse_filters(&self.filters)
    }
}

pub fn parse_filters<S: AsRef<str>>(names: &[S]) -> Result<CategorySet> {
    names
        .iter()
        .map(|name| name.as_ref().parse::<Category>().map_err(anyhow::Error::from))
        .collect()
}
