//! Settings file handling.
//!
//! Settings live in a JSON file; any key left out falls back to its default
//! and a missing file means all defaults.

use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geocode::GOOGLE_GEOCODE_ENDPOINT;
use crate::organize::NameFilter;

pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Input selection
    pub image_folder: PathBuf,
    pub image_prefix: String,
    pub image_type: String,
    pub include_type: bool,
    pub image_exclusion: Option<String>,

    // Grouping
    pub time_threshold_minutes: u32,

    // Geocoding
    pub google_maps_api_key: Option<String>,
    pub geocode_endpoint: String,
    pub cache_dir: Option<PathBuf>,

    // Audit dump
    pub data_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_folder: PathBuf::from("~/Pictures"),
            image_prefix: String::new(),
            image_type: ".jpg".to_string(),
            include_type: true,
            image_exclusion: None,
            time_threshold_minutes: 30,
            google_maps_api_key: None,
            geocode_endpoint: GOOGLE_GEOCODE_ENDPOINT.to_string(),
            cache_dir: None,
            data_file: PathBuf::from("exif_data.json"),
        }
    }
}

impl Config {
    /// Load configuration from file, or defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("imsort.json")
    }

    /// Fills the API key from the environment when the file has none.
    pub fn with_env(mut self) -> Self {
        if self.google_maps_api_key.is_none() {
            self.google_maps_api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        }
        self
    }

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.google_maps_api_key
            .as_deref()
            .ok_or(ConfigError::MissingApiKey)
    }

    /// `image_folder` with a leading `~` expanded.
    pub fn image_folder(&self) -> PathBuf {
        expand_home(&self.image_folder)
    }

    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.as_deref().map(expand_home)
    }

    pub fn time_threshold(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.time_threshold_minutes))
    }

    pub fn name_filter(&self) -> NameFilter {
        NameFilter {
            prefix: self.image_prefix.clone(),
            file_type: self.include_type.then(|| self.image_type.clone()),
            exclusion: self.image_exclusion.clone().filter(|e| !e.is_empty()),
        }
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
