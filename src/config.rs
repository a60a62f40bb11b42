use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where database.json, index.json and the cover store live.
    #[serde(default = "default_database_dir")]
    pub database_dir: PathBuf,
}

fn default_database_dir() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".aria");
    path
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_dir: default_database_dir(),
        }
    }
}

impl AppConfig {
    pub fn get_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("aria");
        path.push("config.toml");
        path
    }

    pub fn load() -> Self {
        let path = Self::get_config_path();
        if path.exists() {
            if let Ok(content) = fs::read_to_string(&path) {
                if let Ok(config) = toml::from_str(&content) {
                    return config;
                }
            }
        }
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_database_dir_override() {
        let config: AppConfig = toml::from_str("database_dir = \"/srv/music/.aria\"").unwrap();
        assert_eq!(config.database_dir, PathBuf::from("/srv/music/.aria"));
    }

    #[test]
    fn empty_config_uses_the_default_dir() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.database_dir.ends_with(".aria"));
    }
}
