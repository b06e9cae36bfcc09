use crate::app_dirs::AppDirs;
use crate::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub inspection_secs: u64,
    pub beep: bool,
    pub store: StoreBackend,
    pub live_window: usize,
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inspection_secs: 15,
            beep: true,
            store: StoreBackend::Json,
            live_window: 50,
            history_limit: 1000,
        }
    }
}

impl Config {
    /// The live window never outgrows the history it is drawn from
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            inspection_ms: self.inspection_secs.saturating_mul(1000),
            live_window: self.live_window.min(self.history_limit),
            history_limit: self.history_limit,
            ..SessionConfig::default()
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("cubik_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            inspection_secs: 8,
            beep: false,
            store: StoreBackend::Sqlite,
            live_window: 100,
            history_limit: 5000,
        };
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{"store": "sqlite"}"#).unwrap();
        let loaded = FileConfigStore::with_path(&path).load();
        assert_eq!(loaded.store, StoreBackend::Sqlite);
        assert_eq!(loaded.inspection_secs, 15);
        assert!(loaded.beep);
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }

    #[test]
    fn session_config_conversion() {
        let cfg = Config {
            inspection_secs: 8,
            ..Config::default()
        };
        let session = cfg.session_config();
        assert_eq!(session.inspection_ms, 8_000);
        assert_eq!(session.live_window, 50);
        assert_eq!(session.history_limit, 1000);
        assert_eq!(session.inspection_tick, Duration::from_millis(100));
    }

    #[test]
    fn session_config_clamps_out_of_range_values() {
        let cfg = Config {
            inspection_secs: u64::MAX,
            live_window: 200,
            history_limit: 20,
            ..Config::default()
        };
        let session = cfg.session_config();
        assert_eq!(session.inspection_ms, u64::MAX);
        assert_eq!(session.live_window, 20);
        assert_eq!(session.history_limit, 20);
    }
}
