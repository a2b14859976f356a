use crate::{AgentService, PersistedConfig};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, warn};

const CONFIG_FILE: &str = "multi-agent-runner/config.toml";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("settings io error: {0}")]
    Io(#[from] io::Error),
    #[error("settings parse failed: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("settings encode failed: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    LoadedFileName,
    AgentService,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 2] = [ConfigKey::LoadedFileName, ConfigKey::AgentService];

    /// Name of the key in the settings file.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::LoadedFileName => "loadedFileName",
            ConfigKey::AgentService => "agentService",
        }
    }
}

/// Key-value settings shared by the command layer, the render step and the
/// host's settings surface.
///
/// `set` returns only after the value is visible to `get`, so a render that
/// follows a write never sees the old value.
pub trait ConfigStore: Send + Sync {
    fn get(&self, key: ConfigKey) -> String;
    fn set(&self, key: ConfigKey, value: &str) -> Result<(), StoreError>;

    fn loaded_file_name(&self) -> String {
        self.get(ConfigKey::LoadedFileName)
    }

    fn agent_service(&self) -> AgentService {
        self.get(ConfigKey::AgentService).parse().unwrap_or_default()
    }
}

fn read_key(config: &PersistedConfig, key: ConfigKey) -> String {
    match key {
        ConfigKey::LoadedFileName => config.loaded_file_name.clone(),
        ConfigKey::AgentService => config.agent_service.as_str().to_string(),
    }
}

fn write_key(config: &mut PersistedConfig, key: ConfigKey, value: &str) {
    match key {
        ConfigKey::LoadedFileName => config.loaded_file_name = value.trim().to_string(),
        ConfigKey::AgentService => config.agent_service = value.parse().unwrap_or_default(),
    }
}

fn lock(config: &Mutex<PersistedConfig>) -> MutexGuard<'_, PersistedConfig> {
    config.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Session-scoped settings; gone when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: Mutex<PersistedConfig>,
}

impl MemoryStore {
    pub fn new(config: PersistedConfig) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: ConfigKey) -> String {
        read_key(&lock(&self.config), key)
    }

    fn set(&self, key: ConfigKey, value: &str) -> Result<(), StoreError> {
        write_key(&mut lock(&self.config), key, value);
        Ok(())
    }
}

/// Durable per-user settings kept in a TOML file.
#[derive(Debug)]
pub struct TomlStore {
    path: PathBuf,
    config: Mutex<PersistedConfig>,
}

impl TomlStore {
    /// Opens the settings file. A missing or unreadable file starts from
    /// defaults; the next write replaces it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = match load_config(&path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "settings unreadable, using defaults");
                PersistedConfig::default()
            }
        };
        Self {
            path,
            config: Mutex::new(config),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for TomlStore {
    fn get(&self, key: ConfigKey) -> String {
        read_key(&lock(&self.config), key)
    }

    fn set(&self, key: ConfigKey, value: &str) -> Result<(), StoreError> {
        let mut config = lock(&self.config);
        write_key(&mut config, key, value);
        debug!(key = key.as_str(), path = %self.path.display(), "saving settings");
        save_config(&self.path, &config)
    }
}

pub fn load_config(path: &Path) -> Result<PersistedConfig, StoreError> {
    if !path.exists() {
        return Ok(PersistedConfig::default());
    }
    let contents = fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

pub fn save_config(path: &Path, config: &PersistedConfig) -> Result<(), StoreError> {
    let contents = toml::to_string_pretty(config)?;
    write_atomic(path, &contents)
}

fn write_atomic(path: &Path, payload: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".tmp-{}", std::process::id()));
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, payload.as_bytes())?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(())
}

/// `$MAR_CONFIG_PATH`, then `$XDG_CONFIG_HOME`, then the platform config dir.
pub fn config_path() -> PathBuf {
    if let Ok(path) = env::var("MAR_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    config_dir().join(CONFIG_FILE)
}

fn config_dir() -> PathBuf {
    if let Ok(path) = env::var("XDG_CONFIG_HOME") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_returns_defaults() {
        let store = MemoryStore::default();
        assert_eq!(store.get(ConfigKey::LoadedFileName), "");
        assert_eq!(store.get(ConfigKey::AgentService), "copilot");
        assert_eq!(store.agent_service(), AgentService::Copilot);
    }

    #[test]
    fn memory_store_set_is_visible_immediately() {
        let store = MemoryStore::default();
        store
            .set(ConfigKey::LoadedFileName, "plan.yaml")
            .unwrap();
        store.set(ConfigKey::AgentService, "claude-code").unwrap();
        assert_eq!(store.loaded_file_name(), "plan.yaml");
        assert_eq!(store.agent_service(), AgentService::ClaudeCode);
    }

    #[test]
    fn unknown_service_value_falls_back_to_default() {
        let store = MemoryStore::new(PersistedConfig {
            loaded_file_name: String::new(),
            agent_service: AgentService::ClaudeCode,
        });
        store.set(ConfigKey::AgentService, "nope").unwrap();
        assert_eq!(store.agent_service(), AgentService::Copilot);
    }

    #[test]
    fn toml_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let store = TomlStore::open(&path);
        assert_eq!(store.loaded_file_name(), "");
        store.set(ConfigKey::LoadedFileName, "plan.yaml").unwrap();
        store.set(ConfigKey::AgentService, "claude-code").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("loadedFileName = \"plan.yaml\""));
        assert!(contents.contains("agentService = \"claude-code\""));

        let reopened = TomlStore::open(&path);
        assert_eq!(reopened.loaded_file_name(), "plan.yaml");
        assert_eq!(reopened.agent_service(), AgentService::ClaudeCode);
    }

    #[test]
    fn toml_store_recovers_from_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is = = not toml").unwrap();

        assert!(load_config(&path).is_err());
        let store = TomlStore::open(&path);
        assert_eq!(store.loaded_file_name(), "");
        assert_eq!(store.agent_service(), AgentService::default());

        store.set(ConfigKey::LoadedFileName, "a.yml").unwrap();
        assert_eq!(load_config(&path).unwrap().loaded_file_name, "a.yml");
    }

    #[test]
    fn clearing_the_file_name_writes_empty_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let store = TomlStore::open(&path);
        store.set(ConfigKey::LoadedFileName, "plan.yaml").unwrap();
        store.set(ConfigKey::LoadedFileName, "").unwrap();
        assert_eq!(TomlStore::open(&path).loaded_file_name(), "");
    }

    #[test]
    fn key_names_match_settings_file() {
        let encoded = toml::to_string(&PersistedConfig::default()).unwrap();
        let table: toml::Table = toml::from_str(&encoded).unwrap();
        let mut written: Vec<&str> = table.keys().map(String::as_str).collect();
        let mut keys: Vec<&str> = ConfigKey::ALL.iter().map(ConfigKey::as_str).collect();
        written.sort_unstable();
        keys.sort_unstable();
        assert_eq!(written, keys);
    }
}
