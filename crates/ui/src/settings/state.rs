use std::path::{Path, PathBuf};
use std::sync::Arc;

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use sidechat_llm::{DEFAULT_OPENAI_MODEL, ProviderConfig};
use sidechat_storage::{DEFAULT_HISTORY_KEY, EmptyHistoryPolicy};
use snafu::{ResultExt, Snafu};

pub const DEFAULT_PROVIDER_ID: &str = "openai";
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const SETTINGS_DIRECTORY_NAME: &str = "sidechat";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const HISTORY_DIRECTORY_NAME: &str = "history";
pub const SETTINGS_ENV_PREFIX: &str = "SIDECHAT_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_provider_id")]
    pub provider_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub max_tokens: Option<u64>,
    #[serde(default = "default_history_key")]
    pub history_key: String,
    /// Falls back to the platform data directory when unset.
    #[serde(default)]
    pub history_dir: Option<PathBuf>,
    #[serde(default)]
    pub persist_empty_history: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider_id: default_provider_id(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            model: default_model(),
            max_tokens: None,
            history_key: default_history_key(),
            history_dir: None,
            persist_empty_history: false,
        }
    }
}

impl Settings {
    pub fn to_provider_config(&self) -> Option<ProviderConfig> {
        if self.api_key.trim().is_empty() {
            return None;
        }

        Some(ProviderConfig::new(
            &self.provider_id,
            &self.api_key,
            &self.endpoint,
        ))
    }

    pub fn history_directory(&self) -> PathBuf {
        self.history_dir
            .clone()
            .unwrap_or_else(default_history_directory)
    }

    pub fn empty_history_policy(&self) -> EmptyHistoryPolicy {
        EmptyHistoryPolicy::from_persist_flag(self.persist_empty_history)
    }

    pub fn normalized(mut self) -> Self {
        self.provider_id = non_blank_or(self.provider_id, default_provider_id);
        self.api_key = self.api_key.trim().to_string();
        self.endpoint = non_blank_or(self.endpoint, default_endpoint);
        self.model = non_blank_or(self.model, default_model);
        self.history_key = non_blank_or(self.history_key, default_history_key);
        self.history_dir = self
            .history_dir
            .filter(|path| !path.as_os_str().is_empty());
        self
    }
}

/// Settings resolved once at startup: defaults, then the JSON file, then `SIDECHAT_`
/// environment variables.
pub struct SettingsStore {
    settings: Arc<Settings>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".sidechat"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(settings),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.settings)
    }

    /// Writes a defaults file when none exists yet, so there is a file to edit.
    ///
    /// Only built-in defaults are written. Values supplied through the environment stay
    /// out of the file.
    pub fn write_defaults_if_missing(&self) -> Result<bool, SettingsError> {
        if self.config_path.exists() {
            return Ok(false);
        }

        self.persist(&Settings::default())?;
        Ok(true)
    }

    fn load_from_disk(path: &Path) -> Settings {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if path.exists() {
            figment = figment.merge(Json::file(path));
        } else {
            tracing::info!("settings file not found at {:?}, using defaults", path);
        }
        figment = figment.merge(Env::prefixed(SETTINGS_ENV_PREFIX));

        match figment.extract::<Settings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                Settings::default()
            }
        }
    }

    fn persist(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!("saved settings to {:?}", self.config_path);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

pub fn default_history_directory() -> PathBuf {
    dirs::data_dir()
        .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
        .unwrap_or_else(|| PathBuf::from(".sidechat"))
        .join(HISTORY_DIRECTORY_NAME)
}

fn non_blank_or(value: String, fallback: fn() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback()
    } else {
        trimmed.to_string()
    }
}

fn default_provider_id() -> String {
    DEFAULT_PROVIDER_ID.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}

fn default_history_key() -> String {
    DEFAULT_HISTORY_KEY.to_string()
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|jail| {
            let store = SettingsStore::new(jail.directory().join("settings.json"));
            let settings = store.settings();

            assert_eq!(settings.history_key, DEFAULT_HISTORY_KEY);
            assert_eq!(settings.model, DEFAULT_OPENAI_MODEL);
            assert_eq!(settings.empty_history_policy(), EmptyHistoryPolicy::Skip);
            assert!(settings.to_provider_config().is_none());
            Ok(())
        });
    }

    #[test]
    fn file_values_override_defaults() {
        Jail::expect_with(|jail| {
            let history_dir = jail.directory().join("chats");
            jail.create_file(
                "settings.json",
                &serde_json::json!({
                    "api_key": "  sk-test  ",
                    "history_key": "work",
                    "history_dir": history_dir,
                    "persist_empty_history": true,
                })
                .to_string(),
            )?;

            let settings = SettingsStore::new(jail.directory().join("settings.json")).settings();

            assert_eq!(settings.api_key, "sk-test");
            assert!(settings.to_provider_config().is_some());
            assert_eq!(settings.history_key, "work");
            assert_eq!(settings.history_directory(), history_dir);
            assert_eq!(settings.empty_history_policy(), EmptyHistoryPolicy::Persist);
            assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_the_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "settings.json",
                r#"{ "api_key": "sk-file", "history_key": "work" }"#,
            )?;
            jail.set_env("SIDECHAT_API_KEY", "sk-env");
            jail.set_env("SIDECHAT_MODEL", "gpt-4.1");

            let settings = SettingsStore::new(jail.directory().join("settings.json")).settings();

            assert_eq!(settings.api_key, "sk-env");
            assert_eq!(settings.model, "gpt-4.1");
            assert_eq!(settings.history_key, "work");
            Ok(())
        });
    }

    #[test]
    fn environment_secrets_are_not_written_to_the_defaults_file() {
        Jail::expect_with(|jail| {
            jail.set_env("SIDECHAT_API_KEY", "sk-from-env-secret");
            let path = jail.directory().join("nested").join("settings.json");
            let store = SettingsStore::new(path.clone());
            assert_eq!(store.settings().api_key, "sk-from-env-secret");

            assert!(store.write_defaults_if_missing().unwrap());

            let content = std::fs::read_to_string(&path).unwrap();
            assert!(!content.contains("sk-from-env-secret"));
            let written: Settings = serde_json::from_str(&content).unwrap();
            assert_eq!(written, Settings::default());
            Ok(())
        });
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("settings.json", "{ not json")?;

            let settings = SettingsStore::new(jail.directory().join("settings.json")).settings();
            assert_eq!(*settings, Settings::default());
            Ok(())
        });
    }

    #[test]
    fn blank_fields_normalize_to_defaults() {
        let settings = Settings {
            provider_id: " ".to_string(),
            model: String::new(),
            history_key: "  ".to_string(),
            history_dir: Some(PathBuf::new()),
            ..Settings::default()
        }
        .normalized();

        assert_eq!(settings.provider_id, DEFAULT_PROVIDER_ID);
        assert_eq!(settings.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(settings.history_key, DEFAULT_HISTORY_KEY);
        assert_eq!(settings.history_dir, None);
        assert!(settings.to_provider_config().is_none());
    }

    #[test]
    fn defaults_are_written_once() {
        Jail::expect_with(|jail| {
            let path = jail.directory().join("settings.json");
            let store = SettingsStore::new(path.clone());

            assert!(store.write_defaults_if_missing().unwrap());
            assert!(!store.write_defaults_if_missing().unwrap());
            assert!(path.exists());
            Ok(())
        });
    }
}
