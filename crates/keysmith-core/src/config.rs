//! Token and key configuration.
//!
//! The configuration file is YAML with two maps keyed by logical name:
//!
//! ```yaml
//! tokens:
//!   soft:
//!     type: file
//!     path: /var/lib/keysmith/soft
//!   hsm:
//!     type: pkcs11
//!     provider: /usr/lib/softhsm/libsofthsm2.so
//!     label: signing
//! keys:
//!   release:
//!     token: soft
//!     label: release-2024
//! ```
//!
//! [`ConfigStore`] loads the file lazily on first use and holds the records for
//! the rest of the run.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TokenError, TokenResult};

/// Environment variable overriding the configuration path.
pub const CONFIG_ENV: &str = "KEYSMITH_CONFIG";

/// Token type used when a token declares none.
pub const DEFAULT_TOKEN_TYPE: &str = "pkcs11";

/// Parsed configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tokens: BTreeMap<String, TokenConfig>,

    #[serde(default)]
    pub keys: BTreeMap<String, KeyConfig>,
}

/// Token backend definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Logical name (the map key).
    #[serde(skip)]
    pub name: String,

    /// Backend type tag; empty means the hardware-module backend.
    #[serde(rename = "type", default)]
    pub token_type: String,

    /// PKCS#11 provider module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Token label to select within the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Token serial number to select within the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,

    /// PIN to log in with instead of prompting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,

    /// Directory holding file token keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Hex SHA-256 of the file token PIN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_sha256: Option<String>,
}

impl TokenConfig {
    /// Type tag with the empty tag mapped to the hardware-module default.
    pub fn effective_type(&self) -> &str {
        if self.token_type.is_empty() {
            DEFAULT_TOKEN_TYPE
        } else {
            &self.token_type
        }
    }
}

/// Key definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Logical name (the map key).
    #[serde(skip)]
    pub name: String,

    /// Name of the owning token.
    #[serde(default)]
    pub token: String,

    /// Label attached to the key material.
    #[serde(default)]
    pub label: String,

    /// Raw key identifier as hex.
    #[serde(default)]
    pub id: String,
}

impl KeyConfig {
    /// Attach the key to a token, replacing any previous association.
    pub fn set_token(&mut self, token: &TokenConfig) {
        self.token = token.name.clone();
    }

    /// Address the key by label. Clears the stored identifier.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
        self.id.clear();
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> TokenResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| TokenError::ConfigLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_yaml(&content).map_err(|e| match e {
            TokenError::Config { message } => TokenError::ConfigLoad {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> TokenResult<Self> {
        let mut config: Config = serde_yaml::from_str(yaml).map_err(|e| TokenError::Config {
            message: format!("failed to parse configuration YAML: {e}"),
        })?;
        config.normalize_names();
        Ok(config)
    }

    /// Copy map keys into the `name` field of every token and key record.
    pub fn normalize_names(&mut self) {
        for (name, token) in self.tokens.iter_mut() {
            token.name = name.clone();
        }
        for (name, key) in self.keys.iter_mut() {
            key.name = name.clone();
        }
    }

    /// Default configuration path: `$KEYSMITH_CONFIG`, else the user config dir.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keysmith")
            .join("keysmith.yaml")
    }
}

#[derive(Debug)]
enum ConfigSource {
    File(PathBuf),
    Yaml(String),
    Parsed(Config),
}

/// Lazily loaded, process-local configuration store.
#[derive(Debug)]
pub struct ConfigStore {
    source: ConfigSource,
    state: RwLock<Option<Config>>,
}

impl ConfigStore {
    /// Store backed by a YAML file, read on first use.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ConfigSource::File(path.into()),
            state: RwLock::new(None),
        }
    }

    /// Store backed by inline YAML, parsed on first use.
    pub fn from_yaml(yaml: impl Into<String>) -> Self {
        Self {
            source: ConfigSource::Yaml(yaml.into()),
            state: RwLock::new(None),
        }
    }

    /// Store over an already parsed configuration, loaded on first use.
    pub fn from_config(mut config: Config) -> Self {
        config.normalize_names();
        Self {
            source: ConfigSource::Parsed(config),
            state: RwLock::new(None),
        }
    }

    /// Whether the configuration has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Load the configuration if it is not loaded yet.
    pub fn init(&self) -> TokenResult<()> {
        if self.is_loaded() {
            return Ok(());
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.is_some() {
            return Ok(());
        }
        let config = match &self.source {
            ConfigSource::File(path) => {
                debug!(path = %path.display(), "loading configuration");
                Config::from_file(path)?
            }
            ConfigSource::Yaml(yaml) => Config::from_yaml(yaml)?,
            ConfigSource::Parsed(config) => config.clone(),
        };
        *state = Some(config);
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&Config) -> TokenResult<T>) -> TokenResult<T> {
        self.init()?;
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        match state.as_ref() {
            Some(config) => f(config),
            None => Err(TokenError::Config {
                message: "configuration is not loaded".into(),
            }),
        }
    }

    fn write<T>(&self, f: impl FnOnce(&mut Config) -> T) -> TokenResult<T> {
        self.init()?;
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        Ok(f(state.get_or_insert_with(Config::default)))
    }

    /// Look up a key by name.
    pub fn get_key(&self, name: &str) -> TokenResult<KeyConfig> {
        self.read(|config| {
            config
                .keys
                .get(name)
                .cloned()
                .ok_or_else(|| TokenError::UnknownKey {
                    name: name.to_string(),
                })
        })
    }

    /// Create an empty key entry under `name`, replacing any existing one.
    pub fn new_key(&self, name: &str) -> TokenResult<KeyConfig> {
        let key = KeyConfig {
            name: name.to_string(),
            ..Default::default()
        };
        self.put_key(key.clone())?;
        Ok(key)
    }

    /// Insert or replace a key entry.
    pub fn put_key(&self, key: KeyConfig) -> TokenResult<()> {
        self.write(|config| {
            config.keys.insert(key.name.clone(), key);
        })
    }

    /// Look up a token by name.
    pub fn get_token(&self, name: &str) -> TokenResult<TokenConfig> {
        self.read(|config| {
            config
                .tokens
                .get(name)
                .cloned()
                .ok_or_else(|| TokenError::UnknownToken {
                    name: name.to_string(),
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const YAML: &str = r#"
tokens:
  soft:
    type: file
    path: /tmp/soft
  hsm:
    provider: /usr/lib/softhsm/libsofthsm2.so
    pin: "123456"
keys:
  release:
    token: soft
    label: release-2024
    id: "01:ab:3f"
"#;

    #[test]
    fn test_parse_config_yaml() {
        let config = Config::from_yaml(YAML).unwrap();
        let soft = &config.tokens["soft"];
        assert_eq!(soft.name, "soft");
        assert_eq!(soft.effective_type(), "file");
        assert_eq!(soft.path, Some(PathBuf::from("/tmp/soft")));

        let hsm = &config.tokens["hsm"];
        assert_eq!(hsm.token_type, "");
        assert_eq!(hsm.effective_type(), DEFAULT_TOKEN_TYPE);
        assert_eq!(hsm.pin.as_deref(), Some("123456"));

        let key = &config.keys["release"];
        assert_eq!(key.name, "release");
        assert_eq!(key.token, "soft");
        assert_eq!(key.id, "01:ab:3f");
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = Config::from_yaml("tokens: [").unwrap_err();
        assert!(matches!(err, TokenError::Config { .. }));
    }

    #[test]
    fn test_store_loads_lazily() {
        let store = ConfigStore::from_yaml(YAML);
        assert!(!store.is_loaded());
        let token = store.get_token("soft").unwrap();
        assert!(store.is_loaded());
        assert_eq!(token.name, "soft");
    }

    #[test]
    fn test_store_unknown_names() {
        let store = ConfigStore::from_yaml(YAML);
        assert!(matches!(
            store.get_key("nope"),
            Err(TokenError::UnknownKey { name }) if name == "nope"
        ));
        assert!(matches!(
            store.get_token("nope"),
            Err(TokenError::UnknownToken { name }) if name == "nope"
        ));
    }

    #[test]
    fn test_new_key_is_visible_to_lookup() {
        let store = ConfigStore::from_yaml(YAML);
        let mut key = store.new_key("fresh").unwrap();
        key.set_label("fresh-label");
        store.put_key(key).unwrap();

        let found = store.get_key("fresh").unwrap();
        assert_eq!(found.label, "fresh-label");
        assert_eq!(found.token, "");
    }

    #[test]
    fn test_set_label_clears_id() {
        let mut key = KeyConfig {
            name: "release".into(),
            token: "soft".into(),
            label: "old".into(),
            id: "0102".into(),
        };
        key.set_label("newlabel");
        assert_eq!(key.label, "newlabel");
        assert_eq!(key.id, "");
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let store = ConfigStore::from_path("/nonexistent/keysmith.yaml");
        let err = store.init().unwrap_err();
        assert!(matches!(err, TokenError::ConfigLoad { .. }));
        assert!(!store.is_loaded());
    }

    #[test]
    fn test_parsed_config_gets_names_from_map_keys() {
        let mut config = Config::default();
        config.tokens.insert(
            "soft".into(),
            TokenConfig {
                token_type: "file".into(),
                path: Some(PathBuf::from("/tmp/soft")),
                ..Default::default()
            },
        );
        config.keys.insert(
            "release".into(),
            KeyConfig {
                token: "soft".into(),
                label: "rel".into(),
                ..Default::default()
            },
        );

        let store = ConfigStore::from_config(config);
        assert!(!store.is_loaded());
        assert_eq!(store.get_token("soft").unwrap().name, "soft");
        assert_eq!(store.get_key("release").unwrap().name, "release");
    }

    #[test]
    #[serial]
    fn test_default_path_honours_env() {
        std::env::set_var(CONFIG_ENV, "/etc/keysmith/custom.yaml");
        assert_eq!(
            Config::default_path(),
            PathBuf::from("/etc/keysmith/custom.yaml")
        );
        std::env::remove_var(CONFIG_ENV);
        assert!(Config::default_path().ends_with("keysmith/keysmith.yaml"));
    }
}
