//! Global groupcal configuration.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{GroupCalError, GroupCalResult};
use crate::identity::{FixedIdentityProvider, Identity};
use crate::store::FileStore;

static DEFAULT_DATA_DIR: &str = "~/.local/share/groupcal";

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn is_default_data_dir(p: &PathBuf) -> bool {
    *p == default_data_dir()
}

/// Configuration at ~/.config/groupcal/config.toml
///
/// Every key can be overridden from the environment with a `GROUPCAL_`
/// prefix, using `__` for nesting (`GROUPCAL_IDENTITY__EMAIL`).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GroupCalConfig {
    #[serde(default = "default_data_dir", skip_serializing_if = "is_default_data_dir")]
    pub data_dir: PathBuf,

    /// Schedule id used when a command is not given one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_schedule: Option<String>,

    /// Who commands act as.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
}

impl Default for GroupCalConfig {
    fn default() -> Self {
        GroupCalConfig {
            data_dir: default_data_dir(),
            default_schedule: None,
            identity: None,
        }
    }
}

impl GroupCalConfig {
    pub fn config_path() -> GroupCalResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| GroupCalError::Config("Could not determine config directory".into()))?
            .join("groupcal");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location, writing a commented template first if
    /// no config file exists yet.
    pub fn load() -> GroupCalResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    /// Load from `path` (which may be missing), then apply `GROUPCAL_*`
    /// environment overrides.
    pub fn load_from(path: &Path) -> GroupCalResult<Self> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("GROUPCAL")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true),
            )
            .build()
            .map_err(|e| GroupCalError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| GroupCalError::Config(e.to_string()))
    }

    /// Save to ~/.config/groupcal/config.toml
    pub fn save(&self) -> GroupCalResult<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> GroupCalResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| GroupCalError::Config(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| GroupCalError::Config(format!("Could not write config file: {e}")))
    }

    /// Create a config file with all options commented out.
    pub fn create_default_config(path: &Path) -> GroupCalResult<()> {
        let contents = format!(
            "\
# groupcal configuration

# Where schedule data is stored:
# data_dir = \"{DEFAULT_DATA_DIR}\"

# Schedule used when none is given on the command line:
# default_schedule = \"<schedule id>\"

# Who you are when creating schedules and events:
# [identity]
# id = \"ana\"
# email = \"ana@example.com\"
# display_name = \"Ana\"
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GroupCalError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| GroupCalError::Config(format!("Could not write config file: {e}")))
    }

    /// Data directory with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned())
    }

    /// Data directory as written in the config, keeping `~`.
    pub fn display_path(&self) -> &Path {
        &self.data_dir
    }

    /// Open the file store in the data directory.
    pub fn open_store(&self) -> GroupCalResult<FileStore> {
        FileStore::open_in(&self.data_path())
    }

    /// The configured identity. Commands cannot run without one.
    pub fn identity(&self) -> GroupCalResult<Identity> {
        match &self.identity {
            Some(identity) if !identity.id.trim().is_empty() && !identity.email.trim().is_empty() => {
                Ok(identity.clone())
            }
            _ => Err(GroupCalError::Config(
                "No identity configured. Set [identity] id and email in config.toml".into(),
            )),
        }
    }

    /// Schedule to use: the explicit one, else the configured default.
    /// Identity provider signed in as the configured identity.
    pub fn identity_provider(&self) -> GroupCalResult<FixedIdentityProvider> {
        Ok(FixedIdentityProvider::new(Some(self.identity()?)))
    }

    pub fn schedule_or_default(&self, explicit: Option<&str>) -> GroupCalResult<String> {
        explicit
            .map(String::from)
            .or_else(|| self.default_schedule.clone())
            .ok_or_else(|| {
                GroupCalError::Config(
                    "No schedule given and no default_schedule configured".into(),
                )
            })
    }
}
