//! Configuration types for gitsem.
//!
//! - [`GlobalConfig`]: user-level settings stored in `~/.gitsem/config.yaml`
//! - [`ProjectConfig`]: project metadata stored in `.gitsem/config.yml`
//!
//! Both files are optional. A missing file yields defaults; a file that
//! exists but cannot be parsed is reported as [`GitsemError::ConfigInvalid`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_HISTORY_LIMIT, DEFAULT_REFLOG_LIMIT, DEFAULT_TIMEOUT, GITSEM_HOME_DIR,
    GLOBAL_CONFIG_FILENAME,
};
use crate::errors::GitsemError;

/// Schema reference written into freshly created project configs.
pub const CONFIG_SCHEMA_REF: &str = "./schemas/config.schema.json";

// ============================================================================
// GlobalConfig
// ============================================================================

/// Global (user-level) configuration.
///
/// # Example YAML
///
/// ```yaml
/// backend:
///   timeout_secs: 30
/// history:
///   log_limit: 200
///   reflog_limit: 50
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

/// Settings for backend invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Deadline for long-running backend commands, in seconds. 0 disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    /// The configured deadline, or `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// How much history is fetched for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_log_limit")]
    pub log_limit: usize,

    #[serde(default = "default_reflog_limit")]
    pub reflog_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            log_limit: default_log_limit(),
            reflog_limit: default_reflog_limit(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}
fn default_log_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}
fn default_reflog_limit() -> usize {
    DEFAULT_REFLOG_LIMIT
}

impl GlobalConfig {
    /// Load from the default location (`~/.gitsem/config.yaml`).
    ///
    /// Falls back to defaults when the home directory cannot be determined
    /// or the file does not exist.
    pub fn load_default() -> Result<Self, GitsemError> {
        match Self::default_path() {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::debug!("Could not determine home directory, using default config");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific path. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`GitsemError::ConfigInvalid`] if the file exists but cannot be
    /// read, parsed, or validated.
    pub fn from_path(path: &Path) -> Result<Self, GitsemError> {
        if !path.exists() {
            tracing::debug!(
                "Global config not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            GitsemError::ConfigInvalid(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            GitsemError::ConfigInvalid(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// `~/.gitsem`
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(GITSEM_HOME_DIR))
    }

    /// `~/.gitsem/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|d| d.join(GLOBAL_CONFIG_FILENAME))
    }

    /// Reject values that would make every listing empty.
    pub fn validate(&self) -> Result<(), GitsemError> {
        if self.history.log_limit == 0 {
            return Err(GitsemError::ConfigInvalid(
                "history.log_limit cannot be 0".to_string(),
            ));
        }
        if self.history.reflog_limit == 0 {
            return Err(GitsemError::ConfigInvalid(
                "history.reflog_limit cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// ProjectConfig
// ============================================================================

/// Display-only project metadata.
///
/// ```yaml
/// # yaml-language-server: $schema=./schemas/config.schema.json
/// $schema: ./schemas/config.schema.json
/// project:
///   name: gitsem
///   description: Semantic layer over git history
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(rename = "$schema", default, skip_serializing_if = "String::is_empty")]
    pub schema: String,

    #[serde(default)]
    pub project: ProjectInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            schema: CONFIG_SCHEMA_REF.to_string(),
            project: ProjectInfo::default(),
        }
    }
}

impl ProjectConfig {
    /// Load from `path`. A missing file yields defaults.
    pub fn from_path(path: &Path) -> Result<Self, GitsemError> {
        if !path.exists() {
            tracing::debug!(
                "Project config not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            GitsemError::ConfigInvalid(format!("Failed to read {}: {}", path.display(), e))
        })?;

        serde_yaml::from_str(&content).map_err(|e| {
            GitsemError::ConfigInvalid(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Write to `path`, prefixed with a language-server schema directive when a schema is set.
    pub fn save(&self, path: &Path) -> Result<(), GitsemError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut content = String::new();
        if !self.schema.is_empty() {
            content.push_str(&format!("# yaml-language-server: $schema={}\n", self.schema));
        }
        content.push_str(&serde_yaml::to_string(self)?);

        fs::write(path, content)?;
        tracing::debug!(path = %path.display(), "Saved project config");
        Ok(())
    }
}
