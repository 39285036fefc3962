//! Configuration file support (`.castoff.toml`).
//!
//! The config carries everything that is *not* an environment signal: the
//! publication property map, the artifact list, repository endpoints, the
//! portal command, and timing knobs. Credentials never live here — they
//! come from the environment at process entry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::publication::{PROP_GROUP, Publication};
use crate::retry::RetryConfig;
use crate::types::{deserialize_duration, serialize_duration};

pub const CONFIG_FILE: &str = ".castoff.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastoffConfig {
    /// Publication property map (`GROUP`, `VERSION_NAME`, `POM_*`).
    pub properties: BTreeMap<String, String>,

    /// Files to publish to the Maven-style repositories.
    #[serde(default)]
    pub artifacts: Vec<ArtifactConfig>,

    #[serde(default)]
    pub repositories: RepositoriesConfig,

    /// External command that performs the plugin-portal upload.
    #[serde(default)]
    pub portal: Option<PortalConfig>,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Close-and-release behavior for the staging API.
    #[serde(default)]
    pub staging: StagingReleaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub classifier: Option<String>,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    "jar".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoriesConfig {
    #[serde(default)]
    pub snapshots: Option<RepositoryConfig>,
    #[serde(default)]
    pub staging: Option<StagingRepositoryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingRepositoryConfig {
    /// Deploy URL artifacts are uploaded to.
    pub url: String,
    /// Base URL of the staging-management API.
    pub api_base: String,
    /// Profile group for close/release. Defaults to the `GROUP` property.
    #[serde(default)]
    pub profile_group: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Program plus arguments, run from the working directory.
    pub command: Vec<String>,

    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    #[serde(default = "default_portal_timeout")]
    pub timeout: Duration,
}

fn default_portal_timeout() -> Duration {
    Duration::from_secs(600)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingReleaseConfig {
    /// How long to wait for a repository to close.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    #[serde(default = "default_staging_timeout")]
    pub timeout: Duration,

    /// Poll interval while waiting.
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    #[serde(default = "default_staging_poll")]
    pub poll: Duration,
}

impl Default for StagingReleaseConfig {
    fn default() -> Self {
        Self {
            timeout: default_staging_timeout(),
            poll: default_staging_poll(),
        }
    }
}

fn default_staging_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_staging_poll() -> Duration {
    Duration::from_secs(10)
}

impl CastoffConfig {
    /// Load and parse the config at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Like [`CastoffConfig::load`], but a missing file is `Ok(None)`.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    pub fn publication(&self) -> Result<Publication> {
        Publication::from_properties(&self.properties)
    }

    /// Profile group used by the staging API, falling back to `GROUP`.
    pub fn profile_group(&self) -> Option<&str> {
        self.repositories
            .staging
            .as_ref()
            .and_then(|s| s.profile_group.as_deref())
            .or_else(|| self.properties.get(PROP_GROUP).map(String::as_str))
    }
}
