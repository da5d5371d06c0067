//! Harness configuration
//!
//! One optional TOML file; every section and field has a default, so an
//! empty file (or no file) reproduces the stock ASPIS layout. Command-line
//! flags are applied on top by [`crate::cli`].

use aspis_exec::{ContainerSettings, ToolchainSettings};
use aspis_matrix::{default_profiles, OptionProfile, ScanSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File read when `--config` is not given, if it exists
pub const DEFAULT_CONFIG_FILE: &str = "aspis-harness.toml";

/// Errors loading the configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        /// Config path
        path: PathBuf,
        /// Parser error
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Execution-pass settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Root of per-case build directories for local runs
    pub build_root: PathBuf,

    /// Per-invocation limit in seconds; 0 disables it
    pub timeout_secs: u64,

    /// Cases run concurrently
    pub jobs: usize,

    /// Candidates shown before the build confirmation
    pub preview: usize,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            build_root: PathBuf::from("./build/test"),
            timeout_secs: 300,
            jobs: 1,
            preview: 3,
        }
    }
}

impl ExecutionSettings {
    /// Time limit per invocation, if any
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Full harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Compiler driver
    pub toolchain: ToolchainSettings,
    /// Fixture discovery
    pub fixtures: ScanSettings,
    /// Option profiles, in index order
    pub profiles: Vec<OptionProfile>,
    /// Containerized backend
    pub container: ContainerSettings,
    /// Execution pass
    pub execution: ExecutionSettings,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            toolchain: ToolchainSettings::default(),
            fixtures: ScanSettings::default(),
            profiles: default_profiles(),
            container: ContainerSettings::default(),
            execution: ExecutionSettings::default(),
        }
    }
}

impl HarnessConfig {
    /// Read and parse a config file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load the explicit file, else [`DEFAULT_CONFIG_FILE`] if present,
    /// else defaults.
    ///
    /// # Errors
    /// An explicit path must exist and parse; the default file only has to
    /// parse if it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    /// `ConfigError::Invalid` describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profiles.is_empty() {
            return Err(ConfigError::Invalid("at least one profile is required".to_string()));
        }
        if self.fixtures.extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "fixtures.extensions must not be empty".to_string(),
            ));
        }
        if self.fixtures.marker.trim().is_empty() {
            return Err(ConfigError::Invalid("fixtures.marker must not be empty".to_string()));
        }
        Ok(())
    }

    /// Annotated default configuration
    #[must_use]
    pub fn default_toml() -> &'static str {
        r#"# aspis-harness configuration

[toolchain]
aspis_script = "../aspis.sh"
# llvm_bin = "/usr/lib/llvm/bin"   # passed as --llvm-bin for local runs
extra_args = ["--verbose"]

[fixtures]
root = "./tests/c"
test_root = "./tests"
extensions = ["c"]
marker = "// expected output"
comment_token = "//"

[[profiles]]
name = "eddi-cfcss"
flags = ["--eddi", "--cfcss"]

[[profiles]]
name = "seddi-rasm"
flags = ["--seddi", "--rasm"]

[[profiles]]
name = "fdsc-rasm"
flags = ["--fdsc", "--rasm"]

[[profiles]]
name = "eddi-no-cfc"
flags = ["--eddi", "--no-cfc"]

[container]
program = "docker"
compose_file = "../docker/docker-compose.yml"
service = "aspis_runner"
shared_volume = "/workspace/ASPIS/tmp"
local_mount = "./tests"

[execution]
build_root = "./build/test"
timeout_secs = 300   # 0 disables the limit
jobs = 1
preview = 3
"#
    }
}
