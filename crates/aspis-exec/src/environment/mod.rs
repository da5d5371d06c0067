//! Execution environments
//!
//! An environment decides *where* the compiler and the compiled fixture run
//! and owns every path translation that implies. The pipeline only talks to
//! the [`ExecutionEnvironment`] trait; the local/containerized choice is made
//! once, when the environment is constructed.

mod container;
mod local;

pub use container::{ContainerEnvironment, ContainerSettings};
pub use local::LocalEnvironment;

use crate::error::EnvironmentError;
use crate::process::CommandOutput;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Toolchain invocation settings shared by both environments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// ASPIS driver script
    pub aspis_script: PathBuf,

    /// LLVM bin directory passed as `--llvm-bin` (local only)
    pub llvm_bin: Option<PathBuf>,

    /// Arguments appended to every compiler invocation
    pub extra_args: Vec<String>,
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        Self {
            aspis_script: PathBuf::from("../aspis.sh"),
            llvm_bin: None,
            extra_args: vec!["--verbose".to_string()],
        }
    }
}

/// Where and how toolchain and fixture commands run
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ExecutionEnvironment: Send + Sync {
    /// Short name for logs and reports
    fn name(&self) -> &'static str;

    /// Build directory for a case, as the compiler sees it
    fn resolve_build_dir(&self, test_name: &str) -> PathBuf;

    /// Compile one fixture.
    ///
    /// `source_file` is relative to the test root; the environment maps it
    /// to the path its compiler can reach.
    async fn invoke_compiler(
        &self,
        source_file: &str,
        output_name: &str,
        options: &str,
        build_dir: &Path,
    ) -> Result<CommandOutput, EnvironmentError>;

    /// Run the artifact `<test_name>.out` produced in `build_dir`
    async fn invoke_binary(
        &self,
        build_dir: &Path,
        test_name: &str,
    ) -> Result<CommandOutput, EnvironmentError>;
}

/// Artifact file name for a case
#[inline]
#[must_use]
pub fn binary_name(test_name: &str) -> String {
    format!("{test_name}.out")
}
