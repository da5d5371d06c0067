//! Host-local execution

use super::{binary_name, ExecutionEnvironment, ToolchainSettings};
use crate::error::EnvironmentError;
use crate::process::{run_command, CommandOutput, CommandSpec};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runs the driver script and fixtures directly on the host
///
/// Build directories live under `build_root` (`./build/test` by default),
/// one per test name.
#[derive(Debug, Clone)]
pub struct LocalEnvironment {
    toolchain: ToolchainSettings,
    test_root: PathBuf,
    build_root: PathBuf,
    timeout: Option<Duration>,
}

impl LocalEnvironment {
    /// Create a local environment
    #[must_use]
    pub fn new(
        toolchain: ToolchainSettings,
        test_root: impl Into<PathBuf>,
        build_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            toolchain,
            test_root: test_root.into(),
            build_root: build_root.into(),
            timeout: None,
        }
    }

    /// Limit each compiler and binary invocation
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Compiler command line for one case
    #[must_use]
    pub fn compile_command(
        &self,
        source_file: &str,
        output_name: &str,
        options: &str,
        build_dir: &Path,
    ) -> CommandSpec {
        let mut spec = CommandSpec::new(self.toolchain.aspis_script.to_string_lossy());
        if let Some(llvm_bin) = &self.toolchain.llvm_bin {
            spec = spec.arg("--llvm-bin").arg(llvm_bin.to_string_lossy());
        }
        spec.args(options.split_whitespace())
            .arg(self.test_root.join(source_file).to_string_lossy())
            .arg("-o")
            .arg(output_name)
            .arg("--build-dir")
            .arg(build_dir.to_string_lossy())
            .args(self.toolchain.extra_args.iter().cloned())
    }
}

#[async_trait::async_trait]
impl ExecutionEnvironment for LocalEnvironment {
    fn name(&self) -> &'static str {
        "local"
    }

    fn resolve_build_dir(&self, test_name: &str) -> PathBuf {
        self.build_root.join(test_name)
    }

    async fn invoke_compiler(
        &self,
        source_file: &str,
        output_name: &str,
        options: &str,
        build_dir: &Path,
    ) -> Result<CommandOutput, EnvironmentError> {
        tokio::fs::create_dir_all(build_dir)
            .await
            .map_err(|e| EnvironmentError::io_error(build_dir, e))?;
        let spec = self.compile_command(source_file, output_name, options, build_dir);
        run_command(&spec, self.timeout).await
    }

    async fn invoke_binary(
        &self,
        build_dir: &Path,
        test_name: &str,
    ) -> Result<CommandOutput, EnvironmentError> {
        let binary = build_dir.join(binary_name(test_name));
        run_command(&CommandSpec::new(binary.to_string_lossy()), self.timeout).await
    }
}
