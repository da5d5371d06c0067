//! Containerized execution through docker compose
//!
//! The compiler runs inside the `aspis_runner` service. The test tree is
//! mounted at `shared_volume` in the container and at `local_mount` on the
//! host, so fixture paths are rewritten into the container's view before
//! compiling and build directories are rewritten back before running the
//! artifact on the host.

use super::{binary_name, ExecutionEnvironment, ToolchainSettings};
use crate::error::EnvironmentError;
use crate::process::{run_command, CommandOutput, CommandSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Container backend settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// Container CLI
    pub program: String,

    /// Compose file declaring the runner service
    pub compose_file: PathBuf,

    /// Service that wraps the ASPIS driver
    pub service: String,

    /// Mount point of the test tree inside the container
    pub shared_volume: PathBuf,

    /// The same tree as seen from the host
    pub local_mount: PathBuf,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
            compose_file: PathBuf::from("../docker/docker-compose.yml"),
            service: "aspis_runner".to_string(),
            shared_volume: PathBuf::from("/workspace/ASPIS/tmp"),
            local_mount: PathBuf::from("./tests"),
        }
    }
}

/// Proxies compilation through `docker compose run`
#[derive(Debug, Clone)]
pub struct ContainerEnvironment {
    toolchain: ToolchainSettings,
    settings: ContainerSettings,
    timeout: Option<Duration>,
}

impl ContainerEnvironment {
    /// Create a containerized environment
    #[must_use]
    pub fn new(toolchain: ToolchainSettings, settings: ContainerSettings) -> Self {
        Self {
            toolchain,
            settings,
            timeout: None,
        }
    }

    /// Limit each compiler and binary invocation
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Host path for a path under the shared volume.
    ///
    /// Paths outside the volume are returned unchanged.
    #[must_use]
    pub fn to_host_path(&self, container_path: &Path) -> PathBuf {
        container_path
            .strip_prefix(&self.settings.shared_volume)
            .map_or_else(|_| container_path.to_path_buf(), |rest| self.settings.local_mount.join(rest))
    }

    /// Compiler command line for one case.
    ///
    /// Runs from the compose file's directory so the compose project
    /// resolves its relative paths.
    #[must_use]
    pub fn compile_command(
        &self,
        source_file: &str,
        output_name: &str,
        options: &str,
        build_dir: &Path,
    ) -> CommandSpec {
        let compose = &self.settings.compose_file;
        let compose_name = compose
            .file_name()
            .map_or_else(|| compose.to_string_lossy(), |name| name.to_string_lossy());

        let mut spec = CommandSpec::new(self.settings.program.clone())
            .args(["compose", "-f"])
            .arg(compose_name)
            .args(["run", "--rm"])
            .arg(self.settings.service.clone())
            .arg(self.settings.shared_volume.join(source_file).to_string_lossy())
            .args(options.split_whitespace())
            .arg("-o")
            .arg(output_name)
            .arg("--build-dir")
            .arg(build_dir.to_string_lossy())
            .args(self.toolchain.extra_args.iter().cloned());

        if let Some(dir) = compose.parent().filter(|p| !p.as_os_str().is_empty()) {
            spec = spec.current_dir(dir);
        }
        spec
    }
}

#[async_trait::async_trait]
impl ExecutionEnvironment for ContainerEnvironment {
    fn name(&self) -> &'static str {
        "container"
    }

    fn resolve_build_dir(&self, test_name: &str) -> PathBuf {
        self.settings.shared_volume.join("build").join(test_name)
    }

    async fn invoke_compiler(
        &self,
        source_file: &str,
        output_name: &str,
        options: &str,
        build_dir: &Path,
    ) -> Result<CommandOutput, EnvironmentError> {
        let spec = self.compile_command(source_file, output_name, options, build_dir);
        run_command(&spec, self.timeout).await
    }

    async fn invoke_binary(
        &self,
        build_dir: &Path,
        test_name: &str,
    ) -> Result<CommandOutput, EnvironmentError> {
        let binary = self.to_host_path(build_dir).join(binary_name(test_name));
        run_command(&CommandSpec::new(binary.to_string_lossy()), self.timeout).await
    }
}
