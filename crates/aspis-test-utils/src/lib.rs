//! Testing utilities for the ASPIS harness workspace
//!
//! Shared fixture trees, sample cases and a stand-in compiler driver.

#![allow(missing_docs)]

use aspis_matrix::{ScanSettings, TestCase, TestMatrix};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Shell script accepted by the local environment in place of `aspis.sh`.
///
/// It "compiles" a fixture by copying it into the build directory as an
/// executable, so fixtures written as shell scripts run directly. The flag
/// `--fail` makes it exit 1, `--hang` makes it sleep.
pub const FAKE_ASPIS: &str = r#"#!/bin/sh
out=""
build=""
src=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    --build-dir) build="$2"; shift 2 ;;
    --llvm-bin) shift 2 ;;
    --fail) echo "instrumentation pass crashed" >&2; exit 1 ;;
    --hang) sleep 30; exit 0 ;;
    -*) shift ;;
    *) src="$1"; shift ;;
  esac
done
mkdir -p "$build"
cp "$src" "$build/$out"
chmod +x "$build/$out"
"#;

/// Temporary `tests/` tree with a `c/` fixture root
pub struct FixtureTree {
    dir: TempDir,
}

impl FixtureTree {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("tests/c")).unwrap();
        Self { dir }
    }

    /// Temp directory holding `tests/`
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn test_root(&self) -> PathBuf {
        self.dir.path().join("tests")
    }

    pub fn fixture_root(&self) -> PathBuf {
        self.test_root().join("c")
    }

    /// Write a file relative to the fixture root
    pub fn add(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.fixture_root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Write a C fixture with an expected-output annotation
    pub fn annotated(&self, relative: &str, expected: &str) -> PathBuf {
        self.add(
            relative,
            &format!("int main(void) {{ return 0; }}\n\n// expected output\n// {expected}\n"),
        )
    }

    /// Write a shell fixture that prints `stdout` and exits with `code`
    pub fn script(&self, relative: &str, stdout: &str, code: i32, expected: &str) -> PathBuf {
        self.add(
            relative,
            &format!("#!/bin/sh\nprintf '%s\\n' '{stdout}'\nexit {code}\n// expected output\n// {expected}\n"),
        )
    }

    pub fn settings(&self) -> ScanSettings {
        ScanSettings {
            root: self.fixture_root(),
            test_root: self.test_root(),
            ..ScanSettings::default()
        }
    }

    /// Install [`FAKE_ASPIS`] as an executable and return its path
    #[cfg(unix)]
    pub fn fake_compiler(&self) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.dir.path().join("aspis.sh");
        fs::write(&path, FAKE_ASPIS).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}

impl Default for FixtureTree {
    fn default() -> Self {
        Self::new()
    }
}

pub fn sample_case(test_name: &str, options: &str) -> TestCase {
    TestCase::new(test_name, "c/add.c", "7", options)
}

pub fn matrix_of(cases: &[(&str, &str)]) -> TestMatrix {
    cases.iter().map(|(name, options)| sample_case(name, options)).collect()
}
