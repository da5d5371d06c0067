//! Instrumentation option profiles

use serde::{Deserialize, Serialize};

/// Named, ordered list of instrumentation flags
///
/// A profile is applied uniformly to every fixture in one build pass. Its
/// position in the profile list, not its name, becomes the `_v<i>` suffix of
/// generated test names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionProfile {
    /// Human-readable profile name
    pub name: String,

    /// Flags passed to the compiler, in order
    pub flags: Vec<String>,
}

impl OptionProfile {
    /// Create a new profile
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            flags: flags.into_iter().map(Into::into).collect(),
        }
    }

    /// Flags joined into the option string stored on each test case
    #[must_use]
    pub fn option_string(&self) -> String {
        self.flags.join(" ")
    }
}

/// The four ASPIS variants every fixture is built against by default
#[must_use]
pub fn default_profiles() -> Vec<OptionProfile> {
    vec![
        OptionProfile::new("eddi-cfcss", ["--eddi", "--cfcss"]),
        OptionProfile::new("seddi-rasm", ["--seddi", "--rasm"]),
        OptionProfile::new("fdsc-rasm", ["--fdsc", "--rasm"]),
        OptionProfile::new("eddi-no-cfc", ["--eddi", "--no-cfc"]),
    ]
}
