//! Parsing `git --version` output.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// `git version 2.40.1`, `git version 2.40.1.vfs.0.2`, or
/// `git version 2.42.0.windows.2`.
static GIT_VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^git version (\d+)\.(\d+)\.(\d+)(?:\.([A-Za-z][\w-]*)\.(\d+)(?:\.(\d+))?)?")
        .expect("Invalid git version regex")
});

/// An installed git's version.
///
/// Fork builds append a platform tag and one or two more numbers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub platform: Option<String>,
    pub revision: u32,
    pub minor_revision: u32,
}

impl GitVersion {
    /// Parse the output of `git --version`. Returns `None` when the output
    /// does not look like a git version.
    pub fn parse(output: &str) -> Option<Self> {
        let captures = GIT_VERSION_REGEX.captures(output.trim())?;
        let number = |idx: usize| -> Option<u32> {
            match captures.get(idx) {
                Some(m) => m.as_str().parse().ok(),
                None => Some(0),
            }
        };

        Some(Self {
            major: number(1)?,
            minor: number(2)?,
            build: number(3)?,
            platform: captures.get(4).map(|m| m.as_str().to_string()),
            revision: number(5)?,
            minor_revision: number(6)?,
        })
    }

    /// Whether this is at least `major.minor.build`.
    pub fn is_at_least(&self, major: u32, minor: u32, build: u32) -> bool {
        (self.major, self.minor, self.build) >= (major, minor, build)
    }
}

impl fmt::Display for GitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)?;
        if let Some(platform) = &self.platform {
            write!(f, ".{}.{}.{}", platform, self.revision, self.minor_revision)?;
        }
        Ok(())
    }
}
