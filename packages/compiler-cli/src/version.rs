//! Compiler version, and the version-mismatch guard: if a locally-installed
//! compiler resolves under the main file's directory and is not identical
//! (by real path) to the currently executing compiler, loading aborts with
//! a fatal diagnostic naming the expected local launcher. `VERSION` comes
//! from `CARGO_PKG_VERSION`, parsed into a small semver-ish `Version`
//! struct.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub prerelease: Option<String>,
}

impl Version {
    pub fn parse(version: &str) -> Option<Self> {
        let mut parts = version.splitn(2, '-');
        let version_part = parts.next()?;
        let prerelease = parts.next().map(str::to_string);

        let mut nums = version_part.split('.');
        Some(Version {
            major: nums.next()?.parse().ok()?,
            minor: nums.next()?.parse().ok()?,
            patch: nums.next()?.parse().ok()?,
            prerelease,
        })
    }

    pub fn current() -> Self {
        Self::parse(VERSION).unwrap_or(Version { major: 0, minor: 1, patch: 0, prerelease: None })
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

/// Result of the loader's compiler-version-mismatch check: a locally
/// resolved compiler binary whose real path differs from the currently
/// executing one aborts loading.
#[derive(Debug, Clone)]
pub struct LocalCompilerMismatch {
    pub expected_launcher: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_prerelease_version() {
        let v = Version::parse("1.2.3-beta.1").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.patch, 3);
        assert_eq!(v.prerelease.as_deref(), Some("beta.1"));
    }

    #[test]
    fn display_round_trips_plain_versions() {
        let v = Version::parse("0.10.4").unwrap();
        assert_eq!(v.to_string(), "0.10.4");
    }
}
