//! Renderer version parsing and range checks.

use std::fmt;
use std::str::FromStr;

/// A `major.minor.patch` version. Missing components are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
}

impl Version {
    /// Create a version from components.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Find the first version-looking token in tool output.
    ///
    /// Accepts output such as `vhs version v0.7.2 (abc123)`.
    pub fn extract(output: &str) -> Option<Self> {
        output
            .split_whitespace()
            .filter(|token| token.trim_start_matches('v').starts_with(|c: char| c.is_ascii_digit()))
            .find_map(|token| token.parse().ok())
    }

    /// Whether `min <= self < max`.
    pub fn within(&self, min: &Version, max: &Version) -> bool {
        min <= self && self < max
    }
}

/// Error returned when a string is not a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVersionError(String);

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid version: {}", self.0)
    }
}

impl std::error::Error for ParseVersionError {}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(s.to_owned());
        let core = s.trim().trim_start_matches('v');
        // Drop pre-release and build suffixes: 0.7.2-rc1, 0.7.2+dirty
        let core = core.split(['-', '+']).next().unwrap_or(core);

        let mut parts = core.split('.');
        let mut next = || -> Result<u64, ParseVersionError> {
            match parts.next() {
                None => Ok(0),
                Some(part) => part.parse().map_err(|_| err()),
            }
        };
        let version = Version::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!("0.5.0".parse(), Ok(Version::new(0, 5, 0)));
        assert_eq!("v0.7.2".parse(), Ok(Version::new(0, 7, 2)));
        assert_eq!("2".parse(), Ok(Version::new(2, 0, 0)));
        assert_eq!("1.2.3-rc1".parse(), Ok(Version::new(1, 2, 3)));
        assert!("1.2.3.4".parse::<Version>().is_err());
        assert!("abc".parse::<Version>().is_err());
    }

    #[test]
    fn test_extract_from_output() {
        assert_eq!(
            Version::extract("vhs version v0.7.2 (a1b2c3d)\n"),
            Some(Version::new(0, 7, 2))
        );
        assert_eq!(Version::extract("no version here"), None);
    }

    #[test]
    fn test_range_is_half_open() {
        let min = Version::new(0, 5, 0);
        let max = Version::new(2, 0, 0);
        assert!(Version::new(0, 5, 0).within(&min, &max));
        assert!(Version::new(1, 9, 9).within(&min, &max));
        assert!(!Version::new(2, 0, 0).within(&min, &max));
        assert!(!Version::new(0, 4, 9).within(&min, &max));
    }
}
