//! Migration version tags
//!
//! A version is written as `major.minor.patch`. Missing trailing components
//! read as zero, so `"2"` and `"2.0"` both denote `2.0.0`. Versions order
//! numerically component by component, which is the order jobs run in.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A semver-like version, stamped on every target record as its Version Tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    major: u64,
    minor: u64,
    patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    /// Parse a version string
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_version("version cannot be empty"));
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() > 3 {
            return Err(Error::invalid_version(format!(
                "'{}' has more than three components",
                trimmed
            )));
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| {
                Error::invalid_version(format!("'{}' is not a number in '{}'", part, trimmed))
            })?;
        }

        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Version {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_and_short_forms() {
        assert_eq!(Version::parse("1.1.0").unwrap(), Version::new(1, 1, 0));
        assert_eq!(Version::parse("2").unwrap(), Version::new(2, 0, 0));
        assert_eq!(Version::parse(" 2.3 ").unwrap(), Version::new(2, 3, 0));

        let short = Version::parse("4.7").unwrap();
        assert_eq!((short.major(), short.minor(), short.patch()), (4, 7, 0));
    }

    #[test]
    fn test_ordering_is_numeric() {
        let v1_9 = Version::parse("1.9.0").unwrap();
        let v1_10 = Version::parse("1.10.0").unwrap();
        assert!(v1_10 > v1_9);
        assert!(Version::new(2, 0, 0) > Version::new(1, 99, 99));
        assert!(Version::new(1, 0, 1) > Version::new(1, 0, 0));
    }

    #[test]
    fn test_display_is_canonical_tag() {
        assert_eq!(Version::parse("1.1").unwrap().to_string(), "1.1.0");
        let tag: String = Version::new(2, 0, 0).into();
        assert_eq!(tag, "2.0.0");
    }

    #[test]
    fn test_rejects_malformed_versions() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1.x.0").is_err());
        assert!(Version::parse("1.0.0.0").is_err());
        assert!(Version::parse("-1.0.0").is_err());
    }

    #[test]
    fn test_serde_uses_string_form() {
        let json = serde_json::to_string(&Version::new(1, 1, 0)).unwrap();
        assert_eq!(json, "\"1.1.0\"");
        let parsed: Version = serde_json::from_str("\"2.0\"").unwrap();
        assert_eq!(parsed, Version::new(2, 0, 0));
        assert!(serde_json::from_str::<Version>("\"oops\"").is_err());
    }
}
