//! Common types used across the ESCO workspace

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::LazyLock;

use crate::error::CommonError;

#[allow(clippy::expect_used)]
static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bv(\d+)\.(\d+)\.(\d+)\b").expect("version pattern is a literal")
});

#[allow(clippy::expect_used)]
static DATASET_VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"ESCO dataset\s*-\s*v(\d+)\.(\d+)\.(\d+)\b").expect("dataset pattern is a literal")
});

/// Published taxonomy version, rendered as `vMAJOR.MINOR.PATCH`.
///
/// Ordering compares `major`, then `minor`, then `patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Every `vX.Y.Z` occurrence in `text`, in document order.
    ///
    /// Components that overflow `u32` are ignored.
    pub fn find_all(text: &str) -> Vec<Version> {
        Self::captures(&VERSION_PATTERN, text)
    }

    /// Every `ESCO dataset - vX.Y.Z` release label in `text`, in document order.
    pub fn find_dataset_releases(text: &str) -> Vec<Version> {
        Self::captures(&DATASET_VERSION_PATTERN, text)
    }

    fn captures(pattern: &Regex, text: &str) -> Vec<Version> {
        pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let major = caps[1].parse().ok()?;
                let minor = caps[2].parse().ok()?;
                let patch = caps[3].parse().ok()?;
                Some(Version::new(major, minor, patch))
            })
            .collect()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::str::FromStr for Version {
    type Err = CommonError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let parts: Vec<&str> = digits.split('.').collect();
        if parts.len() != 3 {
            return Err(CommonError::InvalidVersion(s.to_string()));
        }

        let component = |part: &str| {
            part.parse::<u32>()
                .map_err(|_| CommonError::InvalidVersion(s.to_string()))
        };

        Ok(Version::new(
            component(parts[0])?,
            component(parts[1])?,
            component(parts[2])?,
        ))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
