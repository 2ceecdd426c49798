//! Database software versions.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::error::{Result, UpgradeError};

static RE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").unwrap());

/// A `major.minor.patch` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Find the first `N.N.N` in a tool's version banner.
    ///
    /// ```
    /// use clusterup::cluster::Version;
    ///
    /// let v = Version::parse("postgres (Greenplum Database) 6.20.3 build commit:abc").unwrap();
    /// assert_eq!(v, Version::new(6, 20, 3));
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let caps = RE_VERSION
            .captures(text)
            .ok_or_else(|| UpgradeError::UnknownName {
                kind: "version",
                name: text.trim().to_string(),
            })?;

        let part = |i: usize| -> Result<u32> {
            caps[i].parse().map_err(|_| UpgradeError::UnknownName {
                kind: "version",
                name: text.trim().to_string(),
            })
        };

        Ok(Self::new(part(1)?, part(2)?, part(3)?))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
