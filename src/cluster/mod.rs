//! Cluster topology: the segments making up a source or target cluster.
//!
//! The master is the segment with content id [`MASTER_CONTENT_ID`] in the
//! primary role; its mirror is the standby.

mod version;

pub use version::Version;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Content id shared by the master and its standby.
pub const MASTER_CONTENT_ID: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Primary,
    Mirror,
}

/// One database instance of the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub content_id: i32,
    pub dbid: i32,
    pub role: Role,
    pub hostname: String,
    pub port: u16,
    pub data_dir: PathBuf,
}

impl Segment {
    pub fn is_master(&self) -> bool {
        self.content_id == MASTER_CONTENT_ID && self.role == Role::Primary
    }

    pub fn is_standby(&self) -> bool {
        self.content_id == MASTER_CONTENT_ID && self.role == Role::Mirror
    }
}

/// A cluster installation and its segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Installation root; binaries live under `bin/`.
    pub install_dir: PathBuf,
    pub version: Version,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl Cluster {
    pub fn new(install_dir: impl Into<PathBuf>, version: Version) -> Self {
        Self {
            install_dir: install_dir.into(),
            version,
            segments: Vec::new(),
        }
    }

    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.install_dir.join("bin")
    }

    pub fn master(&self) -> Option<&Segment> {
        self.segments.iter().find(|s| s.is_master())
    }

    pub fn standby(&self) -> Option<&Segment> {
        self.segments.iter().find(|s| s.is_standby())
    }

    pub fn master_data_dir(&self) -> Option<&Path> {
        self.master().map(|s| s.data_dir.as_path())
    }

    pub fn has_standby(&self) -> bool {
        self.standby().is_some()
    }

    /// Whether any non-master segment has a mirror.
    pub fn has_mirrors(&self) -> bool {
        self.segments
            .iter()
            .any(|s| s.content_id != MASTER_CONTENT_ID && s.role == Role::Mirror)
    }

    /// Hostnames carrying at least one segment other than the master, sorted
    /// and de-duplicated. The standby's host is included.
    pub fn segment_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .segments
            .iter()
            .filter(|s| !s.is_master())
            .map(|s| s.hostname.clone())
            .collect();
        hosts.sort();
        hosts.dedup();
        hosts
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn segment(content_id: i32, dbid: i32, role: Role, host: &str) -> Segment {
        Segment {
            content_id,
            dbid,
            role,
            hostname: host.to_string(),
            port: 15432 + dbid as u16,
            data_dir: PathBuf::from(format!("/data/seg{}", content_id)),
        }
    }

    pub(crate) fn sample_cluster() -> Cluster {
        Cluster::new("/usr/local/gpdb6", Version::new(6, 20, 3))
            .with_segment(segment(-1, 1, Role::Primary, "mdw"))
            .with_segment(segment(-1, 8, Role::Mirror, "smdw"))
            .with_segment(segment(0, 2, Role::Primary, "sdw2"))
            .with_segment(segment(1, 3, Role::Primary, "sdw1"))
            .with_segment(segment(0, 4, Role::Mirror, "sdw1"))
            .with_segment(segment(1, 5, Role::Mirror, "sdw2"))
    }

    #[test]
    fn finds_master_and_standby() {
        let cluster = sample_cluster();
        assert_eq!(cluster.master().unwrap().dbid, 1);
        assert_eq!(cluster.standby().unwrap().dbid, 8);
        assert_eq!(cluster.master_data_dir(), Some(Path::new("/data/seg-1")));
        assert!(cluster.has_standby());
        assert!(cluster.has_mirrors());
    }

    #[test]
    fn segment_hosts_exclude_master_and_repeat() {
        assert_eq!(sample_cluster().segment_hosts(), vec!["sdw1", "sdw2", "smdw"]);
    }

    #[test]
    fn cluster_without_mirrors() {
        let cluster = Cluster::new("/usr/local/gpdb5", Version::new(5, 28, 1))
            .with_segment(segment(-1, 1, Role::Primary, "mdw"))
            .with_segment(segment(0, 2, Role::Primary, "mdw"));

        assert!(!cluster.has_mirrors());
        assert!(!cluster.has_standby());
        assert_eq!(cluster.segment_hosts(), vec!["mdw"]);
        assert_eq!(cluster.bin_dir(), PathBuf::from("/usr/local/gpdb5/bin"));
    }
}
