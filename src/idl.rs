//! Identifiers and messages exchanged with the operator session.
//!
//! [`Step`], [`Substep`] and [`Status`] each carry a stable textual name.
//! Names, not ordinals, are what get persisted and sent, so adding a variant
//! never changes the meaning of an existing record.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, UpgradeError};

macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every value, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// The persisted name of this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UpgradeError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    _ => Err(UpgradeError::UnknownName {
                        kind: $kind,
                        name: s.to_string(),
                    }),
                }
            }
        }
    };
}

named_enum! {
    /// A top-level phase of the upgrade.
    Step, "step" {
        UnknownStep => "UNKNOWN_STEP",
        Initialize => "INITIALIZE",
        Execute => "EXECUTE",
        Finalize => "FINALIZE",
        Revert => "REVERT",
    }
}

named_enum! {
    /// One named unit of work within a step.
    Substep, "substep" {
        UnknownSubstep => "UNKNOWN_SUBSTEP",
        SavingSourceClusterConfig => "SAVING_SOURCE_CLUSTER_CONFIG",
        StartAgents => "START_AGENTS",
        CheckDiskSpace => "CHECK_DISK_SPACE",
        GenerateTargetConfig => "GENERATE_TARGET_CONFIG",
        InitTargetCluster => "INIT_TARGET_CLUSTER",
        ShutdownTargetCluster => "SHUTDOWN_TARGET_CLUSTER",
        BackupTargetMaster => "BACKUP_TARGET_MASTER",
        CheckUpgrade => "CHECK_UPGRADE",
        ShutdownSourceCluster => "SHUTDOWN_SOURCE_CLUSTER",
        UpgradeMaster => "UPGRADE_MASTER",
        CopyMaster => "COPY_MASTER",
        UpgradePrimaries => "UPGRADE_PRIMARIES",
        StartTargetCluster => "START_TARGET_CLUSTER",
        UpdateTargetCatalog => "UPDATE_TARGET_CATALOG",
        UpdateDataDirectories => "UPDATE_DATA_DIRECTORIES",
        UpdateTargetConfFiles => "UPDATE_TARGET_CONF_FILES",
        UpgradeStandby => "UPGRADE_STANDBY",
        UpgradeMirrors => "UPGRADE_MIRRORS",
        StopTargetCluster => "STOP_TARGET_CLUSTER",
        DeleteTargetClusterDatadirs => "DELETE_TARGET_CLUSTER_DATADIRS",
        DeleteTablespaces => "DELETE_TABLESPACES",
        RestoreSourceCluster => "RESTORE_SOURCE_CLUSTER",
        StartSourceCluster => "START_SOURCE_CLUSTER",
        ArchiveLogDirectories => "ARCHIVE_LOG_DIRECTORIES",
        DeleteSegmentStatedirs => "DELETE_SEGMENT_STATEDIRS",
        StopHubAndAgents => "STOP_HUB_AND_AGENTS",
        DeleteMasterStatedir => "DELETE_MASTER_STATEDIR",
    }
}

named_enum! {
    /// Recorded outcome of a (step, substep) pair.
    Status, "status" {
        /// Never written; the value of any pair absent from the record.
        UnknownStatus => "UNKNOWN_STATUS",
        /// Written before execution starts.
        Running => "RUNNING",
        Complete => "COMPLETE",
        Failed => "FAILED",
        /// The substep's condition was false.
        Skipped => "SKIPPED",
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::UnknownStatus
    }
}

impl Step {
    /// Human form used in log headers, e.g. `Initialize`.
    pub fn title(&self) -> String {
        let lower = self.as_str().to_lowercase();
        let mut chars = lower.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl Status {
    /// Whether the substep is finished for good. Only `COMPLETE` is; a
    /// `FAILED` or `RUNNING` substep runs again on the next invocation.
    pub fn is_done(&self) -> bool {
        matches!(self, Status::Complete)
    }
}

/// Status update for one substep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubstepStatus {
    pub step: Step,
    pub substep: Substep,
    pub status: Status,
}

/// Which stream a chunk of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Stdout,
    Stderr,
}

/// Raw output forwarded while a substep runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub buffer: Vec<u8>,
    pub kind: ChunkKind,
}

/// Final payload of a phase invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Initialize { has_mirrors: bool, has_standby: bool },
}

/// One message on the progress stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Status(SubstepStatus),
    Chunk(Chunk),
    Response(Response),
}

impl Message {
    pub fn status(&self) -> Option<&SubstepStatus> {
        match self {
            Message::Status(status) => Some(status),
            _ => None,
        }
    }
}
