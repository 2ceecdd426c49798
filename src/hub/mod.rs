//! The coordinator: runs upgrade phases as sequences of substeps.
//!
//! - [`Hub::initialize`] - learn the source cluster and prepare the agents
//! - [`Hub::initialize_create_cluster`] - create and check the intermediate target
//!
//! Everything that touches a real cluster goes through [`ClusterBackend`]
//! or a [`CommandRunner`]; both are injected.

mod check;
mod initialize;
mod rsync;
mod upgrade_master;

pub use initialize::InitializeRequest;
pub use rsync::{mirror_directory, MASTER_EXCLUDES, ORIGINAL_MASTER_BACKUP_NAME};
pub use upgrade_master::{
    upgrade_master, upgrade_work_dir, UpgradeMasterArgs, CHECK_NEXT_ACTION, UPGRADE_TOOL,
};

use std::path::Path;
use std::sync::Arc;

use crate::cluster::{Cluster, Version};
use crate::config::HubConfig;
use crate::error::{Result, UpgradeError};
use crate::exec::CommandRunner;
use crate::hosts::{agent_conns, AgentConn};
use crate::step::OutStreams;

/// Operations on clusters and agents that the hub delegates.
///
/// Methods taking an [`AgentConn`] are called concurrently for many hosts.
pub trait ClusterBackend: Send + Sync {
    /// Version of the installation at `install_dir` on this host.
    fn local_version(&self, install_dir: &Path) -> Result<Version>;

    /// Query the running source cluster for its topology.
    fn fill_configuration(&self, request: &InitializeRequest) -> Result<Cluster>;

    /// Version of the installation at `install_dir` on an agent's host.
    fn agent_version(&self, agent: &AgentConn, install_dir: &Path) -> Result<Version>;

    /// (Re)start the agent on `host`.
    fn restart_agent(&self, host: &str, port: u16, state_dir: &Path) -> Result<()>;

    /// Fail unless the host keeps at least `ratio` of its disk free.
    fn check_disk_space(&self, agent: &AgentConn, ratio: f64) -> Result<()>;

    /// Lay out the intermediate target cluster for `source`.
    fn generate_target_config(
        &self,
        source: &Cluster,
        target_install_dir: &Path,
        state_dir: &Path,
    ) -> Result<Cluster>;

    /// Remove any earlier attempt at the intermediate target.
    fn remove_target_cluster(&self, target: &Cluster, streams: &mut dyn OutStreams) -> Result<()>;

    fn init_target_cluster(&self, target: &Cluster, streams: &mut dyn OutStreams) -> Result<()>;

    fn stop_cluster(&self, cluster: &Cluster, streams: &mut dyn OutStreams) -> Result<()>;

    /// Catalog version of the cluster's master.
    fn catalog_version(&self, cluster: &Cluster, streams: &mut dyn OutStreams) -> Result<String>;

    /// Run the upgrade check for the primaries on an agent's host.
    fn check_upgrade(&self, agent: &AgentConn) -> Result<()>;
}

pub struct Hub {
    pub config: HubConfig,
    backend: Box<dyn ClusterBackend>,
    runner: Arc<dyn CommandRunner>,
    agents: Vec<AgentConn>,
}

impl Hub {
    pub fn new(
        config: HubConfig,
        backend: Box<dyn ClusterBackend>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let agents = config
            .source
            .as_ref()
            .map(|source| agent_conns(source, config.agent_port))
            .unwrap_or_default();

        Self {
            config,
            backend,
            runner,
            agents,
        }
    }

    /// Agents of the source cluster, once known.
    pub fn agents(&self) -> &[AgentConn] {
        &self.agents
    }

    pub fn state_dir(&self) -> &Path {
        &self.config.state_dir
    }

    pub fn save_config(&self) -> Result<()> {
        self.config.save()
    }
}

/// The value of a config field an earlier substep should have filled.
fn required<'a, T>(value: &'a Option<T>, what: &'static str) -> Result<&'a T> {
    value.as_ref().ok_or(UpgradeError::NotConfigured { what })
}
