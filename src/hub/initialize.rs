use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};

use crate::config::Connection;
use crate::error::{self, Result, UpgradeError};
use crate::hosts::{agent_conns, agent_hosts, dispatch, AgentConn};
use crate::idl::{self, Message, Response, Substep};
use crate::step::{MessageSender, Step};

use super::rsync::{mirror_directory, MASTER_EXCLUDES, ORIGINAL_MASTER_BACKUP_NAME};
use super::{required, ClusterBackend, Hub};

/// What the operator supplies to start an upgrade.
#[derive(Debug, Clone, PartialEq)]
pub struct InitializeRequest {
    pub source_install_dir: PathBuf,
    pub target_install_dir: PathBuf,
    pub source_port: u16,
    /// Minimum free disk fraction on every host; `0` skips the check.
    pub disk_free_ratio: f64,
    pub use_link_mode: bool,
}

fn ensure_versions_match(
    backend: &dyn ClusterBackend,
    agents: &[AgentConn],
    install_dir: &Path,
) -> Result<()> {
    let expected = backend.local_version(install_dir)?;

    dispatch(agents, |agent| {
        let found = backend.agent_version(agent, install_dir)?;
        if found != expected {
            return Err(UpgradeError::VersionMismatch {
                host: agent.hostname.clone(),
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    })
}

impl Hub {
    /// Learn the source cluster, bring up agents on its hosts and check
    /// they are usable.
    pub fn initialize(
        &mut self,
        request: &InitializeRequest,
        sender: Arc<dyn MessageSender>,
    ) -> Result<()> {
        let mut st = Step::begin(
            &self.config.state_dir,
            idl::Step::Initialize,
            sender,
            self.agents.clone(),
        )?;

        st.run_internal_substep(|| {
            let source_version = self.backend.local_version(&request.source_install_dir)?;
            let target_version = self.backend.local_version(&request.target_install_dir)?;
            info!("Upgrading from {} to {}", source_version, target_version);

            self.config.connection = Some(Connection::new(source_version, target_version));
            Ok(())
        });

        st.run(Substep::SavingSourceClusterConfig, |_streams| {
            let source = self.backend.fill_configuration(request)?;
            self.agents = agent_conns(&source, self.config.agent_port);

            self.config.source = Some(source);
            self.config.target_install_dir = Some(request.target_install_dir.clone());
            self.config.use_link_mode = request.use_link_mode;
            self.config.save()
        });

        // Checked as soon as the hosts are known.
        st.run_internal_substep(|| {
            let backend = self.backend.as_ref();
            ensure_versions_match(backend, &self.agents, &request.source_install_dir)?;
            ensure_versions_match(backend, &self.agents, &request.target_install_dir)
        });

        st.run(Substep::StartAgents, |_streams| {
            let source = required(&self.config.source, "source cluster")?;
            let port = self.config.agent_port;
            let state_dir = self.config.state_dir.as_path();
            let backend = self.backend.as_ref();

            dispatch(&agent_hosts(source), |host| {
                backend.restart_agent(host, port, state_dir)
            })
        });

        st.run_conditionally(
            Substep::CheckDiskSpace,
            request.disk_free_ratio > 0.0,
            |_streams| {
                let backend = self.backend.as_ref();
                let ratio = request.disk_free_ratio;
                dispatch(&self.agents, |agent| backend.check_disk_space(agent, ratio))
            },
        );

        conclude(st, None)
    }

    /// Create the intermediate target cluster, back up its master and check
    /// that the source can be upgraded into it.
    pub fn initialize_create_cluster(&mut self, sender: Arc<dyn MessageSender>) -> Result<()> {
        let mut st = Step::begin(
            &self.config.state_dir,
            idl::Step::Initialize,
            Arc::clone(&sender),
            self.agents.clone(),
        )?;

        st.run(Substep::GenerateTargetConfig, |_streams| {
            let source = required(&self.config.source, "source cluster")?;
            let install_dir = required(&self.config.target_install_dir, "target installation")?;
            let target = self.backend.generate_target_config(
                source,
                install_dir,
                &self.config.state_dir,
            )?;

            self.config.intermediate_target = Some(target);
            self.config.save()
        });

        st.run(Substep::InitTargetCluster, |streams| {
            let target = required(&self.config.intermediate_target, "intermediate target cluster")?;
            self.backend.remove_target_cluster(target, streams)?;
            self.backend.init_target_cluster(target, streams)?;

            // Needed to revert tablespaces; the target's state is unknown
            // during revert, so record it now.
            let catalog_version = self.backend.catalog_version(target, streams)?;
            self.config.target_catalog_version = Some(catalog_version);
            self.config.save()
        });

        st.run(Substep::ShutdownTargetCluster, |streams| {
            let target = required(&self.config.intermediate_target, "intermediate target cluster")?;
            self.backend.stop_cluster(target, streams)
        });

        st.run(Substep::BackupTargetMaster, |streams| {
            let target = required(&self.config.intermediate_target, "intermediate target cluster")?;
            let source_dir = target.master_data_dir().ok_or(UpgradeError::NotConfigured {
                what: "intermediate target master",
            })?;
            let backup_dir = self.config.state_dir.join(ORIGINAL_MASTER_BACKUP_NAME);

            mirror_directory(
                self.runner.as_ref(),
                streams,
                source_dir,
                &backup_dir,
                MASTER_EXCLUDES,
            )
        });

        st.always_run(Substep::CheckUpgrade, |streams| self.check_upgrade(streams));

        let source = self.config.source.as_ref();
        let response = Message::Response(Response::Initialize {
            has_mirrors: source.is_some_and(|s| s.has_mirrors()),
            has_standby: source.is_some_and(|s| s.has_standby()),
        });
        let sent = sender.send(response).err();

        conclude(st, sent)
    }
}

/// Close the step and combine everything that went wrong.
fn conclude(mut st: Step, sent: Option<UpgradeError>) -> Result<()> {
    let name = st.name();
    let finished = st.finish();

    let mut result = st.into_result();
    if let Some(e) = sent {
        result = error::append_result(result, Err(e));
    }
    let result = error::append_result(result, finished);

    if let Err(e) = &result {
        error!("{}: {}", name.as_str().to_lowercase(), e);
    }
    result
}
