use serde::{Deserialize, Serialize};

use crate::cluster::Cluster;

use super::Host;

/// Address of the per-host agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConn {
    pub hostname: String,
    pub port: u16,
}

impl AgentConn {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }

    /// `host:port`, as used to reach the agent.
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

impl Host for AgentConn {
    fn hostname(&self) -> &str {
        &self.hostname
    }
}

/// Hosts that run an agent for `cluster`: every host carrying a segment
/// other than the master.
pub fn agent_hosts(cluster: &Cluster) -> Vec<String> {
    cluster.segment_hosts()
}

/// Agent addresses for `cluster`, all on `port`.
pub fn agent_conns(cluster: &Cluster, port: u16) -> Vec<AgentConn> {
    agent_hosts(cluster)
        .into_iter()
        .map(|host| AgentConn::new(host, port))
        .collect()
}
