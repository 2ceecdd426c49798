//! Concurrent per-host operations.
//!
//! Cluster-wide substeps (starting agents, checking versions and disk
//! space) run the same action against every agent host with [`dispatch`].

mod agent;
mod dispatch;

pub use agent::{agent_conns, agent_hosts, AgentConn};
pub use dispatch::{dispatch, dispatch_collect};

/// Something that names a host.
pub trait Host {
    fn hostname(&self) -> &str;
}

impl Host for String {
    fn hostname(&self) -> &str {
        self
    }
}
