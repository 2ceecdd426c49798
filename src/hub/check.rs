use std::thread;

use crate::error::{self, Result, UpgradeError};
use crate::hosts::dispatch;
use crate::step::OutStreams;

use super::upgrade_master::{upgrade_master, UpgradeMasterArgs};
use super::{required, Hub};

impl Hub {
    /// Check that the source can be upgraded into the intermediate target.
    ///
    /// The master (here) and the primaries (through the agents) are checked
    /// at the same time; failures from both sides are reported.
    pub fn check_upgrade(&self, streams: &mut dyn OutStreams) -> Result<()> {
        let source = required(&self.config.source, "source cluster")?;
        let intermediate = required(&self.config.intermediate_target, "intermediate target cluster")?;
        let backend = self.backend.as_ref();
        let agents = self.agents.as_slice();

        thread::scope(|scope| {
            let primaries = scope.spawn(|| dispatch(agents, |agent| backend.check_upgrade(agent)));

            let master = upgrade_master(UpgradeMasterArgs {
                source,
                intermediate,
                state_dir: &self.config.state_dir,
                runner: self.runner.as_ref(),
                streams,
                check_only: true,
                use_link_mode: self.config.use_link_mode,
            });

            let primaries = primaries.join().unwrap_or_else(|_| {
                Err(UpgradeError::HostPanicked {
                    message: "primary upgrade check".to_string(),
                })
            });

            error::append_result(master, primaries)
        })
    }
}
