//! In-memory status record and its on-disk encoding.
//!
//! The record is keyed by the composite `(Step, Substep)`. The nested
//! name-keyed layout only exists at the [`StatusRecord::encode`] /
//! [`StatusRecord::decode`] boundary:
//!
//! ```json
//! {
//!   "INITIALIZE": {
//!     "INIT_TARGET_CLUSTER": "FAILED"
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use crate::error::Result;
use crate::idl::{Status, Step, Substep};

type Encoded = BTreeMap<String, BTreeMap<String, String>>;

/// Every recorded (step, substep) status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusRecord {
    entries: BTreeMap<(Step, Substep), Status>,
}

impl StatusRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status of a pair; `UNKNOWN_STATUS` if never written.
    pub fn get(&self, step: Step, substep: Substep) -> Status {
        self.entries
            .get(&(step, substep))
            .copied()
            .unwrap_or_default()
    }

    /// Replace the status of one pair, leaving every other pair untouched.
    pub fn set(&mut self, step: Step, substep: Substep, status: Status) {
        self.entries.insert((step, substep), status);
    }

    /// Forget one pair. Returns the status it had.
    pub fn remove(&mut self, step: Step, substep: Substep) -> Option<Status> {
        self.entries.remove(&(step, substep))
    }

    /// Every recorded substep of one step.
    pub fn step(&self, step: Step) -> BTreeMap<Substep, Status> {
        self.entries
            .range((step, Substep::UnknownSubstep)..)
            .take_while(|((s, _), _)| *s == step)
            .map(|((_, substep), status)| (*substep, *status))
            .collect()
    }

    /// Steps that have at least one recorded substep.
    pub fn steps(&self) -> Vec<Step> {
        let mut steps: Vec<Step> = self.entries.keys().map(|(step, _)| *step).collect();
        steps.dedup();
        steps
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Step, Substep, Status)> + '_ {
        self.entries
            .iter()
            .map(|((step, substep), status)| (*step, *substep, *status))
    }

    /// Serialize to the nested, name-keyed JSON layout.
    pub fn encode(&self) -> Result<String> {
        let mut nested = Encoded::new();
        for (step, substep, status) in self.iter() {
            nested
                .entry(step.as_str().to_string())
                .or_default()
                .insert(substep.as_str().to_string(), status.as_str().to_string());
        }
        Ok(serde_json::to_string_pretty(&nested)?)
    }

    /// Parse the nested, name-keyed JSON layout.
    ///
    /// Unknown step, substep or status names are an error rather than being
    /// silently dropped, so a hand-edit typo cannot make a completed substep
    /// look never-run.
    pub fn decode(text: &str) -> Result<Self> {
        let nested: Encoded = serde_json::from_str(text)?;

        let mut record = Self::new();
        for (step_name, substeps) in nested {
            let step: Step = step_name.parse()?;
            for (substep_name, status_name) in substeps {
                record.set(step, substep_name.parse()?, status_name.parse()?);
            }
        }
        Ok(record)
    }
}
