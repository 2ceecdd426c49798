//! Persistent substep status storage.
//!
//! [`SubstepFileStore`] keeps the [`StatusRecord`] in a JSON file under the
//! coordinator's state directory. Every write is a read-modify-write of the
//! whole record, serialized by an in-process lock and committed with an
//! atomic rename, so a crash never leaves a half-written record behind.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::error::{Result, UpgradeError};
use crate::idl::{Status, Step, Substep};

use super::StatusRecord;

/// File name of the status record inside the state directory.
pub const SUBSTEPS_FILE_NAME: &str = "substeps.json";

/// Durable (step, substep) → status storage.
pub trait SubstepStore: Send {
    /// Status of one pair.
    ///
    /// Returns `UNKNOWN_STATUS` for a pair never written, and
    /// [`UpgradeError::StoreNotFound`] if the record itself does not exist.
    fn read(&self, step: Step, substep: Substep) -> Result<Status>;

    /// Every recorded substep of one step, or `None` if the step has no
    /// entries. Fails like [`SubstepStore::read`] if the record is missing.
    fn read_step(&self, step: Step) -> Result<Option<BTreeMap<Substep, Status>>>;

    /// Persist one pair, creating the record if needed. Durable once this
    /// returns `Ok`.
    fn write(&self, step: Step, substep: Substep, status: Status) -> Result<()>;

    /// Forget one pair so it reads as never run.
    fn clear(&self, step: Step, substep: Substep) -> Result<()>;
}

/// JSON-file backed [`SubstepStore`].
#[derive(Debug)]
pub struct SubstepFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SubstepFileStore {
    /// Use the record at `path`. Nothing is touched until the first call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Use `<state_dir>/substeps.json`.
    pub fn in_state_dir(state_dir: &Path) -> Self {
        Self::new(state_dir.join(SUBSTEPS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the whole record.
    pub fn load(&self) -> Result<StatusRecord> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(UpgradeError::StoreNotFound {
                    path: self.path.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        StatusRecord::decode(&content).map_err(|e| UpgradeError::StoreCorrupt {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Write an empty record unless one already exists.
    pub fn initialize(&self) -> Result<()> {
        let _guard = self.guard();
        match self.load() {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => self.save(&StatusRecord::new()),
            Err(e) => Err(e),
        }
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read-modify-write under the lock.
    fn update(&self, f: impl FnOnce(&mut StatusRecord)) -> Result<()> {
        let _guard = self.guard();

        let mut record = match self.load() {
            Ok(record) => record,
            Err(UpgradeError::StoreNotFound { .. }) => StatusRecord::new(),
            Err(e) => return Err(e),
        };
        f(&mut record);
        self.save(&record)
    }

    /// Save using atomic write.
    ///
    /// Writes to a temp file, syncs it, then renames it over the record.
    fn save(&self, record: &StatusRecord) -> Result<()> {
        let content = record.encode()?;

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

impl SubstepStore for SubstepFileStore {
    fn read(&self, step: Step, substep: Substep) -> Result<Status> {
        Ok(self.load()?.get(step, substep))
    }

    fn read_step(&self, step: Step) -> Result<Option<BTreeMap<Substep, Status>>> {
        let section = self.load()?.step(step);
        if section.is_empty() {
            Ok(None)
        } else {
            Ok(Some(section))
        }
    }

    fn write(&self, step: Step, substep: Substep, status: Status) -> Result<()> {
        debug!("Recording {}/{} as {}", step, substep, status);
        self.update(|record| record.set(step, substep, status))
    }

    fn clear(&self, step: Step, substep: Substep) -> Result<()> {
        self.update(|record| {
            record.remove(step, substep);
        })
    }
}

/// In-memory [`SubstepStore`] for tests and dry runs.
///
/// Starts initialized and empty. Writes can be made to fail to exercise
/// persistence-error handling.
#[derive(Debug)]
pub struct MemoryStore {
    record: Mutex<Option<StatusRecord>>,
    fail_writes: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_record(StatusRecord::new())
    }

    /// A store whose record does not exist yet.
    pub fn uninitialized() -> Self {
        Self {
            record: Mutex::new(None),
            fail_writes: false,
        }
    }

    pub fn with_record(record: StatusRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
            fail_writes: false,
        }
    }

    /// Make every subsequent write fail with an I/O error.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Copy of the current record.
    pub fn snapshot(&self) -> StatusRecord {
        self.guard().clone().unwrap_or_default()
    }

    fn guard(&self) -> MutexGuard<'_, Option<StatusRecord>> {
        self.record
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn loaded(&self) -> Result<StatusRecord> {
        self.guard().clone().ok_or_else(|| UpgradeError::StoreNotFound {
            path: PathBuf::from("<memory>"),
        })
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            return Err(std::io::Error::new(ErrorKind::PermissionDenied, "store is read-only").into());
        }
        Ok(())
    }
}

impl SubstepStore for MemoryStore {
    fn read(&self, step: Step, substep: Substep) -> Result<Status> {
        Ok(self.loaded()?.get(step, substep))
    }

    fn read_step(&self, step: Step) -> Result<Option<BTreeMap<Substep, Status>>> {
        let section = self.loaded()?.step(step);
        Ok(if section.is_empty() { None } else { Some(section) })
    }

    fn write(&self, step: Step, substep: Substep, status: Status) -> Result<()> {
        self.check_writable()?;
        self.guard()
            .get_or_insert_with(StatusRecord::new)
            .set(step, substep, status);
        Ok(())
    }

    fn clear(&self, step: Step, substep: Substep) -> Result<()> {
        self.check_writable()?;
        if let Some(record) = self.guard().as_mut() {
            record.remove(step, substep);
        }
        Ok(())
    }
}

impl<S: SubstepStore + Sync> SubstepStore for std::sync::Arc<S> {
    fn read(&self, step: Step, substep: Substep) -> Result<Status> {
        (**self).read(step, substep)
    }

    fn read_step(&self, step: Step) -> Result<Option<BTreeMap<Substep, Status>>> {
        (**self).read_step(step)
    }

    fn write(&self, step: Step, substep: Substep, status: Status) -> Result<()> {
        (**self).write(step, substep, status)
    }

    fn clear(&self, step: Step, substep: Substep) -> Result<()> {
        (**self).clear(step, substep)
    }
}
