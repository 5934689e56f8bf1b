//! File-backed counter store.
//!
//! The daemon is the only writer. State lives in a single JSON record at
//! `~/.cadence/state.json`:
//!
//! ```json
//! {
//!   "state": { "dailyKey": "...", "daily": {...}, "weeklyKey": "...", "weekly": {...} },
//!   "goals": { "tweets": {...}, ... },
//!   "version": 2,
//!   "lastUpdated": "2026-08-25T12:00:00+00:00"
//! }
//! ```
//!
//! Every operation takes the store lock, reloads the record from disk,
//! applies turnover where the operation touches period state, mutates, and
//! writes back atomically (temp file + rename). Reload-per-operation keeps
//! the daemon restartable at any point and makes external edits to the file
//! visible without a restart.
//!
//! Defensive loads: a missing, empty, or corrupt file becomes a default
//! record with a warning rather than an error. A `version` newer than this
//! build understands is treated the same way; version 1 records are carried
//! forward and rewritten as version 2 on the next save.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use cadence_daemon_protocol::{Goals, GoalsPatch, Metric, Scope, Snapshot, TrackerState};

use crate::period::{apply_turnover, PeriodKeys};

pub const STORAGE_VERSION: u32 = 2;

#[derive(Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StoredRecord {
    state: TrackerState,
    goals: Goals,
    version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_updated: Option<String>,
}

impl Default for StoredRecord {
    fn default() -> Self {
        StoredRecord {
            state: TrackerState::default(),
            goals: Goals::default(),
            version: STORAGE_VERSION,
            last_updated: None,
        }
    }
}

impl StoredRecord {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state.clone(),
            goals: self.goals.clone(),
        }
    }
}

pub struct Store {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Store {
    pub fn new(path: PathBuf) -> Self {
        Store {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current counters and goals after turnover.
    pub fn get(&self, keys: &PeriodKeys) -> Result<Snapshot, String> {
        let _guard = self.guard()?;
        let mut record = self.load()?;
        if apply_turnover(&mut record.state, keys) {
            self.save(&mut record)?;
        }
        Ok(record.snapshot())
    }

    /// Applies a clamped delta to one counter. Metric names outside the
    /// schema, or metrics with no counter in the requested scope, leave the
    /// counters untouched but still answer with the current snapshot.
    pub fn bump(
        &self,
        keys: &PeriodKeys,
        metric: &str,
        amount: i64,
        scope: Scope,
    ) -> Result<Snapshot, String> {
        let _guard = self.guard()?;
        let mut record = self.load()?;
        apply_turnover(&mut record.state, keys);

        match Metric::parse(metric) {
            Some(parsed) => {
                if !record.state.bump(parsed, amount, scope) {
                    debug!(metric, ?scope, "Metric has no counter in scope; ignoring bump");
                }
            }
            None => {
                debug!(metric, "Unknown metric; ignoring bump");
            }
        }

        self.save(&mut record)?;
        Ok(record.snapshot())
    }

    /// Merges a submitted goal patch over the defaults for each known key
    /// and persists the result. Returns the merged table.
    pub fn set_goals(&self, keys: &PeriodKeys, patch: &GoalsPatch) -> Result<Goals, String> {
        let _guard = self.guard()?;
        let mut record = self.load()?;
        apply_turnover(&mut record.state, keys);
        record.goals.merge_patch(patch);
        self.save(&mut record)?;
        Ok(record.goals.clone())
    }

    /// Zeroes both scopes and re-tags them with the current periods. Goals
    /// are preserved.
    pub fn reset(&self, keys: &PeriodKeys) -> Result<Snapshot, String> {
        let _guard = self.guard()?;
        let mut record = self.load()?;
        record.state = TrackerState {
            daily_key: Some(keys.daily.clone()),
            weekly_key: Some(keys.weekly.clone()),
            ..TrackerState::default()
        };
        self.save(&mut record)?;
        Ok(record.snapshot())
    }

    /// The persisted pair as stored, without turnover. Backups should
    /// capture what is on disk, not a freshly rolled-over view.
    pub fn export(&self) -> Result<Snapshot, String> {
        let _guard = self.guard()?;
        let record = self.load()?;
        Ok(record.snapshot())
    }

    /// Replaces counters and goals wholesale. Validation happens at the
    /// protocol layer; the next read re-tags stale periods.
    pub fn import(&self, snapshot: Snapshot) -> Result<(), String> {
        let _guard = self.guard()?;
        let mut record = self.load()?;
        record.state = snapshot.state;
        record.goals = snapshot.goals;
        self.save(&mut record)
    }

    /// Turnover without a client request, for the periodic sweep. Returns
    /// whether anything rolled over.
    pub fn run_turnover(&self, keys: &PeriodKeys) -> Result<bool, String> {
        let _guard = self.guard()?;
        let mut record = self.load()?;
        let changed = apply_turnover(&mut record.state, keys);
        if changed {
            self.save(&mut record)?;
        }
        Ok(changed)
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, String> {
        self.lock
            .lock()
            .map_err(|_| "Store lock poisoned".to_string())
    }

    fn load(&self) -> Result<StoredRecord, String> {
        if !self.path.exists() {
            return Ok(StoredRecord::default());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|err| format!("Failed to read state file: {}", err))?;

        if content.trim().is_empty() {
            warn!(path = %self.path.display(), "Empty state file; starting from defaults");
            return Ok(StoredRecord::default());
        }

        match serde_json::from_str::<StoredRecord>(&content) {
            Ok(record) if record.version == STORAGE_VERSION => Ok(record),
            Ok(record) if record.version < STORAGE_VERSION => {
                // Nothing structural changed between 1 and 2; carry the data
                // and rewrite the version on the next save.
                info!(
                    from = record.version,
                    to = STORAGE_VERSION,
                    "Migrating state file version"
                );
                Ok(record)
            }
            Ok(record) => {
                warn!(
                    version = record.version,
                    supported = STORAGE_VERSION,
                    "State file version is newer than this daemon; starting from defaults"
                );
                Ok(StoredRecord::default())
            }
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Failed to parse state file; starting from defaults"
                );
                Ok(StoredRecord::default())
            }
        }
    }

    fn save(&self, record: &mut StoredRecord) -> Result<(), String> {
        record.version = STORAGE_VERSION;
        record.last_updated = Some(Utc::now().to_rfc3339());

        let parent = self
            .path
            .parent()
            .ok_or_else(|| "State file path has no parent directory".to_string())?;
        fs::create_dir_all(parent)
            .map_err(|err| format!("Failed to create state directory: {}", err))?;

        let content = serde_json::to_string_pretty(record)
            .map_err(|err| format!("Failed to serialize state: {}", err))?;

        let mut temp_file = NamedTempFile::new_in(parent)
            .map_err(|err| format!("Temp file error: {}", err))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|err| format!("Failed to write temp state file: {}", err))?;
        temp_file
            .flush()
            .map_err(|err| format!("Failed to flush temp state file: {}", err))?;
        temp_file
            .persist(&self.path)
            .map_err(|err| format!("Failed to write state file: {}", err.error))?;

        Ok(())
    }
}
