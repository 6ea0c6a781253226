//! In-memory status store.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{JobStatus, StatusCounts, StatusError, StatusStore, StatusUpdate, WriteOutcome};

/// Process-lifetime status store.
///
/// Reads share the lock; each write checks the non-regression rule and
/// overwrites under the same write guard.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    records: RwLock<HashMap<String, JobStatus>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the guard cannot leave a half-written record
    // (inserts are single operations), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, JobStatus>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, JobStatus>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl StatusStore for MemoryStatusStore {
    fn put(&self, job_id: &str, update: StatusUpdate) -> Result<WriteOutcome, StatusError> {
        let mut records = self.write();

        if let Some(current) = records.get(job_id) {
            if !current.state.admits(update.state()) {
                return Ok(WriteOutcome::Absorbed);
            }
        }

        records.insert(job_id.to_string(), update.into_status());
        Ok(WriteOutcome::Applied)
    }

    fn get(&self, job_id: &str) -> Result<JobStatus, StatusError> {
        Ok(self
            .read()
            .get(job_id)
            .cloned()
            .unwrap_or_else(JobStatus::unknown))
    }

    fn counts(&self) -> Result<StatusCounts, StatusError> {
        let mut counts = StatusCounts::default();
        for status in self.read().values() {
            counts.add(status.state, 1);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::status::JobState;

    fn done(url: &str) -> StatusUpdate {
        StatusUpdate::Done {
            output_url: url.to_string(),
        }
    }

    #[test]
    fn test_get_unknown() {
        let store = MemoryStatusStore::new();
        assert_eq!(store.get("never-submitted").unwrap(), JobStatus::unknown());
    }

    #[test]
    fn test_full_lifecycle() {
        let store = MemoryStatusStore::new();

        assert_eq!(store.put("j", StatusUpdate::Queued).unwrap(), WriteOutcome::Applied);
        assert_eq!(store.get("j").unwrap().state, JobState::Queued);

        assert_eq!(store.put("j", StatusUpdate::Processing).unwrap(), WriteOutcome::Applied);
        assert_eq!(store.get("j").unwrap().state, JobState::Processing);

        assert_eq!(store.put("j", done("gs://out/r.csv")).unwrap(), WriteOutcome::Applied);
        let status = store.get("j").unwrap();
        assert_eq!(status.state, JobState::Done);
        assert_eq!(status.output_url.as_deref(), Some("gs://out/r.csv"));
    }

    #[test]
    fn test_terminal_absorbs_non_terminal() {
        let store = MemoryStatusStore::new();
        store.put("j", StatusUpdate::Queued).unwrap();
        store.put("j", done("r")).unwrap();

        assert_eq!(store.put("j", StatusUpdate::Processing).unwrap(), WriteOutcome::Absorbed);
        assert_eq!(store.put("j", StatusUpdate::Queued).unwrap(), WriteOutcome::Absorbed);

        let status = store.get("j").unwrap();
        assert_eq!(status.state, JobState::Done);
        assert_eq!(status.output_url.as_deref(), Some("r"));
    }

    #[test]
    fn test_failed_absorbs_processing() {
        let store = MemoryStatusStore::new();
        store.put("j", StatusUpdate::Failed).unwrap();
        assert_eq!(store.put("j", StatusUpdate::Processing).unwrap(), WriteOutcome::Absorbed);
        assert_eq!(store.get("j").unwrap().state, JobState::Failed);
    }

    #[test]
    fn test_terminal_overwrites_terminal() {
        let store = MemoryStatusStore::new();
        store.put("j", StatusUpdate::Failed).unwrap();
        assert_eq!(store.put("j", done("r2")).unwrap(), WriteOutcome::Applied);
        assert_eq!(store.get("j").unwrap().output_url.as_deref(), Some("r2"));
    }

    #[test]
    fn test_out_of_order_updates_never_regress() {
        let store = MemoryStatusStore::new();
        let sequence = [
            StatusUpdate::Processing,
            done("r"),
            StatusUpdate::Queued,
            StatusUpdate::Processing,
            StatusUpdate::Processing,
        ];

        let mut seen_terminal = false;
        for update in sequence {
            store.put("j", update).unwrap();
            let state = store.get("j").unwrap().state;
            if seen_terminal {
                assert!(state.is_terminal(), "regressed to {state}");
            }
            seen_terminal |= state.is_terminal();
        }
    }

    #[test]
    fn test_counts() {
        let store = MemoryStatusStore::new();
        store.put("a", StatusUpdate::Queued).unwrap();
        store.put("b", StatusUpdate::Processing).unwrap();
        store.put("c", done("r")).unwrap();
        store.put("d", StatusUpdate::Failed).unwrap();
        store.put("e", StatusUpdate::Failed).unwrap();

        let counts = store.counts().unwrap();
        assert_eq!(counts.queued, 1);
        assert_eq!(counts.processing, 1);
        assert_eq!(counts.done, 1);
        assert_eq!(counts.failed, 2);
    }

    #[test]
    fn test_concurrent_writers_never_regress() {
        let store = Arc::new(MemoryStatusStore::new());
        store.put("j", StatusUpdate::Queued).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        if i % 2 == 0 {
                            store.put("j", StatusUpdate::Processing).unwrap();
                        } else {
                            store.put("j", done("r")).unwrap();
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // At least one terminal write happened, so the final state must be terminal.
        assert_eq!(store.get("j").unwrap().state, JobState::Done);
    }
}
