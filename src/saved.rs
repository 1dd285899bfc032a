use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::db::KeyValueStore;
use crate::models::JobId;

pub const SAVED_JOBS_KEY: &str = "savedJobs";

/// Saved job ids, persisted as a JSON array in insertion order.
pub struct SavedJobsStore<S: KeyValueStore> {
    store: S,
    ids: Vec<JobId>,
}

impl<S: KeyValueStore> SavedJobsStore<S> {
    /// Read the persisted set once. Missing or unreadable data yields an empty set.
    pub fn load(store: S) -> Self {
        let ids = match store.get_value(SAVED_JOBS_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<Vec<JobId>>(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "saved jobs are corrupt, starting empty");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "could not read saved jobs, starting empty");
                Vec::new()
            }
        };
        debug!(count = ids.len(), "loaded saved jobs");
        Self { store, ids }
    }

    pub fn is_saved(&self, id: &JobId) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> &[JobId] {
        &self.ids
    }

    /// Flip membership and persist. Returns whether the job is now saved.
    /// A failed write is logged; the in-memory toggle stands.
    pub fn toggle(&mut self, id: &JobId) -> bool {
        let saved = match self.ids.iter().position(|existing| existing == id) {
            Some(pos) => {
                self.ids.remove(pos);
                false
            }
            None => {
                self.ids.push(id.clone());
                true
            }
        };
        if let Err(e) = self.save() {
            warn!(error = %e, job = %id, "failed to persist saved jobs");
        }
        saved
    }

    pub fn save(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.ids).context("Failed to encode saved jobs")?;
        self.store.set_value(SAVED_JOBS_KEY, &raw)
    }
}
