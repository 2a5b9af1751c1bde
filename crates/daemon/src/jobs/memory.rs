use anyhow::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{JobKind, JobRecord, JobStore};

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, JobRecord>>> {
        self.jobs
            .lock()
            .map_err(|_| anyhow::anyhow!("job table lock poisoned"))
    }
}

impl JobStore for MemoryJobStore {
    fn create(&self, kind: JobKind) -> Result<JobRecord> {
        let record = JobRecord::new(kind);
        self.lock()?.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn get(&self, id: &str) -> Result<Option<JobRecord>> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn update(&self, id: &str, change: &mut dyn FnMut(&mut JobRecord)) -> Result<bool> {
        let mut jobs = self.lock()?;
        match jobs.get_mut(id) {
            Some(record) => {
                change(record);
                record.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn list(&self) -> Result<Vec<JobRecord>> {
        let mut records: Vec<JobRecord> = self.lock()?.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn remove(&self, id: &str) -> Result<bool> {
        Ok(self.lock()?.remove(id).is_some())
    }
}
