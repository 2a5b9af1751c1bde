use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::pipeline::Stage;

pub mod memory;
pub mod processor;

pub use memory::MemoryJobStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Video,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    pub logs: Vec<String>,
    pub output_file: Option<PathBuf>,
    pub failure_stage: Option<Stage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(kind: JobKind) -> Self {
        let now = Utc::now();
        JobRecord {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            status: JobStatus::Queued,
            progress: 0,
            message: "Job queued".to_string(),
            logs: Vec::new(),
            output_file: None,
            failure_stage: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the job to a new milestone and records it in the log.
    pub fn advance(&mut self, progress: u8, message: &str) {
        self.status = JobStatus::Processing;
        self.progress = progress.min(100);
        self.message = message.to_string();
        self.logs.push(message.to_string());
    }

    pub fn complete(&mut self, output_file: PathBuf, message: &str) {
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.message = message.to_string();
        self.output_file = Some(output_file);
        self.logs.push("Job completed successfully".to_string());
    }

    pub fn fail(&mut self, stage: Option<Stage>, message: String) {
        self.status = JobStatus::Failed;
        self.failure_stage = stage;
        self.logs.push(format!("Error: {}", message));
        self.message = message;
    }
}

/// Shared job-status table. Every `update` is an atomic read-modify-write of
/// one record; callers never hold a record across awaits.
pub trait JobStore: Send + Sync {
    fn create(&self, kind: JobKind) -> Result<JobRecord>;

    fn get(&self, id: &str) -> Result<Option<JobRecord>>;

    /// Applies `change` to the stored record. Returns `false` when the record
    /// no longer exists.
    fn update(&self, id: &str, change: &mut dyn FnMut(&mut JobRecord)) -> Result<bool>;

    /// All records, newest first.
    fn list(&self) -> Result<Vec<JobRecord>>;

    /// Discards a record. In-flight work for it keeps running; its later
    /// updates become no-ops.
    fn remove(&self, id: &str) -> Result<bool>;
}
