use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::jobs::JobStore;
use crate::pipeline::{Composer, ProgressSink};

/// Forwards pipeline milestones into one job record.
struct StoreProgress {
    store: Arc<dyn JobStore>,
    job_id: String,
}

impl ProgressSink for StoreProgress {
    fn report(&self, progress: u8, message: &str) {
        info!(job_id = %self.job_id, progress, step = message, "job progress");
        match self.store.update(&self.job_id, &mut |job| job.advance(progress, message)) {
            Ok(true) => {}
            Ok(false) => warn!(job_id = %self.job_id, "job discarded, progress dropped"),
            Err(e) => error!(job_id = %self.job_id, error = %format!("{:#}", e), "failed to record progress"),
        }
    }
}

/// Runs render jobs in the background and keeps their records current.
pub struct JobProcessor {
    store: Arc<dyn JobStore>,
    composer: Arc<Composer>,
}

impl JobProcessor {
    pub fn new(store: Arc<dyn JobStore>, composer: Arc<Composer>) -> Self {
        JobProcessor { store, composer }
    }

    fn progress(&self, job_id: &str) -> StoreProgress {
        StoreProgress {
            store: self.store.clone(),
            job_id: job_id.to_string(),
        }
    }

    fn finish(&self, job_id: &str, output: PathBuf, message: &str) {
        let recorded = self
            .store
            .update(job_id, &mut |job| job.complete(output.clone(), message));
        match recorded {
            Ok(true) => info!(job_id, output = %output.display(), "job completed"),
            Ok(false) => warn!(job_id, "job discarded before completion"),
            Err(e) => error!(job_id, error = %format!("{:#}", e), "failed to record completion"),
        }
    }

    fn record_failure(&self, job_id: &str, stage: Option<crate::pipeline::Stage>, message: String) {
        error!(job_id, stage = ?stage, error = %message, "job failed");
        if let Err(e) = self
            .store
            .update(job_id, &mut |job| job.fail(stage, message.clone()))
        {
            error!(job_id, error = %format!("{:#}", e), "failed to record failure");
        }
    }

    pub async fn run_video(&self, job_id: &str, text: &str, output: PathBuf) {
        let progress = self.progress(job_id);
        match self.composer.compose(job_id, text, &output, &progress).await {
            Ok(path) => self.finish(job_id, path, "Video generated successfully"),
            Err(failure) => {
                let message = failure.to_string();
                self.record_failure(job_id, Some(failure.stage), message);
            }
        }
    }

    pub async fn run_audio(&self, job_id: &str, text: &str, output: PathBuf) {
        let progress = self.progress(job_id);
        progress.report(20, "Generating audio...");
        match self.composer.narrate(text, &output).await {
            Ok(path) => self.finish(job_id, path, "Audio generated successfully"),
            Err(e) => self.record_failure(job_id, None, format!("{:#}", e)),
        }
    }

    pub fn spawn_video(self: &Arc<Self>, job_id: String, text: String, output: PathBuf) {
        let processor = self.clone();
        tokio::spawn(async move {
            processor.run_video(&job_id, &text, output).await;
        });
    }

    pub fn spawn_audio(self: &Arc<Self>, job_id: String, text: String, output: PathBuf) {
        let processor = self.clone();
        tokio::spawn(async move {
            processor.run_audio(&job_id, &text, output).await;
        });
    }
}
