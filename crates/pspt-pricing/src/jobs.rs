//! Asynchronous full-refresh jobs.
//!
//! A job moves `queued → running → done | failed`. Each job is driven by one
//! spawned worker task, which is the only writer of its record while it runs.
//! A supervisor task marks the record `failed` if the worker panics. Terminal
//! jobs stay queryable until retention evicts them.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::refresh::{BatchOutcome, RefreshService};

/// Countries refreshed per batch window inside a job.
pub const JOB_BATCH_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub force: bool,
    pub stale_only: bool,
    pub progress_text: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub total: usize,
    pub processed: usize,
    pub ok: usize,
    pub cached: usize,
    pub failed: usize,
}

impl RefreshJob {
    fn queued(force: bool, stale_only: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Queued,
            force,
            stale_only,
            progress_text: "Queued".to_string(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
            total: 0,
            processed: 0,
            ok: 0,
            cached: 0,
            failed: 0,
        }
    }

    fn absorb(&mut self, batch: &BatchOutcome) {
        self.total = batch.total;
        self.processed += batch.processed;
        self.ok += batch.ok;
        self.cached += batch.cached;
        self.failed += batch.failed;
        self.progress_text = format!(
            "{}-{} / {}",
            batch.offset + 1,
            batch.offset + batch.processed,
            batch.total
        );
    }
}

/// Bounds on how many terminal jobs the registry keeps, and for how long.
#[derive(Debug, Clone, Copy)]
pub struct JobRetention {
    pub max_jobs: usize,
    pub max_age: chrono::Duration,
}

impl JobRetention {
    #[must_use]
    pub fn new(max_jobs: usize, max_age_secs: u64) -> Self {
        let secs = i64::try_from(max_age_secs).unwrap_or(i64::MAX);
        Self {
            max_jobs,
            max_age: chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX),
        }
    }
}

impl Default for JobRetention {
    fn default() -> Self {
        Self::new(200, 24 * 60 * 60)
    }
}

type Registry = Arc<RwLock<HashMap<Uuid, RefreshJob>>>;

/// Owns the job registry and spawns job tasks.
pub struct JobTracker {
    refresh: Arc<RefreshService>,
    jobs: Registry,
    retention: JobRetention,
}

impl JobTracker {
    #[must_use]
    pub fn new(refresh: Arc<RefreshService>, retention: JobRetention) -> Self {
        Self {
            refresh,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// Registers a queued job and spawns its task. Only the returned
    /// snapshot is guaranteed to be `queued`: on a multi-thread runtime the
    /// task may already be running by the time the caller reads the registry.
    ///
    /// The job refreshes every country when `force` is set or `stale_only`
    /// is off; otherwise fresh countries come back as cached.
    pub async fn create_job(&self, force: bool, stale_only: bool) -> RefreshJob {
        let job = RefreshJob::queued(force, stale_only);
        let snapshot = job.clone();

        {
            let mut jobs = self.jobs.write().await;
            evict(&mut jobs, self.retention, Utc::now());
            jobs.insert(job.id, job);
        }

        tracing::info!(job_id = %snapshot.id, force, stale_only, "refresh job queued");

        let effective_force = force || !stale_only;
        tokio::spawn(supervise(
            Arc::clone(&self.refresh),
            Arc::clone(&self.jobs),
            snapshot.id,
            effective_force,
        ));

        snapshot
    }

    pub async fn get(&self, id: Uuid) -> Option<RefreshJob> {
        self.jobs.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

async fn update(jobs: &Registry, id: Uuid, apply: impl FnOnce(&mut RefreshJob)) {
    if let Some(job) = jobs.write().await.get_mut(&id) {
        apply(job);
    }
}

/// Runs the job on its own task so a panic inside it still leaves the
/// record terminal.
async fn supervise(refresh: Arc<RefreshService>, jobs: Registry, id: Uuid, force: bool) {
    let worker = tokio::spawn(run_job(refresh, Arc::clone(&jobs), id, force));
    if let Err(e) = worker.await {
        tracing::error!(job_id = %id, error = %e, "refresh job task aborted");
        update(&jobs, id, |job| {
            if job.status.is_terminal() {
                return;
            }
            job.status = JobStatus::Failed;
            job.progress_text = "Failed".to_string();
            job.error = Some(format!("refresh job aborted: {e}"));
            job.finished_at = Some(Utc::now());
        })
        .await;
    }
}

async fn run_job(refresh: Arc<RefreshService>, jobs: Registry, id: Uuid, force: bool) {
    update(&jobs, id, |job| {
        job.status = JobStatus::Running;
        job.started_at = Some(Utc::now());
    })
    .await;

    let mut offset = 0;
    loop {
        match refresh.refresh_batch(force, offset, Some(JOB_BATCH_SIZE)).await {
            Ok(batch) => {
                update(&jobs, id, |job| job.absorb(&batch)).await;
                tracing::info!(
                    job_id = %id,
                    offset = batch.offset,
                    processed = batch.processed,
                    total = batch.total,
                    "refresh job progress"
                );
                match batch.next_offset {
                    Some(next) if !batch.done => offset = next,
                    _ => break,
                }
            }
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "refresh job failed");
                update(&jobs, id, |job| {
                    job.status = JobStatus::Failed;
                    job.progress_text = "Failed".to_string();
                    job.error = Some(e.to_string());
                    job.finished_at = Some(Utc::now());
                })
                .await;
                return;
            }
        }
    }

    update(&jobs, id, |job| {
        job.status = JobStatus::Done;
        job.progress_text = "Done".to_string();
        job.finished_at = Some(Utc::now());
    })
    .await;
    tracing::info!(job_id = %id, "refresh job done");
}

/// Drops terminal jobs older than the retention age, then the oldest
/// terminal jobs until there is room for one more under `max_jobs`.
fn evict(jobs: &mut HashMap<Uuid, RefreshJob>, retention: JobRetention, now: DateTime<Utc>) {
    jobs.retain(|_, job| {
        let finished = job.finished_at.unwrap_or(job.created_at);
        !job.status.is_terminal() || now - finished <= retention.max_age
    });

    if jobs.len() < retention.max_jobs {
        return;
    }

    let mut terminal: Vec<(DateTime<Utc>, Uuid)> = jobs
        .values()
        .filter(|job| job.status.is_terminal())
        .map(|job| (job.finished_at.unwrap_or(job.created_at), job.id))
        .collect();
    terminal.sort();

    let excess = jobs.len() + 1 - retention.max_jobs.max(1);
    for (_, id) in terminal.into_iter().take(excess) {
        jobs.remove(&id);
    }
}

#[cfg(test)]
#[path = "jobs_test.rs"]
mod tests;
