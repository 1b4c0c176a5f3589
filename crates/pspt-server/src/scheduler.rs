//! Background job scheduler.
//!
//! Registers the recurring stale-only refresh when a cron expression is
//! configured. The scheduled run goes through the same job tracker as
//! `POST /api/v1/refresh/jobs`, so its progress is pollable like any other job.

use std::sync::Arc;

use pspt_pricing::JobTracker;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is rejected, or the scheduler fails to start.
pub async fn build_scheduler(
    jobs: Arc<JobTracker>,
    refresh_cron: Option<&str>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    match refresh_cron.map(str::trim).filter(|c| !c.is_empty()) {
        Some(cron) => register_refresh_job(&scheduler, jobs, cron).await?,
        None => tracing::info!("scheduler: no refresh cron configured; scheduled refresh disabled"),
    }

    scheduler.start().await?;
    Ok(scheduler)
}

/// Queues a stale-only refresh job on every tick of `cron`.
async fn register_refresh_job(
    scheduler: &JobScheduler,
    jobs: Arc<JobTracker>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let jobs = Arc::clone(&jobs);

        Box::pin(async move {
            let job = jobs.create_job(false, true).await;
            tracing::info!(job_id = %job.id, "scheduler: queued stale-only refresh");
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: registered price refresh job");
    Ok(())
}
