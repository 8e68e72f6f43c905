//! Application context shared by all request handlers.
//!
//! [`AppContext`] is cheap to clone: it only holds `Arc`s and a
//! `reqwest::Client` (itself reference counted). Configuration inside it is
//! an immutable snapshot taken at startup.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use vr_av::ToolRegistry;
use vr_core::config::Config;
use vr_core::JobId;

/// Application context shared by all request handlers (via Axum state).
#[derive(Clone)]
pub struct AppContext {
    /// Immutable application configuration.
    pub config: Arc<Config>,
    /// External tool registry.
    pub tools: Arc<ToolRegistry>,
    /// HTTP client used for upstream retrieval.
    pub http: reqwest::Client,
    /// Limits the number of ffmpeg processes running at once.
    pub conversions: Arc<Semaphore>,
    /// Jobs currently running, with their start time. The retention sweeper
    /// never removes their directories.
    pub active_jobs: Arc<DashMap<JobId, Instant>>,
}

impl AppContext {
    /// Build the context: HTTP client from `config.fetch`, conversion
    /// limiter from `config.conversion`.
    pub fn new(config: Config, tools: ToolRegistry) -> vr_core::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.fetch.timeout())
            .user_agent(config.fetch.user_agent.clone())
            .build()
            .map_err(|e| vr_core::Error::Internal(format!("failed to build HTTP client: {e}")))?;

        let conversions = Arc::new(Semaphore::new(config.conversion.permits()));

        Ok(Self {
            config: Arc::new(config),
            tools: Arc::new(tools),
            http,
            conversions,
            active_jobs: Arc::new(DashMap::new()),
        })
    }

    /// Mark `id` as running until the returned guard is dropped.
    pub fn track_job(&self, id: JobId) -> ActiveJob {
        self.active_jobs.insert(id, Instant::now());
        ActiveJob {
            jobs: self.active_jobs.clone(),
            id,
        }
    }

    /// Ids of the jobs running right now.
    pub fn active_job_ids(&self) -> HashSet<JobId> {
        self.active_jobs.iter().map(|entry| *entry.key()).collect()
    }

    /// Wait for a free conversion slot.
    ///
    /// Waiters are served in FIFO order. The slot is released when the
    /// returned permit is dropped.
    pub async fn acquire_conversion_slot(&self) -> vr_core::Result<OwnedSemaphorePermit> {
        if self.conversions.available_permits() == 0 {
            tracing::debug!("All conversion slots busy; waiting");
        }
        self.conversions
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| vr_core::Error::Internal("conversion limiter closed".into()))
    }
}

/// Registration of a running job in [`AppContext::active_jobs`].
///
/// Dropping it removes the entry.
#[derive(Debug)]
pub struct ActiveJob {
    jobs: Arc<DashMap<JobId, Instant>>,
    id: JobId,
}

impl Drop for ActiveJob {
    fn drop(&mut self) {
        if let Some((_, started)) = self.jobs.remove(&self.id) {
            tracing::trace!(
                job_id = %self.id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Job untracked"
            );
        }
    }
}
