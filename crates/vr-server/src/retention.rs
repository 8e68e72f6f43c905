//! Background eviction of expired job outputs.
//!
//! Only entries whose names are job-shaped are considered: `<JobId>` output
//! directories under the public directory, and `<JobId>-*` temp directories
//! left behind by a crash. Anything else in those directories (the player
//! page, static assets) is never touched. Jobs still running are skipped
//! whatever their age.

use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tokio_util::sync::CancellationToken;

use vr_core::config::StorageConfig;
use vr_core::JobId;

use crate::context::AppContext;

/// Length of a hyphenated UUID string.
const JOB_ID_LEN: usize = 36;

/// Outcome of a single sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub errors: usize,
}

/// Remove job directories older than `max_age`, measured against `now`.
///
/// Directories belonging to a job in `active` are kept.
pub fn sweep_once(
    storage: &StorageConfig,
    max_age: Duration,
    now: SystemTime,
    active: &HashSet<JobId>,
) -> SweepReport {
    let mut report = SweepReport::default();
    let sweep = Sweep {
        max_age,
        now,
        active,
    };
    sweep.dir(&storage.public_dir, output_job_id, &mut report);
    sweep.dir(&storage.temp_dir, temp_job_id, &mut report);
    report
}

fn output_job_id(name: &str) -> Option<JobId> {
    name.parse().ok()
}

fn temp_job_id(name: &str) -> Option<JobId> {
    if name.as_bytes().get(JOB_ID_LEN) != Some(&b'-') {
        return None;
    }
    name.get(..JOB_ID_LEN).and_then(output_job_id)
}

struct Sweep<'a> {
    max_age: Duration,
    now: SystemTime,
    active: &'a HashSet<JobId>,
}

impl Sweep<'_> {
    fn dir(&self, root: &Path, job_id: fn(&str) -> Option<JobId>, report: &mut SweepReport) {
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                tracing::warn!("Retention: cannot read {}: {e}", root.display());
                report.errors += 1;
                return;
            }
        };

        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(id) = job_id(name) else {
                continue;
            };
            if self.active.contains(&id) {
                tracing::trace!(job_id = %id, "Retention: job still running");
                continue;
            }

            let Ok(meta) = entry.metadata() else {
                report.errors += 1;
                continue;
            };
            if !meta.is_dir() {
                continue;
            }

            let age = meta
                .modified()
                .ok()
                .and_then(|modified| self.now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < self.max_age {
                continue;
            }

            match std::fs::remove_dir_all(entry.path()) {
                Ok(()) => {
                    tracing::debug!(path = ?entry.path(), age_secs = age.as_secs(), "Retention: removed");
                    report.removed += 1;
                }
                Err(e) => {
                    tracing::warn!(path = ?entry.path(), "Retention: failed to remove: {e}");
                    report.errors += 1;
                }
            }
        }
    }
}

/// Run the sweeper until `cancel` fires.
pub async fn run_sweeper(ctx: AppContext, cancel: CancellationToken) {
    let retention = ctx.config.retention.clone();
    tracing::info!(
        max_age_secs = retention.max_age_secs,
        interval_secs = retention.sweep_interval().as_secs(),
        "Retention sweeper started"
    );

    let mut interval = tokio::time::interval(retention.sweep_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = cancel.cancelled() => break,
        }

        let storage = ctx.config.storage.clone();
        let max_age = retention.max_age();
        let active = ctx.active_job_ids();
        let result = tokio::task::spawn_blocking(move || {
            sweep_once(&storage, max_age, SystemTime::now(), &active)
        })
        .await;

        match result {
            Ok(report) if report.removed > 0 || report.errors > 0 => {
                tracing::info!(
                    removed = report.removed,
                    errors = report.errors,
                    "Retention sweep complete"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Retention sweep task failed: {e}"),
        }
    }

    tracing::info!("Retention sweeper stopped");
}
