//! Job coordinator: one request in, one HLS output directory out.
//!
//! A job allocates a [`JobWorkspace`], downloads the source into it, runs
//! ffmpeg once under a conversion slot, and commits the output. Any failure
//! drops the workspace uncommitted, which removes both the input and the
//! partial output.

use reqwest::Url;
use serde::Serialize;

use vr_av::JobWorkspace;
use vr_core::JobId;

use crate::context::AppContext;
use crate::fetch;

/// Reference to a committed job output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRef {
    #[serde(skip)]
    pub job_id: JobId,
    /// Public path of the manifest, e.g. `/<id>/stream.m3u8`.
    pub stream_url: String,
}

/// Run a conversion job for `url` and return the manifest reference.
pub async fn run_job(ctx: &AppContext, url: &Url) -> vr_core::Result<StreamRef> {
    let job_id = JobId::new();
    let storage = &ctx.config.storage;

    // Declared before the workspace so the sweeper skips it until cleanup ends.
    let _active = ctx.track_job(job_id);
    let workspace = JobWorkspace::allocate(job_id, &storage.temp_dir, &storage.public_dir)?;
    tracing::info!(job_id = %job_id, url = %url, "Job started");

    let result = match execute(ctx, &workspace, url).await {
        Ok(()) => {
            let stream_url = workspace.public_manifest_path();
            workspace
                .commit()
                .map(|_| StreamRef { job_id, stream_url })
        }
        // Dropping the uncommitted workspace removes input and partial output.
        Err(e) => Err(e),
    };

    match &result {
        Ok(stream) => {
            tracing::info!(job_id = %job_id, stream_url = %stream.stream_url, "Job completed");
        }
        Err(e) => {
            tracing::error!(job_id = %job_id, url = %url, error = %e, "Job failed");
        }
    }

    result
}

async fn execute(ctx: &AppContext, workspace: &JobWorkspace, url: &Url) -> vr_core::Result<()> {
    let bytes = fetch::download_to(&ctx.http, url, &workspace.input()).await?;
    tracing::info!(job_id = %workspace.id(), bytes, "Source downloaded");

    let _slot = ctx.acquire_conversion_slot().await?;
    vr_av::package_hls(&ctx.tools, workspace, &ctx.config.conversion).await
}
