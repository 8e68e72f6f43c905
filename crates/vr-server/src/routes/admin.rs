//! Admin diagnostics route handlers.

use axum::extract::State;
use axum::Json;

use vr_av::ToolInfo;

use crate::context::AppContext;
use crate::error::AppError;

/// GET /admin/tools
///
/// Probes every known tool for its version, so the work runs off the async
/// executor.
pub async fn tools(State(ctx): State<AppContext>) -> Result<Json<Vec<ToolInfo>>, AppError> {
    let registry = ctx.tools.clone();
    let infos = tokio::task::spawn_blocking(move || registry.check_all())
        .await
        .map_err(|e| vr_core::Error::Internal(format!("tool check failed: {e}")))?;
    Ok(Json(infos))
}
