//! Video conversion route.

use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::context::AppContext;
use crate::coordinator::{self, StreamRef};
use crate::error::AppError;
use crate::fetch;
use crate::middleware::request_id::RequestId;

#[derive(Debug, Deserialize)]
pub struct VideoQuery {
    pub url: Option<String>,
}

/// GET /video?url=<source>
///
/// Downloads the source, packages it as HLS, and returns the public manifest
/// path once the output is complete.
pub async fn convert_video(
    State(ctx): State<AppContext>,
    request_id: Option<Extension<RequestId>>,
    Query(query): Query<VideoQuery>,
) -> Result<Json<StreamRef>, AppError> {
    let attach = |e: vr_core::Error| {
        let err = AppError::from(e);
        match &request_id {
            Some(Extension(RequestId(id))) => err.with_request_id(id.clone()),
            None => err,
        }
    };

    let url = fetch::parse_locator(query.url.as_deref()).map_err(attach)?;
    let stream = coordinator::run_job(&ctx, &url).await.map_err(attach)?;
    Ok(Json(stream))
}
