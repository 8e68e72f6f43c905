//! Subtitle fetch-and-convert route.

use std::borrow::Cow;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Extension;
use bytes::Bytes;
use serde::Deserialize;

use vr_av::SubtitleFormat;

use crate::context::AppContext;
use crate::error::AppError;
use crate::fetch;
use crate::middleware::request_id::RequestId;

/// Content type of every subtitle response.
pub const VTT_CONTENT_TYPE: &str = "text/vtt; charset=utf-8";

#[derive(Debug, Deserialize)]
pub struct SubtitleQuery {
    pub url: Option<String>,
    pub format: Option<String>,
}

/// GET /subtitle?url=<source>&format=<fmt>
///
/// SRT sources are rewritten as WebVTT when the requested format is `vtt`
/// (the default); anything else is passed through byte for byte.
pub async fn get_subtitle(
    State(ctx): State<AppContext>,
    request_id: Option<Extension<RequestId>>,
    Query(query): Query<SubtitleQuery>,
) -> Result<impl IntoResponse, AppError> {
    let attach = |e: vr_core::Error| {
        let err = AppError::from(e);
        match &request_id {
            Some(Extension(RequestId(id))) => err.with_request_id(id.clone()),
            None => err,
        }
    };

    let url = fetch::parse_locator(query.url.as_deref()).map_err(attach)?;
    let format: SubtitleFormat = query
        .format
        .as_deref()
        .unwrap_or_default()
        .parse()
        .unwrap_or_default();

    let fetched = fetch::fetch_bytes(&ctx.http, &url).await.map_err(attach)?;
    let body = match vr_av::subtitles::convert(url.path(), &fetched, &format) {
        Cow::Owned(converted) => Bytes::from(converted),
        Cow::Borrowed(_) => fetched.clone(),
    };

    tracing::debug!(url = %url, bytes = body.len(), "Subtitle served");

    Ok(([(header::CONTENT_TYPE, VTT_CONTENT_TYPE)], body))
}
