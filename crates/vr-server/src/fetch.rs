//! Upstream retrieval: locator validation, streaming downloads, body fetches.
//!
//! Every failure here is a single attempt; nothing is retried.

use std::path::Path;

use bytes::Bytes;
use futures::StreamExt;
use reqwest::Url;
use tokio::io::AsyncWriteExt;

use vr_core::{Error, Result};

/// Validate a client-supplied locator.
///
/// Missing, blank, unparsable, or non-http(s) locators are
/// [`Error::Validation`].
pub fn parse_locator(raw: Option<&str>) -> Result<Url> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Validation("url query parameter is required".into()))?;

    let url = Url::parse(raw).map_err(|e| Error::Validation(format!("invalid url '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::Validation(format!("unsupported url scheme '{other}'"))),
    }
}

async fn get_success(client: &reqwest::Client, url: &Url) -> Result<reqwest::Response> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| Error::fetch(url.as_str(), e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::fetch(url.as_str(), format!("upstream responded {status}")));
    }

    Ok(response)
}

/// Stream the resource at `url` into a new file at `dest`.
///
/// Returns the number of bytes written. The body is written chunk by chunk
/// and never held in memory whole.
pub async fn download_to(client: &reqwest::Client, url: &Url, dest: &Path) -> Result<u64> {
    let response = get_success(client, url).await?;

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| Error::fetch(url.as_str(), format!("body read failed: {e}")))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

/// Fetch the resource at `url` as raw bytes, exactly as served.
pub async fn fetch_bytes(client: &reqwest::Client, url: &Url) -> Result<Bytes> {
    get_success(client, url)
        .await?
        .bytes()
        .await
        .map_err(|e| Error::fetch(url.as_str(), format!("body read failed: {e}")))
}
