//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which builds an [`AppContext`] whose temp and
//! public directories live under a fresh temporary directory. On unix, ffmpeg
//! can be replaced with a small shell script so conversions run without real
//! media. [`TestHarness::serve`] starts Axum on a random port for HTTP-level
//! testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vr_av::ToolRegistry;
use vr_core::config::Config;
use vr_server::context::AppContext;
use vr_server::router::build_router;

/// Fake ffmpeg that writes a manifest and one segment next to its last
/// argument, after checking the downloaded input is non-empty.
pub const FFMPEG_OK: &str = r#"#!/bin/sh
[ -s "$3" ] || { echo "input missing or empty: $3" >&2; exit 1; }
for last; do :; done
out_dir=$(dirname "$last")
printf 'segment' > "$out_dir/segment000.ts"
printf '#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXTINF:10.0,\nsegment000.ts\n#EXT-X-ENDLIST\n' > "$last"
"#;

/// Fake ffmpeg that leaves partial output behind and exits non-zero.
pub const FFMPEG_FAIL: &str = r#"#!/bin/sh
for last; do :; done
out_dir=$(dirname "$last")
printf 'partial' > "$out_dir/segment000.ts"
echo "Invalid data found when processing input" >&2
exit 1
"#;

/// Test harness wrapping a fully-constructed [`AppContext`] backed by
/// temporary storage.
pub struct TestHarness {
    pub ctx: AppContext,
    base: TempDir,
}

impl TestHarness {
    /// Harness with default configuration and whatever ffmpeg is on `PATH`.
    pub fn new() -> Self {
        Self::with_options(None, |_| {})
    }

    /// Harness whose ffmpeg is the given shell script.
    #[cfg(unix)]
    pub fn with_ffmpeg(script: &str) -> Self {
        Self::with_options(Some(script), |_| {})
    }

    /// Harness with an optional ffmpeg script and a configuration tweak
    /// applied after storage paths are set.
    pub fn with_options(script: Option<&str>, tweak: impl FnOnce(&mut Config)) -> Self {
        let base = tempfile::tempdir().expect("failed to create temp dir");

        let mut config = Config::default();
        config.storage.temp_dir = base.path().join("tmp");
        config.storage.public_dir = base.path().join("public");
        config.retention.enabled = false;
        if let Some(script) = script {
            config.tools.ffmpeg_path = Some(install_script(base.path(), "ffmpeg", script));
        }
        tweak(&mut config);

        let tools = ToolRegistry::discover(&config.tools);
        let ctx = AppContext::new(config, tools).expect("failed to build context");

        Self { ctx, base }
    }

    /// Start an Axum server on a random port and return its address.
    pub async fn serve(&self) -> SocketAddr {
        let app = build_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        addr
    }

    pub fn base(&self) -> &Path {
        self.base.path()
    }

    pub fn temp_dir(&self) -> &Path {
        &self.ctx.config.storage.temp_dir
    }

    pub fn public_dir(&self) -> &Path {
        &self.ctx.config.storage.public_dir
    }

    /// Entries currently in the temp directory.
    pub fn temp_entries(&self) -> Vec<PathBuf> {
        entries(self.temp_dir())
    }

    /// Entries currently in the public directory.
    pub fn public_entries(&self) -> Vec<PathBuf> {
        entries(self.public_dir())
    }
}

/// Sorted entries of `dir`; empty if the directory does not exist.
pub fn entries(dir: &Path) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|rd| rd.flatten().map(|e| e.path()).collect())
        .unwrap_or_default();
    out.sort();
    out
}

/// Write an executable script named `name` under `<base>/bin`.
pub fn install_script(base: &Path, name: &str, body: &str) -> PathBuf {
    let bin = base.join("bin");
    std::fs::create_dir_all(&bin).expect("failed to create bin dir");
    let path = bin.join(name);
    std::fs::write(&path, body).expect("failed to write script");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("failed to chmod script");
    }

    path
}

/// Start a mock upstream serving `body` at `route`.
pub async fn upstream_with(route: &str, body: Vec<u8>) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&server)
        .await;
    server
}

/// Start a mock upstream that answers every request with `status`.
pub async fn upstream_status(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}
