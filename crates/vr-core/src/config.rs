//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the server, storage layout, tools, conversion, fetching,
//! and retention. Every section defaults sensibly so a completely empty `{}`
//! file is valid.
//!
//! Configuration is read once at process start and is immutable afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

/// Environment variable that overrides `server.port`.
pub const PORT_ENV: &str = "PORT";

/// Upper bound on `conversion.max_concurrent`.
pub const MAX_CONCURRENT_CONVERSIONS: usize = 1024;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub tools: ToolsConfig,
    pub conversion: ConversionConfig,
    pub fetch: FetchConfig,
    pub retention: RetentionConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str).map_err(|e| Error::Config(format!("parse error: {e}")))
    }

    /// Load configuration from a file path.
    ///
    /// A `None` path or a file that does not exist yields the defaults. A file
    /// that exists but cannot be read or parsed is an error; callers treat it
    /// as fatal.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents)
                .map_err(|e| Error::Config(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(Error::Config(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides using a custom lookup.
    ///
    /// Blank values are ignored. A non-blank `PORT` that is not a valid port
    /// number is an error.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let port = lookup(PORT_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        if let Some(raw) = port {
            self.server.port = raw
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("invalid {PORT_ENV} '{raw}': {e}")))?;
        }

        Ok(())
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.conversion.max_concurrent == 0 {
            warnings.push("conversion.max_concurrent is 0; using 1".into());
        }

        if self.conversion.max_concurrent > MAX_CONCURRENT_CONVERSIONS {
            warnings.push(format!(
                "conversion.max_concurrent is {}; using {MAX_CONCURRENT_CONVERSIONS}",
                self.conversion.max_concurrent
            ));
        }

        if self.conversion.segment_secs == 0 {
            warnings.push("conversion.segment_secs is 0; ffmpeg will use its default".into());
        }

        if self.conversion.timeout_secs == 0 {
            warnings.push("conversion.timeout_secs is 0; conversions will time out immediately".into());
        }

        if self.storage.temp_dir == self.storage.public_dir {
            warnings.push(
                "storage.temp_dir equals storage.public_dir; downloaded inputs will be publicly served"
                    .into(),
            );
        }

        let job_budget = self
            .conversion
            .timeout_secs
            .saturating_add(self.fetch.timeout_secs);
        if self.retention.enabled && self.retention.max_age_secs <= job_budget {
            warnings.push(format!(
                "retention.max_age_secs ({}) is not above the download plus conversion timeouts ({job_budget}s); outputs may expire soon after they are served",
                self.retention.max_age_secs
            ));
        }

        if self.retention.enabled && self.retention.sweep_interval_secs == 0 {
            warnings.push("retention.sweep_interval_secs is 0; using 60".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

/// Directory layout for job workspaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Transient directory for downloaded inputs.
    pub temp_dir: PathBuf,
    /// Directory served at the site root; job outputs land in `<public_dir>/<id>/`.
    pub public_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from("./data/tmp"),
            public_dir: PathBuf::from("./public"),
        }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// How ffmpeg maps and encodes the input streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamProfile {
    /// Copy the existing codecs into HLS segments.
    Remux,
    /// Map every video, audio, and subtitle stream and re-encode to the
    /// configured codec set.
    #[default]
    Transcode,
}

/// HLS conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    pub profile: StreamProfile,
    /// Target segment length in seconds (`-hls_time`).
    pub segment_secs: u32,
    pub video_codec: String,
    pub audio_codec: String,
    pub subtitle_codec: String,
    /// Maximum number of ffmpeg processes running at once.
    pub max_concurrent: usize,
    /// Maximum runtime of a single ffmpeg invocation.
    pub timeout_secs: u64,
}

impl ConversionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Permit count for the conversion limiter, clamped to
    /// `1..=MAX_CONCURRENT_CONVERSIONS`.
    pub fn permits(&self) -> usize {
        self.max_concurrent.clamp(1, MAX_CONCURRENT_CONVERSIONS)
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            profile: StreamProfile::default(),
            segment_secs: 10,
            video_codec: "libx264".into(),
            audio_codec: "aac".into(),
            subtitle_codec: "webvtt".into(),
            max_concurrent: 2,
            timeout_secs: 3600,
        }
    }
}

/// Upstream retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Overall request timeout, including the body download.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            user_agent: concat!("vidrelay/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

/// Eviction of generated output directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub enabled: bool,
    /// Outputs older than this are removed.
    pub max_age_secs: u64,
    pub sweep_interval_secs: u64,
}

impl RetentionConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        if self.sweep_interval_secs == 0 {
            Duration::from_secs(60)
        } else {
            Duration::from_secs(self.sweep_interval_secs)
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age_secs: 86_400,
            sweep_interval_secs: 300,
        }
    }
}
