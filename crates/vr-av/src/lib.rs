//! # vr-av
//!
//! External tool management and media job plumbing for vidrelay.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for running external processes.
//! - **Job workspaces** ([`JobWorkspace`]) -- identifier-scoped input file and
//!   output directory with unconditional cleanup.
//! - **HLS packaging** ([`package_hls`]) -- a single ffmpeg invocation that
//!   writes a manifest and its segments.
//! - **Subtitle conversion** ([`subtitles`]) -- SRT to WebVTT text rewrite.

pub mod actions;
pub mod command;
pub mod subtitles;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use actions::{hls_args, package_hls, MANIFEST_NAME};
pub use command::{ToolCommand, ToolOutput};
pub use subtitles::SubtitleFormat;
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
pub use workspace::JobWorkspace;
