//! HLS packaging with a single ffmpeg invocation.

use std::path::Path;

use vr_core::config::{ConversionConfig, StreamProfile};

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;
use crate::workspace::{JobWorkspace, MANIFEST_NAME};

/// Segment file pattern inside the output directory.
const SEGMENT_PATTERN: &str = "segment%03d.ts";

/// Build the ffmpeg argument list that packages `input` into HLS inside
/// `output_dir`.
///
/// - [`StreamProfile::Remux`] copies the existing codecs.
/// - [`StreamProfile::Transcode`] maps every video, audio and subtitle
///   stream (each optional, so inputs lacking one kind still convert) and
///   re-encodes them to the configured codec set.
///
/// Produces `<output_dir>/stream.m3u8` and `<output_dir>/segmentNNN.ts`.
pub fn hls_args(input: &Path, output_dir: &Path, conversion: &ConversionConfig) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".into(), "-i".into(), input.to_string_lossy().into()];

    match conversion.profile {
        StreamProfile::Remux => {
            args.extend(["-codec".into(), "copy".into()]);
        }
        StreamProfile::Transcode => {
            for map in ["0:v?", "0:a?", "0:s?"] {
                args.extend(["-map".into(), map.into()]);
            }
            args.extend(["-c:v".into(), conversion.video_codec.clone()]);
            args.extend(["-c:a".into(), conversion.audio_codec.clone()]);
            args.extend(["-c:s".into(), conversion.subtitle_codec.clone()]);
        }
    }

    args.extend(["-start_number".into(), "0".into()]);
    if conversion.segment_secs > 0 {
        args.extend(["-hls_time".into(), conversion.segment_secs.to_string()]);
    }
    args.extend(["-hls_list_size".into(), "0".into()]);
    args.extend(["-hls_playlist_type".into(), "vod".into()]);
    args.extend([
        "-hls_segment_filename".into(),
        output_dir.join(SEGMENT_PATTERN).to_string_lossy().into(),
    ]);
    args.extend(["-f".into(), "hls".into()]);
    args.push(output_dir.join(MANIFEST_NAME).to_string_lossy().into());
    args
}

/// Run ffmpeg once over the workspace input, writing the manifest and
/// segments into the workspace output directory.
pub async fn package_hls(
    tools: &ToolRegistry,
    workspace: &JobWorkspace,
    conversion: &ConversionConfig,
) -> vr_core::Result<()> {
    let ffmpeg = tools.require("ffmpeg")?;

    tracing::info!(
        job_id = %workspace.id(),
        profile = ?conversion.profile,
        segment_secs = conversion.segment_secs,
        "HLS package: {:?} -> {:?}",
        workspace.input(),
        workspace.output_dir()
    );

    let mut cmd = ToolCommand::new(ffmpeg.path.clone());
    cmd.timeout(conversion.timeout());
    cmd.args(hls_args(&workspace.input(), workspace.output_dir(), conversion));
    cmd.execute().await?;

    Ok(())
}
