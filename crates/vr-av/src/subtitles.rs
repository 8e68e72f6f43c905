//! SubRip (SRT) to WebVTT text conversion.
//!
//! The two formats differ only in a header line and the decimal separator of
//! cue timestamps, so the conversion is a pure text rewrite.

use std::borrow::Cow;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

/// Header line every WebVTT file starts with, followed by a blank line.
pub const VTT_HEADER: &str = "WEBVTT\n\n";

static RE_SRT_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2}:\d{2}:\d{2}),(\d{3})").unwrap());

/// Target subtitle format requested by the client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubtitleFormat {
    /// WebVTT, the format browsers play natively.
    #[default]
    Vtt,
    /// Any other requested format; the fetched text is passed through.
    Other(String),
}

impl FromStr for SubtitleFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("vtt") || s.eq_ignore_ascii_case("webvtt") {
            Ok(SubtitleFormat::Vtt)
        } else {
            Ok(SubtitleFormat::Other(s.to_string()))
        }
    }
}

/// Whether a locator names an SRT file.
///
/// Only the path matters: a query string or fragment after the file name is
/// ignored.
pub fn is_srt_name(locator: &str) -> bool {
    let path = locator
        .split(['?', '#'])
        .next()
        .unwrap_or(locator);
    path.get(path.len().saturating_sub(4)..)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(".srt"))
}

/// Rewrite SRT text as WebVTT.
///
/// Prefixes the header, normalizes line endings to `\n`, and rewrites every
/// `HH:MM:SS,mmm` timestamp to `HH:MM:SS.mmm`. Cue numbers and text are left
/// untouched; WebVTT treats them as cue identifiers and payload.
pub fn srt_to_vtt(srt: &str) -> String {
    let body = srt.strip_prefix('\u{feff}').unwrap_or(srt);
    let body = body.replace("\r\n", "\n").replace('\r', "\n");
    let body = RE_SRT_TIMESTAMP.replace_all(&body, "$1.$2");

    let mut out = String::with_capacity(VTT_HEADER.len() + body.len());
    out.push_str(VTT_HEADER);
    out.push_str(&body);
    out
}

/// Convert a fetched subtitle body for delivery.
///
/// SRT sources requested as WebVTT are decoded (invalid UTF-8 is replaced)
/// and rewritten. Anything else is returned as the exact fetched bytes.
pub fn convert<'a>(locator: &str, body: &'a [u8], format: &SubtitleFormat) -> Cow<'a, [u8]> {
    if *format == SubtitleFormat::Vtt && is_srt_name(locator) {
        Cow::Owned(srt_to_vtt(&String::from_utf8_lossy(body)).into_bytes())
    } else {
        Cow::Borrowed(body)
    }
}
