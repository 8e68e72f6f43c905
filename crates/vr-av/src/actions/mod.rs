//! Media processing actions.

mod hls;

pub use crate::workspace::MANIFEST_NAME;
pub use hls::{hls_args, package_hls};
