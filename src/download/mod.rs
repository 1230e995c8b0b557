//! Media download via the external `yt-dlp` tool.

/// Blocking yt-dlp invocation and output discovery
pub mod fetcher;
/// Fixed download policy rendered as yt-dlp arguments
pub mod options;

pub use fetcher::{fetch, FetchError};
pub use options::{DownloadOptions, MediaKind};
