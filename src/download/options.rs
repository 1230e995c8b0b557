//! Download policy for a single fetch.
//!
//! Translates the user's format choice into a fully specified yt-dlp
//! argument vector. Building options performs no I/O; whether aria2c is
//! available is probed by the caller and passed in.

use std::fmt;
use std::path::{Path, PathBuf};

/// Requested media kind, chosen via the inline keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Best available audio, re-encoded to mp3
    Audio,
    /// Best combined video+audio
    Video,
}

impl MediaKind {
    /// Callback payload and user-facing noun ("audio"/"video")
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    /// Parse an inline-button callback payload
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retry budget for the whole transfer and for each fragment
const RETRIES: &str = "10";
/// Socket timeout in seconds
const SOCKET_TIMEOUT: &str = "10";
/// Download chunk size (10 MiB)
const HTTP_CHUNK_SIZE: &str = "10M";
/// aria2c tuning: 16 parallel connections, 1 MiB minimum split size
const ARIA2C_ARGS: &str = "aria2c:-x 16 -k 1M";
/// Target codec for audio extraction
const AUDIO_CODEC: &str = "mp3";
/// Target bitrate for audio extraction
const AUDIO_QUALITY: &str = "192K";

/// Fixed download policy for one yt-dlp run. Not user-tunable.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    kind: MediaKind,
    output_template: PathBuf,
    use_aria2c: bool,
}

impl DownloadOptions {
    /// Build the policy for `kind`, writing into `dest_dir`.
    ///
    /// `use_aria2c` should reflect whether the aria2c binary is actually
    /// present; passing `false` keeps yt-dlp on its built-in downloader.
    #[must_use]
    pub fn new(kind: MediaKind, dest_dir: &Path, use_aria2c: bool) -> Self {
        Self {
            kind,
            output_template: dest_dir.join("%(title)s.%(ext)s"),
            use_aria2c,
        }
    }

    /// Quality selector: best audio, or best combined video+audio
    #[must_use]
    pub const fn format_selector(&self) -> &'static str {
        match self.kind {
            MediaKind::Audio => "bestaudio/best",
            MediaKind::Video => "bestvideo+bestaudio/best",
        }
    }

    /// Extension of the finished file when post-processing fixes it.
    ///
    /// Audio is re-encoded to mp3, so the extension is known up front;
    /// video keeps whatever container the site served.
    #[must_use]
    pub const fn forced_extension(&self) -> Option<&'static str> {
        match self.kind {
            MediaKind::Audio => Some(AUDIO_CODEC),
            MediaKind::Video => None,
        }
    }

    /// Render the full yt-dlp argument vector, everything except the URL
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--format".to_string(),
            self.format_selector().to_string(),
            "--output".to_string(),
            self.output_template.display().to_string(),
        ];
        args.extend(
            [
                "--no-playlist",
                "--continue",
                "--retries",
                RETRIES,
                "--fragment-retries",
                RETRIES,
                "--socket-timeout",
                SOCKET_TIMEOUT,
                "--http-chunk-size",
                HTTP_CHUNK_SIZE,
                "--no-progress",
                "--quiet",
            ]
            .iter()
            .map(ToString::to_string),
        );

        if self.use_aria2c {
            args.extend(
                ["--downloader", "aria2c", "--downloader-args", ARIA2C_ARGS]
                    .iter()
                    .map(ToString::to_string),
            );
        }

        if self.kind == MediaKind::Audio {
            args.extend(
                [
                    "--extract-audio",
                    "--audio-format",
                    AUDIO_CODEC,
                    "--audio-quality",
                    AUDIO_QUALITY,
                ]
                .iter()
                .map(ToString::to_string),
            );
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn args_for(kind: MediaKind, use_aria2c: bool) -> Vec<String> {
        DownloadOptions::new(kind, Path::new("/tmp/work"), use_aria2c).to_args()
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_audio_selects_best_audio() {
        let args = args_for(MediaKind::Audio, false);
        assert_eq!(value_after(&args, "--format"), Some("bestaudio/best"));
    }

    #[test]
    fn test_video_selects_best_combined() {
        let args = args_for(MediaKind::Video, false);
        assert_eq!(
            value_after(&args, "--format"),
            Some("bestvideo+bestaudio/best")
        );
    }

    #[test]
    fn test_output_template_rooted_at_dest_dir() {
        let args = args_for(MediaKind::Video, false);
        assert_eq!(
            value_after(&args, "--output"),
            Some("/tmp/work/%(title)s.%(ext)s")
        );
    }

    #[test]
    fn test_resilience_parameters() {
        let args = args_for(MediaKind::Video, false);
        assert!(args.iter().any(|a| a == "--no-playlist"));
        assert!(args.iter().any(|a| a == "--continue"));
        assert_eq!(value_after(&args, "--retries"), Some("10"));
        assert_eq!(value_after(&args, "--fragment-retries"), Some("10"));
        assert_eq!(value_after(&args, "--socket-timeout"), Some("10"));
        assert_eq!(value_after(&args, "--http-chunk-size"), Some("10M"));
    }

    #[test]
    fn test_aria2c_only_when_available() {
        let with = args_for(MediaKind::Video, true);
        assert_eq!(value_after(&with, "--downloader"), Some("aria2c"));
        assert_eq!(
            value_after(&with, "--downloader-args"),
            Some("aria2c:-x 16 -k 1M")
        );

        let without = args_for(MediaKind::Video, false);
        assert!(!without.iter().any(|a| a == "--downloader"));
    }

    #[test]
    fn test_audio_postprocessing_and_extension() {
        let args = args_for(MediaKind::Audio, false);
        assert!(args.iter().any(|a| a == "--extract-audio"));
        assert_eq!(value_after(&args, "--audio-format"), Some("mp3"));
        assert_eq!(value_after(&args, "--audio-quality"), Some("192K"));

        let opts = DownloadOptions::new(MediaKind::Audio, Path::new("/tmp/w"), false);
        assert_eq!(opts.forced_extension(), Some("mp3"));
        let opts = DownloadOptions::new(MediaKind::Video, Path::new("/tmp/w"), false);
        assert_eq!(opts.forced_extension(), None);
    }

    #[test]
    fn test_video_has_no_audio_postprocessing() {
        let args = args_for(MediaKind::Video, false);
        assert!(!args.iter().any(|a| a == "--extract-audio"));
    }

    #[test]
    fn test_media_kind_round_trip() {
        assert_eq!(MediaKind::parse("audio"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::parse("video"), Some(MediaKind::Video));
        assert_eq!(MediaKind::parse("gif"), None);
        assert_eq!(MediaKind::Audio.to_string(), "audio");
        assert_eq!(MediaKind::Video.to_string(), "video");
    }
}
