//! Invocation of the external yt-dlp binary.
//!
//! The transfer blocks for its whole duration, so it runs on a
//! `spawn_blocking` worker; the dispatcher task only awaits the join
//! handle and keeps serving other chats meanwhile.

use crate::download::options::{DownloadOptions, MediaKind};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure of a single fetch. The `Display` text is what the user sees
/// after "Error during download:".
#[derive(Debug, Error)]
pub enum FetchError {
    /// yt-dlp could not be launched, typically because it is not installed
    #[error("could not launch yt-dlp: {0}")]
    Spawn(std::io::Error),
    /// yt-dlp ran and reported an error (bad URL, unsupported site,
    /// exhausted retries, failed post-processing)
    #[error("{0}")]
    Failed(String),
    /// The destination directory could not be scanned afterwards
    #[error("could not read download directory: {0}")]
    Output(std::io::Error),
    /// yt-dlp exited successfully but left no file behind
    #[error("download finished but no output file was found")]
    NoOutput,
    /// The blocking worker was torn down before the transfer finished
    #[error("download worker stopped unexpectedly")]
    Worker,
}

/// Download `url` into `dir` and return the finished file's path.
///
/// aria2c is used for multi-connection transfers when present on PATH;
/// its absence silently falls back to yt-dlp's built-in downloader.
///
/// # Errors
///
/// Returns a [`FetchError`] if yt-dlp cannot be launched, exits with an
/// error, or produces no output file.
pub async fn fetch(url: String, dir: PathBuf, kind: MediaKind) -> Result<PathBuf, FetchError> {
    let use_aria2c = which::which("aria2c").is_ok();
    let options = DownloadOptions::new(kind, &dir, use_aria2c);

    tokio::task::spawn_blocking(move || run_ytdlp(&url, &dir, &options))
        .await
        .map_err(|_| FetchError::Worker)?
}

/// Run yt-dlp to completion and locate what it wrote. Blocking.
fn run_ytdlp(url: &str, dir: &Path, options: &DownloadOptions) -> Result<PathBuf, FetchError> {
    debug!(url, args = ?options.to_args(), "invoking yt-dlp");

    let output = Command::new("yt-dlp")
        .args(options.to_args())
        .arg("--")
        .arg(url)
        .output()
        .map_err(FetchError::Spawn)?;

    if !output.status.success() {
        let cause = error_cause(&String::from_utf8_lossy(&output.stderr));
        warn!(url, status = %output.status, %cause, "yt-dlp failed");
        return Err(FetchError::Failed(cause));
    }

    find_downloaded_file(dir, options.forced_extension())
}

/// Extract a human-readable cause from yt-dlp's stderr.
///
/// yt-dlp prefixes fatal messages with `ERROR:`; the last such line is the
/// most specific one. Falls back to the last non-empty line.
fn error_cause(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find_map(|l| l.strip_prefix("ERROR:"))
        .map(str::trim)
        .or_else(|| lines.last().copied())
        .unwrap_or("yt-dlp exited with an error")
        .to_string()
}

/// Locate the finished download inside `dir`.
///
/// The directory is exclusively owned by one fetch, so the newest regular
/// file is the result. `.part`/`.ytdl` leftovers from interrupted
/// transfers are skipped, and when post-processing fixed the extension
/// (audio is always mp3) only matching files qualify.
fn find_downloaded_file(dir: &Path, forced_ext: Option<&str>) -> Result<PathBuf, FetchError> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    for entry in std::fs::read_dir(dir).map_err(FetchError::Output)? {
        let entry = entry.map_err(FetchError::Output)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if matches!(ext, "part" | "ytdl" | "aria2") {
            continue;
        }
        if let Some(forced) = forced_ext {
            if !ext.eq_ignore_ascii_case(forced) {
                continue;
            }
        }

        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        if newest.as_ref().is_none_or(|(t, _)| modified >= *t) {
            newest = Some((modified, path));
        }
    }

    newest.map(|(_, p)| p).ok_or(FetchError::NoOutput)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_error_cause_prefers_error_line() {
        let stderr = "WARNING: something minor\nERROR: Unsupported URL: https://x\n";
        assert_eq!(error_cause(stderr), "Unsupported URL: https://x");
    }

    #[test]
    fn test_error_cause_takes_last_error_line() {
        let stderr = "ERROR: first try failed\nretrying...\nERROR: giving up after 10 retries";
        assert_eq!(error_cause(stderr), "giving up after 10 retries");
    }

    #[test]
    fn test_error_cause_falls_back_to_last_line() {
        assert_eq!(error_cause("aria2c: exit status 1\n"), "aria2c: exit status 1");
        assert_eq!(error_cause("  \n\n"), "yt-dlp exited with an error");
    }

    #[test]
    fn test_finds_single_downloaded_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("Some Title.mp4"), b"x").expect("write");

        let found = find_downloaded_file(dir.path(), None).expect("should find file");
        assert_eq!(found, dir.path().join("Some Title.mp4"));
    }

    #[test]
    fn test_skips_partial_downloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("clip.mp4.part"), b"x").expect("write");
        fs::write(dir.path().join("clip.mp4.ytdl"), b"x").expect("write");

        let err = find_downloaded_file(dir.path(), None).expect_err("only leftovers");
        assert!(matches!(err, FetchError::NoOutput));
    }

    #[test]
    fn test_forced_extension_filters_intermediates() {
        let dir = tempfile::tempdir().expect("tempdir");
        // After audio extraction the original container may still be present
        fs::write(dir.path().join("song.webm"), b"x").expect("write");
        fs::write(dir.path().join("song.mp3"), b"x").expect("write");

        let found = find_downloaded_file(dir.path(), Some("mp3")).expect("should find mp3");
        assert_eq!(found, dir.path().join("song.mp3"));
    }

    #[test]
    fn test_empty_directory_is_no_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = find_downloaded_file(dir.path(), None).expect_err("empty dir");
        assert!(matches!(err, FetchError::NoOutput));
    }
}
