//! Delivery pipeline for one download.
//!
//! Fetches the media into a scoped temporary directory, paces the send
//! with a short visible countdown, ships the file to the chat, and always
//! removes the directory afterwards.

use crate::download::{self, MediaKind};
use anyhow::Result;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, MessageId};
use tracing::{error, info};

/// Seconds counted down before the file is sent. Purely user-facing pacing.
const COUNTDOWN_FROM: u64 = 5;

/// Status line for one countdown tick
fn countdown_text(kind: MediaKind, secs: u64) -> String {
    let unit = if secs == 1 { "second" } else { "seconds" };
    format!("🚀 Sending your {kind} in {secs} {unit}…")
}

/// Run one download and hand the result to the user.
///
/// `status` is the message already showing the "Downloading…" line;
/// countdown ticks edit it in place. The temporary directory is removed
/// on every exit path when the guard drops; removal failures are ignored
/// by `TempDir` itself.
///
/// # Errors
///
/// Returns an error only when Telegram itself rejects a send or edit.
/// Fetch failures are reported to the user and logged, not propagated.
pub async fn deliver(
    bot: &Bot,
    chat_id: ChatId,
    status: MessageId,
    url: String,
    kind: MediaKind,
) -> Result<()> {
    let workdir = tempfile::tempdir()?;

    match download::fetch(url.clone(), workdir.path().to_path_buf(), kind).await {
        Ok(file_path) => {
            info!(%url, path = %file_path.display(), "download finished");

            for secs in (1..=COUNTDOWN_FROM).rev() {
                bot.edit_message_text(chat_id, status, countdown_text(kind, secs))
                    .await?;
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let media = InputFile::file(file_path);
            match kind {
                MediaKind::Audio => {
                    bot.send_audio(chat_id, media).await?;
                }
                MediaKind::Video => {
                    bot.send_video(chat_id, media).await?;
                }
            }

            bot.send_message(chat_id, "✅ Done! Send me another link (or /cancel to stop).")
                .await?;
        }
        Err(e) => {
            error!(%url, error = %e, "download failed");
            bot.send_message(chat_id, format!("❌ Error during download: {e}"))
                .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_pluralization() {
        assert_eq!(
            countdown_text(MediaKind::Audio, 5),
            "🚀 Sending your audio in 5 seconds…"
        );
        assert_eq!(
            countdown_text(MediaKind::Audio, 2),
            "🚀 Sending your audio in 2 seconds…"
        );
        assert_eq!(
            countdown_text(MediaKind::Audio, 1),
            "🚀 Sending your audio in 1 second…"
        );
    }

    #[test]
    fn test_countdown_names_the_chosen_kind() {
        for secs in (1..=COUNTDOWN_FROM).rev() {
            assert!(countdown_text(MediaKind::Video, secs).contains("your video"));
        }
    }

    #[test]
    fn test_workdir_removed_on_drop() {
        let workdir = tempfile::tempdir().expect("tempdir");
        let path = workdir.path().to_path_buf();
        std::fs::write(path.join("clip.mp4"), b"x").expect("write");

        drop(workdir);
        assert!(!path.exists());
    }
}
