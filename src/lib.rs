#![deny(missing_docs)]
//! clipfetch - Telegram media download bot
//!
//! A small conversational bot: the user sends a link, picks audio or video,
//! and gets the file back. Downloads are delegated to the external `yt-dlp`
//! tool and run on blocking workers so the dispatcher stays responsive.

/// Telegram bot implementation
pub mod bot;
/// Configuration management
pub mod config;
/// Media download via yt-dlp
pub mod download;
