//! Command, message, and callback handlers for the download conversation.
//!
//! The conversation loops: greeting, link, format choice, delivery, back
//! to the link prompt. Anything the dispatcher cannot match restarts the
//! conversation from the greeting.

use crate::bot::delivery;
use crate::bot::state::State;
use crate::download::MediaKind;
use anyhow::{anyhow, Result};
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::command::BotCommands;
use tracing::warn;

/// Dialogue handle shared by all handlers
pub type BotDialogue = Dialogue<State, InMemStorage<State>>;

/// Commands understood by the bot
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Begin (or restart) a download conversation
    #[command(description = "begin download.")]
    Start,
    /// End the conversation
    #[command(description = "stop.")]
    Cancel,
    /// Show the command summary
    #[command(description = "show help.")]
    Help,
}

const GREETING: &str = "👋 Hi! Send me the link of the video you want to download.";
const BAD_URL: &str = "❗️ Please send a valid URL (must start with http:// or https://).";
const CHOOSE_FORMAT: &str = "Great! Do you want audio or video?";
const LOST_URL: &str = "❌ Something went wrong (missing URL). Please /start again.";
const FAREWELL: &str = "👋 Operation cancelled. Use /start to download again.";
const HELP: &str = "/start – begin download\n/cancel – stop";

/// `/start`, also the catch-all restart: greet and wait for a link.
///
/// Always lands in `AwaitingLink`, discarding any pending URL.
///
/// # Errors
///
/// Returns an error if the dialogue update or the reply fails.
pub async fn start(bot: Bot, msg: Message, dialogue: BotDialogue) -> Result<()> {
    dialogue
        .update(State::AwaitingLink)
        .await
        .map_err(|e| anyhow!(e.to_string()))?;
    bot.send_message(msg.chat.id, GREETING).await?;
    Ok(())
}

/// `/cancel`: say goodbye and end the dialogue.
///
/// # Errors
///
/// Returns an error if the dialogue exit or the reply fails.
pub async fn cancel(bot: Bot, msg: Message, dialogue: BotDialogue) -> Result<()> {
    dialogue.exit().await.map_err(|e| anyhow!(e.to_string()))?;
    bot.send_message(msg.chat.id, FAREWELL).await?;
    Ok(())
}

/// `/help`: list the commands.
///
/// # Errors
///
/// Returns an error if the reply fails.
pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, HELP).await?;
    Ok(())
}

/// Validate and trim a candidate link. Accepted schemes are http and
/// https, case-insensitively.
fn parse_link(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(trimmed)
    } else {
        None
    }
}

/// The two-button audio/video chooser
fn format_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[
        InlineKeyboardButton::callback("Audio 🎵", MediaKind::Audio.as_str()),
        InlineKeyboardButton::callback("Video 🎥", MediaKind::Video.as_str()),
    ]])
}

/// A text message while a link is awaited: validate it and ask for the
/// format, or re-prompt without leaving `AwaitingLink`.
///
/// # Errors
///
/// Returns an error if the dialogue update or a reply fails.
pub async fn handle_link(bot: Bot, msg: Message, dialogue: BotDialogue) -> Result<()> {
    let Some(url) = msg.text().and_then(parse_link) else {
        bot.send_message(msg.chat.id, BAD_URL).await?;
        return Ok(());
    };

    dialogue
        .update(State::AwaitingFormat {
            url: url.to_string(),
        })
        .await
        .map_err(|e| anyhow!(e.to_string()))?;

    bot.send_message(msg.chat.id, CHOOSE_FORMAT)
        .reply_markup(format_keyboard())
        .await?;
    Ok(())
}

/// A format button was pressed: run the delivery pipeline and loop back
/// to the link prompt, whatever the outcome.
///
/// # Errors
///
/// Returns an error if a dialogue operation or a Telegram call fails.
pub async fn handle_format_choice(bot: Bot, q: CallbackQuery, dialogue: BotDialogue) -> Result<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(msg) = q.message.as_ref() else {
        return Ok(());
    };
    let chat_id = msg.chat().id;
    let status_id = msg.id();

    let Some(kind) = q.data.as_deref().and_then(MediaKind::parse) else {
        // Unrecognized payload, treat like any other unmatched event
        warn!(data = ?q.data, "unrecognized callback payload, restarting");
        dialogue
            .update(State::AwaitingLink)
            .await
            .map_err(|e| anyhow!(e.to_string()))?;
        bot.send_message(chat_id, GREETING).await?;
        return Ok(());
    };

    let url = match dialogue.get().await {
        Ok(Some(State::AwaitingFormat { url })) => url,
        _ => {
            // The button outlived its dialogue, nothing left to download
            bot.edit_message_text(chat_id, status_id, LOST_URL).await?;
            dialogue.exit().await.map_err(|e| anyhow!(e.to_string()))?;
            return Ok(());
        }
    };

    bot.edit_message_text(chat_id, status_id, format!("🔄 Downloading your {kind}…"))
        .await?;

    // Back to the link prompt regardless of how delivery goes
    dialogue
        .update(State::AwaitingLink)
        .await
        .map_err(|e| anyhow!(e.to_string()))?;

    delivery::deliver(&bot, chat_id, status_id, url, kind).await
}
