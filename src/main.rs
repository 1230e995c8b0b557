use clipfetch::bot::handlers::{self, BotDialogue, Command};
use clipfetch::bot::state::State;
use clipfetch::config::Settings;
use dotenvy::dotenv;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Load .env file
    dotenv().ok();

    init_logging();

    info!("Starting clipfetch bot...");

    let settings = init_settings();
    let bot = Bot::new(settings.telegram_token.clone());
    let dialogue_storage = InMemStorage::<State>::new();

    info!("Bot is running...");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![dialogue_storage])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_settings() -> Settings {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            error!("Failed to load configuration (is TELEGRAM_TOKEN set?): {e}");
            std::process::exit(1);
        }
    }
}

/// Explicit dispatch tree: commands work from any state, a text message is
/// only treated as a link while one is awaited, format buttons arrive as
/// callback queries, and everything else restarts the conversation.
fn schema() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_callback_query()
                .enter_dialogue::<CallbackQuery, InMemStorage<State>, State>()
                .endpoint(handle_format_choice),
        )
        .branch(
            Update::filter_message()
                .enter_dialogue::<Message, InMemStorage<State>, State>()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::case![State::AwaitingLink]
                        .filter(|msg: Message| msg.text().is_some())
                        .endpoint(handle_link),
                )
                // Catch-all: any unmatched update restarts from the greeting
                .endpoint(handle_fallback),
        )
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    dialogue: BotDialogue,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => handlers::start(bot, msg, dialogue).await,
        Command::Cancel => handlers::cancel(bot, msg, dialogue).await,
        Command::Help => handlers::help(bot, msg).await,
    };
    if let Err(e) = res {
        error!("Command error: {e}");
    }
    respond(())
}

async fn handle_link(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_link(bot, msg, dialogue).await {
        error!("Link handler error: {e}");
    }
    respond(())
}

async fn handle_format_choice(
    bot: Bot,
    q: CallbackQuery,
    dialogue: BotDialogue,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = Box::pin(handlers::handle_format_choice(bot, q, dialogue)).await {
        error!("Format choice handler error: {e}");
    }
    respond(())
}

async fn handle_fallback(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::start(bot, msg, dialogue).await {
        error!("Fallback handler error: {e}");
    }
    respond(())
}
