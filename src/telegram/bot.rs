//! Bot construction and lifecycle helpers

use crate::config::Config;
use crate::logger::{self, LogTag};
use crate::telegram::commands::Command;
use anyhow::{bail, Context, Result};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

/// Build a bot from the configured token and validate it with getMe
pub async fn build_bot(cfg: &Config) -> Result<Bot> {
    if cfg.bot_token.is_empty() {
        bail!("no bot token configured (set BOT_TOKEN or bot_token in config.json)");
    }

    let bot = Bot::new(&cfg.bot_token);
    let me = bot
        .get_me()
        .await
        .context("failed to validate bot token with getMe")?;
    logger::info(
        LogTag::Telegram,
        &format!(
            "Bot initialized: @{} (ID: {})",
            me.username.as_deref().unwrap_or("unknown"),
            me.id
        ),
    );

    Ok(bot)
}

/// Register the command list shown in the Telegram "/" menu
pub async fn register_commands(bot: &Bot) {
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        logger::warning(
            LogTag::Telegram,
            &format!("Failed to register bot commands: {}", e),
        );
    }
}
