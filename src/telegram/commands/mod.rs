//! Command definitions and the command router

pub mod admin;
pub mod callbacks;
pub mod messages;
pub mod user;

use crate::telegram::AppContext;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "open the main menu")]
    Start(String),
    #[command(description = "show your ID (chat ID in groups)")]
    Id,
    #[command(description = "show your balance")]
    Balance(String),
    #[command(description = "list available commands")]
    Help,
    #[command(description = "open the admin panel")]
    Admin,
    #[command(description = "grant temporary balance rights")]
    Addvip(String),
    #[command(description = "revoke balance rights")]
    Rmvip(String),
}

/// Dispatch a parsed command to its handler
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    ctx: Arc<AppContext>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start(payload) => user::handle_start(&bot, &msg, &ctx, &payload).await,
        Command::Id => user::handle_id(&bot, &msg, &ctx).await,
        Command::Balance(args) => user::handle_balance(&bot, &msg, &ctx, &args).await,
        Command::Help => user::handle_help(&bot, &msg, &ctx).await,
        Command::Admin => admin::handle_admin_panel(&bot, &msg, &ctx).await,
        Command::Addvip(args) => admin::handle_addvip(&bot, &msg, &ctx, &args).await,
        Command::Rmvip(args) => admin::handle_rmvip(&bot, &msg, &ctx, &args).await,
    }
}
