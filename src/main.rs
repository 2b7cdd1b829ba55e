use clap::Parser;
use exchangebot::config::Config;
use exchangebot::database::Database;
use exchangebot::locales::Translator;
use exchangebot::logger::{self, LogTag};
use exchangebot::state::ConversationStore;
use exchangebot::telegram::{self, AppContext};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "exchangebot", about = "P2P exchange Telegram bot")]
struct Args {
    /// Path to the JSON config file
    #[arg(long, default_value = "config.json")]
    config: String,
}

#[tokio::main]
async fn main() {
    // .env is optional; environment beats file config either way
    dotenv::dotenv().ok();
    let args = Args::parse();

    let cfg = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            std::process::exit(1);
        }
    };

    let log_file = if cfg.general.log_file.is_empty() {
        None
    } else {
        Some(cfg.general.log_file.as_str())
    };
    logger::init(log_file);
    logger::info(LogTag::System, "🚀 exchangebot starting up");

    if cfg.admins.is_empty() && cfg.admin_groups.is_empty() {
        logger::warning(
            LogTag::Config,
            "No admins or admin groups configured; requests cannot be approved",
        );
    }

    let db = match Database::open(&cfg.database.path) {
        Ok(db) => db,
        Err(e) => {
            logger::error(LogTag::Database, &format!("Failed to open database: {:#}", e));
            std::process::exit(1);
        }
    };
    logger::info(
        LogTag::Database,
        &format!("Database ready at {}", cfg.database.path),
    );

    let translator = match Translator::load(&cfg.general.default_locale) {
        Ok(t) => t,
        Err(e) => {
            logger::error(LogTag::Config, &format!("Failed to load locales: {:#}", e));
            std::process::exit(1);
        }
    };

    let bot = match telegram::bot::build_bot(&cfg).await {
        Ok(bot) => bot,
        Err(e) => {
            logger::error(LogTag::Telegram, &format!("Failed to start bot: {:#}", e));
            std::process::exit(1);
        }
    };
    telegram::bot::register_commands(&bot).await;

    let ctx = Arc::new(AppContext {
        cfg,
        db,
        translator,
        conversations: ConversationStore::new(),
    });

    telegram::run_dispatcher(bot, ctx).await;
    logger::info(LogTag::System, "Shutdown complete");
}
