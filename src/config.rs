//! Application configuration
//!
//! A single [`Config`] struct is loaded once at startup (JSON file plus
//! environment overrides) and passed by `Arc` to every component that needs
//! it. Nothing reads configuration through globals.

use crate::errors::AccessError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Telegram bot token from @BotFather (overridable via BOT_TOKEN)
    #[serde(default)]
    pub bot_token: String,
    /// User ids allowed to run privileged commands (overridable via ADMINS_LIST)
    #[serde(default)]
    pub admins: Vec<i64>,
    /// Group chat ids that receive deal/top-up requests and may act on them
    /// (overridable via ADMIN_GROUPS)
    #[serde(default)]
    pub admin_groups: Vec<i64>,
    pub database: DatabaseConfig,
    pub exchange: ExchangeConfig,
    pub general: GeneralConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Service TON wallet shown on the top-up screen
    pub deposit_wallet: String,
    /// Currency label for wallet withdrawals and top-ups
    pub wallet_currency: String,
    /// Currency label for card withdrawals
    pub card_currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Locale used before a user has registered or chosen a language
    pub default_locale: String,
    /// Log file path; empty disables file logging
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            admins: vec![],
            admin_groups: vec![],
            database: DatabaseConfig {
                path: "users.db".to_string(),
            },
            exchange: ExchangeConfig {
                deposit_wallet: String::new(),
                wallet_currency: "TON".to_string(),
                card_currency: "RUB".to_string(),
            },
            general: GeneralConfig {
                default_locale: "ru".to_string(),
                log_file: "exchangebot.log".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, creating a default one if the
    /// file does not exist, then apply environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse config file {}", path))?
        } else {
            let config = Config::default();
            let raw = serde_json::to_string_pretty(&config)?;
            fs::write(path, raw)
                .with_context(|| format!("failed to write default config to {}", path))?;
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment variables win over file values, matching the deployment
    /// convention of supplying credentials out of band.
    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("BOT_TOKEN") {
            if !token.is_empty() {
                self.bot_token = token;
            }
        }
        if let Ok(list) = std::env::var("ADMINS_LIST") {
            if let Some(ids) = parse_id_list(&list) {
                self.admins = ids;
            }
        }
        if let Ok(list) = std::env::var("ADMIN_GROUPS") {
            if let Some(ids) = parse_id_list(&list) {
                self.admin_groups = ids;
            }
        }
    }

    /// Capability check for privileged operations.
    ///
    /// An actor is an administrator when their user id is allow-listed, or
    /// when they act from inside a configured admin group chat.
    pub fn is_admin(&self, user_id: i64, chat_id: Option<i64>) -> bool {
        if self.admins.contains(&user_id) {
            return true;
        }
        match chat_id {
            Some(chat) => self.admin_groups.contains(&chat),
            None => false,
        }
    }

    /// Like [`Config::is_admin`] but produces a typed authorization error,
    /// for call sites that propagate rather than reply inline.
    pub fn ensure_admin(&self, user_id: i64, chat_id: Option<i64>) -> Result<(), AccessError> {
        if self.is_admin(user_id, chat_id) {
            Ok(())
        } else {
            Err(AccessError::NotAdmin(user_id))
        }
    }
}

/// Parse a comma-separated id list ("123,-1007,42"); None when any entry is
/// malformed so a typo does not silently truncate the allow-list.
fn parse_id_list(raw: &str) -> Option<Vec<i64>> {
    raw.split(',')
        .map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1,2,3"), Some(vec![1, 2, 3]));
        assert_eq!(parse_id_list(" 5 , -100123 "), Some(vec![5, -100123]));
        assert_eq!(parse_id_list("1,abc"), None);
    }

    #[test]
    fn test_is_admin_by_user_id() {
        let mut cfg = Config::default();
        cfg.admins = vec![42];
        assert!(cfg.is_admin(42, None));
        assert!(!cfg.is_admin(43, None));
    }

    #[test]
    fn test_is_admin_by_group() {
        let mut cfg = Config::default();
        cfg.admin_groups = vec![-100500];
        assert!(cfg.is_admin(7, Some(-100500)));
        assert!(!cfg.is_admin(7, Some(-100501)));
        assert!(!cfg.is_admin(7, None));
    }

    #[test]
    fn test_ensure_admin_error() {
        let cfg = Config::default();
        assert!(matches!(
            cfg.ensure_admin(9, None),
            Err(AccessError::NotAdmin(9))
        ));
    }
}
