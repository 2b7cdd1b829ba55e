//! Telegram integration
//!
//! Everything that talks to the Telegram Bot API lives here:
//! - Bot construction and command registration
//! - The update dispatcher (commands, callbacks, free text)
//! - Inline keyboards and display formatting
//! - Best-effort notification delivery to users and admin groups
//!
//! ```text
//! telegram/
//! ├── mod.rs           # this file - public API
//! ├── bot.rs           # bot construction, command registration
//! ├── dispatcher.rs    # update routing + shared AppContext
//! ├── keyboards.rs     # inline keyboards
//! ├── formatters.rs    # display helpers (masking, amounts)
//! ├── notifier.rs      # best-effort sends
//! └── commands/        # handlers
//!     ├── mod.rs       # command definitions + router
//!     ├── user.rs      # /start /id /balance /help
//!     ├── admin.rs     # /admin /addvip /rmvip + admin callbacks
//!     ├── callbacks.rs # inline button router
//!     └── messages.rs  # free-text input driven by conversation state
//! ```

pub mod bot;
pub mod commands;
pub mod dispatcher;
pub mod formatters;
pub mod keyboards;
pub mod notifier;

pub use dispatcher::{run_dispatcher, AppContext};
