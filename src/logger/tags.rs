/// Subsystem tags for log messages
///
/// Every log line carries the tag of the subsystem that produced it, so a
/// single log stream stays readable when several flows interleave.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTag {
    System,
    Config,
    Database,
    Ledger,
    Telegram,
    Admin,
}

impl LogTag {
    /// Fixed-width, upper-case tag name for console alignment
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Config => "CONFIG",
            LogTag::Database => "DATABASE",
            LogTag::Ledger => "LEDGER",
            LogTag::Telegram => "TELEGRAM",
            LogTag::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
