//! Centralized configuration constants and defaults.

use std::time::Duration;

/// **Help triggers:** messages that make the dispatcher answer with the help text.
pub const HELP_TRIGGERS: &[&str] = &["help", "/help", "help!"];

/// Restriction length treated by Telegram as "forever" (anything above ~366 days).
pub const PERMANENT_BAN_DURATION: Duration = Duration::from_secs(400 * 24 * 60 * 60);

/// Durations at or above this threshold are issued as bans instead of restrictions.
pub const PERMANENT_BAN_THRESHOLD: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// **Service accounts:** Telegram ids that post on behalf of channels and admins.
pub mod service {
    /// Telegram service notifications.
    pub const TELEGRAM_SERVICE_ID: i64 = 777000;
    /// `@Channel_Bot`, posts forwarded from a linked channel.
    pub const CHANNEL_BOT_ID: i64 = 136817688;
    /// `@GroupAnonymousBot`, anonymous group admins.
    pub const GROUP_ANONYMOUS_BOT_ID: i64 = 1087968824;

    /// Ids that bypass automatic moderation.
    pub const IDS: &[i64] = &[TELEGRAM_SERVICE_ID, CHANNEL_BOT_ID, GROUP_ANONYMOUS_BOT_ID];

    /// Returns true for platform service accounts.
    pub fn is_service(id: i64) -> bool {
        IDS.contains(&id)
    }
}

/// **Reporter:** chat log writer tuning.
pub mod reporter {
    use std::time::Duration;

    /// Capacity of the save queue; saves beyond it are dropped.
    pub const QUEUE_CAPACITY: usize = 1000;
    /// Flush once this many entries are buffered.
    pub const BATCH_SIZE: usize = 100;
    /// Flush when no new entries arrived for this long.
    pub const FLUSH_IDLE: Duration = Duration::from_secs(5);
    /// Deadline for the delete-detection check.
    pub const CHECK_TIMEOUT: Duration = Duration::from_secs(10);
    /// Unix permissions of created log files.
    pub const FILE_MODE: u32 = 0o660;
}

/// **Flipbook:** paged reply cache limits.
pub mod flipbook {
    use std::time::Duration;

    pub const MAX_ENTRIES: usize = 100;
    pub const TTL: Duration = Duration::from_secs(12 * 60 * 60);
    /// Separator between key and page in callback payloads.
    pub const CALLBACK_SEPARATOR: char = ':';
}

/// **Timeouts** for outbound calls.
pub mod timeout {
    use std::time::Duration;

    /// Per-call deadline recommended for bots talking to the network.
    pub const BOT_CALL: Duration = Duration::from_secs(5);
    /// Deadline for oracle requests (CAS, LLM).
    pub const ORACLE: Duration = Duration::from_secs(5);
    /// Deadline for the broadcast liveness ping.
    pub const BROADCAST_PING: Duration = Duration::from_secs(5);
    /// Deadline for reading the single Rtjc line.
    pub const RTJC_READ: Duration = Duration::from_secs(5);
    /// Pause after a failed accept before retrying.
    pub const RTJC_BACKOFF: Duration = Duration::from_millis(100);
}

/// **User-visible texts.**
pub mod text {
    pub const BROADCAST_STARTED: &str = "broadcast started";
    pub const BROADCAST_FINISHED: &str = "broadcast finished";
    pub const DRY_MODE_PREFIX: &str = "but I'm in dry mode, ";
    pub const FLIPBOOK_EXPIRED: &str = "this message has expired";
}

/// **Rtjc:** defaults for the pinned announcement recognizer.
pub mod rtjc {
    pub const PIN_MARKER: &str = "⚠️ Официальный кАТ! - Срочно в номер!";
    pub const PIN_REPLACEMENT: &str = "⚠️ Вести из кАта:";
}
