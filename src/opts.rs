//! Command line options. Every flag can also come from the environment or `.env`.

use crate::autoban::AutoBanParams;
use crate::bot::broadcast::BroadcastParams;
use crate::bot::openai::OpenAiParams;
use crate::chat::SuperUsers;
use crate::config::{flipbook, rtjc, timeout};
use crate::llm::LlmParams;
use crate::spam::local::LocalOracleParams;
use crate::terminator::TerminatorParams;
use clap::Parser;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DAY: u64 = 24 * 60 * 60;

/// Chat automation and moderation bot for the podcast chat.
#[derive(Parser, Debug, Clone)]
#[command(name = "rt-bot", version, about)]
pub struct Opts {
    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_TOKEN")]
    pub token: String,

    /// Main group id for announcements
    #[arg(long, env = "TELEGRAM_GROUP", default_value_t = 0, allow_hyphen_values = true)]
    pub group: i64,

    /// Bot username, resolved from Telegram when empty
    #[arg(long = "bot-name", env = "BOT_NAME", default_value = "")]
    pub bot_name: String,

    /// Super-users, comma separated
    #[arg(long = "super", env = "SUPER_USERS", value_delimiter = ',')]
    pub super_users: Vec<String>,

    /// Rtjc listener port, 0 disables it
    #[arg(long, env = "RTJC_PORT", default_value_t = 18001)]
    pub port: u16,

    #[arg(long, env = "RTJC_PIN_MARKER", default_value = rtjc::PIN_MARKER)]
    pub pin_marker: String,

    #[arg(long, env = "RTJC_PIN_REPLACEMENT", default_value = rtjc::PIN_REPLACEMENT)]
    pub pin_replacement: String,

    /// Directory for daily chat logs, empty disables logging
    #[arg(long, env = "LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Public message url template with {chat} and {id}; enables deleted message detection
    #[arg(long, env = "MESSAGE_URL")]
    pub message_url: Option<String>,

    #[arg(long, env = "MESSAGE_CHECK_DELAY_SECS", default_value_t = 10)]
    pub message_check_delay_secs: u64,

    #[arg(long, env = "BAN_DURATION_SECS", default_value_t = 600)]
    pub ban_duration_secs: u64,

    #[arg(long, env = "BAN_PENALTY", default_value_t = 3)]
    pub ban_penalty: u32,

    #[arg(long, env = "ALLOWED_PERIOD_MS", default_value_t = 30_000)]
    pub allowed_period_ms: u64,

    /// Longest message allowed when it triggers a bot, 0 disables the check
    #[arg(long, env = "MAX_MSG_SIZE", default_value_t = 5000)]
    pub max_msg_size: usize,

    #[arg(long, env = "MSGS_PER_SEC", default_value_t = 5)]
    pub msgs_per_sec: u32,

    #[arg(long, env = "DUPS_PER_SEC", default_value_t = 3)]
    pub dups_per_sec: u32,

    /// CAS api root, empty disables the CAS filter
    #[arg(long, env = "CAS_API", default_value = "https://api.cas.chat")]
    pub cas_api: String,

    /// Spam samples file, one per line
    #[arg(long, env = "SPAM_SAMPLES")]
    pub spam_samples: Option<PathBuf>,

    #[arg(long, env = "SPAM_STOP_WORDS")]
    pub spam_stop_words: Option<PathBuf>,

    #[arg(long, env = "SPAM_SIMILARITY_THRESHOLD", default_value_t = 0.5)]
    pub spam_similarity_threshold: f64,

    #[arg(long, env = "SPAM_MAX_EMOJI", default_value_t = 2)]
    pub spam_max_emoji: usize,

    /// Ask the llm about first messages of unknown users
    #[arg(long, env = "SPAM_LLM")]
    pub spam_llm: bool,

    /// Characters of samples put into the llm prompt
    #[arg(long, env = "SPAM_PROMPT_SIZE", default_value_t = 2000)]
    pub spam_prompt_size: usize,

    /// Report spam without deleting or banning
    #[arg(long, env = "SPAM_DRY")]
    pub spam_dry: bool,

    #[arg(long, env = "OPENAI_API", default_value = "https://api.openai.com/v1")]
    pub openai_api: String,

    /// OpenAI token, empty disables the chat bot and the llm filter
    #[arg(long, env = "OPENAI_TOKEN", default_value = "")]
    pub openai_token: String,

    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4o-mini")]
    pub openai_model: String,

    #[arg(long, env = "OPENAI_MAX_TOKENS", default_value_t = 1000)]
    pub max_tokens: u32,

    #[arg(long, env = "OPENAI_MAX_SYMBOLS", default_value_t = 16000)]
    pub max_symbols: usize,

    /// Deadline for one completion request of the chat bot
    #[arg(long, env = "OPENAI_TIMEOUT_SECS", default_value_t = timeout::BOT_CALL.as_secs())]
    pub openai_timeout_secs: u64,

    #[arg(long, env = "OPENAI_HISTORY_SIZE", default_value_t = 5)]
    pub history_size: usize,

    #[arg(long, env = "OPENAI_HISTORY_REPLY_PROBABILITY", default_value_t = 0.0)]
    pub history_reply_probability: f64,

    /// Directory with basic.data and say.data
    #[arg(long, env = "SYS_DATA", default_value = "data")]
    pub sys_data: PathBuf,

    #[arg(long, env = "WTF_MIN_DAYS", default_value_t = 1)]
    pub wtf_min_days: u64,

    #[arg(long, env = "WTF_MAX_DAYS", default_value_t = 10)]
    pub wtf_max_days: u64,

    /// Stream url pinged for liveness, empty disables the broadcast watcher
    #[arg(long, env = "BROADCAST_URL", default_value = "")]
    pub broadcast_url: String,

    #[arg(long, env = "PING_INTERVAL_MS", default_value_t = 10_000)]
    pub ping_interval_ms: u64,

    #[arg(long, env = "DELAY_TO_OFF_SECS", default_value_t = 300)]
    pub delay_to_off_secs: u64,

    /// File keeping broadcast status across restarts
    #[arg(long, env = "BROADCAST_STATE")]
    pub broadcast_state: Option<PathBuf>,

    #[arg(long, env = "FLIPBOOK_TTL_SECS", default_value_t = flipbook::TTL.as_secs())]
    pub flipbook_ttl_secs: u64,

    /// Exit cleanly after this many hours, 0 runs forever
    #[arg(long, env = "MAX_LIFETIME_HOURS", default_value_t = 0)]
    pub max_lifetime_hours: u64,

    /// Debug logging
    #[arg(long, env = "DEBUG")]
    pub dbg: bool,
}

impl Opts {
    pub fn super_users(&self) -> SuperUsers {
        SuperUsers::new(&self.super_users)
    }

    pub fn rtjc_addr(&self) -> Option<SocketAddr> {
        (self.port != 0).then(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port)))
    }

    pub fn terminator(&self) -> TerminatorParams {
        TerminatorParams {
            ban_duration: Duration::from_secs(self.ban_duration_secs),
            ban_penalty: self.ban_penalty,
            allowed_period: Duration::from_millis(self.allowed_period_ms),
            exclude: self.super_users(),
        }
    }

    pub fn autoban(&self) -> AutoBanParams {
        AutoBanParams {
            max_msg_size: self.max_msg_size,
            msgs_per_sec: self.msgs_per_sec,
            dups_per_sec: self.dups_per_sec,
        }
    }

    pub fn local_oracle(&self) -> LocalOracleParams {
        LocalOracleParams {
            similarity_threshold: self.spam_similarity_threshold,
            max_emoji: self.spam_max_emoji,
        }
    }

    /// None when no OpenAI token is configured. The timeout is the chat bot's.
    pub fn llm(&self) -> Option<LlmParams> {
        if self.openai_token.is_empty() {
            return None;
        }
        Some(LlmParams {
            api: self.openai_api.trim_end_matches('/').to_string(),
            token: self.openai_token.clone(),
            model: self.openai_model.clone(),
            timeout: Duration::from_secs(self.openai_timeout_secs.max(1)),
        })
    }

    pub fn openai(&self) -> OpenAiParams {
        OpenAiParams {
            max_tokens: self.max_tokens,
            max_symbols: self.max_symbols,
            history_size: self.history_size,
            reply_probability: self.history_reply_probability,
            cooldown: Duration::from_secs(60),
            super_users: self.super_users(),
        }
    }

    pub fn wtf_range(&self) -> (Duration, Duration) {
        let min = self.wtf_min_days.min(self.wtf_max_days);
        (Duration::from_secs(min * DAY), Duration::from_secs(self.wtf_max_days.max(min) * DAY))
    }

    /// None when no stream url is configured.
    pub fn broadcast(&self) -> Option<BroadcastParams> {
        if self.broadcast_url.is_empty() {
            return None;
        }
        Some(BroadcastParams {
            url: self.broadcast_url.clone(),
            ping_interval: Duration::from_millis(self.ping_interval_ms.max(1)),
            delay_to_off: Duration::from_secs(self.delay_to_off_secs),
            state_file: self.broadcast_state.clone(),
        })
    }

    pub fn max_lifetime(&self) -> Option<Duration> {
        (self.max_lifetime_hours > 0).then(|| Duration::from_secs(self.max_lifetime_hours * 60 * 60))
    }
}
