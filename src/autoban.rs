//! Kicks users who flood the bots with oversized, repeated or rapid messages.

use crate::bot::Message;
use crate::chat::{ChatApi, SuperUsers};
use crate::config::service;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(1);

/// AutoBan limits. A zero limit disables the corresponding rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoBanParams {
    pub max_msg_size: usize,
    pub msgs_per_sec: u32,
    pub dups_per_sec: u32,
}

#[derive(Debug, Clone)]
struct Activity {
    dt: Instant,
    count: u32,
    dups: u32,
    msg: String,
}

impl Activity {
    fn start(text: &str, now: Instant) -> Self {
        Self {
            dt: now,
            count: 1,
            dups: 1,
            msg: text.to_string(),
        }
    }
}

/// Why a user was kicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offense {
    TooLong,
    Duplicates,
    TooFast,
}

impl std::fmt::Display for Offense {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Offense::TooLong => write!(f, "message too long"),
            Offense::Duplicates => write!(f, "duplicated messages"),
            Offense::TooFast => write!(f, "too many messages"),
        }
    }
}

pub struct AutoBan {
    params: AutoBanParams,
    super_users: SuperUsers,
    api: Arc<dyn ChatApi>,
    last_activity: Mutex<HashMap<i64, Activity>>,
}

impl AutoBan {
    pub fn new(params: AutoBanParams, super_users: SuperUsers, api: Arc<dyn ChatApi>) -> Self {
        Self {
            params,
            super_users,
            api,
            last_activity: Mutex::new(HashMap::new()),
        }
    }

    /// Records the message and reports the rule it breaks. Never touches the chat.
    pub fn offense_at(&self, msg: &Message, now: Instant) -> Option<Offense> {
        if self.super_users.contains_user(&msg.from) || service::is_service(msg.from.id) {
            return None;
        }

        if self.params.max_msg_size > 0 && msg.text.chars().count() > self.params.max_msg_size {
            return Some(Offense::TooLong);
        }

        let mut activity = self.last_activity.lock().unwrap_or_else(|e| e.into_inner());
        let Some(prior) = activity.get_mut(&msg.from.id) else {
            activity.insert(msg.from.id, Activity::start(&msg.text, now));
            return None;
        };

        if msg.text == prior.msg {
            prior.dups += 1;
            if self.params.dups_per_sec > 0 && prior.dups >= self.params.dups_per_sec {
                return Some(Offense::Duplicates);
            }
        }

        if self.params.msgs_per_sec > 0 && prior.count >= self.params.msgs_per_sec {
            return Some(Offense::TooFast);
        }

        // the window only moves once a message arrives after it closed
        if now.duration_since(prior.dt) < WINDOW {
            prior.count += 1;
        } else {
            *prior = Activity::start(&msg.text, now);
        }
        None
    }

    /// Kicks the author if the message breaks a limit. Returns true only when the kick went through.
    pub async fn check(&self, msg: &Message) -> bool {
        let Some(offense) = self.offense_at(msg, Instant::now()) else {
            return false;
        };
        log::info!(
            "autoban {} (id {}) in chat {}: {}",
            msg.from.name(),
            msg.from.id,
            msg.chat_id,
            offense
        );
        match self.api.kick(msg.chat_id, msg.from.id).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("failed to kick {} in chat {}: {:#}", msg.from.id, msg.chat_id, e);
                false
            }
        }
    }
}
