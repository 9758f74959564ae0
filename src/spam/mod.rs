//! User admission filters backed by an external or local spam oracle.
//!
//! A [`SpamFilter`] wraps one [`SpamOracle`] and adds the shared policy:
//! super-users and anonymous senders bypass the check, the first clean
//! message approves the sender for the rest of the process lifetime, and
//! spam produces a response asking the listener to delete the message and
//! ban the author.

pub mod cas;
pub mod llm;
pub mod local;

pub use cas::CasOracle;
pub use llm::LlmOracle;
pub use local::{LocalOracle, LocalOracleParams};

use crate::bot::{Bot, Message, Response};
use crate::chat::SuperUsers;
use crate::config::{text, PERMANENT_BAN_DURATION};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;

/// Oracle decision for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Ham,
    Spam(String),
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("can't decode response: {0}")]
    Decode(String),
}

/// Source of spam verdicts.
#[async_trait]
pub trait SpamOracle: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;
    async fn check(&self, msg: &Message) -> Result<Verdict, OracleError>;
}

/// Spam filter with a process-wide set of approved users.
pub struct SpamFilter {
    oracle: Box<dyn SpamOracle>,
    super_users: SuperUsers,
    dry: bool,
    approved: Mutex<HashSet<i64>>,
}

impl SpamFilter {
    pub fn new(oracle: Box<dyn SpamOracle>, super_users: SuperUsers, dry: bool) -> Self {
        Self {
            oracle,
            super_users,
            dry,
            approved: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_approved(&self, user_id: i64) -> bool {
        self.approved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&user_id)
    }

    fn approve(&self, user_id: i64) {
        self.approved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user_id);
    }

    fn spam_response(&self, msg: &Message, reason: &str) -> Response {
        let report = format!("this is spam from \"{}\", {}", msg.from.name(), reason);
        if self.dry {
            return Response {
                text: format!("{}{}", text::DRY_MODE_PREFIX, report),
                send: true,
                reply_to: Some(msg.id),
                ..Default::default()
            };
        }
        Response {
            text: report,
            send: true,
            reply_to: Some(msg.id),
            ban_interval: Some(PERMANENT_BAN_DURATION),
            user: Some(msg.from.clone()),
            delete_reply_to: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Bot for SpamFilter {
    async fn on_message(&self, msg: &Message) -> Response {
        if msg.from.id == 0 || self.super_users.contains_user(&msg.from) {
            return Response::none();
        }
        if self.is_approved(msg.from.id) {
            return Response::none();
        }

        match self.oracle.check(msg).await {
            Ok(Verdict::Ham) => {
                self.approve(msg.from.id);
                Response::none()
            }
            Ok(Verdict::Spam(reason)) => {
                log::info!(
                    "{} detected spam from {} (id {}) in chat {}: {}",
                    self.oracle.name(),
                    msg.from.name(),
                    msg.from.id,
                    msg.chat_id,
                    reason
                );
                self.spam_response(msg, &reason)
            }
            Err(e) => {
                log::warn!("{} check failed for user {}: {}", self.oracle.name(), msg.from.id, e);
                Response::none()
            }
        }
    }

    fn react_on(&self) -> Vec<String> {
        Vec::new()
    }
}
