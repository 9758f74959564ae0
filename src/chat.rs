//! Platform surface used by the core: outbound messages and administrative actions.

use crate::bot::{ParseMode, User};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;

/// Navigation controls attached to a flipbook reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub key: u64,
    pub page: usize,
    pub total: usize,
}

/// A message the listener wants posted.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    pub parse_mode: ParseMode,
    pub preview: bool,
    pub reply_to: Option<i32>,
    pub paging: Option<Paging>,
}

impl OutgoingMessage {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: ParseMode::Markdown,
            preview: false,
            reply_to: None,
            paging: None,
        }
    }
}

/// Messaging platform operations. Every call is try-once; callers log and swallow errors.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Posts a message and returns its id.
    async fn send(&self, msg: OutgoingMessage) -> Result<i32>;
    async fn edit(&self, message_id: i32, msg: OutgoingMessage) -> Result<()>;
    async fn pin(&self, chat_id: i64, message_id: i32) -> Result<()>;
    async fn unpin(&self, chat_id: i64, message_id: i32) -> Result<()>;
    async fn delete(&self, chat_id: i64, message_id: i32) -> Result<()>;
    /// Makes the user read-only for `duration`.
    async fn restrict(&self, chat_id: i64, user_id: i64, duration: Duration) -> Result<()>;
    async fn ban(&self, chat_id: i64, user_id: i64, duration: Duration) -> Result<()>;
    /// Removes the user from the chat while allowing them to rejoin.
    async fn kick(&self, chat_id: i64, user_id: i64) -> Result<()>;
    async fn unban(&self, chat_id: i64, user_id: i64) -> Result<()>;
}

/// Usernames exempt from moderation and allowed to run privileged commands.
#[derive(Debug, Clone, Default)]
pub struct SuperUsers {
    names: HashSet<String>,
}

impl SuperUsers {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| Self::key(n.as_ref()))
            .filter(|n| !n.is_empty())
            .collect();
        Self { names }
    }

    fn key(name: &str) -> String {
        name.trim().trim_start_matches('@').to_lowercase()
    }

    pub fn is_super(&self, username: &str) -> bool {
        !username.is_empty() && self.names.contains(&Self::key(username))
    }

    pub fn contains_user(&self, user: &User) -> bool {
        self.is_super(&user.username)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
