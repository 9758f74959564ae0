#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use rt_bot::bot::{Message, User};
use rt_bot::chat::{ChatApi, OutgoingMessage};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Platform call captured by [`RecordingApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Send(OutgoingMessage),
    Edit(i32, OutgoingMessage),
    Pin(i64, i32),
    Unpin(i64, i32),
    Delete(i64, i32),
    Restrict(i64, i64, Duration),
    Ban(i64, i64, Duration),
    Kick(i64, i64),
    Unban(i64, i64),
}

/// ChatApi double remembering every call in order.
pub struct RecordingApi {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI32,
    fail_kick: AtomicBool,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(1000),
            fail_kick: AtomicBool::new(false),
        }
    }

    pub fn fail_kicks(&self) {
        self.fail_kick.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChatApi for RecordingApi {
    async fn send(&self, msg: OutgoingMessage) -> Result<i32> {
        self.record(Call::Send(msg));
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn edit(&self, message_id: i32, msg: OutgoingMessage) -> Result<()> {
        self.record(Call::Edit(message_id, msg));
        Ok(())
    }

    async fn pin(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.record(Call::Pin(chat_id, message_id));
        Ok(())
    }

    async fn unpin(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.record(Call::Unpin(chat_id, message_id));
        Ok(())
    }

    async fn delete(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.record(Call::Delete(chat_id, message_id));
        Ok(())
    }

    async fn restrict(&self, chat_id: i64, user_id: i64, duration: Duration) -> Result<()> {
        self.record(Call::Restrict(chat_id, user_id, duration));
        Ok(())
    }

    async fn ban(&self, chat_id: i64, user_id: i64, duration: Duration) -> Result<()> {
        self.record(Call::Ban(chat_id, user_id, duration));
        Ok(())
    }

    async fn kick(&self, chat_id: i64, user_id: i64) -> Result<()> {
        if self.fail_kick.load(Ordering::SeqCst) {
            return Err(anyhow!("not enough rights"));
        }
        self.record(Call::Kick(chat_id, user_id));
        Ok(())
    }

    async fn unban(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.record(Call::Unban(chat_id, user_id));
        Ok(())
    }
}

pub fn user(id: i64, username: &str) -> User {
    User::new(id, username, username)
}

/// Message sent now in `chat_id`.
pub fn message(id: i32, chat_id: i64, from: User, text: &str) -> Message {
    Message {
        id,
        chat_id,
        sent: Utc::now(),
        ..Message::with_text(text, from)
    }
}
