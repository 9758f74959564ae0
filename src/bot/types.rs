//! Platform independent message model shared by bots, moderation and the reporter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Author of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Username", default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(rename = "DisplayName", default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
}

impl User {
    pub fn new(id: i64, username: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            display_name: display_name.into(),
        }
    }

    /// Name suitable for addressing the user in a reply.
    pub fn name(&self) -> &str {
        if !self.username.is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }

    /// Markdown mention rendered as a `tg://user` link.
    pub fn mention(&self) -> String {
        format!("[@{}](tg://user?id={})", self.name(), self.id)
    }
}

/// Formatting hint attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Offset")]
    pub offset: usize,
    #[serde(rename = "Length")]
    pub length: usize,
    #[serde(rename = "URL", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "User", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl Entity {
    pub const MENTION: &'static str = "mention";
    pub const TEXT_MENTION: &'static str = "text_mention";
}

/// Attachment carried by a message. The core only passes these through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Kind", rename_all = "snake_case")]
pub enum Media {
    Photo {
        #[serde(rename = "FileID")]
        file_id: String,
        #[serde(rename = "Width")]
        width: u32,
        #[serde(rename = "Height")]
        height: u32,
    },
    Sticker {
        #[serde(rename = "FileID")]
        file_id: String,
        #[serde(rename = "Emoji", default)]
        emoji: Option<String>,
    },
    Voice {
        #[serde(rename = "FileID")]
        file_id: String,
    },
    Animation {
        #[serde(rename = "FileID")]
        file_id: String,
    },
    Document {
        #[serde(rename = "FileID")]
        file_id: String,
        #[serde(rename = "FileName", default)]
        file_name: Option<String>,
    },
    Video {
        #[serde(rename = "FileID")]
        file_id: String,
    },
}

/// Normalized message, as delivered by the platform adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "ID")]
    pub id: i32,
    #[serde(rename = "ChatID")]
    pub chat_id: i64,
    #[serde(rename = "From")]
    pub from: User,
    #[serde(rename = "Text", default)]
    pub text: String,
    #[serde(rename = "Sent")]
    pub sent: DateTime<Utc>,
    #[serde(rename = "Entities", default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Entity>,
    #[serde(rename = "ReplyTo", default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Box<Message>>,
    #[serde(rename = "Media", default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            id: 0,
            chat_id: 0,
            from: User::default(),
            text: String::new(),
            sent: Utc::now(),
            entities: Vec::new(),
            reply_to: None,
            media: None,
        }
    }
}

impl Message {
    /// Message with only text and author set, handy for tests and synthetic input.
    pub fn with_text(text: impl Into<String>, from: User) -> Self {
        Self {
            text: text.into(),
            from,
            ..Default::default()
        }
    }

    /// Trimmed text with the case folded, the form most triggers compare against.
    pub fn normalized_text(&self) -> String {
        self.text.trim().to_lowercase()
    }
}

/// Markup used when sending a reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    #[default]
    Markdown,
    Html,
    Plain,
}

/// What a bot wants the listener to do in reply to a message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub text: String,
    /// Extra pages for flipbook replies.
    pub alt_text: Vec<String>,
    pub send: bool,
    pub pin: bool,
    pub unpin: bool,
    pub preview: bool,
    pub reply_to: Option<i32>,
    /// Restriction to apply to `user`.
    pub ban_interval: Option<Duration>,
    pub user: Option<User>,
    pub delete_reply_to: bool,
    pub parse_mode: ParseMode,
}

impl Response {
    /// Response that does not participate.
    pub fn none() -> Self {
        Self::default()
    }

    /// Plain text reply to be sent.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            send: true,
            ..Default::default()
        }
    }

    /// Ban interval, if any, with zero treated as "no ban".
    pub fn ban(&self) -> Option<(Duration, &User)> {
        match (self.ban_interval, &self.user) {
            (Some(d), Some(u)) if !d.is_zero() => Some((d, u)),
            _ => None,
        }
    }
}
