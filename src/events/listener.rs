use crate::autoban::AutoBan;
use crate::bot::{Bot, Message, MultiBot, ParseMode, Response};
use crate::chat::{ChatApi, OutgoingMessage, Paging};
use crate::config::PERMANENT_BAN_THRESHOLD;
use crate::events::flipbook::{parse_callback, Book, Flipbook};
use crate::reporter::Reporter;
use crate::rtjc::Submitter;
use crate::terminator::Terminator;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct ListenerParams {
    /// Chat that receives submitted announcements.
    pub chat_id: i64,
    /// Own username, messages from it are ignored.
    pub bot_username: String,
    pub bot_display_name: String,
}

/// What happened to an incoming message; mostly useful for tests and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ignored,
    Spam,
    Kicked,
    NoReply,
    Throttled,
    Warned,
    Replied,
}

/// Platform independent message pipeline.
pub struct Listener {
    params: ListenerParams,
    api: Arc<dyn ChatApi>,
    bots: MultiBot,
    spam_filters: Vec<Arc<dyn Bot>>,
    terminator: Terminator,
    autoban: AutoBan,
    reporter: Option<Reporter>,
    flipbook: Flipbook,
    last_pinned: Mutex<Option<(i64, i32)>>,
}

pub struct ListenerParts {
    pub api: Arc<dyn ChatApi>,
    pub bots: MultiBot,
    pub spam_filters: Vec<Arc<dyn Bot>>,
    pub terminator: Terminator,
    pub autoban: AutoBan,
    pub reporter: Option<Reporter>,
    pub flipbook: Flipbook,
}

impl Listener {
    pub fn new(params: ListenerParams, parts: ListenerParts) -> Self {
        Self {
            params,
            api: parts.api,
            bots: parts.bots,
            spam_filters: parts.spam_filters,
            terminator: parts.terminator,
            autoban: parts.autoban,
            reporter: parts.reporter,
            flipbook: parts.flipbook,
            last_pinned: Mutex::new(None),
        }
    }

    fn is_self(&self, msg: &Message) -> bool {
        let p = &self.params;
        (!p.bot_username.is_empty() && msg.from.username.eq_ignore_ascii_case(&p.bot_username))
            || (!p.bot_display_name.is_empty() && msg.from.display_name == p.bot_display_name)
    }

    /// Runs one normalized message through logging, moderation, bots and reply.
    pub async fn handle(&self, msg: Message) -> Outcome {
        log::debug!("incoming message {} from {} in chat {}", msg.id, msg.from.name(), msg.chat_id);
        if let Some(reporter) = &self.reporter {
            reporter.save(&msg);
        }

        if self.is_self(&msg) {
            return Outcome::Ignored;
        }

        for filter in &self.spam_filters {
            let resp = filter.on_message(&msg).await;
            if resp.send {
                self.respond(&msg, resp).await;
                return Outcome::Spam;
            }
        }

        let resp = self.bots.on_message(&msg).await;
        if !resp.send {
            return Outcome::NoReply;
        }

        if self.autoban.check(&msg).await {
            return Outcome::Kicked;
        }

        let ban = self.terminator.check(&msg.from, msg.sent, msg.chat_id);
        if ban.active {
            if !ban.new {
                log::debug!("{} is throttled, reply dropped", msg.from.name());
                return Outcome::Throttled;
            }
            let notice = OutgoingMessage {
                reply_to: Some(msg.id),
                ..OutgoingMessage::new(
                    msg.chat_id,
                    format!("{}, слишком много болтаешь, бот на перерыве", msg.from.mention()),
                )
            };
            if let Err(e) = self.api.send(notice).await {
                log::warn!("failed to send throttle notice to chat {}: {:#}", msg.chat_id, e);
            }
            return Outcome::Warned;
        }

        self.respond(&msg, resp).await;
        Outcome::Replied
    }

    /// Applies a response: delete, send with paging, pin/unpin, ban.
    async fn respond(&self, msg: &Message, resp: Response) {
        let chat_id = msg.chat_id;
        let mut reply_to = resp.reply_to;

        if resp.delete_reply_to {
            if let Some(id) = resp.reply_to {
                match self.api.delete(chat_id, id).await {
                    Ok(()) => reply_to = None,
                    Err(e) => log::warn!("failed to delete message {} in chat {}: {:#}", id, chat_id, e),
                }
            }
        }

        if !resp.text.is_empty() {
            let paging = if resp.alt_text.is_empty() {
                None
            } else {
                let book = Book {
                    text: resp.text.clone(),
                    alt_text: resp.alt_text.clone(),
                };
                let total = book.pages();
                Some(Paging {
                    key: self.flipbook.insert(book),
                    page: 0,
                    total,
                })
            };
            let out = OutgoingMessage {
                chat_id,
                text: resp.text.clone(),
                parse_mode: resp.parse_mode,
                preview: resp.preview,
                reply_to,
                paging,
            };
            match self.api.send(out).await {
                Ok(sent_id) => {
                    if resp.pin {
                        self.pin(chat_id, sent_id).await;
                    }
                }
                Err(e) => log::warn!("failed to send reply to chat {}: {:#}", chat_id, e),
            }
        }

        if resp.unpin {
            self.unpin_last().await;
        }

        if let Some((duration, user)) = resp.ban() {
            let res = if duration >= PERMANENT_BAN_THRESHOLD {
                self.api.ban(chat_id, user.id, duration).await
            } else {
                self.api.restrict(chat_id, user.id, duration).await
            };
            match res {
                Ok(()) => log::info!("{} (id {}) restricted in chat {} for {:?}", user.name(), user.id, chat_id, duration),
                Err(e) => log::warn!("failed to restrict {} in chat {}: {:#}", user.id, chat_id, e),
            }
        }
    }

    async fn pin(&self, chat_id: i64, message_id: i32) {
        match self.api.pin(chat_id, message_id).await {
            Ok(()) => {
                *self.last_pinned.lock().unwrap_or_else(|e| e.into_inner()) = Some((chat_id, message_id));
            }
            Err(e) => log::warn!("failed to pin message {} in chat {}: {:#}", message_id, chat_id, e),
        }
    }

    async fn unpin_last(&self) {
        let last = self.last_pinned.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some((chat_id, message_id)) = last else {
            return;
        };
        if let Err(e) = self.api.unpin(chat_id, message_id).await {
            log::warn!("failed to unpin message {} in chat {}: {:#}", message_id, chat_id, e);
        }
    }

    /// Switches a flipbook message to the page named by the callback payload.
    /// Returns false when the book expired or the payload is bogus.
    pub async fn flip(&self, chat_id: i64, message_id: i32, data: &str) -> bool {
        let Some((key, page)) = parse_callback(data) else {
            return false;
        };
        let Some(book) = self.flipbook.get(key) else {
            return false;
        };
        let Some(text) = book.page(page) else {
            return false;
        };
        let out = OutgoingMessage {
            paging: Some(Paging {
                key,
                page,
                total: book.pages(),
            }),
            ..OutgoingMessage::new(chat_id, text)
        };
        if let Err(e) = self.api.edit(message_id, out).await {
            log::warn!("failed to flip message {} in chat {}: {:#}", message_id, chat_id, e);
        }
        true
    }
}

#[async_trait]
impl Submitter for Listener {
    async fn submit(&self, text: &str, pin: bool) -> Result<()> {
        let out = OutgoingMessage {
            parse_mode: ParseMode::Markdown,
            ..OutgoingMessage::new(self.params.chat_id, text)
        };
        let id = self.api.send(out).await?;
        if pin {
            self.pin(self.params.chat_id, id).await;
        }
        Ok(())
    }
}
