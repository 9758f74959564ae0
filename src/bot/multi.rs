//! Fan-out of one message to every bot and merge of their replies.

use crate::bot::{Bot, Message, ParseMode, Response};
use crate::config::HELP_TRIGGERS;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Composite bot delivering each message to all children concurrently.
#[derive(Clone, Default)]
pub struct MultiBot {
    bots: Vec<Arc<dyn Bot>>,
}

impl MultiBot {
    pub fn new(bots: Vec<Arc<dyn Bot>>) -> Self {
        Self { bots }
    }

    pub fn push(&mut self, bot: Arc<dyn Bot>) {
        self.bots.push(bot);
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }

    fn is_help_request(text: &str) -> bool {
        let text = text.trim().to_lowercase();
        HELP_TRIGGERS.contains(&text.as_str())
    }

    fn help_response(&self) -> Response {
        let lines: Vec<String> = self
            .bots
            .iter()
            .map(|b| b.help())
            .map(|h| h.trim_end().to_string())
            .filter(|h| !h.is_empty())
            .collect();
        let text = if lines.is_empty() {
            format!("_{}_", self.react_on().join(" "))
        } else {
            lines.join("\n")
        };
        Response {
            text,
            send: true,
            preview: false,
            ..Default::default()
        }
    }
}

/// Folds `next` into `acc`. Texts and pages are appended in arrival order.
fn merge(acc: &mut Response, mut next: Response) {
    if acc.ban().is_none() && next.ban().is_some() {
        acc.ban_interval = next.ban_interval;
        acc.user = next.user.take();
    }
    if !next.text.is_empty() {
        if !acc.text.is_empty() {
            acc.text.push('\n');
        }
        acc.text.push_str(&next.text);
    }
    acc.alt_text.extend(std::mem::take(&mut next.alt_text));
    acc.pin |= next.pin;
    acc.unpin |= next.unpin;
    acc.preview |= next.preview;
    acc.delete_reply_to |= next.delete_reply_to;
    if acc.reply_to.is_none() {
        acc.reply_to = next.reply_to;
    }
    if acc.parse_mode == ParseMode::default() {
        acc.parse_mode = next.parse_mode;
    }
}

#[async_trait]
impl Bot for MultiBot {
    async fn on_message(&self, msg: &Message) -> Response {
        if Self::is_help_request(&msg.text) {
            return self.help_response();
        }

        let shared = Arc::new(msg.clone());
        let mut tasks = JoinSet::new();
        for bot in &self.bots {
            let bot = Arc::clone(bot);
            let msg = Arc::clone(&shared);
            tasks.spawn(async move { bot.on_message(&msg).await });
        }

        let mut merged = Response::none();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(resp) if resp.send => {
                    merged.send = true;
                    merge(&mut merged, resp);
                }
                Ok(_) => {}
                Err(e) if e.is_panic() => {
                    log::warn!("bot panicked on message {} in chat {}: {}", msg.id, msg.chat_id, e);
                }
                Err(e) => log::warn!("bot task failed on message {}: {}", msg.id, e),
            }
        }

        if !merged.send {
            return Response::none();
        }
        merged
    }

    fn react_on(&self) -> Vec<String> {
        self.bots.iter().flat_map(|b| b.react_on()).collect()
    }

    fn help(&self) -> String {
        self.help_response().text
    }
}
