//! `chat!` questions answered by a language model, with the recent chat as context.

use crate::bot::{gen_help_msg, Bot, LimitedMessageHistory, Message, Response};
use crate::chat::SuperUsers;
use crate::llm::{ChatMessage, LlmClient};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const TRIGGER: &str = "chat!";
const SYSTEM_PROMPT: &str = "You are a participant of a podcast listeners chat. \
Answer briefly, in the language of the question.";
const CONTINUE_PROMPT: &str = "Continue the conversation below with one short, relevant remark.";

#[derive(Debug, Clone)]
pub struct OpenAiParams {
    pub max_tokens: u32,
    /// Upper bound for the context sent along with a question, in characters.
    pub max_symbols: usize,
    pub history_size: usize,
    /// Chance to join the conversation unprompted once the history is full.
    pub reply_probability: f64,
    /// Minimum pause between answers for regular users.
    pub cooldown: Duration,
    pub super_users: SuperUsers,
}

pub struct OpenAi {
    client: LlmClient,
    params: OpenAiParams,
    history: Mutex<LimitedMessageHistory>,
    last_dt: Mutex<Option<Instant>>,
}

impl OpenAi {
    pub fn new(client: LlmClient, params: OpenAiParams) -> Self {
        let history = LimitedMessageHistory::new(params.history_size);
        Self {
            client,
            params,
            history: Mutex::new(history),
            last_dt: Mutex::new(None),
        }
    }

    fn question(text: &str) -> Option<&str> {
        let text = text.trim();
        let head = text.get(..TRIGGER.len())?;
        if !head.eq_ignore_ascii_case(TRIGGER) {
            return None;
        }
        let rest = text[TRIGGER.len()..].trim();
        (!rest.is_empty()).then_some(rest)
    }

    /// Takes the cooldown slot. Super-users are never throttled.
    fn acquire(&self, msg: &Message) -> bool {
        if self.params.super_users.contains_user(&msg.from) {
            return true;
        }
        let mut last = self.last_dt.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(prev) = *last {
            if prev.elapsed() < self.params.cooldown {
                return false;
            }
        }
        *last = Some(Instant::now());
        true
    }

    /// History rendered as `name: text` lines, newest kept when over the limit.
    fn context(&self) -> String {
        let history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        let mut lines: Vec<String> = Vec::new();
        let mut size = 0;
        for m in history.messages().collect::<Vec<_>>().into_iter().rev() {
            let line = format!("{}: {}", m.from.name(), m.text);
            size += line.chars().count() + 1;
            if size > self.params.max_symbols {
                break;
            }
            lines.push(line);
        }
        lines.reverse();
        lines.join("\n")
    }

    fn remember(&self, msg: &Message) -> bool {
        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history.add(msg.clone());
        history.len() >= history.limit() && history.limit() > 0
    }

    async fn ask(&self, messages: Vec<ChatMessage>, reply_to: i32) -> Response {
        match self.client.complete(&messages, self.params.max_tokens).await {
            Ok(answer) if !answer.trim().is_empty() => Response {
                text: answer.trim().to_string(),
                send: true,
                reply_to: Some(reply_to),
                ..Default::default()
            },
            Ok(_) => Response::none(),
            Err(e) => {
                log::warn!("llm request failed: {}", e);
                Response::none()
            }
        }
    }
}

#[async_trait]
impl Bot for OpenAi {
    async fn on_message(&self, msg: &Message) -> Response {
        if msg.text.trim().is_empty() {
            return Response::none();
        }

        if let Some(question) = Self::question(&msg.text) {
            if !self.acquire(msg) {
                log::debug!("chat! from {} ignored, cooldown", msg.from.name());
                return Response::none();
            }
            let context = self.context();
            let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
            if !context.is_empty() {
                messages.push(ChatMessage::system(format!("Recent messages:\n{}", context)));
            }
            messages.push(ChatMessage::user(question));
            return self.ask(messages, msg.id).await;
        }

        let full = self.remember(msg);
        let roll = rand::thread_rng().gen::<f64>();
        if !full || roll >= self.params.reply_probability || !self.acquire(msg) {
            return Response::none();
        }
        let messages = vec![
            ChatMessage::system(CONTINUE_PROMPT),
            ChatMessage::user(self.context()),
        ];
        self.ask(messages, msg.id).await
    }

    fn react_on(&self) -> Vec<String> {
        vec![TRIGGER.to_string()]
    }

    fn help(&self) -> String {
        gen_help_msg(&self.react_on(), "спросить что-нибудь у нейросети")
    }
}
