//! `ban!`/`unban!` commands for super-users.

use crate::bot::{gen_help_msg, Bot, Entity, Message, Response, User};
use crate::chat::{ChatApi, SuperUsers};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

// `ban! @name`, `/ban@botname name`, `unban!` as a reply
static COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:/(?P<un1>un)?ban(?:@\w+)?|(?P<un2>un)?ban!)(?:\s+@?(?P<name>\S+))?$")
        .unwrap_or_else(|e| panic!("bad command regex: {}", e))
});

const USAGE: &str = "ban! @имя или ответом на сообщение";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Ban,
    Unban,
}

pub struct Banhammer {
    api: Arc<dyn ChatApi>,
    super_users: SuperUsers,
}

impl Banhammer {
    pub fn new(api: Arc<dyn ChatApi>, super_users: SuperUsers) -> Self {
        Self { api, super_users }
    }

    fn parse(text: &str) -> Option<(Command, &str)> {
        let caps = COMMAND.captures(text.trim())?;
        let cmd = if caps.name("un1").is_some() || caps.name("un2").is_some() {
            Command::Unban
        } else {
            Command::Ban
        };
        Some((cmd, caps.name("name").map_or("", |m| m.as_str())))
    }

    /// Finds the mentioned user whose username or display name equals `name`.
    fn resolve(msg: &Message, name: &str) -> Option<User> {
        if name.is_empty() {
            return msg.reply_to.as_ref().map(|r| r.from.clone());
        }
        msg.entities
            .iter()
            .filter(|e| e.kind == Entity::MENTION || e.kind == Entity::TEXT_MENTION)
            .filter_map(|e| e.user.as_ref())
            .find(|u| u.username.eq_ignore_ascii_case(name) || u.display_name == name)
            .cloned()
    }
}

#[async_trait]
impl Bot for Banhammer {
    async fn on_message(&self, msg: &Message) -> Response {
        let Some((cmd, name)) = Self::parse(&msg.text) else {
            return Response::none();
        };
        if !self.super_users.contains_user(&msg.from) {
            return Response::none();
        }
        let Some(target) = Self::resolve(msg, name) else {
            if name.is_empty() {
                return Response::text(USAGE);
            }
            return Response::text(format!("не могу найти {}", name));
        };
        let shown = if name.is_empty() { target.name().to_string() } else { name.to_string() };

        match cmd {
            Command::Ban => match self.api.kick(msg.chat_id, target.id).await {
                Ok(()) => {
                    log::info!("{} banned {} (id {}) in chat {}", msg.from.name(), shown, target.id, msg.chat_id);
                    Response::text(format!("прощай {}", shown))
                }
                Err(e) => {
                    log::warn!("failed to ban {} in chat {}: {:#}", target.id, msg.chat_id, e);
                    Response::none()
                }
            },
            Command::Unban => match self.api.unban(msg.chat_id, target.id).await {
                Ok(()) => Response::text(format!("амнистия для {}", shown)),
                Err(e) => {
                    log::warn!("failed to unban {} in chat {}: {:#}", target.id, msg.chat_id, e);
                    Response::none()
                }
            },
        }
    }

    fn react_on(&self) -> Vec<String> {
        vec!["ban!".to_string(), "unban!".to_string()]
    }

    fn help(&self) -> String {
        gen_help_msg(&self.react_on(), "забанить или разбанить, только для избранных")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_commands() {
        assert_eq!(Banhammer::parse("ban! @user1"), Some((Command::Ban, "user1")));
        assert_eq!(Banhammer::parse("UNBAN! user2 "), Some((Command::Unban, "user2")));
        assert_eq!(Banhammer::parse("ban!"), Some((Command::Ban, "")));
        assert_eq!(Banhammer::parse("/ban@rtbot user3"), Some((Command::Ban, "user3")));
        assert_eq!(Banhammer::parse("banana! x"), None);
    }
}
