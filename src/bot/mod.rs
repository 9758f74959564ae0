pub mod banhammer;
pub mod broadcast;
pub mod history;
pub mod multi;
pub mod openai;
pub mod sys;
pub mod types;
pub mod wtf;

pub use history::LimitedMessageHistory;
pub use multi::MultiBot;
pub use types::{Entity, Media, Message, ParseMode, Response, User};

use async_trait::async_trait;

/// A chat handler. Implementations must tolerate concurrent calls.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Handles one message. Network failures and timeouts yield `Response::none()`.
    async fn on_message(&self, msg: &Message) -> Response;

    /// Triggers the bot reacts on, used for help output.
    fn react_on(&self) -> Vec<String>;

    /// One help line, empty if the bot has nothing to advertise.
    fn help(&self) -> String {
        String::new()
    }
}

/// Renders a help line as `"t1, t2 _– description_"`.
pub fn gen_help_msg(triggers: &[String], description: &str) -> String {
    let escaped: Vec<String> = triggers.iter().map(|t| escape_markdown(t)).collect();
    format!("{} _– {}_", escaped.join(", "), description)
}

/// Escapes characters meaningful in Telegram legacy markdown.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_line_escapes_underscores() {
        let line = gen_help_msg(&["so_what!".to_string(), "sw!".to_string()], "explains");
        assert_eq!(line, "so\\_what!, sw! _– explains_");
    }
}
