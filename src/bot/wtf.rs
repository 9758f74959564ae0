//! `wtf!` makes the sender read-only for a random period.

use crate::bot::{gen_help_msg, Bot, Message, Response};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static HOMOGLYPHS: Lazy<HashMap<char, char>> = Lazy::new(|| {
    [
        ('в', 'w'),
        ('ш', 'w'),
        ('щ', 'w'),
        ('ω', 'w'),
        ('ѡ', 'w'),
        ('ɯ', 'w'),
        ('т', 't'),
        ('τ', 't'),
        ('ŧ', 't'),
        ('ƭ', 't'),
        ('ʈ', 't'),
        ('ф', 'f'),
        ('ƒ', 'f'),
        ('ꞙ', 'f'),
        ('ẜ', 'f'),
        ('ſ', 'f'),
        ('¡', '!'),
        ('¿', '?'),
        ('؟', '?'),
    ]
    .into_iter()
    .collect()
});

const WTF_FORMS: &[&str] = &["wtf!", "wtf?", "!ftw", "?ftw"];

/// Reduces text to its skeleton: compatibility decomposition, no combining
/// marks, lowercase, lookalikes folded to latin, only letters and `!`/`?` kept.
pub fn skeleton(text: &str) -> String {
    text.to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| *HOMOGLYPHS.get(&c).unwrap_or(&c))
        .filter(|c| c.is_alphabetic() || *c == '!' || *c == '?')
        .collect()
}

/// True if the text is some disguised spelling of `wtf!` or `wtf?`.
pub fn is_wtf(text: &str) -> bool {
    let s = skeleton(text);
    WTF_FORMS.contains(&s.as_str())
}

/// Formats a duration the way the chat reads it, e.g. `1дн 10сек`.
pub fn humanize_duration(d: Duration) -> String {
    let mut secs = d.as_secs();
    let days = secs / 86_400;
    secs %= 86_400;
    let hours = secs / 3600;
    secs %= 3600;
    let minutes = secs / 60;
    secs %= 60;

    let parts: Vec<String> = [(days, "дн"), (hours, "час"), (minutes, "мин"), (secs, "сек")]
        .into_iter()
        .filter(|(v, _)| *v > 0)
        .map(|(v, unit)| format!("{}{}", v, unit))
        .collect();
    if parts.is_empty() {
        return "0сек".to_string();
    }
    parts.join(" ")
}

type RandFn = Box<dyn Fn(u64) -> u64 + Send + Sync>;

pub struct Wtf {
    min: Duration,
    max: Duration,
    rand: RandFn,
}

impl Wtf {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self::with_rand(
            min,
            max,
            Box::new(|n| if n == 0 { 0 } else { rand::thread_rng().gen_range(0..n) }),
        )
    }

    /// Same as [`Wtf::new`] with a custom source of randomness, `rand(n)` in `0..n`.
    pub fn with_rand(min: Duration, max: Duration, rand: RandFn) -> Self {
        Self { min, max: max.max(min), rand }
    }
}

#[async_trait]
impl Bot for Wtf {
    async fn on_message(&self, msg: &Message) -> Response {
        if !is_wtf(&msg.text) {
            return Response::none();
        }
        let spread = self.max.saturating_sub(self.min).as_secs();
        let ban = self.min + Duration::from_secs((self.rand)(spread));
        Response {
            text: format!("{} получает бан на {}", msg.from.mention(), humanize_duration(ban)),
            send: true,
            ban_interval: Some(ban),
            user: Some(msg.from.clone()),
            ..Default::default()
        }
    }

    fn react_on(&self) -> Vec<String> {
        vec!["wtf!".to_string(), "wtf?".to_string()]
    }

    fn help(&self) -> String {
        gen_help_msg(&self.react_on(), "если не хочешь больше читать этот чат")
    }
}
