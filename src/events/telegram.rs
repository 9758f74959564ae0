//! Telegram adapter: update normalization, platform calls and the dispatcher loop.

use crate::bot::{Entity, Media, Message, ParseMode, User};
use crate::chat::{ChatApi, OutgoingMessage, Paging};
use crate::config::text;
use crate::events::flipbook::callback_data;
use crate::events::Listener;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
use teloxide::dptree;
use teloxide::payloads::{
    AnswerCallbackQuerySetters, BanChatMemberSetters, EditMessageTextSetters,
    PinChatMessageSetters, RestrictChatMemberSetters, SendMessageSetters,
    UnbanChatMemberSetters, UnpinChatMessageSetters,
};
use teloxide::prelude::{CallbackQuery, Requester, ResponseResult, Update};
use teloxide::types::{
    ChatId, ChatPermissions, InlineKeyboardButton, InlineKeyboardMarkup, LinkPreviewOptions,
    MessageEntity, MessageEntityKind, MessageId, ReplyParameters, UserId,
};
use teloxide::Bot as TgBot;
use tokio::sync::watch;

fn convert_user(u: &teloxide::types::User) -> User {
    User {
        id: u.id.0 as i64,
        username: u.username.clone().unwrap_or_default(),
        display_name: u.full_name(),
    }
}

fn convert_entity(e: &MessageEntity) -> Entity {
    let (kind, url, user) = match &e.kind {
        MessageEntityKind::Mention => (Entity::MENTION, None, None),
        MessageEntityKind::TextMention { user } => (Entity::TEXT_MENTION, None, Some(convert_user(user))),
        MessageEntityKind::TextLink { url } => ("text_link", Some(url.to_string()), None),
        MessageEntityKind::Url => ("url", None, None),
        MessageEntityKind::Hashtag => ("hashtag", None, None),
        MessageEntityKind::BotCommand => ("bot_command", None, None),
        MessageEntityKind::Bold => ("bold", None, None),
        MessageEntityKind::Italic => ("italic", None, None),
        MessageEntityKind::Code => ("code", None, None),
        MessageEntityKind::Pre { .. } => ("pre", None, None),
        _ => ("other", None, None),
    };
    Entity {
        kind: kind.to_string(),
        offset: e.offset,
        length: e.length,
        url,
        user,
    }
}

fn convert_media(msg: &teloxide::types::Message) -> Option<Media> {
    if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        return Some(Media::Photo {
            file_id: photo.file.id.to_string(),
            width: photo.width,
            height: photo.height,
        });
    }
    if let Some(sticker) = msg.sticker() {
        return Some(Media::Sticker {
            file_id: sticker.file.id.to_string(),
            emoji: sticker.emoji.clone(),
        });
    }
    if let Some(voice) = msg.voice() {
        return Some(Media::Voice { file_id: voice.file.id.to_string() });
    }
    if let Some(animation) = msg.animation() {
        return Some(Media::Animation { file_id: animation.file.id.to_string() });
    }
    if let Some(video) = msg.video() {
        return Some(Media::Video { file_id: video.file.id.to_string() });
    }
    if let Some(doc) = msg.document() {
        return Some(Media::Document {
            file_id: doc.file.id.to_string(),
            file_name: doc.file_name.clone(),
        });
    }
    None
}

/// Converts a Telegram message; messages without any sender are dropped.
pub fn normalize(msg: &teloxide::types::Message) -> Option<Message> {
    let from = match (&msg.from, &msg.sender_chat) {
        (_, Some(chat)) => User {
            id: chat.id.0,
            username: chat.username().unwrap_or_default().to_string(),
            display_name: chat.title().unwrap_or_default().to_string(),
        },
        (Some(user), None) => convert_user(user),
        (None, None) => return None,
    };
    let text = msg.text().or_else(|| msg.caption()).unwrap_or_default().to_string();
    let entities = msg
        .entities()
        .or_else(|| msg.caption_entities())
        .map(|es| es.iter().map(convert_entity).collect())
        .unwrap_or_default();

    Some(Message {
        id: msg.id.0,
        chat_id: msg.chat.id.0,
        from,
        text,
        sent: msg.date,
        entities,
        reply_to: msg.reply_to_message().and_then(normalize).map(Box::new),
        media: convert_media(msg),
    })
}

#[allow(deprecated)]
fn parse_mode(mode: ParseMode) -> Option<teloxide::types::ParseMode> {
    match mode {
        ParseMode::Markdown => Some(teloxide::types::ParseMode::Markdown),
        ParseMode::Html => Some(teloxide::types::ParseMode::Html),
        ParseMode::Plain => None,
    }
}

fn no_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

fn keyboard(p: Paging) -> InlineKeyboardMarkup {
    let mut row = Vec::new();
    if p.page > 0 {
        row.push(InlineKeyboardButton::callback("◀", callback_data(p.key, p.page - 1)));
    }
    row.push(InlineKeyboardButton::callback(
        format!("{}/{}", p.page + 1, p.total),
        callback_data(p.key, p.page),
    ));
    if p.page + 1 < p.total {
        row.push(InlineKeyboardButton::callback("▶", callback_data(p.key, p.page + 1)));
    }
    InlineKeyboardMarkup::new(vec![row])
}

fn until(duration: Duration) -> chrono::DateTime<Utc> {
    Utc::now() + chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(400))
}

/// [`ChatApi`] backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramApi {
    bot: TgBot,
}

impl TelegramApi {
    pub fn new(bot: TgBot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatApi for TelegramApi {
    async fn send(&self, msg: OutgoingMessage) -> Result<i32> {
        let mut req = self.bot.send_message(ChatId(msg.chat_id), msg.text);
        if let Some(mode) = parse_mode(msg.parse_mode) {
            req = req.parse_mode(mode);
        }
        if !msg.preview {
            req = req.link_preview_options(no_preview());
        }
        if let Some(id) = msg.reply_to {
            req = req.reply_parameters(ReplyParameters::new(MessageId(id)));
        }
        if let Some(paging) = msg.paging {
            req = req.reply_markup(keyboard(paging));
        }
        let sent = req.await.with_context(|| format!("send to chat {}", msg.chat_id))?;
        Ok(sent.id.0)
    }

    async fn edit(&self, message_id: i32, msg: OutgoingMessage) -> Result<()> {
        let mut req = self
            .bot
            .edit_message_text(ChatId(msg.chat_id), MessageId(message_id), msg.text);
        if let Some(mode) = parse_mode(msg.parse_mode) {
            req = req.parse_mode(mode);
        }
        if let Some(paging) = msg.paging {
            req = req.reply_markup(keyboard(paging));
        }
        req.await.context("edit message")?;
        Ok(())
    }

    async fn pin(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.bot
            .pin_chat_message(ChatId(chat_id), MessageId(message_id))
            .disable_notification(true)
            .await
            .context("pin message")?;
        Ok(())
    }

    async fn unpin(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.bot
            .unpin_chat_message(ChatId(chat_id))
            .message_id(MessageId(message_id))
            .await
            .context("unpin message")?;
        Ok(())
    }

    async fn delete(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .context("delete message")?;
        Ok(())
    }

    async fn restrict(&self, chat_id: i64, user_id: i64, duration: Duration) -> Result<()> {
        self.bot
            .restrict_chat_member(ChatId(chat_id), UserId(user_id as u64), ChatPermissions::empty())
            .until_date(until(duration))
            .await
            .context("restrict member")?;
        Ok(())
    }

    async fn ban(&self, chat_id: i64, user_id: i64, duration: Duration) -> Result<()> {
        self.bot
            .ban_chat_member(ChatId(chat_id), UserId(user_id as u64))
            .until_date(until(duration))
            .await
            .context("ban member")?;
        Ok(())
    }

    async fn kick(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.bot
            .ban_chat_member(ChatId(chat_id), UserId(user_id as u64))
            .await
            .context("kick member")?;
        self.unban(chat_id, user_id).await
    }

    async fn unban(&self, chat_id: i64, user_id: i64) -> Result<()> {
        self.bot
            .unban_chat_member(ChatId(chat_id), UserId(user_id as u64))
            .only_if_banned(true)
            .await
            .context("unban member")?;
        Ok(())
    }
}

async fn message_handler(msg: teloxide::types::Message, listener: Arc<Listener>) -> ResponseResult<()> {
    let Some(normalized) = normalize(&msg) else {
        return Ok(());
    };
    let outcome = listener.handle(normalized).await;
    log::debug!("message {} in chat {}: {:?}", msg.id.0, msg.chat.id.0, outcome);
    Ok(())
}

async fn callback_handler(bot: TgBot, query: CallbackQuery, listener: Arc<Listener>) -> ResponseResult<()> {
    let flipped = match (&query.data, &query.message) {
        (Some(data), Some(message)) => listener.flip(message.chat().id.0, message.id().0, data).await,
        _ => false,
    };
    let mut answer = bot.answer_callback_query(query.id.clone());
    if !flipped {
        answer = answer.text(text::FLIPBOOK_EXPIRED);
    }
    answer.await?;
    Ok(())
}

/// Own username and display name, used to ignore the bot's own messages.
pub async fn identity(bot: &TgBot) -> Result<(String, String)> {
    let me = bot.get_me().await.context("can't get bot identity")?;
    Ok((me.user.username.clone().unwrap_or_default(), me.user.full_name()))
}

/// Polls Telegram and feeds updates to the listener until `shutdown` flips.
pub async fn run(bot: TgBot, listener: Arc<Listener>, mut shutdown: watch::Receiver<bool>) {
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(message_handler))
        .branch(Update::filter_callback_query().endpoint(callback_handler));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![listener])
        .default_handler(|_| async {})
        .build();

    let token = dispatcher.shutdown_token();
    tokio::spawn(async move {
        let _ = shutdown.changed().await;
        if let Ok(done) = token.shutdown() {
            done.await;
        }
    });

    log::info!("telegram listener started");
    dispatcher.dispatch().await;
    log::info!("telegram listener stopped");
}
