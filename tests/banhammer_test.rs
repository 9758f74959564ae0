mod common;

use common::{message, user, Call, RecordingApi};
use rt_bot::bot::banhammer::Banhammer;
use rt_bot::bot::{Bot, Entity};
use rt_bot::chat::SuperUsers;
use std::sync::Arc;

const CHAT: i64 = 123;

fn banhammer(api: Arc<RecordingApi>) -> Banhammer {
    Banhammer::new(api, SuperUsers::new(["umputun"]))
}

fn mention_of(text: &str, name: &str, target: rt_bot::bot::User) -> Vec<Entity> {
    let offset = text.encode_utf16().count() - name.encode_utf16().count();
    vec![Entity {
        kind: Entity::MENTION.to_string(),
        offset,
        length: name.encode_utf16().count(),
        url: None,
        user: Some(target),
    }]
}

#[tokio::test]
async fn test_super_user_bans_mentioned_user() {
    let api = Arc::new(RecordingApi::new());
    let bot = banhammer(api.clone());
    let text = "ban! user1";
    let mut msg = message(10, CHAT, user(99, "umputun"), text);
    msg.entities = mention_of(text, "user1", user(1, "user1"));

    let resp = bot.on_message(&msg).await;
    assert!(resp.send);
    assert_eq!(resp.text, "прощай user1");
    assert_eq!(api.calls(), vec![Call::Kick(CHAT, 1)]);
}

#[tokio::test]
async fn test_unban() {
    let api = Arc::new(RecordingApi::new());
    let bot = banhammer(api.clone());
    let text = "unban! @user1";
    let mut msg = message(10, CHAT, user(99, "Umputun"), text);
    msg.entities = mention_of(text, "@user1", user(1, "user1"));

    let resp = bot.on_message(&msg).await;
    assert_eq!(resp.text, "амнистия для user1");
    assert_eq!(api.calls(), vec![Call::Unban(CHAT, 1)]);
}

#[tokio::test]
async fn test_ban_by_reply() {
    let api = Arc::new(RecordingApi::new());
    let bot = banhammer(api.clone());
    let mut msg = message(11, CHAT, user(99, "umputun"), "ban!");
    msg.reply_to = Some(Box::new(message(5, CHAT, user(7, "troll"), "bad words")));

    let resp = bot.on_message(&msg).await;
    assert_eq!(resp.text, "прощай troll");
    assert_eq!(api.calls(), vec![Call::Kick(CHAT, 7)]);
}

#[tokio::test]
async fn test_regular_users_are_ignored() {
    let api = Arc::new(RecordingApi::new());
    let bot = banhammer(api.clone());
    let text = "ban! user1";
    let mut msg = message(10, CHAT, user(50, "someone"), text);
    msg.entities = mention_of(text, "user1", user(1, "user1"));

    assert!(!bot.on_message(&msg).await.send);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_target() {
    let api = Arc::new(RecordingApi::new());
    let bot = banhammer(api.clone());
    let resp = bot.on_message(&message(10, CHAT, user(99, "umputun"), "ban! ghost")).await;
    assert!(resp.send);
    assert_eq!(resp.text, "не могу найти ghost");
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_failed_kick_is_silent() {
    let api = Arc::new(RecordingApi::new());
    api.fail_kicks();
    let bot = banhammer(api.clone());
    let text = "ban! user1";
    let mut msg = message(10, CHAT, user(99, "umputun"), text);
    msg.entities = mention_of(text, "user1", user(1, "user1"));
    assert!(!bot.on_message(&msg).await.send);
}

#[tokio::test]
async fn test_bare_ban_without_reply_shows_usage() {
    let api = Arc::new(RecordingApi::new());
    let bot = banhammer(api.clone());
    let resp = bot.on_message(&message(12, CHAT, user(99, "umputun"), "ban!")).await;
    assert!(resp.send);
    assert!(resp.text.starts_with("ban! @"), "got {:?}", resp.text);
    assert!(!resp.text.ends_with(' '));
    assert!(api.calls().is_empty());
}
