mod common;

use async_trait::async_trait;
use common::{message, user, Call, RecordingApi};
use rt_bot::autoban::{AutoBan, AutoBanParams};
use rt_bot::bot::{Bot, Message, MultiBot, Response};
use rt_bot::chat::{Paging, SuperUsers};
use rt_bot::config::PERMANENT_BAN_DURATION;
use rt_bot::events::{Flipbook, Listener, ListenerParams, ListenerParts, Outcome};
use rt_bot::rtjc::Submitter;
use rt_bot::terminator::{Terminator, TerminatorParams};
use std::sync::Arc;
use std::time::Duration;

const CHAT: i64 = 123;
const MAIN_CHAT: i64 = -100500;

type Script = Box<dyn Fn(&Message) -> Response + Send + Sync>;

struct Scripted(Script);

#[async_trait]
impl Bot for Scripted {
    async fn on_message(&self, msg: &Message) -> Response {
        (self.0)(msg)
    }

    fn react_on(&self) -> Vec<String> {
        Vec::new()
    }
}

fn scripted(f: impl Fn(&Message) -> Response + Send + Sync + 'static) -> Arc<dyn Bot> {
    Arc::new(Scripted(Box::new(f)))
}

fn pong() -> Arc<dyn Bot> {
    scripted(|m| {
        if m.text.starts_with("ping") {
            Response::text("pong")
        } else {
            Response::none()
        }
    })
}

struct Setup {
    bots: Vec<Arc<dyn Bot>>,
    spam_filters: Vec<Arc<dyn Bot>>,
    autoban: AutoBanParams,
    ban_penalty: u32,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            bots: vec![pong()],
            spam_filters: Vec::new(),
            autoban: AutoBanParams::default(),
            ban_penalty: 100,
        }
    }
}

fn listener(api: Arc<RecordingApi>, setup: Setup) -> Listener {
    let super_users = SuperUsers::new(["umputun"]);
    Listener::new(
        ListenerParams {
            chat_id: MAIN_CHAT,
            bot_username: "rtbot".to_string(),
            bot_display_name: "RT Bot".to_string(),
        },
        ListenerParts {
            api: api.clone(),
            bots: MultiBot::new(setup.bots),
            spam_filters: setup.spam_filters,
            terminator: Terminator::new(TerminatorParams {
                ban_duration: Duration::from_secs(60),
                ban_penalty: setup.ban_penalty,
                allowed_period: Duration::from_secs(5),
                exclude: super_users.clone(),
            }),
            autoban: AutoBan::new(setup.autoban, super_users, api),
            reporter: None,
            flipbook: Flipbook::new(10, Duration::from_secs(60)),
        },
    )
}

#[tokio::test]
async fn test_reply_is_sent() {
    let api = Arc::new(RecordingApi::new());
    let l = listener(api.clone(), Setup::default());

    assert_eq!(l.handle(message(1, CHAT, user(5, "user"), "ping")).await, Outcome::Replied);
    let sent = api.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chat_id, CHAT);
    assert_eq!(sent[0].text, "pong");
    assert_eq!(sent[0].paging, None);
}

#[tokio::test]
async fn test_silence_and_own_messages() {
    let api = Arc::new(RecordingApi::new());
    let l = listener(api.clone(), Setup::default());

    assert_eq!(l.handle(message(1, CHAT, user(5, "user"), "hello")).await, Outcome::NoReply);
    assert_eq!(l.handle(message(2, CHAT, user(6, "RTBot"), "ping")).await, Outcome::Ignored);
    assert_eq!(l.handle(message(3, CHAT, user(7, ""), "ping")).await, Outcome::Replied);
    assert_eq!(api.sent().len(), 1);
}

#[tokio::test]
async fn test_spam_is_deleted_and_banned() {
    let api = Arc::new(RecordingApi::new());
    let spam_filter = scripted(|m| Response {
        text: "this is spam".to_string(),
        send: true,
        reply_to: Some(m.id),
        ban_interval: Some(PERMANENT_BAN_DURATION),
        user: Some(m.from.clone()),
        delete_reply_to: true,
        ..Default::default()
    });
    let l = listener(
        api.clone(),
        Setup {
            spam_filters: vec![spam_filter],
            ..Default::default()
        },
    );

    assert_eq!(l.handle(message(42, CHAT, user(666, "spammer"), "ping")).await, Outcome::Spam);
    let calls = api.calls();
    assert_eq!(calls.len(), 3, "{:?}", calls);
    assert_eq!(calls[0], Call::Delete(CHAT, 42));
    match &calls[1] {
        Call::Send(m) => {
            assert_eq!(m.text, "this is spam");
            assert_eq!(m.reply_to, None, "deleted message can't be replied to");
        }
        other => panic!("expected send, got {:?}", other),
    }
    assert_eq!(calls[2], Call::Ban(CHAT, 666, PERMANENT_BAN_DURATION));
}

#[tokio::test]
async fn test_bot_ban_restricts_user() {
    let api = Arc::new(RecordingApi::new());
    let jailer = scripted(|m| Response {
        text: "bye".to_string(),
        send: true,
        ban_interval: Some(Duration::from_secs(86_400)),
        user: Some(m.from.clone()),
        ..Default::default()
    });
    let l = listener(
        api.clone(),
        Setup {
            bots: vec![jailer],
            ..Default::default()
        },
    );

    l.handle(message(1, CHAT, user(5, "user"), "wtf!")).await;
    assert!(api.calls().contains(&Call::Restrict(CHAT, 5, Duration::from_secs(86_400))));
}

#[tokio::test]
async fn test_throttled_user_gets_one_notice() {
    let api = Arc::new(RecordingApi::new());
    let l = listener(
        api.clone(),
        Setup {
            ban_penalty: 3,
            ..Default::default()
        },
    );
    let u = user(5, "chatty");

    let mut outcomes = Vec::new();
    for i in 0..5 {
        outcomes.push(l.handle(message(i, CHAT, u.clone(), &format!("ping {}", i))).await);
    }
    assert_eq!(
        outcomes,
        vec![
            Outcome::Replied,
            Outcome::Replied,
            Outcome::Replied,
            Outcome::Warned,
            Outcome::Throttled
        ]
    );
    let sent = api.sent();
    assert_eq!(sent.len(), 4);
    assert!(sent[3].text.contains("слишком много болтаешь"), "got {}", sent[3].text);
    assert_eq!(sent[3].reply_to, Some(3));
}

#[tokio::test]
async fn test_autoban_kicks_bot_abuser() {
    let api = Arc::new(RecordingApi::new());
    let l = listener(
        api.clone(),
        Setup {
            autoban: AutoBanParams {
                max_msg_size: 20,
                msgs_per_sec: 0,
                dups_per_sec: 0,
            },
            ..Default::default()
        },
    );

    let long = format!("ping {}", "x".repeat(50));
    assert_eq!(l.handle(message(1, CHAT, user(5, "user"), &long)).await, Outcome::Kicked);
    assert_eq!(api.calls(), vec![Call::Kick(CHAT, 5)]);

    // long text nobody reacts on is left alone
    let quiet = "x".repeat(50);
    assert_eq!(l.handle(message(2, CHAT, user(6, "user2"), &quiet)).await, Outcome::NoReply);
}

#[tokio::test]
async fn test_flipbook_pages() {
    let api = Arc::new(RecordingApi::new());
    let pager = scripted(|_| Response {
        text: "page one".to_string(),
        alt_text: vec!["page two".to_string()],
        send: true,
        ..Default::default()
    });
    let l = listener(
        api.clone(),
        Setup {
            bots: vec![pager],
            ..Default::default()
        },
    );

    l.handle(message(1, CHAT, user(5, "user"), "read")).await;
    let sent = api.sent();
    let paging = sent[0].paging.expect("paged reply");
    assert_eq!(paging.page, 0);
    assert_eq!(paging.total, 2);

    let data = format!("{}:1", paging.key);
    assert!(l.flip(CHAT, 1000, &data).await);
    let edit = api
        .calls()
        .into_iter()
        .find_map(|c| match c {
            Call::Edit(id, m) => Some((id, m)),
            _ => None,
        })
        .expect("edit issued");
    assert_eq!(edit.0, 1000);
    assert_eq!(edit.1.text, "page two");
    assert_eq!(edit.1.paging, Some(Paging { key: paging.key, page: 1, total: 2 }));

    assert!(!l.flip(CHAT, 1000, "999:0").await, "unknown key");
    assert!(!l.flip(CHAT, 1000, &format!("{}:5", paging.key)).await, "unknown page");
    assert!(!l.flip(CHAT, 1000, "garbage").await);
}

#[tokio::test]
async fn test_pin_then_unpin() {
    let api = Arc::new(RecordingApi::new());
    let announcer = scripted(|m| match m.text.as_str() {
        "start" => Response {
            text: "broadcast started".to_string(),
            send: true,
            pin: true,
            ..Default::default()
        },
        "stop" => Response {
            text: "broadcast finished".to_string(),
            send: true,
            unpin: true,
            ..Default::default()
        },
        _ => Response::none(),
    });
    let l = listener(
        api.clone(),
        Setup {
            bots: vec![announcer],
            ..Default::default()
        },
    );

    l.handle(message(1, CHAT, user(5, "user"), "start")).await;
    l.handle(message(2, CHAT, user(5, "user"), "stop")).await;
    let calls = api.calls();
    assert!(calls.contains(&Call::Pin(CHAT, 1000)), "{:?}", calls);
    assert!(calls.contains(&Call::Unpin(CHAT, 1000)), "{:?}", calls);
}

#[tokio::test]
async fn test_submit_posts_to_main_chat() {
    let api = Arc::new(RecordingApi::new());
    let l = listener(api.clone(), Setup::default());

    l.submit("новости", false).await.unwrap();
    l.submit("срочно", true).await.unwrap();
    let calls = api.calls();
    assert_eq!(calls.len(), 3);
    match &calls[0] {
        Call::Send(m) => {
            assert_eq!(m.chat_id, MAIN_CHAT);
            assert_eq!(m.text, "новости");
        }
        other => panic!("expected send, got {:?}", other),
    }
    assert_eq!(calls[2], Call::Pin(MAIN_CHAT, 1001));
}
