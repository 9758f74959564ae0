use rt_bot::bot::openai::{OpenAi, OpenAiParams};
use rt_bot::bot::{Bot, Message, User};
use rt_bot::chat::SuperUsers;
use rt_bot::llm::{LlmClient, LlmParams};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use warp::Filter;

/// Completion double echoing the last user message and keeping every request body.
async fn llm_server(bodies: Arc<Mutex<Vec<serde_json::Value>>>) -> String {
    let route = warp::path!("chat" / "completions")
        .and(warp::post())
        .and(warp::body::json())
        .map(move |body: serde_json::Value| {
            let last = body["messages"]
                .as_array()
                .and_then(|m| m.last())
                .and_then(|m| m["content"].as_str())
                .unwrap_or_default()
                .to_string();
            bodies.lock().unwrap().push(body);
            warp::reply::json(&json!({
                "choices": [{"message": {"role": "assistant", "content": format!("answer to {}", last)}}]
            }))
        });
    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{}", addr)
}

fn bot(api: String, history_size: usize) -> OpenAi {
    let client = LlmClient::new(LlmParams {
        api,
        token: "t".to_string(),
        model: "test-model".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap();
    OpenAi::new(
        client,
        OpenAiParams {
            max_tokens: 100,
            max_symbols: 1000,
            history_size,
            reply_probability: 0.0,
            cooldown: Duration::from_secs(60),
            super_users: SuperUsers::new(["umputun"]),
        },
    )
}

fn msg(id: i32, username: &str, text: &str) -> Message {
    Message {
        id,
        ..Message::with_text(text, User::new(id as i64, username, username))
    }
}

#[tokio::test]
async fn test_question_with_history() {
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let api = llm_server(bodies.clone()).await;
    let bot = bot(api, 5);

    assert!(!bot.on_message(&msg(1, "alice", "мы обсуждаем rust")).await.send);
    let resp = bot.on_message(&msg(2, "bob", "chat! о чём речь?")).await;
    assert!(resp.send);
    assert_eq!(resp.text, "answer to о чём речь?");
    assert_eq!(resp.reply_to, Some(2));

    let bodies = bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["model"], "test-model");
    assert_eq!(bodies[0]["max_tokens"], 100);
    let context = bodies[0]["messages"][1]["content"].as_str().unwrap();
    assert!(context.contains("alice: мы обсуждаем rust"), "got {}", context);
}

#[tokio::test]
async fn test_cooldown_applies_to_regular_users_only() {
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let api = llm_server(bodies.clone()).await;
    let bot = bot(api, 5);

    assert!(bot.on_message(&msg(1, "bob", "chat! first")).await.send);
    assert!(!bot.on_message(&msg(2, "bob", "chat! second")).await.send, "cooldown");
    assert!(bot.on_message(&msg(3, "umputun", "chat! boss")).await.send);
    assert_eq!(bodies.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_llm_failure_is_silent() {
    let bot = bot("http://127.0.0.1:1".to_string(), 5);
    assert!(!bot.on_message(&msg(1, "bob", "chat! anyone?")).await.send);
    assert_eq!(bot.react_on(), vec!["chat!"]);
}
