use rt_bot::bot::sys::Sys;
use rt_bot::bot::{Bot, Message, User};

fn msg(text: &str) -> Message {
    Message::with_text(text, User::new(1, "user", "User"))
}

#[tokio::test]
async fn test_sys_commands_from_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("basic.data"), "ping|пинг|pong\n/rules|правила|no spam, please\n").unwrap();
    std::fs::write(dir.path().join("say.data"), "first quote\nsecond quote\n").unwrap();
    let sys = Sys::load(dir.path()).unwrap();

    assert_eq!(sys.on_message(&msg("PING")).await.text, "pong");
    assert_eq!(sys.on_message(&msg(" правила ")).await.text, "no spam, please");
    assert!(!sys.on_message(&msg("ping pong")).await.send);

    let said = sys.on_message(&msg("say!")).await;
    assert!(said.send);
    assert!(said.text == "first quote" || said.text == "second quote");

    assert_eq!(sys.react_on(), vec!["ping", "пинг", "/rules", "правила", "say!"]);
    assert!(sys.help().contains("ping, пинг"));
}

#[tokio::test]
async fn test_say_file_is_optional() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("basic.data"), "ping|pong\n").unwrap();
    let sys = Sys::load(dir.path()).unwrap();
    assert!(!sys.on_message(&msg("say!")).await.send);
    assert!(!sys.react_on().contains(&"say!".to_string()));
}

#[test]
fn test_missing_basic_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Sys::load(dir.path()).is_err());
}
