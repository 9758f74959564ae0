pub mod autoban;
pub mod bot;
pub mod chat;
pub mod config;
pub mod events;
pub mod llm;
pub mod opts;
pub mod reporter;
pub mod rtjc;
pub mod spam;
pub mod terminator;
