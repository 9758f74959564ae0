//! Platform event handling: the listener pipeline and the Telegram adapter.

pub mod flipbook;
pub mod listener;
pub mod telegram;

pub use flipbook::Flipbook;
pub use listener::{Listener, ListenerParams, ListenerParts, Outcome};
