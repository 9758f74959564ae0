//! Paged replies kept for a while so readers can flip through them.

use crate::config::flipbook::CALLBACK_SEPARATOR;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub text: String,
    pub alt_text: Vec<String>,
}

impl Book {
    /// Page 0 is the main text, the rest are alternates.
    pub fn page(&self, page: usize) -> Option<&str> {
        if page == 0 {
            return Some(&self.text);
        }
        self.alt_text.get(page - 1).map(String::as_str)
    }

    pub fn pages(&self) -> usize {
        1 + self.alt_text.len()
    }
}

struct Entry {
    book: Book,
    created: Instant,
}

struct Inner {
    next_key: u64,
    entries: HashMap<u64, Entry>,
    order: VecDeque<u64>,
}

/// Bounded cache with per-entry expiry; the oldest entry goes first when full.
pub struct Flipbook {
    max_entries: usize,
    ttl: Duration,
    inner: Mutex<Inner>,
}

impl Flipbook {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            max_entries: max_entries.max(1),
            ttl,
            inner: Mutex::new(Inner {
                next_key: 1,
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    fn evict(&self, inner: &mut Inner, now: Instant) {
        while let Some(key) = inner.order.front().copied() {
            let expired = inner
                .entries
                .get(&key)
                .map_or(true, |e| now.duration_since(e.created) >= self.ttl);
            if !expired && inner.entries.len() < self.max_entries {
                break;
            }
            inner.order.pop_front();
            inner.entries.remove(&key);
        }
    }

    /// Stores a book and returns its key.
    pub fn insert(&self, book: Book) -> u64 {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        self.evict(&mut inner, now);
        let key = inner.next_key;
        inner.next_key += 1;
        inner.entries.insert(key, Entry { book, created: now });
        inner.order.push_back(key);
        key
    }

    pub fn get(&self, key: u64) -> Option<Book> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let entry = inner.entries.get(&key)?;
        if entry.created.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.book.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Encodes a page request as callback payload.
pub fn callback_data(key: u64, page: usize) -> String {
    format!("{}{}{}", key, CALLBACK_SEPARATOR, page)
}

/// Parses `"{key}:{page}"`.
pub fn parse_callback(data: &str) -> Option<(u64, usize)> {
    let (key, page) = data.split_once(CALLBACK_SEPARATOR)?;
    Some((key.parse().ok()?, page.parse().ok()?))
}
