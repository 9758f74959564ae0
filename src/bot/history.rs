use crate::bot::Message;
use std::collections::VecDeque;

/// Fixed-capacity message window. Oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct LimitedMessageHistory {
    limit: usize,
    messages: VecDeque<Message>,
    count: u64,
}

impl LimitedMessageHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            messages: VecDeque::with_capacity(limit),
            count: 0,
        }
    }

    pub fn add(&mut self, msg: Message) {
        self.count += 1;
        if self.limit == 0 {
            return;
        }
        if self.messages.len() == self.limit {
            self.messages.pop_front();
        }
        self.messages.push_back(msg);
    }

    /// Visible messages, oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Total number of messages ever added, including evicted ones.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::User;

    #[test]
    fn evicts_oldest_and_counts_all() {
        let mut h = LimitedMessageHistory::new(2);
        for t in ["a", "b", "c"] {
            h.add(Message::with_text(t, User::default()));
        }
        let texts: Vec<&str> = h.messages().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "c"]);
        assert_eq!(h.count(), 3);
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn zero_limit_keeps_nothing() {
        let mut h = LimitedMessageHistory::new(0);
        h.add(Message::with_text("a", User::default()));
        assert!(h.is_empty());
        assert_eq!(h.count(), 1);
    }
}
