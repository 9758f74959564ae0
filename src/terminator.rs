//! Per-(user, chat) throttling of people who keep poking the bots.

use crate::bot::User;
use crate::chat::SuperUsers;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Outcome of a throttle check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BanState {
    pub active: bool,
    /// Set only on the message that moved the user into the banned state.
    pub new: bool,
}

impl BanState {
    const NONE: BanState = BanState { active: false, new: false };
    const ONGOING: BanState = BanState { active: true, new: false };
    const FRESH: BanState = BanState { active: true, new: true };
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum UserKey {
    Name(String),
    Id(i64),
}

impl UserKey {
    fn of(user: &User) -> Self {
        if user.username.is_empty() {
            UserKey::Id(user.id)
        } else {
            UserKey::Name(user.username.clone())
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Activity {
    last_activity: DateTime<Utc>,
    penalty: u32,
}

/// Terminator settings.
#[derive(Debug, Clone)]
pub struct TerminatorParams {
    pub ban_duration: Duration,
    pub ban_penalty: u32,
    pub allowed_period: Duration,
    pub exclude: SuperUsers,
}

/// Sliding-window penalty accumulator with a ban state per user and chat.
#[derive(Debug)]
pub struct Terminator {
    params: TerminatorParams,
    users: Mutex<HashMap<(UserKey, i64), Activity>>,
}

fn chrono_duration(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::days(365 * 100))
}

impl Terminator {
    pub fn new(params: TerminatorParams) -> Self {
        Self {
            params,
            users: Mutex::new(HashMap::new()),
        }
    }

    /// Checks a message sent by `user` at `msg_time` against the wall clock.
    pub fn check(&self, user: &User, msg_time: DateTime<Utc>, chat_id: i64) -> BanState {
        self.check_at(user, msg_time, chat_id, Utc::now())
    }

    /// Same as [`Terminator::check`] with an explicit current time.
    pub fn check_at(
        &self,
        user: &User,
        msg_time: DateTime<Utc>,
        chat_id: i64,
        now: DateTime<Utc>,
    ) -> BanState {
        if self.params.exclude.contains_user(user) {
            return BanState::NONE;
        }

        let allowed = chrono_duration(self.params.allowed_period);
        let ban_duration = chrono_duration(self.params.ban_duration);

        // late deliveries never count
        if msg_time + allowed < now {
            return BanState::NONE;
        }

        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        let key = (UserKey::of(user), chat_id);
        let Some(rec) = users.get_mut(&key) else {
            users.insert(
                key,
                Activity {
                    last_activity: msg_time,
                    penalty: 0,
                },
            );
            return BanState::NONE;
        };

        if rec.penalty > self.params.ban_penalty {
            if now < rec.last_activity + ban_duration {
                return BanState::ONGOING;
            }
            rec.penalty = 0;
        }

        if msg_time < rec.last_activity + allowed {
            rec.penalty += 1;
            if rec.penalty >= self.params.ban_penalty {
                rec.penalty = self.params.ban_penalty + 1;
                rec.last_activity = msg_time;
                log::info!(
                    "user {} in chat {} is too active, banned for {:?}",
                    user.name(),
                    chat_id,
                    self.params.ban_duration
                );
                return BanState::FRESH;
            }
        } else {
            rec.penalty = 0;
        }

        rec.last_activity = msg_time;
        BanState::NONE
    }
}
