//! Tracks the live audio stream and announces when it goes up or down.

use crate::bot::{Bot, Message, Response};
use crate::config::{text, timeout};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone)]
pub struct BroadcastParams {
    pub url: String,
    pub ping_interval: Duration,
    /// Failed pings are tolerated for this long after the last successful one.
    pub delay_to_off: Duration,
    /// Optional JSON file keeping the state across restarts.
    pub state_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct PersistedState {
    status: bool,
    last_on: DateTime<Utc>,
}

#[derive(Debug)]
struct BroadcastState {
    status: bool,
    last_on: DateTime<Utc>,
    last_sent: Option<bool>,
}

struct Checker {
    client: Client,
    params: BroadcastParams,
    state: Arc<Mutex<BroadcastState>>,
}

impl Checker {
    async fn ping(&self) -> bool {
        match self.client.get(&self.params.url).send().await {
            Ok(resp) => resp.status() == StatusCode::OK,
            Err(e) => {
                log::debug!("broadcast ping to {} failed: {}", self.params.url, e);
                false
            }
        }
    }

    /// Applies one ping result. Returns the new status on an edge.
    fn apply(&self, up: bool, now: DateTime<Utc>) -> Option<bool> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let delay = chrono::Duration::from_std(self.params.delay_to_off)
            .unwrap_or_else(|_| chrono::Duration::days(1));
        if up {
            state.last_on = now;
            if !state.status {
                state.status = true;
                return Some(true);
            }
            return None;
        }
        if state.status && now - state.last_on > delay {
            state.status = false;
            return Some(false);
        }
        None
    }

    fn persist(&self) {
        let Some(path) = &self.params.state_file else {
            return;
        };
        let snapshot = {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            PersistedState {
                status: state.status,
                last_on: state.last_on,
            }
        };
        let res = serde_json::to_vec(&snapshot)
            .context("can't encode broadcast state")
            .and_then(|data| {
                std::fs::write(path, data)
                    .with_context(|| format!("can't write {}", path.display()))
            });
        if let Err(e) = res {
            log::warn!("failed to persist broadcast state: {:#}", e);
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.params.ping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {
                    log::info!("broadcast checker stopped");
                    return;
                }
            }
            let up = self.ping().await;
            if let Some(status) = self.apply(up, Utc::now()) {
                log::info!("broadcast status changed to {}", if status { "on" } else { "off" });
                self.persist();
            }
        }
    }
}

/// Bot reporting stream liveness edges; the ping loop runs in its own task.
pub struct BroadcastStatus {
    state: Arc<Mutex<BroadcastState>>,
}

fn load_state(path: &PathBuf) -> Option<PersistedState> {
    let data = std::fs::read(path).ok()?;
    match serde_json::from_slice(&data) {
        Ok(state) => Some(state),
        Err(e) => {
            log::warn!("ignoring broken broadcast state {}: {}", path.display(), e);
            None
        }
    }
}

impl BroadcastStatus {
    /// Starts the checker task. It stops once `shutdown` flips.
    pub fn start(
        params: BroadcastParams,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(Self, JoinHandle<()>)> {
        let client = Client::builder()
            .timeout(timeout::BROADCAST_PING.min(params.ping_interval.max(Duration::from_millis(500))))
            .build()
            .context("can't make broadcast http client")?;

        let restored = params.state_file.as_ref().and_then(load_state);
        let initial = match restored {
            Some(p) => {
                log::info!("restored broadcast status {}", p.status);
                BroadcastState {
                    status: p.status,
                    last_on: p.last_on,
                    last_sent: Some(p.status),
                }
            }
            None => BroadcastState {
                status: false,
                last_on: DateTime::<Utc>::MIN_UTC,
                last_sent: Some(false),
            },
        };

        let state = Arc::new(Mutex::new(initial));
        let checker = Checker {
            client,
            params,
            state: Arc::clone(&state),
        };
        let handle = tokio::spawn(checker.run(shutdown));
        Ok((Self { state }, handle))
    }

    /// Current stream status as seen by the checker.
    pub fn is_on(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).status
    }
}

#[async_trait]
impl Bot for BroadcastStatus {
    async fn on_message(&self, _msg: &Message) -> Response {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.last_sent == Some(state.status) {
            return Response::none();
        }
        state.last_sent = Some(state.status);
        if state.status {
            return Response {
                text: text::BROADCAST_STARTED.to_string(),
                send: true,
                pin: true,
                ..Default::default()
            };
        }
        Response {
            text: text::BROADCAST_FINISHED.to_string(),
            send: true,
            unpin: true,
            ..Default::default()
        }
    }

    fn react_on(&self) -> Vec<String> {
        Vec::new()
    }
}
