//! Append-only chat log: one JSON message per line, one file per day.

use crate::bot::Message;
use crate::config::reporter::{BATCH_SIZE, FILE_MODE, FLUSH_IDLE, CHECK_TIMEOUT, QUEUE_CAPACITY};
use anyhow::{Context, Result};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct ReporterParams {
    pub log_dir: PathBuf,
    /// Idle time after which buffered entries are written.
    pub flush_idle: Duration,
    /// Public message url template with `{chat}` and `{id}` placeholders.
    /// When set, entries are written only if the message is still there after `check_delay`.
    pub message_url: Option<String>,
    pub check_delay: Duration,
}

impl ReporterParams {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            flush_idle: FLUSH_IDLE,
            message_url: None,
            check_delay: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    day: String,
    line: String,
}

struct LiveCheck {
    client: Client,
    template: String,
    delay: Duration,
}

impl LiveCheck {
    fn url(&self, msg: &Message) -> String {
        self.template
            .replace("{chat}", &msg.chat_id.to_string())
            .replace("{id}", &msg.id.to_string())
    }

    /// A deleted message answers with a redirect, an error, or nothing at all.
    async fn is_alive(&self, msg: &Message) -> bool {
        let url = self.url(msg);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                log::debug!("message {} gone, {} answered {}", msg.id, url, resp.status());
                false
            }
            Err(e) => {
                log::debug!("check of {} failed: {}", url, e);
                false
            }
        }
    }
}

type Checks = Arc<Mutex<JoinSet<()>>>;

/// Handle for saving messages; the file writer runs in its own task.
#[derive(Clone)]
pub struct Reporter {
    tx: mpsc::Sender<Entry>,
    live_check: Option<Arc<LiveCheck>>,
    checks: Checks,
    shutdown: watch::Receiver<bool>,
}

impl Reporter {
    /// Creates the log directory and starts the writer, which stops once `shutdown` flips.
    pub fn start(params: ReporterParams, shutdown: watch::Receiver<bool>) -> Result<(Self, JoinHandle<()>)> {
        std::fs::create_dir_all(&params.log_dir)
            .with_context(|| format!("can't create log dir {}", params.log_dir.display()))?;

        let live_check = match &params.message_url {
            Some(template) => {
                let client = Client::builder()
                    .redirect(Policy::none())
                    .timeout(CHECK_TIMEOUT)
                    .build()
                    .context("can't make message check http client")?;
                Some(Arc::new(LiveCheck {
                    client,
                    template: template.clone(),
                    delay: params.check_delay,
                }))
            }
            None => None,
        };

        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let checks: Checks = Arc::default();
        let writer = Writer {
            dir: params.log_dir,
            flush_idle: params.flush_idle,
            checks: Arc::clone(&checks),
        };
        let handle = tokio::spawn(writer.run(rx, shutdown.clone()));
        Ok((
            Self {
                tx,
                live_check,
                checks,
                shutdown,
            },
            handle,
        ))
    }

    /// Queues a message for the log. Never blocks; entries are dropped when the queue is full.
    pub fn save(&self, msg: &Message) {
        if msg.text.is_empty() && msg.media.is_none() {
            return;
        }
        let line = match serde_json::to_string(msg) {
            Ok(line) => line,
            Err(e) => {
                log::warn!("can't encode message {}: {}", msg.id, e);
                return;
            }
        };
        let entry = Entry {
            day: msg.sent.format("%Y%m%d").to_string(),
            line,
        };

        let Some(live_check) = &self.live_check else {
            self.push(entry);
            return;
        };
        let live_check = Arc::clone(live_check);
        let tx = self.tx.clone();
        let mut shutdown = self.shutdown.clone();
        let msg = msg.clone();
        let mut checks = self.checks.lock().unwrap_or_else(|e| e.into_inner());
        while checks.try_join_next().is_some() {}
        checks.spawn(async move {
            // on shutdown the check runs right away so the writer can drain it
            tokio::select! {
                _ = tokio::time::sleep(live_check.delay) => {}
                _ = async { shutdown.wait_for(|stop| *stop).await.is_ok() } => {}
            }
            if live_check.is_alive(&msg).await {
                push(&tx, entry);
            }
        });
    }

    fn push(&self, entry: Entry) {
        push(&self.tx, entry);
    }
}

fn push(tx: &mpsc::Sender<Entry>, entry: Entry) {
    if let Err(e) = tx.try_send(entry) {
        log::warn!("reporter queue rejected entry: {}", e);
    }
}

struct Writer {
    dir: PathBuf,
    flush_idle: Duration,
    checks: Checks,
}

impl Writer {
    async fn run(self, mut rx: mpsc::Receiver<Entry>, mut shutdown: watch::Receiver<bool>) {
        let mut batch: Vec<Entry> = Vec::with_capacity(BATCH_SIZE);
        // set when the first entry of a batch arrives
        let mut deadline: Option<Instant> = None;
        loop {
            let due = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::select! {
                received = rx.recv() => match received {
                    Some(entry) => {
                        if batch.is_empty() {
                            deadline = Some(Instant::now() + self.flush_idle);
                        }
                        batch.push(entry);
                        if batch.len() >= BATCH_SIZE {
                            self.flush(&mut batch).await;
                            deadline = None;
                        }
                    }
                    None => break,
                },
                _ = due => {
                    self.flush(&mut batch).await;
                    deadline = None;
                }
                _ = shutdown.changed() => break,
            }
        }

        let mut pending = std::mem::take(&mut *self.checks.lock().unwrap_or_else(|e| e.into_inner()));
        if !pending.is_empty() {
            log::debug!("waiting for {} message checks", pending.len());
        }
        while let Some(res) = pending.join_next().await {
            if let Err(e) = res {
                log::warn!("message check failed: {}", e);
            }
        }

        while let Ok(entry) = rx.try_recv() {
            batch.push(entry);
        }
        self.flush(&mut batch).await;
        log::info!("reporter stopped");
    }

    async fn flush(&self, batch: &mut Vec<Entry>) {
        if batch.is_empty() {
            return;
        }
        let mut by_day: BTreeMap<String, String> = BTreeMap::new();
        for entry in batch.drain(..) {
            let buf = by_day.entry(entry.day).or_default();
            buf.push_str(&entry.line);
            buf.push('\n');
        }
        for (day, data) in by_day {
            let path = self.dir.join(format!("{}.log", day));
            if let Err(e) = append(&path, data.as_bytes()).await {
                log::warn!("failed to write {}: {:#}", path.display(), e);
            }
        }
    }
}

async fn append(path: &Path, data: &[u8]) -> Result<()> {
    let mut opts = OpenOptions::new();
    opts.create(true).append(true);
    #[cfg(unix)]
    opts.mode(FILE_MODE);
    let mut file = opts.open(path).await.context("can't open log file")?;
    file.write_all(data).await.context("can't write log file")?;
    file.flush().await?;
    Ok(())
}
