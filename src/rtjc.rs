//! Line-oriented TCP ingress for announcements from the news feed.
//!
//! Each connection carries one `\n`-terminated line which is posted to the
//! chat. Lines carrying the pin marker are rewritten and pinned.

use crate::config::timeout;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

/// Destination for announcements.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, text: &str, pin: bool) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct RtjcParams {
    pub addr: SocketAddr,
    pub pin_marker: String,
    pub pin_replacement: String,
}

pub struct Rtjc {
    listener: TcpListener,
    params: RtjcParams,
    submitter: Arc<dyn Submitter>,
}

impl Rtjc {
    pub async fn bind(params: RtjcParams, submitter: Arc<dyn Submitter>) -> Result<Self> {
        let listener = TcpListener::bind(params.addr)
            .await
            .with_context(|| format!("can't listen on {}", params.addr))?;
        log::info!("rtjc listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            params,
            submitter,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Returns the text to post and whether to pin it.
    pub fn recognize(&self, line: &str) -> (String, bool) {
        if !self.params.pin_marker.is_empty() && line.contains(&self.params.pin_marker) {
            let text = line.replace(&self.params.pin_marker, &self.params.pin_replacement);
            return (text.trim().to_string(), true);
        }
        (line.to_string(), false)
    }

    /// Accepts connections until `shutdown` flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let this = Arc::new(self);
        loop {
            let accepted = tokio::select! {
                res = this.listener.accept() => res,
                _ = shutdown.changed() => {
                    log::info!("rtjc stopped");
                    return;
                }
            };
            match accepted {
                Ok((stream, peer)) => {
                    let this = Arc::clone(&this);
                    tokio::spawn(async move {
                        if let Err(e) = this.handle(stream).await {
                            log::warn!("rtjc connection from {} failed: {:#}", peer, e);
                        }
                    });
                }
                Err(e) => {
                    log::warn!("rtjc accept failed: {}", e);
                    tokio::time::sleep(timeout::RTJC_BACKOFF).await;
                }
            }
        }
    }

    async fn handle(&self, stream: TcpStream) -> Result<()> {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        tokio::time::timeout(timeout::RTJC_READ, reader.read_line(&mut line))
            .await
            .context("read timed out")?
            .context("read failed")?;
        let line = line.trim_end_matches(['\r', '\n']).trim();
        if line.is_empty() {
            return Ok(());
        }
        let (text, pin) = self.recognize(line);
        log::info!("rtjc message {:?}, pin={}", text, pin);
        self.submitter.submit(&text, pin).await
    }
}
