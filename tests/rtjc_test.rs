use anyhow::Result;
use async_trait::async_trait;
use rt_bot::config::rtjc::{PIN_MARKER, PIN_REPLACEMENT};
use rt_bot::rtjc::{Rtjc, RtjcParams, Submitter};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::watch;

#[derive(Default)]
struct Recorder {
    got: Mutex<Vec<(String, bool)>>,
}

#[async_trait]
impl Submitter for Recorder {
    async fn submit(&self, text: &str, pin: bool) -> Result<()> {
        self.got.lock().unwrap().push((text.to_string(), pin));
        Ok(())
    }
}

fn params() -> RtjcParams {
    RtjcParams {
        addr: "127.0.0.1:0".parse().unwrap(),
        pin_marker: PIN_MARKER.to_string(),
        pin_replacement: PIN_REPLACEMENT.to_string(),
    }
}

async fn send_line(addr: std::net::SocketAddr, line: &str) {
    let mut conn = TcpStream::connect(addr).await.unwrap();
    conn.write_all(line.as_bytes()).await.unwrap();
    conn.shutdown().await.unwrap();
}

async fn wait_for(rec: &Recorder, n: usize) {
    for _ in 0..100 {
        if rec.got.lock().unwrap().len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_lines_are_submitted() {
    let rec = Arc::new(Recorder::default());
    let rtjc = Rtjc::bind(params(), rec.clone()).await.unwrap();
    let addr = rtjc.local_addr().unwrap();
    let (tx, rx) = watch::channel(false);
    let server = tokio::spawn(rtjc.run(rx));

    send_line(addr, "новости выпуска\n").await;
    wait_for(&rec, 1).await;
    send_line(addr, &format!("{} в эфире\n", PIN_MARKER)).await;
    wait_for(&rec, 2).await;

    let got = rec.got.lock().unwrap().clone();
    assert_eq!(
        got,
        vec![
            ("новости выпуска".to_string(), false),
            (format!("{} в эфире", PIN_REPLACEMENT), true),
        ]
    );

    tx.send(true).unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_empty_lines_are_skipped() {
    let rec = Arc::new(Recorder::default());
    let rtjc = Rtjc::bind(params(), rec.clone()).await.unwrap();
    let addr = rtjc.local_addr().unwrap();
    let (_tx, rx) = watch::channel(false);
    tokio::spawn(rtjc.run(rx));

    send_line(addr, "   \n").await;
    send_line(addr, "last one\r\n").await;
    wait_for(&rec, 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let got = rec.got.lock().unwrap().clone();
    assert_eq!(got, vec![("last one".to_string(), false)]);
}

#[tokio::test]
async fn test_recognize_pin_marker() {
    let rtjc = Rtjc::bind(params(), Arc::new(Recorder::default())).await.unwrap();
    assert_eq!(rtjc.recognize("plain"), ("plain".to_string(), false));
    let (text, pin) = rtjc.recognize(&format!("{} новый выпуск", PIN_MARKER));
    assert!(pin);
    assert_eq!(text, format!("{} новый выпуск", PIN_REPLACEMENT));
}
