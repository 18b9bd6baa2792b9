//! Webhook delivery against a local HTTP fixture: terminal states, attempt
//! accounting, bounded retries.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use uuid::Uuid;

use server::models::WebhookDelivery;
use server::ports::WebhookDeliveryStore;
use server::services::webhook::deliver_with_retries;
use support::MemWebhookStore;

/// Minimal HTTP fixture: answers every request with `status_line` and
/// counts hits.
async fn spawn_fixture(status_line: &'static str, hits: Arc<AtomicUsize>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let hits = Arc::clone(&hits);
            tokio::spawn(async move {
                read_request(&mut socket).await;
                hits.fetch_add(1, Ordering::SeqCst);
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}/hook")
}

/// Read one full request (headers + Content-Length body).
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let Ok(n) = socket.read(&mut buf).await else {
            return;
        };
        if n == 0 {
            return;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&data[..pos]).to_ascii_lowercase();
            let content_length: usize = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0);
            if data.len() - (pos + 4) >= content_length {
                return;
            }
        }
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap()
}

fn new_log(url: &str) -> WebhookDelivery {
    WebhookDelivery::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        url.to_string(),
        r#"{"event_type":"PAYMENT_UPDATE"}"#.to_string(),
    )
}

#[tokio::test]
async fn delivery_succeeds_on_first_attempt() {
    let hits = Arc::new(AtomicUsize::new(0));
    let url = spawn_fixture("200 OK", Arc::clone(&hits)).await;
    let store = Arc::new(MemWebhookStore::new());

    let log = new_log(&url);
    let log_id = log.id;
    deliver_with_retries(
        client(),
        Arc::clone(&store) as Arc<dyn WebhookDeliveryStore>,
        url,
        log.payload.clone(),
        log,
        &[Duration::from_millis(10); 3],
    )
    .await;

    let saved = store.snapshot(log_id).unwrap();
    assert_eq!(saved.status, "DELIVERED");
    assert_eq!(saved.attempt, 1);
    assert_eq!(saved.http_status, Some(200));
    assert!(saved.next_retry_at.is_none());
    assert!(saved.last_error.is_none());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_2xx_exhausts_retries_then_fails() {
    let hits = Arc::new(AtomicUsize::new(0));
    let url = spawn_fixture("500 Internal Server Error", Arc::clone(&hits)).await;
    let store = Arc::new(MemWebhookStore::new());

    let log = new_log(&url);
    let log_id = log.id;
    let started = Instant::now();
    deliver_with_retries(
        client(),
        Arc::clone(&store) as Arc<dyn WebhookDeliveryStore>,
        url,
        log.payload.clone(),
        log,
        &[Duration::from_millis(10), Duration::from_millis(10)],
    )
    .await;

    let saved = store.snapshot(log_id).unwrap();
    assert_eq!(saved.status, "FAILED");
    // Immediate attempt + one per interval.
    assert_eq!(saved.attempt, 3);
    assert_eq!(saved.http_status, Some(500));
    assert_eq!(saved.last_error.as_deref(), Some("HTTP 500"));
    assert!(saved.next_retry_at.is_none());
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    // Terminates within the sum of intervals plus per-attempt timeouts.
    assert!(started.elapsed() < Duration::from_secs(7));
}

#[tokio::test]
async fn transport_error_records_the_cause() {
    // Bind then drop: nothing listens on this port.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let url = format!("http://{addr}/hook");

    let store = Arc::new(MemWebhookStore::new());
    let log = new_log(&url);
    let log_id = log.id;
    deliver_with_retries(
        client(),
        Arc::clone(&store) as Arc<dyn WebhookDeliveryStore>,
        url,
        log.payload.clone(),
        log,
        &[],
    )
    .await;

    let saved = store.snapshot(log_id).unwrap();
    assert_eq!(saved.status, "FAILED");
    assert_eq!(saved.attempt, 1);
    assert!(saved.http_status.is_none());
    assert!(saved.last_error.is_some());
}

#[tokio::test]
async fn recovery_mid_schedule_delivers() {
    // First two attempts see 500, the third sees 200.
    let hits = Arc::new(AtomicUsize::new(0));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let counter = Arc::clone(&hits);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let status = if n < 2 { "500 Internal Server Error" } else { "200 OK" };
            read_request(&mut socket).await;
            let response =
                format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    let url = format!("http://{addr}/hook");
    let store = Arc::new(MemWebhookStore::new());
    let log = new_log(&url);
    let log_id = log.id;
    deliver_with_retries(
        client(),
        Arc::clone(&store) as Arc<dyn WebhookDeliveryStore>,
        url,
        log.payload.clone(),
        log,
        &[Duration::from_millis(10); 4],
    )
    .await;

    let saved = store.snapshot(log_id).unwrap();
    assert_eq!(saved.status, "DELIVERED");
    assert_eq!(saved.attempt, 3);
    assert_eq!(saved.http_status, Some(200));
}
