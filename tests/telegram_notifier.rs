use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::Value;

use tapebot_rs::config::TelegramSettings;
use tapebot_rs::notify::{dispatch, Alert, AlertSource, Notifier, NotifyError, TelegramNotifier};

#[derive(Clone, Default)]
struct Captured {
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn send_message(
    State(captured): State<Captured>,
    Path(token): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    captured.requests.lock().push((token.clone(), body));
    if token == "botbad:token" {
        return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"ok": false, "description": "Unauthorized"})));
    }
    (StatusCode::OK, Json(serde_json::json!({"ok": true})))
}

async fn spawn_mock() -> (SocketAddr, Captured) {
    let captured = Captured::default();
    let app = Router::new()
        .route("/:token/sendMessage", post(send_message))
        .with_state(captured.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, captured)
}

fn settings(addr: SocketAddr, token: &str) -> TelegramSettings {
    TelegramSettings {
        token: token.to_string(),
        chat_id: "-100123".to_string(),
        api_base: format!("http://{addr}"),
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_posts_chat_id_and_text() {
    let (addr, captured) = spawn_mock().await;
    let notifier = TelegramNotifier::new(&settings(addr, "123:abc"), false).unwrap();
    let alert = Alert::new(AlertSource::Spread, "BTCUSDT", "[BTCUSDT] SPREAD 7.00 bps");

    notifier.send(&alert).await.unwrap();

    let requests = captured.requests.lock();
    assert_eq!(requests.len(), 1);
    let (token, body) = &requests[0];
    assert_eq!(token, "bot123:abc");
    assert_eq!(body["chat_id"], "-100123");
    assert_eq!(body["text"], "[BTCUSDT] SPREAD 7.00 bps");
}

#[tokio::test]
async fn test_non_ok_status_is_rejected() {
    let (addr, captured) = spawn_mock().await;
    let notifier = TelegramNotifier::new(&settings(addr, "bad:token"), false).unwrap();
    let alert = Alert::new(AlertSource::Tape, "BTCUSDT", "hello");

    match notifier.send(&alert).await {
        Err(NotifyError::Rejected { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("Unauthorized"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    // dispatch swallows the failure
    dispatch(&notifier, &alert).await;
    assert_eq!(captured.requests.lock().len(), 2);
}

#[tokio::test]
async fn test_dry_run_never_reaches_the_server() {
    let (addr, captured) = spawn_mock().await;
    let notifier = TelegramNotifier::new(&settings(addr, "123:abc"), true).unwrap();
    notifier.send(&Alert::new(AlertSource::Obi, "BTCUSDT", "dry")).await.unwrap();
    assert!(captured.requests.lock().is_empty());
}
