//! Integration tests for file sharing.
//!
//! An axum server accepts multipart uploads on `/upload` and serves files on
//! `/uploads/{name}`. The test plays the room broadcast: every upload the
//! server accepted is turned into the `file-shared` event a real server
//! would emit.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use url::Url;

use duochat::chat::ChatClient;
use duochat::chat::ledger::{
    Direction, EntryBody, EntryId, EntryStatus, LOCAL_SENDER, LedgerEntry, NoticeLevel,
};
use duochat::chat::upload::{self, UploadError, resolve_file_url};
use duochat_proto::event::{ClientEvent, FileShared, IncomingChat, ServerEvent};

// ---------------------------------------------------------------------------
// Test server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct ReceivedUpload {
    file_name: String,
    size: u64,
    room_id: String,
    sender_id: String,
    temp_id: String,
}

type UploadLog = Arc<Mutex<Vec<ReceivedUpload>>>;

async fn accept_upload(State(log): State<UploadLog>, mut multipart: Multipart) -> StatusCode {
    let mut upload = ReceivedUpload::default();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            upload.file_name = field.file_name().unwrap_or_default().to_string();
        }
        let Ok(bytes) = field.bytes().await else {
            return StatusCode::BAD_REQUEST;
        };
        let text = String::from_utf8_lossy(&bytes).into_owned();
        match name.as_str() {
            "file" => upload.size = bytes.len() as u64,
            "roomId" => upload.room_id = text,
            "senderId" => upload.sender_id = text,
            "tempId" => upload.temp_id = text,
            _ => {}
        }
    }
    if upload.file_name.starts_with("reject") {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    log.lock().unwrap().push(upload);
    StatusCode::OK
}

async fn serve_file(UrlPath(name): UrlPath<String>) -> String {
    format!("contents of {name}")
}

async fn start_server() -> (Url, UploadLog) {
    let log = UploadLog::default();
    let app = Router::new()
        .route("/upload", post(accept_upload))
        .route("/uploads/{name}", get(serve_file))
        .with_state(Arc::clone(&log));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (Url::parse(&format!("http://{addr}")).unwrap(), log)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("duochat-test-{}", uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_file(dir: &std::path::Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn ada_in_room() -> (ChatClient, mpsc::Receiver<ClientEvent>) {
    let (tx, rx) = mpsc::channel(64);
    let mut client = ChatClient::new(tx, Duration::from_millis(2000));
    client.set_local_id("sock-ada");
    client.set_display_name("Ada").unwrap();
    client.create_room().unwrap();
    client.handle_server_event(ServerEvent::RoomCreated("R1".into()));
    (client, rx)
}

fn shared(upload: &ReceivedUpload, sender_name: &str) -> ServerEvent {
    ServerEvent::FileShared(FileShared {
        temp_id: upload.temp_id.clone(),
        original_name: upload.file_name.clone(),
        mime_type: "text/plain".into(),
        size: upload.size,
        path: format!("/uploads/{}", upload.file_name),
        sender_id: upload.sender_id.clone(),
        sender_name: sender_name.into(),
    })
}

fn upload_of<'a>(log: &'a [ReceivedUpload], temp_id: &EntryId) -> &'a ReceivedUpload {
    log.iter().find(|u| u.temp_id == temp_id.as_str()).unwrap()
}

fn file_names(entries: &[LedgerEntry]) -> Vec<(String, EntryStatus)> {
    entries
        .iter()
        .filter_map(|e| match &e.body {
            EntryBody::File(meta) => Some((meta.name.clone(), e.status)),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_uploads_confirm_their_own_placeholders() {
    let (base, log) = start_server().await;
    let endpoint = resolve_file_url(&base, "/upload").unwrap();
    let dir = scratch_dir();
    let a = write_file(&dir, "a.txt", "alpha");
    let b = write_file(&dir, "b.txt", "bravo!");

    let (mut ada, _rx) = ada_in_room();
    let jobs = ada.select_files(&[a, b]).unwrap();
    assert_eq!(
        file_names(ada.ledger().entries()),
        vec![
            ("a.txt".to_string(), EntryStatus::Pending),
            ("b.txt".to_string(), EntryStatus::Pending),
        ]
    );
    assert_eq!(ada.uploads().in_flight_count(), 2);

    let http = reqwest::Client::new();
    let (ra, rb) = tokio::join!(
        upload::upload_file(&http, &endpoint, &jobs[0]),
        upload::upload_file(&http, &endpoint, &jobs[1]),
    );
    ra.unwrap();
    rb.unwrap();

    let received = log.lock().unwrap().clone();
    assert_eq!(received.len(), 2);
    let second = upload_of(&received, &jobs[1].temp_id);
    assert_eq!(second.room_id, "R1");
    assert_eq!(second.sender_id, "sock-ada");
    assert_eq!(second.size, 6);

    // Broadcasts arrive out of order; each confirms its own placeholder.
    ada.handle_server_event(shared(second, "Ada"));
    ada.handle_server_event(shared(upload_of(&received, &jobs[0].temp_id), "Ada"));

    assert_eq!(
        file_names(ada.ledger().entries()),
        vec![
            ("a.txt".to_string(), EntryStatus::Confirmed),
            ("b.txt".to_string(), EntryStatus::Confirmed),
        ]
    );
    let entry = ada.ledger().get(&jobs[1].temp_id).unwrap();
    assert_eq!(entry.direction, Direction::Sent);
    assert_eq!(entry.sender, LOCAL_SENDER);
    assert_eq!(ada.uploads().in_flight_count(), 0);
}

#[tokio::test]
async fn one_failure_does_not_affect_the_other_upload() {
    let (base, log) = start_server().await;
    let endpoint = resolve_file_url(&base, "/upload").unwrap();
    let dir = scratch_dir();
    let good = write_file(&dir, "good.txt", "ok");
    let bad = write_file(&dir, "reject.txt", "no");

    let (mut ada, _rx) = ada_in_room();
    let jobs = ada.select_files(&[good, bad]).unwrap();

    let http = reqwest::Client::new();
    upload::upload_file(&http, &endpoint, &jobs[0]).await.unwrap();
    let err = upload::upload_file(&http, &endpoint, &jobs[1])
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::Http(_)));

    ada.upload_failed(&jobs[1].temp_id, &jobs[1].file_name);
    assert!(ada.ledger().get(&jobs[1].temp_id).is_none());
    assert!(ada.ledger().get(&jobs[0].temp_id).unwrap().is_pending());

    let last = ada.ledger().iter().last().unwrap();
    assert_eq!(
        last.body,
        EntryBody::Notification {
            text: "⚠️ reject.txt upload failed.".into(),
            level: NoticeLevel::Error,
        }
    );

    let received = log.lock().unwrap().clone();
    ada.handle_server_event(shared(upload_of(&received, &jobs[0].temp_id), "Ada"));
    assert_eq!(
        ada.ledger().get(&jobs[0].temp_id).unwrap().status,
        EntryStatus::Confirmed
    );
}

#[tokio::test]
async fn confirmed_file_keeps_placeholder_position() {
    let (base, log) = start_server().await;
    let endpoint = resolve_file_url(&base, "/upload").unwrap();
    let dir = scratch_dir();
    let path = write_file(&dir, "notes.md", "# notes");

    let (mut ada, _rx) = ada_in_room();
    let jobs = ada.select_files(&[path]).unwrap();
    ada.handle_server_event(ServerEvent::ChatMessage(IncomingChat {
        message: "sent while uploading".into(),
        message_id: "m-bob".into(),
        sender_name: "Bob".into(),
    }));

    upload::upload_file(&reqwest::Client::new(), &endpoint, &jobs[0])
        .await
        .unwrap();
    let received = log.lock().unwrap().clone();
    ada.handle_server_event(shared(&received[0], "Ada"));

    assert_eq!(ada.ledger().position(&jobs[0].temp_id), Some(0));
    assert_eq!(ada.ledger().position(&EntryId::new("m-bob")), Some(1));
    assert_eq!(ada.ledger().len(), 2);
}

#[tokio::test]
async fn duplicate_file_shared_is_idempotent() {
    let (mut ada, _rx) = ada_in_room();
    let upload = ReceivedUpload {
        file_name: "x.bin".into(),
        size: 10,
        room_id: "R1".into(),
        sender_id: "sock-bob".into(),
        temp_id: "temp-bob-1".into(),
    };

    ada.handle_server_event(shared(&upload, "Bob"));
    ada.handle_server_event(shared(&upload, "Bob"));

    assert_eq!(ada.ledger().len(), 1);
    let entry = ada.ledger().get(&EntryId::new("temp-bob-1")).unwrap();
    assert_eq!(entry.direction, Direction::Received);
    assert_eq!(entry.sender, "Bob");
    assert_eq!(entry.status, EntryStatus::Confirmed);
}

#[tokio::test]
async fn failure_after_confirmation_keeps_the_file() {
    let (mut ada, _rx) = ada_in_room();
    let dir = scratch_dir();
    let path = write_file(&dir, "late.txt", "late");
    let jobs = ada.select_files(&[path]).unwrap();

    let upload = ReceivedUpload {
        file_name: "late.txt".into(),
        size: 4,
        room_id: "R1".into(),
        sender_id: "sock-ada".into(),
        temp_id: jobs[0].temp_id.to_string(),
    };
    ada.handle_server_event(shared(&upload, "Ada"));
    ada.upload_failed(&jobs[0].temp_id, "late.txt");

    assert_eq!(
        ada.ledger().get(&jobs[0].temp_id).unwrap().status,
        EntryStatus::Confirmed
    );
    assert!(!ada.ledger().iter().any(|e| matches!(
        e.body,
        EntryBody::Notification {
            level: NoticeLevel::Error,
            ..
        }
    )));
}

#[tokio::test]
async fn upload_to_closed_port_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let endpoint = Url::parse(&format!("http://{addr}/upload")).unwrap();

    let dir = scratch_dir();
    let path = write_file(&dir, "a.txt", "alpha");
    let (mut ada, _rx) = ada_in_room();
    let jobs = ada.select_files(&[path]).unwrap();

    let err = upload::upload_file(&reqwest::Client::new(), &endpoint, &jobs[0])
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::Http(_)));
}

#[tokio::test]
async fn download_saves_under_base_name() {
    let (base, _log) = start_server().await;
    let dest = scratch_dir().join("downloads");
    let url = resolve_file_url(&base, "/uploads/plan.txt").unwrap();

    let path = upload::download_file(&reqwest::Client::new(), url, &dest, "../plan.txt")
        .await
        .unwrap();

    assert_eq!(path, dest.join("plan.txt"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "contents of plan.txt");
}

#[test]
fn selecting_nothing_is_refused() {
    let (mut ada, _rx) = ada_in_room();
    assert!(ada.select_files(&[]).is_err());
    assert!(ada.ledger().is_empty());
}
