//! HTTP API against a real listener, backed by the in-memory store and the
//! fake models.

mod common;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{harness, Harness, LetterEmbedder, RecordingChat, COLLECTION};
use rag_chatbot::memory::MemoryBackend;
use rag_chatbot::server::{router, AppState, NO_DOCUMENTS};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::task::JoinHandle;

struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
    _uploads: TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct Fakes {
    backend: Arc<MemoryBackend>,
    embedder: Arc<LetterEmbedder>,
    chat: Arc<RecordingChat>,
}

async fn start(reply: &str) -> (TestServer, Fakes) {
    let Harness {
        pipeline,
        backend,
        embedder,
        chat,
    } = harness(Some(reply)).await;
    let uploads = TempDir::new().unwrap();
    let state = Arc::new(AppState::new(pipeline, uploads.path().join("uploads")));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router(state)).await.ok();
    });
    let server = TestServer {
        addr,
        handle,
        _uploads: uploads,
    };
    (
        server,
        Fakes {
            backend,
            embedder,
            chat,
        },
    )
}

async fn ask(client: &reqwest::Client, server: &TestServer, query: &str) -> String {
    let resp = client
        .post(server.url("/chat"))
        .json(&json!({ "query": query }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    body["answer"].as_str().unwrap().to_string()
}

fn csv_upload() -> Form {
    let csv = "topic,detail\nrefund,Refunds are issued within 30 days\nshipping,Free over 50\n";
    Form::new().part(
        "files",
        Part::bytes(csv.as_bytes().to_vec()).file_name("policy.csv"),
    )
}

#[tokio::test]
async fn chat_before_upload_asks_for_documents() {
    let (server, h) = start("Refunds take 30 days.").await;
    let client = reqwest::Client::new();

    assert_eq!(ask(&client, &server, "What is the refund policy?").await, NO_DOCUMENTS);
    assert!(h.chat.prompts().is_empty());
}

#[tokio::test]
async fn upload_reports_ingest_and_enables_chat() {
    let (server, h) = start("Refunds take 30 days.").await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/upload"))
        .multipart(csv_upload())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["files"], json!(["policy.csv"]));
    assert_eq!(body["documents"], 2);
    assert_eq!(body["chunks_stored"], 2);
    assert_eq!(body["failures"], json!([]));
    assert_eq!(h.backend.point_count(COLLECTION), 2);

    assert_eq!(
        ask(&client, &server, "What is the refund policy?").await,
        "Refunds take 30 days."
    );
    let prompts = h.chat.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("detail: Refunds are issued within 30 days"));
}

#[tokio::test]
async fn upload_without_files_is_rejected() {
    let (server, h) = start("Refunds take 30 days.").await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/upload"))
        .multipart(Form::new().text("note", "no attachment"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 1);

    assert_eq!(ask(&client, &server, "What is the refund policy?").await, NO_DOCUMENTS);
}

#[tokio::test]
async fn clearing_the_session_requires_a_new_upload() {
    let (server, _h) = start("Refunds take 30 days.").await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/upload"))
        .multipart(csv_upload())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client.delete(server.url("/session")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["removed"], 1);

    assert_eq!(ask(&client, &server, "What is the refund policy?").await, NO_DOCUMENTS);
}
