//! End-to-end tests for the EasyChat client.
//!
//! These tests exercise the full pipeline from a submitted turn to rendered
//! answer and opened citation, against an in-process backend that speaks
//! the same HTTP contract as the real one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use easychat_config::ClientConfig;
use easychat_core::document::{Document, PDF_MIME};
use easychat_core::error::{DocumentError, Error, Result};
use easychat_core::message::{ChatTurn, Role};
use easychat_core::view::{ChatView, DocumentSurface, RenderEvent};
use easychat_session::{ConversationSession, DocumentViewer, FAILURE_NOTICE, LinkAction, resolve_link};
use easychat_transport::{DocumentFetcher, HttpChatTransport, HttpDocumentSource};
use serde_json::json;

// ── In-process backend ───────────────────────────────────────────────────

#[derive(Default)]
struct Backend {
    blob_requests: AtomicUsize,
}

const FIRST_FRAME: &str = r#"{"choices":[{"message":{"content":"The handbook covers leave [doc1].","context":{"citations":[{"title":"Employee Handbook","url":"https://acct.blob.core.windows.net/docs/handbook.pdf","filepath":"handbook_pages_2.pdf","storageaccount_blob":"handbook.pdf","storageaccount_container":"docs","storageaccount_name":"acct"},{"title":"Intranet","url":"https://intranet.example.com/leave.html"}]}}}]}"#;

async fn chat_stream() -> impl IntoResponse {
    let body = format!(
        "{FIRST_FRAME}\n{}\n{}\n",
        r#"{"choices":[{"delta":{"content":" Ask HR "}}]}"#,
        r#"{"choices":[{"delta":{"content":"for details."}}]}"#,
    );
    // Deliberately awkward chunking: mid-frame and mid-line splits.
    let bytes = body.into_bytes();
    let chunks: Vec<std::result::Result<Vec<u8>, std::io::Error>> =
        bytes.chunks(37).map(|c| Ok(c.to_vec())).collect();
    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(futures::stream::iter(chunks)),
    )
}

async fn chat_error() -> impl IntoResponse {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({"error": "messages missing"})),
    )
}

async fn blob_file(
    State(backend): State<Arc<Backend>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    backend.blob_requests.fetch_add(1, Ordering::SeqCst);
    let found = params.get("storageaccount_blob").map(String::as_str) == Some("handbook.pdf")
        && params.get("storageaccount_container").map(String::as_str) == Some("docs")
        && params.get("storageaccount_name").map(String::as_str) == Some("acct");
    if found {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, PDF_MIME)],
            b"%PDF-1.4 /Type /Page".to_vec(),
        )
    } else {
        (StatusCode::NOT_FOUND, [(header::CONTENT_TYPE, "text/plain")], Vec::new())
    }
}

async fn serve(backend: Arc<Backend>, failing_chat: bool) -> String {
    let chat = if failing_chat {
        Router::new().route("/api/chat/stream", post(chat_error))
    } else {
        Router::new().route("/api/chat/stream", post(chat_stream))
    };
    let app = chat
        .route("/api/blobstorage/file", get(blob_file))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ── Recording collaborators ──────────────────────────────────────────────

#[derive(Default)]
struct TranscriptView {
    turns: Mutex<Vec<ChatTurn>>,
    renders: Mutex<Vec<RenderEvent>>,
    input: Mutex<String>,
}

impl ChatView for TranscriptView {
    fn show_turn(&self, turn: &ChatTurn) {
        self.turns.lock().unwrap().push(turn.clone());
    }
    fn show_waiting(&self) {}
    fn hide_waiting(&self) {}
    fn render_assistant(&self, event: &RenderEvent) {
        self.renders.lock().unwrap().push(event.clone());
    }
    fn remove_last_turn(&self) {
        self.turns.lock().unwrap().pop();
    }
    fn set_input(&self, text: &str) {
        *self.input.lock().unwrap() = text.to_string();
    }
    fn clear_transcript(&self) {
        self.turns.lock().unwrap().clear();
        self.renders.lock().unwrap().clear();
    }
}

/// Reports a fixed page count and records scrolling.
#[derive(Default)]
struct PagedSurface {
    pages: u32,
    scrolled: Mutex<Vec<u32>>,
    closed: AtomicUsize,
}

#[async_trait::async_trait]
impl DocumentSurface for PagedSurface {
    fn open(&self) {}
    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
    async fn present(&self, document: &Document) -> Result<u32> {
        assert!(document.is_pdf());
        Ok(self.pages)
    }
    fn scroll_to_page(&self, page: u32) {
        self.scrolled.lock().unwrap().push(page);
    }
}

struct Harness {
    session: ConversationSession,
    view: Arc<TranscriptView>,
    viewer: DocumentViewer,
    surface: Arc<PagedSurface>,
    fetcher: Arc<DocumentFetcher>,
}

fn harness(base_url: &str) -> Harness {
    let config = ClientConfig {
        base_url: base_url.to_string(),
        settle_delay_ms: 0,
        ..ClientConfig::default()
    };
    let transport = Arc::new(HttpChatTransport::from_config(&config).unwrap());
    let source = Arc::new(HttpDocumentSource::from_config(&config).unwrap());
    let fetcher = Arc::new(DocumentFetcher::new(source, config.document_cache_capacity).unwrap());

    let view = Arc::new(TranscriptView::default());
    let surface = Arc::new(PagedSurface {
        pages: 3,
        ..PagedSurface::default()
    });
    let session = ConversationSession::from_config(&config, transport, view.clone())
        .with_documents(fetcher.clone());
    let viewer = DocumentViewer::new(fetcher.clone(), surface.clone());

    Harness {
        session,
        view,
        viewer,
        surface,
        fetcher,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn streamed_answer_with_citations_end_to_end() {
    let base = serve(Arc::new(Backend::default()), false).await;
    let h = harness(&base);

    let message = h.session.submit_turn("What about leave?").await.unwrap().unwrap();
    assert_eq!(
        message.text,
        "The handbook covers leave [doc1]. Ask HR for details."
    );

    let history = h.session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history.turns()[1].role, Role::Assistant);
    assert_eq!(history.turns()[1].content, message.text);

    let renders = h.view.renders.lock().unwrap().clone();
    let RenderEvent::Started { markdown, citations, .. } = &renders[0] else {
        panic!("first render must be Started");
    };
    assert!(markdown.ends_with(
        "\n\n[doc1]: https://easy-chat-bot/citation/0\n[doc2]: https://easy-chat-bot/citation/1\n"
    ));
    assert_eq!(citations.len(), 1, "only the PDF citation is listed");
    assert_eq!(citations[0].tooltip, "Employee Handbook (page 3)");
    assert!(matches!(renders.last(), Some(RenderEvent::Settled { .. })));
}

#[tokio::test]
async fn citation_link_opens_document_once() {
    let backend = Arc::new(Backend::default());
    let base = serve(backend.clone(), false).await;
    let h = harness(&base);

    h.session.submit_turn("What about leave?").await.unwrap();
    let citations = h.session.last_citations();

    let action = resolve_link(
        "https://easy-chat-bot/citation/0",
        "chat.example.com",
        &citations,
    );
    let LinkAction::Citation { index, viewable: true, .. } = &action else {
        panic!("expected a viewable citation, got {action:?}");
    };

    let viewed = h.viewer.open(&citations[*index]).await.unwrap();
    assert_eq!(viewed.page_count, 3);
    assert_eq!(viewed.scrolled_to, Some(2));
    assert_eq!(*h.surface.scrolled.lock().unwrap(), vec![2]);

    h.viewer.open(&citations[*index]).await.unwrap();
    assert_eq!(backend.blob_requests.load(Ordering::SeqCst), 1);

    // The web page citation is inert.
    assert!(matches!(
        resolve_link("https://easy-chat-bot/citation/1", "chat.example.com", &citations),
        LinkAction::Citation { viewable: false, .. }
    ));
}

#[tokio::test]
async fn backend_error_rolls_back_turn() {
    let base = serve(Arc::new(Backend::default()), true).await;
    let h = harness(&base);

    let err = h.session.submit_turn("Hello").await.unwrap_err();
    assert!(matches!(err, Error::InvalidResponse(_)));
    assert!(h.session.history().is_empty());
    assert_eq!(*h.view.input.lock().unwrap(), "Hello");
    assert_eq!(
        *h.view.turns.lock().unwrap(),
        vec![ChatTurn::error(FAILURE_NOTICE)]
    );
}

#[tokio::test]
async fn missing_document_closes_viewer() {
    let base = serve(Arc::new(Backend::default()), false).await;
    let h = harness(&base);

    h.session.submit_turn("What about leave?").await.unwrap();
    let mut citation = h.session.last_citations()[0].clone();
    citation.storageaccount_blob = Some("gone.pdf".into());

    let err = h.viewer.open(&citation).await.unwrap_err();
    assert!(matches!(
        err,
        Error::DocumentFetchFailure(DocumentError::Status(404))
    ));
    assert_eq!(h.surface.closed.load(Ordering::SeqCst), 1);
    assert_eq!(h.session.history().len(), 2, "chat history is untouched");
}

#[tokio::test]
async fn clearing_session_empties_document_cache() {
    let base = serve(Arc::new(Backend::default()), false).await;
    let h = harness(&base);

    h.session.submit_turn("What about leave?").await.unwrap();
    let citation = h.session.last_citations()[0].clone();
    h.viewer.open(&citation).await.unwrap();
    assert_eq!(h.fetcher.cached_count().await, 1);

    h.session.clear_session().await;
    assert_eq!(h.fetcher.cached_count().await, 0);
    assert!(h.session.history().is_empty());
    assert!(h.session.last_citations().is_empty());
}

#[tokio::test]
async fn unreachable_backend_fails_fast() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let h = harness(&format!("http://{addr}"));

    let result = tokio::time::timeout(Duration::from_secs(10), h.session.submit_turn("Hello"))
        .await
        .expect("transport failure should not hang");
    assert!(matches!(result, Err(Error::TransportFailure(_))));
}
