use application::answer_service::AnswerService;
use application::ingest_service::IngestService;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use domain::chunking::ChunkPolicy;
use domain::error::PipelineResult;
use domain::ports::{EmbeddingProvider, EmbeddingTask};
use infrastructure::index_store::IndexStore;
use presentation::web::{router, WebState};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tests::{BagOfWordsEmbedder, FakePdfExtractor, RecordingChat, PAGE_BREAK};
use tower::ServiceExt;

const MODEL: &str = "bag-of-words-v1";
const BOUNDARY: &str = "chatpdfboundary";

/// Bag-of-words embeddings that take a while and record how many calls
/// overlap.
#[derive(Clone)]
struct SlowEmbedder {
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl SlowEmbedder {
    fn new() -> Self {
        Self {
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for SlowEmbedder {
    fn model(&self) -> &str {
        MODEL
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        _task: EmbeddingTask,
    ) -> PipelineResult<Vec<Vec<f32>>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| BagOfWordsEmbedder::vector_for(t)).collect())
    }
}

fn build_app<E>(dir: &Path, embeddings: E, chat: &RecordingChat) -> Router
where
    E: EmbeddingProvider + Clone + Send + Sync + 'static,
{
    let path = dir.join("faiss_index").join("index.db");
    let ingest = IngestService::new(
        FakePdfExtractor,
        embeddings.clone(),
        IndexStore::new(&path),
        ChunkPolicy::default(),
    );
    let answers = AnswerService::new(embeddings, chat.clone(), IndexStore::new(&path), 4, 0.3);
    router(WebState::new(ingest, answers))
}

#[derive(Clone)]
struct Plain;

impl EmbeddingProvider for Plain {
    fn model(&self) -> &str {
        MODEL
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        _task: EmbeddingTask,
    ) -> PipelineResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| BagOfWordsEmbedder::vector_for(t)).collect())
    }
}

/// `(field name, file name, content)` parts of a multipart form.
fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, file_name, content) in parts {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        match file_name {
            Some(file_name) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/pdf\r\n\r\n"
            )),
            None => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
            )),
        }
        body.push_str(content);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    multipart_request(body.into_bytes())
}

fn multipart_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/process")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn ask(question: &str) -> Request<Body> {
    let encoded: String = question
        .bytes()
        .map(|b| match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => (b as char).to_string(),
            b' ' => "+".to_string(),
            other => format!("%{other:02X}"),
        })
        .collect();
    Request::builder()
        .method("POST")
        .uri("/ask")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("question={encoded}")))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn index_page_renders_both_forms() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(dir.path(), Plain, &RecordingChat::replying("unused"));
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, html) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("action=\"/process\""));
    assert!(html.contains("action=\"/ask\""));
}

#[tokio::test]
async fn asking_before_processing_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let chat = RecordingChat::replying("unused");
    let app = build_app(dir.path(), Plain, &chat);
    let (status, html) = send(&app, ask("What color is the sky?")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(html.contains("index not found"));
    assert!(html.contains("value=\"What color is the sky?\""));
    assert!(chat.prompts().is_empty());
}

#[tokio::test]
async fn submitting_no_files_is_a_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_app(dir.path(), Plain, &RecordingChat::replying("unused"));
    // What a browser sends when the file picker is left empty.
    let (status, html) = send(&app, multipart(&[("pdf_docs", Some(""), "")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(html.contains("no documents were uploaded"));
    assert!(!dir.path().join("faiss_index").join("index.db").exists());
}

#[tokio::test]
async fn process_then_ask_answers_from_uploaded_pdfs() {
    let dir = tempfile::tempdir().unwrap();
    let chat = RecordingChat::replying("The sky is <b>blue</b>.");
    let app = build_app(dir.path(), Plain, &chat);

    let sky = format!("The sky is blue.{PAGE_BREAK}Clouds are white.");
    let (status, html) = send(
        &app,
        multipart(&[
            ("pdf_docs", Some("sky.pdf"), sky.as_str()),
            ("unrelated", None, "Grass is green."),
            ("pdf_docs", Some(""), ""),
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{html}");
    assert!(html.contains("Done: 1 document(s), 33 characters, 1 chunks indexed."));

    let (status, html) = send(&app, ask("What color is the sky?")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("The sky is &lt;b&gt;blue&lt;/b&gt;."));

    let prompts = chat.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("The sky is blue.Clouds are white."));
    assert!(!prompts[0].contains("Grass"));
}

#[tokio::test]
async fn unreadable_upload_keeps_previous_index() {
    let dir = tempfile::tempdir().unwrap();
    let chat = RecordingChat::replying("ok");
    let app = build_app(dir.path(), Plain, &chat);
    let (status, _) = send(&app, multipart(&[("pdf_docs", Some("a.pdf"), "Old text.")])).await;
    assert_eq!(status, StatusCode::OK);

    // File content that is not UTF-8 is unreadable to the fake extractor.
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"pdf_docs\"; filename=\"broken.pdf\"\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(&[0xff, 0xfe, 0x00]);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let (status, html) = send(&app, multipart_request(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(html.contains("broken.pdf"));

    let (status, _) = send(&app, ask("text")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(chat.prompts()[0].contains("Old text."));
}

#[tokio::test]
async fn actions_never_overlap() {
    let dir = tempfile::tempdir().unwrap();
    let embeddings = SlowEmbedder::new();
    let chat = RecordingChat::replying("ok");
    let app = build_app(dir.path(), embeddings.clone(), &chat);

    let (status, _) = send(
        &app,
        multipart(&[("pdf_docs", Some("sky.pdf"), "The sky is blue.")]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (first, second, rebuild) = tokio::join!(
        send(&app, ask("Why is the sky blue?")),
        send(&app, ask("What is blue?")),
        send(
            &app,
            multipart(&[("pdf_docs", Some("grass.pdf"), "Grass grows green.")])
        ),
    );
    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(rebuild.0, StatusCode::OK);
    assert_eq!(embeddings.peak(), 1);
    assert_eq!(chat.prompts().len(), 2);
}
