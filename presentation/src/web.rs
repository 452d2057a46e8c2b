//! The upload-and-ask web form.
//!
//! Two actions, as on the command line: `POST /process` rebuilds the index
//! from uploaded PDFs and `POST /ask` answers one question. A single lock
//! makes sure only one action runs at a time.

use crate::services;
use application::answer_service::AnswerService;
use application::ingest_service::IngestService;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use domain::error::{PipelineError, PipelineResult};
use domain::models::{Answer, BuildReport, PdfDocument};
use domain::ports::{ChatProvider, EmbeddingProvider, PageExtractor};
use html_escape::encode_text;
use infrastructure::config::Config;
use infrastructure::document_loader::MAX_DOCUMENT_BYTES;
use serde::Deserialize;
use shared::types::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Name of the file input on the form.
pub const UPLOAD_FIELD: &str = "pdf_docs";

pub struct WebState<X, E, C> {
    inner: Arc<WebInner<X, E, C>>,
}

impl<X, E, C> Clone for WebState<X, E, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct WebInner<X, E, C> {
    ingest: IngestService<X, E>,
    answers: AnswerService<E, C>,
    busy: Mutex<()>,
}

impl<X, E, C> WebState<X, E, C> {
    pub fn new(ingest: IngestService<X, E>, answers: AnswerService<E, C>) -> Self {
        Self {
            inner: Arc::new(WebInner {
                ingest,
                answers,
                busy: Mutex::new(()),
            }),
        }
    }
}

#[derive(Deserialize)]
pub struct AskForm {
    question: String,
}

/// What the page shows below the form.
#[derive(Debug, Default)]
pub struct PageView {
    pub question: String,
    pub notice: Option<Notice>,
    pub answer: Option<String>,
}

#[derive(Debug)]
pub enum Notice {
    Success(String),
    Error(String),
}

pub fn router<X, E, C>(state: WebState<X, E, C>) -> Router
where
    X: PageExtractor + Send + Sync + 'static,
    E: EmbeddingProvider + Send + Sync + 'static,
    C: ChatProvider + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(index))
        .route("/process", post(process::<X, E, C>))
        .route("/ask", post(ask::<X, E, C>))
        .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES as usize))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: &Config, bind: &str) -> Result<()> {
    let (ingest, answers) = services::build(config)?;
    let app = router(WebState::new(ingest, answers));

    let listener = TcpListener::bind(bind).await?;
    info!("Chat PDF listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

async fn index() -> Html<String> {
    Html(render_page(&PageView::default()))
}

async fn process<X, E, C>(
    State(state): State<WebState<X, E, C>>,
    mut multipart: Multipart,
) -> Response
where
    X: PageExtractor + Send + Sync + 'static,
    E: EmbeddingProvider + Send + Sync + 'static,
    C: ChatProvider + Send + Sync + 'static,
{
    let mut documents = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_page(StatusCode::BAD_REQUEST, String::new(), e.body_text()),
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return error_page(StatusCode::BAD_REQUEST, String::new(), e.body_text()),
        };
        // Browsers send one empty part when no file was chosen.
        if name.is_empty() && bytes.is_empty() {
            continue;
        }
        documents.push(PdfDocument::new(name, bytes.to_vec()));
    }

    let _guard = state.inner.busy.lock().await;
    match rebuild(&state, documents).await {
        Ok(report) => page(
            StatusCode::OK,
            PageView {
                notice: Some(Notice::Success(describe_build(&report))),
                ..PageView::default()
            },
        ),
        Err(e) => {
            warn!(error = %e, "processing failed");
            error_page(status_for(&e), String::new(), e.to_string())
        }
    }
}

/// Extraction parses every PDF and runs on the blocking pool; embedding and
/// persisting follow on the async side.
async fn rebuild<X, E, C>(
    state: &WebState<X, E, C>,
    documents: Vec<PdfDocument>,
) -> PipelineResult<BuildReport>
where
    X: PageExtractor + Send + Sync + 'static,
    E: EmbeddingProvider + Send + Sync + 'static,
    C: ChatProvider + Send + Sync + 'static,
{
    let count = documents.len();
    let inner = Arc::clone(&state.inner);
    let text = tokio::task::spawn_blocking(move || inner.ingest.extract(&documents))
        .await
        .map_err(|e| PipelineError::Io(std::io::Error::other(e)))??;
    state.inner.ingest.index_text(&text, count).await
}

async fn ask<X, E, C>(
    State(state): State<WebState<X, E, C>>,
    Form(form): Form<AskForm>,
) -> Response
where
    X: PageExtractor + Send + Sync + 'static,
    E: EmbeddingProvider + Send + Sync + 'static,
    C: ChatProvider + Send + Sync + 'static,
{
    let _guard = state.inner.busy.lock().await;
    match state.inner.answers.answer(&form.question).await {
        Ok(answer) => page(
            StatusCode::OK,
            PageView {
                question: form.question,
                notice: None,
                answer: Some(render_answer(&answer)),
            },
        ),
        Err(e) => {
            warn!(error = %e, "question failed");
            error_page(status_for(&e), form.question, e.to_string())
        }
    }
}

pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Extraction { .. }
        | PipelineError::EmptyInput(_)
        | PipelineError::EmptyQuestion => StatusCode::BAD_REQUEST,
        PipelineError::IndexNotFound(_) | PipelineError::EmbeddingModelMismatch { .. } => {
            StatusCode::CONFLICT
        }
        PipelineError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        PipelineError::InvalidChunkPolicy { .. }
        | PipelineError::DimensionMismatch { .. }
        | PipelineError::Storage(_)
        | PipelineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn page(status: StatusCode, view: PageView) -> Response {
    (status, Html(render_page(&view))).into_response()
}

fn error_page(status: StatusCode, question: String, message: String) -> Response {
    page(
        status,
        PageView {
            question,
            notice: Some(Notice::Error(message)),
            answer: None,
        },
    )
}

fn describe_build(report: &BuildReport) -> String {
    format!(
        "Done: {} document(s), {} characters, {} chunks indexed.",
        report.documents, report.characters, report.chunks
    )
}

fn render_answer(answer: &Answer) -> String {
    let mut html = format!(
        "<p><strong>Reply:</strong></p><pre class=\"reply\">{}</pre>",
        encode_text(&answer.text)
    );
    html.push_str(&format!(
        "<p class=\"meta\">Response time: {} ms</p>",
        answer.elapsed_ms
    ));
    html
}

/// Render the full page. Everything user- or model-supplied is escaped here;
/// `answer` is already-rendered markup from [`render_answer`].
pub fn render_page(view: &PageView) -> String {
    let notice = match &view.notice {
        Some(Notice::Success(msg)) => format!("<div class=\"success\">{}</div>", encode_text(msg)),
        Some(Notice::Error(msg)) => format!("<div class=\"error\">{}</div>", encode_text(msg)),
        None => String::new(),
    };
    let answer = view.answer.as_deref().unwrap_or_default();
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Chat PDF</title>
<style>
body {{ font-family: sans-serif; display: flex; margin: 0; }}
aside {{ width: 320px; padding: 1.5rem; background: #f0f2f6; min-height: 100vh; }}
main {{ flex: 1; padding: 1.5rem 3rem; }}
.success {{ background: #dff5e3; padding: .75rem; margin-top: 1rem; }}
.error {{ background: #fde2e1; padding: .75rem; margin-top: 1rem; }}
.reply {{ white-space: pre-wrap; font-family: inherit; }}
.meta {{ color: #777; font-size: .85rem; }}
input[type=text] {{ width: 100%; padding: .5rem; }}
</style>
</head>
<body>
<aside>
<h2>Menu:</h2>
<form action="/process" method="post" enctype="multipart/form-data">
<p>Upload your PDF File(s) and click on the Submit &amp; Process Button</p>
<input type="file" name="{field}" accept="application/pdf,.pdf" multiple>
<p><button type="submit">Submit &amp; Process</button></p>
</form>
</aside>
<main>
<h1>Chat with PDF using Gemini</h1>
<form action="/ask" method="post">
<label for="question">Ask a Question from the PDF Files</label>
<input type="text" id="question" name="question" value="{question}" autofocus>
</form>
{notice}
{answer}
</main>
</body>
</html>
"#,
        field = UPLOAD_FIELD,
        question = html_escape::encode_double_quoted_attribute(&view.question),
        notice = notice,
        answer = answer,
    )
}
