//! Builds the production services from a [`Config`].

use application::answer_service::AnswerService;
use application::ingest_service::IngestService;
use infrastructure::config::Config;
use infrastructure::gemini_client::GeminiClient;
use infrastructure::index_store::IndexStore;
use infrastructure::pdf_extractor::PdfExtractor;
use shared::types::Result;

pub type Ingest = IngestService<PdfExtractor, GeminiClient>;
pub type Answers = AnswerService<GeminiClient, GeminiClient>;

pub fn ingest_service(config: &Config, client: &GeminiClient) -> Ingest {
    IngestService::new(
        PdfExtractor::new(),
        client.clone(),
        IndexStore::new(config.index_path()),
        config.chunk_policy,
    )
}

pub fn answer_service(config: &Config, client: &GeminiClient) -> Answers {
    AnswerService::new(
        client.clone(),
        client.clone(),
        IndexStore::new(config.index_path()),
        config.top_k,
        config.temperature,
    )
}

/// Both services, sharing one HTTP client.
pub fn build(config: &Config) -> Result<(Ingest, Answers)> {
    let client = GeminiClient::new(config)?;
    Ok((ingest_service(config, &client), answer_service(config, &client)))
}
