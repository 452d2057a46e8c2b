use domain::error::PipelineResult;
use domain::models::PdfDocument;
use domain::ports::PageExtractor;
use tracing::debug;

/// Flatten every page of every document, in document-then-page order, into one string.
pub fn extract_batch_text<X: PageExtractor>(
    extractor: &X,
    documents: &[PdfDocument],
) -> PipelineResult<String> {
    let mut text = String::new();
    for document in documents {
        let pages = extractor.extract_pages(&document.name, &document.bytes)?;
        debug!(document = %document.name, pages = pages.len(), "extracted");
        for page in pages {
            text.push_str(&page);
        }
    }
    Ok(text)
}
