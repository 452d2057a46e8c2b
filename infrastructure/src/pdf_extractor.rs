//! Page-level PDF text extraction.
//!
//! `lopdf` is the primary parser because it exposes page boundaries. When it
//! cannot load a file at all, `pdf-extract` gets a second attempt; its output
//! has no page breaks, so the document comes back as a single page.

use domain::error::{PipelineError, PipelineResult};
use domain::ports::PageExtractor;
use lopdf::Document;
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl PageExtractor for PdfExtractor {
    fn extract_pages(&self, name: &str, bytes: &[u8]) -> PipelineResult<Vec<String>> {
        match Document::load_mem(bytes) {
            Ok(doc) => Ok(extract_with_lopdf(name, &doc)),
            Err(primary) => {
                warn!(document = name, error = %primary, "lopdf could not load PDF, trying pdf-extract");
                let text = pdf_extract::extract_text_from_mem(bytes).map_err(|fallback| {
                    PipelineError::Extraction {
                        document: name.to_string(),
                        reason: format!("{primary}; fallback: {fallback}"),
                    }
                })?;
                Ok(vec![text])
            }
        }
    }
}

fn extract_with_lopdf(name: &str, doc: &Document) -> Vec<String> {
    let pages = doc.get_pages();
    debug!(document = name, pages = pages.len(), "extracting pages");
    pages
        .keys()
        .map(|&page_number| match doc.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                // Image-only or undecodable pages count as blank.
                debug!(document = name, page = page_number, error = %e, "page has no extractable text");
                String::new()
            }
        })
        .collect()
}
