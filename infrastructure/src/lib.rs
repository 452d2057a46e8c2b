pub mod config;
pub mod document_loader;
pub mod embedder;
pub mod gemini_client;
pub mod index_store;
pub mod pdf_extractor;
pub mod search;
