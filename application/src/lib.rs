pub mod answer_service;
pub mod extraction;
pub mod ingest_service;
