pub mod chunking;
pub mod error;
pub mod models;
pub mod ports;
pub mod prompt;

pub use error::{PipelineError, PipelineResult};
