use anyhow::{anyhow, Context};
use domain::chunking::{ChunkPolicy, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use dotenvy::dotenv;
use shared::types::Result;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/embedding-001";
pub const DEFAULT_CHAT_MODEL: &str = "models/gemini-2.0-flash-lite";
pub const DEFAULT_INDEX_DIR: &str = "faiss_index";
pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

const INDEX_FILE: &str = "index.db";

/// Process-wide settings, built once at startup and handed to each service.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub index_dir: PathBuf,
    pub chunk_policy: ChunkPolicy,
    pub top_k: usize,
    pub temperature: f32,
    pub bind_addr: String,
    pub request_timeout: Duration,
}

impl Config {
    /// Read `.env` (if present) and the process environment.
    pub fn load() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let chunk_size = parse_or(&lookup, "CHAT_PDF_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        let overlap = parse_or(&lookup, "CHAT_PDF_CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?;
        let chunk_policy = ChunkPolicy::new(chunk_size, overlap)?;

        let top_k = parse_or(&lookup, "CHAT_PDF_TOP_K", DEFAULT_TOP_K)?;
        if top_k == 0 {
            return Err(anyhow!("CHAT_PDF_TOP_K must be at least 1"));
        }
        let temperature = parse_or(&lookup, "CHAT_PDF_TEMPERATURE", DEFAULT_TEMPERATURE)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(anyhow!(
                "CHAT_PDF_TEMPERATURE must be between 0.0 and 2.0, got {temperature}"
            ));
        }
        let timeout_secs = parse_or(&lookup, "CHAT_PDF_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        Ok(Self {
            api_key: lookup("GOOGLE_API_KEY").filter(|k| !k.trim().is_empty()),
            api_base: text("CHAT_PDF_API_BASE", DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            embedding_model: text("CHAT_PDF_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            chat_model: text("CHAT_PDF_CHAT_MODEL", DEFAULT_CHAT_MODEL),
            index_dir: PathBuf::from(text("CHAT_PDF_INDEX_DIR", DEFAULT_INDEX_DIR)),
            chunk_policy,
            top_k,
            temperature,
            bind_addr: text("CHAT_PDF_BIND", DEFAULT_BIND),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Fixed location of the persisted index.
    pub fn index_path(&self) -> PathBuf {
        self.index_dir.join(INDEX_FILE)
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("GOOGLE_API_KEY is not set (add it to the environment or .env)"))
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: '{raw}'")),
        None => Ok(default),
    }
}
