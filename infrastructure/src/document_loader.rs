use domain::models::PdfDocument;
use rayon::prelude::*;
use shared::types::Result;
use shared::utils::is_pdf_file;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Same ceiling the upload form enforces.
pub const MAX_DOCUMENT_BYTES: u64 = 200 * 1024 * 1024;

/// Resolves command-line paths into an ordered batch of PDF documents.
/// Directories are walked in full; no subdirectory is skipped.
pub struct DocumentLoader {
    max_file_bytes: u64,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self {
            max_file_bytes: MAX_DOCUMENT_BYTES,
        }
    }

    /// Files are taken in the order given; directories contribute their PDFs
    /// sorted by path.
    pub fn collect_files(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for input in inputs {
            if input.is_dir() {
                let mut found = Vec::new();
                self.collect_files_recursive(input, &mut found)?;
                found.sort();
                files.extend(found);
            } else if input.is_file() {
                files.push(input.clone());
            } else {
                anyhow::bail!("no such file or directory: {}", input.display());
            }
        }
        Ok(files)
    }

    pub fn load(&self, inputs: &[PathBuf]) -> Result<Vec<PdfDocument>> {
        let files = self.collect_files(inputs)?;
        info!(files = files.len(), "loading documents");
        // `collect` on an indexed parallel iterator keeps input order.
        files
            .par_iter()
            .map(|path| self.read_document(path))
            .collect()
    }

    fn collect_files_recursive(&self, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                self.collect_files_recursive(&path, files)?;
            } else if is_pdf_file(&path) {
                files.push(path);
            }
        }
        Ok(())
    }

    fn read_document(&self, path: &Path) -> Result<PdfDocument> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let len = path.metadata()?.len();
        if len > self.max_file_bytes {
            anyhow::bail!(
                "{} is {} bytes, larger than the {} byte limit",
                path.display(),
                len,
                self.max_file_bytes
            );
        }
        let bytes = fs::read(path)?;
        debug!(document = %name, bytes = bytes.len(), "read document");
        Ok(PdfDocument::new(name, bytes))
    }
}
