//! PDF text extraction

use std::path::Path;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// Text used in place of an unreadable document
pub const PLACEHOLDER_TEXT: &str =
    "No readable text was extracted. The uploaded PDF may be a scanned image or a protected file.";

/// Extracts plain text from a stored document.
///
/// Implementations are synchronous and may be CPU heavy; the pipeline runs
/// them on the blocking thread pool.
pub trait TextExtractor: Send + Sync {
    /// Extract text from the file at `path`
    fn extract(&self, path: &Path) -> Result<String>;

    /// Extractor name for logging
    fn name(&self) -> &str;
}

/// PDF extractor backed by `pdf-extract`, falling back to `lopdf`
pub struct PdfParser {
    timeout: Duration,
}

impl PdfParser {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Extract per-page text, bounded by the configured timeout
    fn extract_pages_with_timeout(&self, filename: &str, data: Arc<Vec<u8>>) -> Result<Vec<String>> {
        let (tx, rx) = mpsc::channel();
        let worker_data = Arc::clone(&data);

        // pdf-extract can hang on pathological font tables; run it on its own thread
        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem_by_pages(&worker_data);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(pages)) => {
                let _ = handle.join();
                Ok(pages)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                tracing::warn!("[{}] pdf-extract failed: {}, trying lopdf fallback", filename, e);
                Self::extract_pages_fallback(filename, &data)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!(
                    "[{}] pdf-extract timed out after {}s, trying lopdf fallback",
                    filename,
                    self.timeout.as_secs()
                );
                Self::extract_pages_fallback(filename, &data)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                tracing::error!("[{}] pdf-extract thread crashed, trying lopdf fallback", filename);
                Self::extract_pages_fallback(filename, &data)
            }
        }
    }

    /// Fallback extraction using lopdf directly
    fn extract_pages_fallback(filename: &str, data: &[u8]) -> Result<Vec<String>> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::extraction(filename, format!("Failed to load PDF: {}", e)))?;

        let pages = doc
            .get_pages()
            .keys()
            .map(|page_num| doc.extract_text(&[*page_num]).unwrap_or_default())
            .collect();

        Ok(pages)
    }
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for PdfParser {
    fn extract(&self, path: &Path) -> Result<String> {
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("document.pdf")
            .to_string();

        let data = std::fs::read(path)
            .map_err(|e| Error::extraction(&filename, format!("Failed to read file: {}", e)))?;

        let pages = self.extract_pages_with_timeout(&filename, Arc::new(data))?;
        let combined = combine_pages(&pages);

        if combined.is_empty() {
            return Err(Error::extraction(filename, "No text content could be extracted from PDF"));
        }

        Ok(combined)
    }

    fn name(&self) -> &str {
        "pdf-extract"
    }
}

/// Tag each page with its number and join them; empty input yields ""
pub fn combine_pages(pages: &[String]) -> String {
    let any_text = pages.iter().any(|p| !clean_page_text(p).is_empty());
    if !any_text {
        return String::new();
    }

    pages
        .iter()
        .enumerate()
        .map(|(idx, page)| format!("[Page {}]\n{}", idx + 1, clean_page_text(page)))
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string()
}

/// Normalise ligatures and typographic punctuation, drop NULs and blank lines
fn clean_page_text(text: &str) -> String {
    text.replace('\0', "")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace('\u{00A0}', " ")
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
