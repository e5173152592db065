//! Page-segmented PDF text extraction.

use std::path::Path;

use medrag_core::error::{Error, Result};
use tracing::{debug, warn};

/// Extract the text of every page, in page order. Pages whose text cannot be
/// decoded come back empty so page numbers stay aligned with indices.
pub fn extract_pages(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(Error::MissingInput { path: path.to_path_buf(), reason: "file not found".into() });
    }
    let doc = lopdf::Document::load(path)
        .map_err(|e| Error::MissingInput { path: path.to_path_buf(), reason: e.to_string() })?;
    let pages = doc.get_pages();
    debug!(path = %path.display(), pages = pages.len(), "extracting pdf text");
    let mut out = Vec::with_capacity(pages.len());
    for &number in pages.keys() {
        match doc.extract_text(&[number]) {
            Ok(text) => out.push(text),
            Err(e) => {
                warn!(path = %path.display(), page = number, error = %e, "could not extract page text");
                out.push(String::new());
            }
        }
    }
    Ok(out)
}
