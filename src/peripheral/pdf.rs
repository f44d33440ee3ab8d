use std::path::Path;

use crate::util::basic::SError;

/// Extracts the text of every page, in order.
pub fn get_all_pages_text_from_path(path: &Path) -> Result<Vec<String>, SError> {
    pdf_extract::extract_text_by_pages(path)
        .map_err(|e| format!("Failed to extract text from {:?}: {}", path, e))
}

pub fn get_all_pages_text_from_mem(buf: &[u8]) -> Result<Vec<String>, SError> {
    pdf_extract::extract_text_from_mem_by_pages(buf)
        .map_err(|e| format!("Failed to extract text from PDF data: {}", e))
}
