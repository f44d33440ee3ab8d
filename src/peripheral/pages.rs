use lazy_static::lazy_static;

/// page_num should be one-based
pub fn parseable_page_marker(page_num: u32) -> String {
    format!("PAGE_BREAK<{page_num}>")
}

lazy_static! {
    static ref PAGE_MARKER_PATTERN: regex::Regex =
        regex::Regex::new(r"PAGE_BREAK<(\d+)>").unwrap();
}

pub fn get_page_marker_pattern() -> &'static regex::Regex {
    &PAGE_MARKER_PATTERN
}

/// Splits pre-extracted text (eg. a .txt test fixture produced by the
/// note-text tool with --parsable-page-markers) back into per-page text.
/// Text without any marker is treated as a single page.
pub fn split_marked_text(text: &str) -> Vec<String> {
    let pages: Vec<String> = PAGE_MARKER_PATTERN
        .split(text)
        .map(|p| p.to_string())
        .filter(|p| !p.trim().is_empty())
        .collect();
    if pages.is_empty() {
        vec![text.to_string()]
    } else {
        pages
    }
}
