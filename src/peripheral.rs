pub mod pages;
#[cfg(feature = "pdf_parse")]
pub mod pdf;
