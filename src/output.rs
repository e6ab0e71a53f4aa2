//! Per-page results and final document assembly for PDF OCR.

/// Returned by the image tool when the model produced no content.
pub const NO_TEXT_IN_IMAGE: &str = "No text found in the image.";

/// Returned by the PDF tool when no page produced a section.
pub const NO_TEXT_IN_PDF: &str = "No text found in the PDF.";

/// What happened to a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The model returned non-blank text (kept verbatim, untrimmed).
    Text(String),
    /// The model returned nothing, or only whitespace.
    Blank,
    /// Rendering or inference failed; holds the error message.
    Failed(String),
}

/// The OCR result for one page.
#[derive(Debug, Clone)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    pub outcome: PageOutcome,
    /// Wall-clock time spent rendering and recognising this page.
    pub duration_ms: u64,
}

impl PageResult {
    /// Render the page as a `--- Page N ---` section.
    ///
    /// Blank pages have no section.
    pub fn section(&self) -> Option<String> {
        let n = self.page_num;
        match &self.outcome {
            PageOutcome::Text(text) => Some(format!("--- Page {n} ---\n{text}")),
            PageOutcome::Blank => None,
            PageOutcome::Failed(message) => Some(format!(
                "--- Page {n} ---\nError processing page {n}: {message}"
            )),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, PageOutcome::Failed(_))
    }
}

/// Join page sections with blank lines, in the order given.
///
/// Returns [`NO_TEXT_IN_PDF`] when no page produced a section.
pub fn assemble_document(pages: &[PageResult]) -> String {
    let sections: Vec<String> = pages.iter().filter_map(PageResult::section).collect();
    if sections.is_empty() {
        NO_TEXT_IN_PDF.to_string()
    } else {
        sections.join("\n\n")
    }
}
