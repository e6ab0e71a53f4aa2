//! Instruction prompts sent alongside each image.
//!
//! Both prompts ask for a bare transcription. Keeping them here means unit
//! tests can inspect them directly without a live model.

/// Prompt for a standalone image.
pub const IMAGE_OCR_PROMPT: &str =
    "Please perform image OCR. Do not add any extra commentary, just the extracted text.";

/// Prompt for one rasterised PDF page (1-indexed `page_num`).
pub fn page_ocr_prompt(page_num: usize) -> String {
    format!(
        "Please perform OCR on this PDF page {page_num}. Extract all text content. \
         Do not add any extra commentary, just the extracted text."
    )
}
