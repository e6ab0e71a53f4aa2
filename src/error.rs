//! Error types for the gemini-ocr-mcp library.
//!
//! Every pipeline stage returns `Result<_, OcrError>`. Nothing is thrown
//! across the tool boundary: [`crate::convert::OcrService`] collapses an
//! `OcrError` into a display string at the outermost layer, and the PDF page
//! loop records per-page failures in [`crate::output::PageOutcome::Failed`]
//! instead of propagating them.
//!
//! [`ErrorKind`] is the coarse tag attached to each variant so callers and
//! tests can branch on the failure class without matching message text.

use std::fmt;
use thiserror::Error;

/// The remote resource a fetch was trying to retrieve.
///
/// Only used to word error messages ("Failed to fetch image from URL").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Image,
    Pdf,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Image => f.write_str("image"),
            ResourceKind::Pdf => f.write_str("PDF"),
        }
    }
}

/// Failure class of an [`OcrError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied an unusable argument (bad URL scheme).
    InvalidInput,
    /// Network or HTTP failure fetching the remote resource.
    FetchFailure,
    /// Bytes are not a decodable image or an openable PDF.
    UnsupportedFormat,
    /// Missing credential, bad settings, or pdfium unavailable.
    ConfigurationError,
    /// Requested PDF page does not exist.
    PageOutOfRange,
    /// A PDF page could not be rasterised.
    RenderFailure,
    /// The external OCR model call failed.
    InferenceFailure,
    /// Unexpected internal failure (worker thread gone, task panicked).
    Internal,
}

/// All errors produced by the OCR pipelines.
#[derive(Debug, Error)]
pub enum OcrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// URL does not start with `http://` or `https://`.
    #[error("Invalid URL format. URL must start with 'http://' or 'https://'")]
    InvalidUrl { url: String },

    // ── Fetch errors ──────────────────────────────────────────────────────
    /// Transport error or non-success HTTP status.
    #[error("Failed to fetch {resource} from URL: {reason}")]
    FetchFailed {
        resource: ResourceKind,
        url: String,
        reason: String,
    },

    /// The fetch did not complete within the configured timeout.
    #[error("Failed to fetch {resource} from URL: timed out after {secs}s")]
    FetchTimeout {
        resource: ResourceKind,
        url: String,
        secs: u64,
    },

    // ── Format errors ─────────────────────────────────────────────────────
    /// Bytes could not be identified or decoded as an image container.
    #[error("Invalid or unsupported image format: {detail}")]
    UnsupportedFormat { detail: String },

    /// Bytes could not be opened as a PDF document.
    #[error("Failed to open PDF: {detail}")]
    InvalidPdf { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// The API credential is absent from the environment.
    #[error("{var} environment variable not set.")]
    MissingApiKey { var: &'static str },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── PDF errors ────────────────────────────────────────────────────────
    /// Requested page lies outside `[1, total]`.
    #[error("Page number {page} is out of range. PDF has {total} pages.")]
    PageOutOfRange { page: i64, total: usize },

    /// pdfium returned an error for a specific page (1-indexed).
    #[error("Rasterisation failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    // ── Inference errors ──────────────────────────────────────────────────
    /// The model API returned an error.
    #[error("Inference request failed: {message}")]
    InferenceFailed { message: String },

    /// The model API did not answer within the configured timeout.
    #[error("Inference request timed out after {secs}s")]
    InferenceTimeout { secs: u64 },

    // ── Transport ─────────────────────────────────────────────────────────
    /// The MCP transport failed to start or terminated abnormally.
    #[error("MCP transport error: {0}")]
    Transport(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrError {
    /// The failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OcrError::InvalidUrl { .. } => ErrorKind::InvalidInput,
            OcrError::FetchFailed { .. } | OcrError::FetchTimeout { .. } => ErrorKind::FetchFailure,
            OcrError::UnsupportedFormat { .. } | OcrError::InvalidPdf { .. } => {
                ErrorKind::UnsupportedFormat
            }
            OcrError::MissingApiKey { .. }
            | OcrError::InvalidConfig(_)
            | OcrError::PdfiumBindingFailed(_) => ErrorKind::ConfigurationError,
            OcrError::PageOutOfRange { .. } => ErrorKind::PageOutOfRange,
            OcrError::RenderFailed { .. } => ErrorKind::RenderFailure,
            OcrError::InferenceFailed { .. } | OcrError::InferenceTimeout { .. } => {
                ErrorKind::InferenceFailure
            }
            OcrError::Transport(_) | OcrError::Internal(_) => ErrorKind::Internal,
        }
    }
}
