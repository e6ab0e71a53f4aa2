//! # gemini-ocr-mcp
//!
//! An MCP server that performs OCR on remote images and PDFs with Google
//! Gemini vision models.
//!
//! Two tools are exposed:
//!
//! - `ocr_image_url(image_url)`: fetch an image and return its text
//! - `ocr_pdf_url(pdf_url, page_number?)`: fetch a PDF, rasterise the
//!   selected page (or all pages) and return the text of each page under a
//!   `--- Page N ---` header
//!
//! Both always answer with a string. Failures are reported as
//! `Error performing OCR: ...` / `Error performing PDF OCR: ...`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image URL                         PDF URL
//!  │                                 │
//!  ├─ 1. Fetch   reqwest, 60s        ├─ 1. Fetch   reqwest, 120s
//!  ├─ 2. Sniff   format → MIME       ├─ 2. Open    pdfium (blocking worker)
//!  └─ 3. Gemini  one call            ├─ 3. Select  page_number or all
//!                                    └─ 4. Loop    render PNG → Gemini,
//!                                                  sequential, paced
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gemini_ocr_mcp::{OcrConfig, OcrServer, OcrService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // GEMINI_API_KEY, GEMINI_MODEL and PDFIUM_LIB_PATH are read here.
//!     let service = OcrService::new(OcrConfig::from_env());
//!     OcrServer::new(service).serve_stdio().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `gemini-ocr-mcp` binary (clap + anyhow + tracing-subscriber + dotenvy) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OcrConfig, OcrConfigBuilder, PageSelection};
pub use convert::OcrService;
pub use error::{ErrorKind, OcrError, ResourceKind};
pub use output::{PageOutcome, PageResult};
pub use pipeline::input::{Fetcher, HttpFetcher};
pub use pipeline::llm::{GeminiConnector, InferenceRequest, ModelConnector, VisionModel};
pub use pipeline::render::{DocumentLoader, PageSource, PdfiumLoader};
pub use server::OcrServer;
