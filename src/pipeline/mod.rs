//! Pipeline stages shared by the image and PDF tools.
//!
//! ## Data Flow
//!
//! ```text
//! image:  input ──▶ sniff ─────────────────────▶ llm
//!         (fetch)   (format → MIME)              (Gemini)
//!
//! PDF:    input ──▶ render ──▶ encode ──▶ llm   (per page, sequential)
//!         (fetch)   (pdfium)   (PNG)     (Gemini)
//! ```
//!
//! 1. [`input`]  — URL validation and the `Fetcher` seam over `reqwest`
//! 2. [`sniff`]  — identify the image container and resolve its MIME type
//! 3. [`render`] — open a PDF on a blocking worker and rasterise pages
//! 4. [`encode`] — PNG-encode rendered pages
//! 5. [`llm`]    — the inference seam and its edgequake-llm backend

pub mod encode;
pub mod input;
pub mod llm;
pub mod render;
pub mod sniff;
