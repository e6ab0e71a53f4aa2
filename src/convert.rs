//! Tool entry points: image OCR and PDF OCR from a URL.
//!
//! [`OcrService`] owns the configuration and the pipeline seams. Each call
//! is independent: nothing is cached between calls and nothing is shared
//! except the read-only config and the HTTP client.
//!
//! Two layers:
//!
//! - [`OcrService::ocr_image`] / [`OcrService::ocr_pdf`] return
//!   `Result<String, OcrError>` for library callers.
//! - [`OcrService::ocr_image_url`] / [`OcrService::ocr_pdf_url`] collapse
//!   errors into the `Error performing ...` strings the tools reply with.

use crate::config::{OcrConfig, PageSelection};
use crate::error::{OcrError, ResourceKind};
use crate::output::{assemble_document, PageOutcome, PageResult, NO_TEXT_IN_IMAGE};
use crate::pipeline::encode::PAGE_MIME;
use crate::pipeline::input::{self, Fetcher, HttpFetcher};
use crate::pipeline::llm::{GeminiConnector, InferenceRequest, ModelConnector, VisionModel};
use crate::pipeline::render::{self, DocumentLoader, PageSource, PdfiumLoader};
use crate::pipeline::sniff;
use crate::prompts;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Prefix of every failed image tool reply.
pub const IMAGE_ERROR_PREFIX: &str = "Error performing OCR";

/// Prefix of every failed PDF tool reply.
pub const PDF_ERROR_PREFIX: &str = "Error performing PDF OCR";

/// OCR over remote images and PDFs.
///
/// # Example
/// ```rust,no_run
/// use gemini_ocr_mcp::{OcrConfig, OcrService};
///
/// # #[tokio::main]
/// # async fn main() {
/// let service = OcrService::new(OcrConfig::from_env());
/// let text = service.ocr_pdf_url("https://example.com/report.pdf", Some(1)).await;
/// println!("{text}");
/// # }
/// ```
#[derive(Clone)]
pub struct OcrService {
    config: Arc<OcrConfig>,
    fetcher: Arc<dyn Fetcher>,
    documents: Arc<dyn DocumentLoader>,
    connector: Arc<dyn ModelConnector>,
}

impl std::fmt::Debug for OcrService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OcrService {
    /// Service with the production seams: `reqwest`, pdfium and Gemini.
    pub fn new(config: OcrConfig) -> Self {
        let documents = PdfiumLoader::from_config(&config);
        Self {
            config: Arc::new(config),
            fetcher: Arc::new(HttpFetcher::new()),
            documents: Arc::new(documents),
            connector: Arc::new(GeminiConnector),
        }
    }

    pub fn with_fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    pub fn with_document_loader(mut self, loader: impl DocumentLoader + 'static) -> Self {
        self.documents = Arc::new(loader);
        self
    }

    pub fn with_connector(mut self, connector: impl ModelConnector + 'static) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    // ── Tool boundary ────────────────────────────────────────────────────

    /// Image tool reply: extracted text, the no-text sentinel, or an
    /// `Error performing OCR: ...` string. Never fails.
    pub async fn ocr_image_url(&self, image_url: &str) -> String {
        match self.ocr_image(image_url).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Image OCR failed for {}: {}", image_url, e);
                format!("{IMAGE_ERROR_PREFIX}: {e}")
            }
        }
    }

    /// PDF tool reply: page sections, the no-text sentinel, or an
    /// `Error performing PDF OCR: ...` string. Never fails.
    pub async fn ocr_pdf_url(&self, pdf_url: &str, page_number: Option<i64>) -> String {
        match self.ocr_pdf(pdf_url, page_number).await {
            Ok(text) => text,
            Err(e) => {
                warn!("PDF OCR failed for {}: {}", pdf_url, e);
                format!("{PDF_ERROR_PREFIX}: {e}")
            }
        }
    }

    // ── Image OCR ────────────────────────────────────────────────────────

    /// Fetch an image, identify its format and ask the model for its text.
    pub async fn ocr_image(&self, image_url: &str) -> Result<String, OcrError> {
        let start = Instant::now();
        info!("Image OCR: {}", image_url);

        input::validate_url(image_url)?;

        let bytes = self
            .fetcher
            .fetch(image_url, ResourceKind::Image, self.config.image_timeout())
            .await?;

        let mime_type = sniff::sniff_mime(&bytes)?;

        self.config.require_api_key()?;
        let model = self.connector.connect(&self.config)?;

        let text = model
            .recognize(InferenceRequest {
                prompt: prompts::IMAGE_OCR_PROMPT.to_string(),
                image: bytes,
                mime_type,
            })
            .await?;

        info!("Image OCR complete in {}ms", start.elapsed().as_millis());
        Ok(text.unwrap_or_else(|| NO_TEXT_IN_IMAGE.to_string()))
    }

    // ── PDF OCR ──────────────────────────────────────────────────────────

    /// Fetch a PDF and OCR the selected page, or every page in order.
    ///
    /// Page-level failures are embedded in the output; only failures that
    /// affect the whole document are returned as `Err`.
    pub async fn ocr_pdf(
        &self,
        pdf_url: &str,
        page_number: Option<i64>,
    ) -> Result<String, OcrError> {
        let start = Instant::now();
        info!("PDF OCR: {} (page: {:?})", pdf_url, page_number);

        input::validate_url(pdf_url)?;

        let bytes = self
            .fetcher
            .fetch(pdf_url, ResourceKind::Pdf, self.config.pdf_timeout())
            .await?;

        render::check_pdf_header(&bytes)?;
        let document = self.documents.open(bytes).await?;
        let total_pages = document.page_count();

        self.config.require_api_key()?;
        let model = self.connector.connect(&self.config)?;

        let selection = PageSelection::from_request(page_number, total_pages)?;
        let page_indices = selection.to_indices(total_pages);
        debug!("Selected {} of {} pages", page_indices.len(), total_pages);

        let pages = self
            .process_pages(document.as_ref(), model.as_ref(), &page_indices)
            .await;

        // The worker releases the document once the handle is gone.
        drop(document);

        let failed = pages.iter().filter(|p| p.is_failed()).count();
        info!(
            "PDF OCR complete: {} pages, {} failed, {}ms",
            pages.len(),
            failed,
            start.elapsed().as_millis()
        );

        Ok(assemble_document(&pages))
    }

    /// Run every selected page through render → recognise, in order.
    async fn process_pages(
        &self,
        document: &dyn PageSource,
        model: &dyn VisionModel,
        page_indices: &[usize],
    ) -> Vec<PageResult> {
        let mut results = Vec::with_capacity(page_indices.len());

        for (i, &idx) in page_indices.iter().enumerate() {
            if i > 0 && !self.config.page_delay.is_zero() {
                tokio::time::sleep(self.config.page_delay).await;
            }

            let page_num = idx + 1;
            let page_start = Instant::now();

            let outcome = match self.process_page(document, model, idx).await {
                Ok(Some(text)) if !text.trim().is_empty() => PageOutcome::Text(text),
                Ok(_) => {
                    debug!("Page {}: no text", page_num);
                    PageOutcome::Blank
                }
                Err(e) => {
                    warn!("Page {}: {}", page_num, e);
                    PageOutcome::Failed(e.to_string())
                }
            };

            let duration_ms = page_start.elapsed().as_millis() as u64;
            debug!("Page {} done in {}ms", page_num, duration_ms);

            results.push(PageResult {
                page_num,
                outcome,
                duration_ms,
            });
        }

        results
    }

    async fn process_page(
        &self,
        document: &dyn PageSource,
        model: &dyn VisionModel,
        idx: usize,
    ) -> Result<Option<String>, OcrError> {
        let png = document.render_page(idx).await?;
        model
            .recognize(InferenceRequest {
                prompt: prompts::page_ocr_prompt(idx + 1),
                image: png,
                mime_type: PAGE_MIME.to_string(),
            })
            .await
    }
}
