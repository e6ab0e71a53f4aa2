//! Hermetic tests for the two OCR tools.
//!
//! The network, pdfium and Gemini are replaced with in-memory fakes wired in
//! through `OcrService`'s builder methods, so these run without credentials
//! or a pdfium library.

use async_trait::async_trait;
use gemini_ocr_mcp::{
    DocumentLoader, ErrorKind, Fetcher, InferenceRequest, ModelConnector, OcrConfig, OcrError,
    OcrService, PageSource, ResourceKind, VisionModel,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_test::{assert_err, assert_ok};

const IMAGE_URL: &str = "https://example.com/scan.png";
const PDF_URL: &str = "https://example.com/report.pdf";

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Serves canned bodies by URL; unknown URLs fail like a 404.
#[derive(Default)]
struct MockFetcher {
    bodies: HashMap<String, Vec<u8>>,
    calls: Arc<AtomicUsize>,
}

impl MockFetcher {
    fn with(url: &str, body: Vec<u8>) -> Self {
        let mut f = Self::default();
        f.bodies.insert(url.to_string(), body);
        f
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(
        &self,
        url: &str,
        resource: ResourceKind,
        _timeout: Duration,
    ) -> Result<Vec<u8>, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| OcrError::FetchFailed {
                resource,
                url: url.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            })
    }
}

/// A page either renders to marker bytes `page-N` or fails.
#[derive(Clone)]
enum FakePage {
    Renders,
    Broken,
}

struct FakePages {
    pages: Vec<FakePage>,
}

#[async_trait]
impl PageSource for FakePages {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn render_page(&self, index: usize) -> Result<Vec<u8>, OcrError> {
        match self.pages.get(index) {
            Some(FakePage::Renders) => Ok(page_marker(index + 1)),
            Some(FakePage::Broken) => Err(OcrError::RenderFailed {
                page: index + 1,
                detail: "corrupt content stream".to_string(),
            }),
            None => Err(OcrError::Internal(format!("no page at index {index}"))),
        }
    }
}

struct FakeDocuments {
    pages: Vec<FakePage>,
}

impl FakeDocuments {
    fn renders(n: usize) -> Self {
        Self {
            pages: vec![FakePage::Renders; n],
        }
    }
}

#[async_trait]
impl DocumentLoader for FakeDocuments {
    async fn open(&self, _bytes: Vec<u8>) -> Result<Box<dyn PageSource>, OcrError> {
        Ok(Box::new(FakePages {
            pages: self.pages.clone(),
        }))
    }
}

/// Answers by image bytes; records every request it sees.
#[derive(Default)]
struct MockModel {
    answers: HashMap<Vec<u8>, Result<Option<String>, String>>,
    default_answer: Option<String>,
    seen: Mutex<Vec<(String, String, Instant)>>,
}

impl MockModel {
    fn answer(mut self, image: Vec<u8>, text: Option<&str>) -> Self {
        self.answers.insert(image, Ok(text.map(str::to_string)));
        self
    }

    fn fail_on(mut self, image: Vec<u8>, message: &str) -> Self {
        self.answers.insert(image, Err(message.to_string()));
        self
    }

    fn prompts(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|s| s.0.clone()).collect()
    }

    fn mime_types(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|s| s.1.clone()).collect()
    }

    fn call_times(&self) -> Vec<Instant> {
        self.seen.lock().unwrap().iter().map(|s| s.2).collect()
    }
}

#[async_trait]
impl VisionModel for MockModel {
    async fn recognize(&self, request: InferenceRequest) -> Result<Option<String>, OcrError> {
        self.seen.lock().unwrap().push((
            request.prompt.clone(),
            request.mime_type.clone(),
            Instant::now(),
        ));
        match self.answers.get(&request.image) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(message)) => Err(OcrError::InferenceFailed {
                message: message.clone(),
            }),
            None => Ok(self.default_answer.clone()),
        }
    }
}

struct MockConnector {
    model: Arc<MockModel>,
    connects: Arc<AtomicUsize>,
}

impl ModelConnector for MockConnector {
    fn connect(&self, _config: &OcrConfig) -> Result<Arc<dyn VisionModel>, OcrError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.model.clone())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn page_marker(page_num: usize) -> Vec<u8> {
    format!("page-{page_num}").into_bytes()
}

fn encoded(format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format)
        .expect("encode test image");
    buf
}

fn fake_pdf() -> Vec<u8> {
    b"%PDF-1.7\n% test document\n".to_vec()
}

fn config() -> OcrConfig {
    OcrConfig::builder()
        .api_key("test-key")
        .page_delay(Duration::ZERO)
        .build()
        .unwrap()
}

/// A service plus handles onto its fakes.
struct Harness {
    service: OcrService,
    model: Arc<MockModel>,
    fetches: Arc<AtomicUsize>,
    connects: Arc<AtomicUsize>,
}

fn harness(
    config: OcrConfig,
    fetcher: MockFetcher,
    documents: FakeDocuments,
    model: MockModel,
) -> Harness {
    let model = Arc::new(model);
    let fetches = fetcher.calls.clone();
    let connects = Arc::new(AtomicUsize::new(0));
    let service = OcrService::new(config)
        .with_fetcher(fetcher)
        .with_document_loader(documents)
        .with_connector(MockConnector {
            model: model.clone(),
            connects: connects.clone(),
        });
    Harness {
        service,
        model,
        fetches,
        connects,
    }
}

fn image_harness(body: Vec<u8>, model: MockModel) -> Harness {
    harness(
        config(),
        MockFetcher::with(IMAGE_URL, body),
        FakeDocuments::renders(0),
        model,
    )
}

fn pdf_harness(documents: FakeDocuments, model: MockModel) -> Harness {
    harness(
        config(),
        MockFetcher::with(PDF_URL, fake_pdf()),
        documents,
        model,
    )
}

fn three_page_model() -> MockModel {
    MockModel::default()
        .answer(page_marker(1), Some("alpha"))
        .answer(page_marker(2), Some("beta"))
        .answer(page_marker(3), Some("gamma"))
}

// ── URL validation & fetch ───────────────────────────────────────────────────

#[tokio::test]
async fn image_rejects_non_http_url_without_fetching() {
    let h = image_harness(encoded(ImageFormat::Png), MockModel::default());

    for url in ["ftp://example.com/a.png", "example.com/a.png", ""] {
        let reply = h.service.ocr_image_url(url).await;
        assert_eq!(
            reply,
            "Error performing OCR: Invalid URL format. URL must start with 'http://' or 'https://'"
        );
    }
    assert_eq!(h.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn pdf_rejects_non_http_url() {
    let h = pdf_harness(FakeDocuments::renders(1), MockModel::default());
    let reply = h.service.ocr_pdf_url("file:///tmp/report.pdf", None).await;
    assert!(reply.starts_with("Error performing PDF OCR: "), "got: {reply}");
    assert!(reply.contains("Invalid URL format"));
    assert_eq!(h.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fetch_failure_is_reported() {
    let h = image_harness(encoded(ImageFormat::Png), MockModel::default());
    let reply = h
        .service
        .ocr_image_url("https://example.com/missing.png")
        .await;
    assert_eq!(
        reply,
        "Error performing OCR: Failed to fetch image from URL: HTTP 404 Not Found"
    );

    let err = assert_err!(h.service.ocr_image("https://example.com/missing.png").await);
    assert_eq!(err.kind(), ErrorKind::FetchFailure);
}

// ── Image OCR ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn undecodable_image_is_unsupported() {
    let h = image_harness(b"<html>not an image</html>".to_vec(), MockModel::default());
    let reply = h.service.ocr_image_url(IMAGE_URL).await;
    assert!(reply.starts_with("Error performing OCR: "), "got: {reply}");
    assert!(reply.contains("Invalid or unsupported image format"));
    assert!(h.model.prompts().is_empty());
}

#[tokio::test]
async fn png_is_sent_as_image_png_with_image_prompt() {
    let png = encoded(ImageFormat::Png);
    let h = image_harness(
        png.clone(),
        MockModel::default().answer(png, Some("Hello, world")),
    );

    let text = assert_ok!(h.service.ocr_image(IMAGE_URL).await);
    assert_eq!(text, "Hello, world");
    assert_eq!(h.model.mime_types(), vec!["image/png"]);
    assert_eq!(
        h.model.prompts(),
        vec![gemini_ocr_mcp::prompts::IMAGE_OCR_PROMPT]
    );
}

#[tokio::test]
async fn webp_is_sent_as_image_webp() {
    let h = image_harness(
        encoded(ImageFormat::WebP),
        MockModel {
            default_answer: Some("text".into()),
            ..Default::default()
        },
    );
    assert_ok!(h.service.ocr_image(IMAGE_URL).await);
    assert_eq!(h.model.mime_types(), vec!["image/webp"]);
}

#[tokio::test]
async fn image_without_content_returns_sentinel() {
    let h = image_harness(encoded(ImageFormat::Png), MockModel::default());
    let reply = h.service.ocr_image_url(IMAGE_URL).await;
    assert_eq!(reply, "No text found in the image.");
}

#[tokio::test]
async fn image_missing_api_key_makes_no_inference_call() {
    let h = harness(
        OcrConfig::default(),
        MockFetcher::with(IMAGE_URL, encoded(ImageFormat::Png)),
        FakeDocuments::renders(0),
        MockModel::default(),
    );
    let reply = h.service.ocr_image_url(IMAGE_URL).await;
    assert_eq!(
        reply,
        "Error performing OCR: GEMINI_API_KEY environment variable not set."
    );
    assert_eq!(h.connects.load(Ordering::SeqCst), 0);
    assert!(h.model.prompts().is_empty());
}

#[tokio::test]
async fn image_inference_failure_is_reported() {
    let png = encoded(ImageFormat::Png);
    let h = image_harness(
        png.clone(),
        MockModel::default().fail_on(png, "quota exceeded"),
    );
    let reply = h.service.ocr_image_url(IMAGE_URL).await;
    assert_eq!(
        reply,
        "Error performing OCR: Inference request failed: quota exceeded"
    );
}

// ── PDF OCR ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn all_pages_in_ascending_order() {
    let h = pdf_harness(FakeDocuments::renders(3), three_page_model());
    let reply = h.service.ocr_pdf_url(PDF_URL, None).await;
    assert_eq!(
        reply,
        "--- Page 1 ---\nalpha\n\n--- Page 2 ---\nbeta\n\n--- Page 3 ---\ngamma"
    );
    assert_eq!(h.model.mime_types(), vec!["image/png"; 3]);
    assert!(h.model.prompts()[2].contains("PDF page 3"));
}

#[tokio::test]
async fn single_page_selection() {
    let h = pdf_harness(FakeDocuments::renders(3), three_page_model());
    let reply = h.service.ocr_pdf_url(PDF_URL, Some(2)).await;
    assert_eq!(reply, "--- Page 2 ---\nbeta");
    assert_eq!(
        h.model.prompts(),
        vec![gemini_ocr_mcp::prompts::page_ocr_prompt(2)]
    );
}

#[tokio::test]
async fn page_out_of_range_names_page_and_count() {
    let h = pdf_harness(FakeDocuments::renders(3), three_page_model());

    for page in [0, 4, -1] {
        let reply = h.service.ocr_pdf_url(PDF_URL, Some(page)).await;
        assert_eq!(
            reply,
            format!(
                "Error performing PDF OCR: Page number {page} is out of range. PDF has 3 pages."
            )
        );
    }
    assert!(h.model.prompts().is_empty());
}

#[tokio::test]
async fn all_blank_pages_return_sentinel() {
    let model = MockModel::default()
        .answer(page_marker(1), Some("   \n"))
        .answer(page_marker(2), None);
    let h = pdf_harness(FakeDocuments::renders(2), model);
    let reply = h.service.ocr_pdf_url(PDF_URL, None).await;
    assert_eq!(reply, "No text found in the PDF.");
}

#[tokio::test]
async fn blank_page_is_skipped_silently() {
    let model = MockModel::default()
        .answer(page_marker(1), Some("first"))
        .answer(page_marker(2), Some(""))
        .answer(page_marker(3), Some("third\n"));
    let h = pdf_harness(FakeDocuments::renders(3), model);
    let reply = h.service.ocr_pdf_url(PDF_URL, None).await;
    // Page text is kept untrimmed.
    assert_eq!(reply, "--- Page 1 ---\nfirst\n\n--- Page 3 ---\nthird\n");
}

#[tokio::test]
async fn render_failure_is_embedded_and_loop_continues() {
    let documents = FakeDocuments {
        pages: vec![FakePage::Renders, FakePage::Broken, FakePage::Renders],
    };
    let h = pdf_harness(documents, three_page_model());
    let reply = h.service.ocr_pdf_url(PDF_URL, None).await;

    let sections: Vec<&str> = reply.split("\n\n").collect();
    assert_eq!(sections.len(), 3, "got: {reply}");
    assert_eq!(sections[0], "--- Page 1 ---\nalpha");
    assert!(sections[1].starts_with("--- Page 2 ---\nError processing page 2: "));
    assert!(sections[1].contains("corrupt content stream"));
    assert_eq!(sections[2], "--- Page 3 ---\ngamma");

    // The broken page never reaches the model.
    assert_eq!(h.model.prompts().len(), 2);
}

#[tokio::test]
async fn inference_failure_is_embedded() {
    let model = MockModel::default()
        .answer(page_marker(1), Some("ok"))
        .fail_on(page_marker(2), "503 Service Unavailable");
    let h = pdf_harness(FakeDocuments::renders(2), model);
    let reply = h.service.ocr_pdf_url(PDF_URL, None).await;
    assert_eq!(
        reply,
        "--- Page 1 ---\nok\n\n--- Page 2 ---\nError processing page 2: \
         Inference request failed: 503 Service Unavailable"
    );
}

#[tokio::test]
async fn failed_pages_count_as_sections() {
    let documents = FakeDocuments {
        pages: vec![FakePage::Broken],
    };
    let h = pdf_harness(documents, MockModel::default());
    let reply = h.service.ocr_pdf_url(PDF_URL, None).await;
    assert!(reply.starts_with("--- Page 1 ---\nError processing page 1: "));
}

#[tokio::test]
async fn non_pdf_body_fails_to_open() {
    let h = harness(
        config(),
        MockFetcher::with(PDF_URL, b"<!DOCTYPE html><p>moved</p>".to_vec()),
        FakeDocuments::renders(3),
        MockModel::default(),
    );
    let reply = h.service.ocr_pdf_url(PDF_URL, None).await;
    assert!(
        reply.starts_with("Error performing PDF OCR: Failed to open PDF:"),
        "got: {reply}"
    );

    let err = assert_err!(h.service.ocr_pdf(PDF_URL, None).await);
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
}

#[tokio::test]
async fn pdf_missing_api_key_makes_no_inference_call() {
    let h = harness(
        OcrConfig::builder().page_delay(Duration::ZERO).build().unwrap(),
        MockFetcher::with(PDF_URL, fake_pdf()),
        FakeDocuments::renders(2),
        three_page_model(),
    );
    let reply = h.service.ocr_pdf_url(PDF_URL, None).await;
    assert_eq!(
        reply,
        "Error performing PDF OCR: GEMINI_API_KEY environment variable not set."
    );
    assert_eq!(h.connects.load(Ordering::SeqCst), 0);
    assert!(h.model.prompts().is_empty());
}

#[tokio::test]
async fn pages_are_paced() {
    let delay = Duration::from_millis(40);
    let config = OcrConfig::builder()
        .api_key("test-key")
        .page_delay(delay)
        .build()
        .unwrap();
    let h = harness(
        config,
        MockFetcher::with(PDF_URL, fake_pdf()),
        FakeDocuments::renders(3),
        three_page_model(),
    );

    let start = Instant::now();
    assert_ok!(h.service.ocr_pdf(PDF_URL, None).await);
    assert!(start.elapsed() >= delay * 2);

    let times = h.model.call_times();
    assert_eq!(times.len(), 3);
    for pair in times.windows(2) {
        assert!(pair[1].duration_since(pair[0]) >= delay);
    }
}

#[tokio::test]
async fn single_page_is_not_delayed() {
    let config = OcrConfig::builder()
        .api_key("test-key")
        .page_delay(Duration::from_secs(5))
        .build()
        .unwrap();
    let h = harness(
        config,
        MockFetcher::with(PDF_URL, fake_pdf()),
        FakeDocuments::renders(3),
        three_page_model(),
    );

    let start = Instant::now();
    let reply = h.service.ocr_pdf_url(PDF_URL, Some(3)).await;
    assert_eq!(reply, "--- Page 3 ---\ngamma");
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn overlapping_pdf_calls_interleave() {
    let delay = Duration::from_millis(100);
    let config = OcrConfig::builder()
        .api_key("test-key")
        .page_delay(delay)
        .build()
        .unwrap();
    let second_url = "https://example.com/other.pdf";
    let mut fetcher = MockFetcher::with(PDF_URL, fake_pdf());
    fetcher.bodies.insert(second_url.to_string(), fake_pdf());
    let h = harness(config, fetcher, FakeDocuments::renders(3), three_page_model());

    let start = Instant::now();
    let (a, b) = tokio::join!(
        h.service.ocr_pdf_url(PDF_URL, None),
        h.service.ocr_pdf_url(second_url, None),
    );
    let elapsed = start.elapsed();

    let expected = "--- Page 1 ---\nalpha\n\n--- Page 2 ---\nbeta\n\n--- Page 3 ---\ngamma";
    assert_eq!(a, expected);
    assert_eq!(b, expected);

    // Both documents reach page 1 before either moves on.
    let prompts = h.model.prompts();
    assert_eq!(prompts.len(), 6);
    assert!(prompts[0].contains("PDF page 1."));
    assert!(prompts[1].contains("PDF page 1."));

    // Run one after the other, the two calls would need four delays.
    assert!(elapsed < delay * 4, "calls were serialised: {elapsed:?}");
}
