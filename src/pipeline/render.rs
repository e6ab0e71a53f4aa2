//! PDF rasterisation: open a document from bytes and render pages to PNG.
//!
//! ## One pdfium worker per process
//!
//! With the `thread_safe` feature, `pdfium-render` serialises every pdfium
//! call behind a process-global lock that a `Pdfium` instance holds for its
//! whole lifetime. A second `Pdfium` therefore blocks until the first is
//! dropped. [`PdfiumWorker`] binds pdfium exactly once on a dedicated thread
//! and owns every open document. Tool calls send it open/render/close
//! commands over a channel, so concurrent PDF calls interleave page by
//! page and the inference calls between renders never touch pdfium.
//!
//! Dropping a [`PdfiumDocument`] handle closes its document on the worker,
//! whether the call succeeded or not.

use crate::config::OcrConfig;
use crate::error::OcrError;
use crate::pipeline::encode;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// How far into the file the `%PDF` marker may appear.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// An opened, paged document that can rasterise its pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Render the page at 0-indexed `index` and return PNG bytes.
    async fn render_page(&self, index: usize) -> Result<Vec<u8>, OcrError>;
}

/// Opens PDF bytes as a [`PageSource`].
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn PageSource>, OcrError>;
}

/// Reject bytes that carry no `%PDF` marker near the start of the file.
///
/// Gives callers a clear message instead of an opaque pdfium load error.
pub fn check_pdf_header(bytes: &[u8]) -> Result<(), OcrError> {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    if window.windows(4).any(|w| w == b"%PDF") {
        return Ok(());
    }

    let magic: Vec<u8> = bytes.iter().take(4).copied().collect();
    Err(OcrError::InvalidPdf {
        detail: format!("not a PDF document (first bytes: {magic:?})"),
    })
}

/// [`DocumentLoader`] backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumLoader {
    lib_path: Option<PathBuf>,
    scale: f32,
}

impl PdfiumLoader {
    pub fn new(lib_path: Option<PathBuf>, scale: f32) -> Self {
        Self { lib_path, scale }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.pdfium_lib_path.clone(), config.render_scale)
    }
}

#[async_trait]
impl DocumentLoader for PdfiumLoader {
    async fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn PageSource>, OcrError> {
        let worker = PdfiumWorker::global(self.lib_path.as_deref());
        let document = worker.open(bytes, self.scale).await?;
        Ok(Box::new(document))
    }
}

// ── Worker ───────────────────────────────────────────────────────────────

type DocumentId = u64;

enum Command {
    Open {
        bytes: Vec<u8>,
        scale: f32,
        reply: oneshot::Sender<Result<(DocumentId, usize), OcrError>>,
    },
    Render {
        id: DocumentId,
        index: usize,
        reply: oneshot::Sender<Result<Vec<u8>, OcrError>>,
    },
    Close {
        id: DocumentId,
    },
}

/// Handle to the thread that owns the pdfium bindings and open documents.
#[derive(Debug, Clone)]
pub struct PdfiumWorker {
    commands: mpsc::UnboundedSender<Command>,
}

impl PdfiumWorker {
    /// The process-wide worker, started on first use.
    ///
    /// `lib_path` only matters for the call that starts the worker.
    pub fn global(lib_path: Option<&Path>) -> &'static PdfiumWorker {
        static WORKER: OnceLock<PdfiumWorker> = OnceLock::new();
        WORKER.get_or_init(|| PdfiumWorker::spawn(lib_path.map(Path::to_path_buf)))
    }

    /// Start a worker thread that binds pdfium from `lib_path`.
    pub fn spawn(lib_path: Option<PathBuf>) -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        let spawned = std::thread::Builder::new()
            .name("pdfium-worker".into())
            .spawn(move || run_worker(lib_path, inbox));
        if let Err(e) = spawned {
            // The receiver is gone, so every command reports the worker as stopped.
            error!("Failed to start pdfium worker thread: {}", e);
        }
        Self { commands }
    }

    /// Load `bytes` as a PDF rendered at `scale`.
    pub async fn open(&self, bytes: Vec<u8>, scale: f32) -> Result<PdfiumDocument, OcrError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Open {
            bytes,
            scale,
            reply,
        })?;

        let (id, page_count) = response.await.map_err(|_| worker_stopped())??;
        Ok(PdfiumDocument {
            id,
            page_count,
            worker: self.clone(),
        })
    }

    fn send(&self, command: Command) -> Result<(), OcrError> {
        self.commands.send(command).map_err(|_| worker_stopped())
    }
}

fn worker_stopped() -> OcrError {
    OcrError::Internal("pdfium worker is no longer running".into())
}

/// A document loaded on a [`PdfiumWorker`].
#[derive(Debug)]
pub struct PdfiumDocument {
    id: DocumentId,
    page_count: usize,
    worker: PdfiumWorker,
}

#[async_trait]
impl PageSource for PdfiumDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    async fn render_page(&self, index: usize) -> Result<Vec<u8>, OcrError> {
        let (reply, response) = oneshot::channel();
        self.worker.send(Command::Render {
            id: self.id,
            index,
            reply,
        })?;
        response.await.map_err(|_| worker_stopped())?
    }
}

impl Drop for PdfiumDocument {
    fn drop(&mut self) {
        let _ = self.worker.send(Command::Close { id: self.id });
    }
}

/// A loaded document and the scale its pages are rendered at.
struct OpenDocument<'a> {
    document: PdfDocument<'a>,
    scale: f32,
}

/// Worker loop. Runs until every [`PdfiumWorker`] handle is dropped.
fn run_worker(lib_path: Option<PathBuf>, mut inbox: mpsc::UnboundedReceiver<Command>) {
    let pdfium = bind_pdfium(lib_path.as_deref());
    match &pdfium {
        Ok(_) => info!("pdfium bound"),
        Err(e) => warn!("pdfium unavailable: {}", e),
    }

    let mut documents: HashMap<DocumentId, OpenDocument<'_>> = HashMap::new();
    let mut next_id: DocumentId = 0;

    while let Some(command) = inbox.blocking_recv() {
        match command {
            Command::Open {
                bytes,
                scale,
                reply,
            } => {
                let loaded = match &pdfium {
                    Ok(pdfium) => {
                        pdfium
                            .load_pdf_from_byte_vec(bytes, None)
                            .map_err(|e| OcrError::InvalidPdf {
                                detail: format!("{:?}", e),
                            })
                    }
                    Err(detail) => Err(OcrError::PdfiumBindingFailed(detail.clone())),
                };

                let result = loaded.map(|document| {
                    let id = next_id;
                    next_id += 1;
                    let page_count = document.pages().len() as usize;
                    info!("PDF {} loaded: {} pages", id, page_count);
                    documents.insert(id, OpenDocument { document, scale });
                    (id, page_count)
                });

                if let Err(Ok((id, _))) = reply.send(result) {
                    // Caller went away before the reply.
                    documents.remove(&id);
                }
            }
            Command::Render { id, index, reply } => {
                let result = match documents.get(&id) {
                    Some(open) => render_page_blocking(open, index),
                    None => Err(OcrError::Internal(format!("PDF {id} is not open"))),
                };
                let _ = reply.send(result);
            }
            Command::Close { id } => {
                if documents.remove(&id).is_some() {
                    debug!("PDF {} released", id);
                }
            }
        }
    }
}

/// Bind to pdfium: explicit path first, then the working directory, then
/// the system library.
fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, String> {
    let bindings = match lib_path {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| format!("{:?}", e))?;

    Ok(Pdfium::new(bindings))
}

/// Rasterise one page (0-indexed) and encode it as PNG.
fn render_page_blocking(open: &OpenDocument<'_>, index: usize) -> Result<Vec<u8>, OcrError> {
    let page_num = index + 1;
    let render_failed = |detail: String| OcrError::RenderFailed {
        page: page_num,
        detail,
    };

    let page_index =
        u16::try_from(index).map_err(|_| render_failed(format!("page index {index} too large")))?;
    let page = open
        .document
        .pages()
        .get(page_index)
        .map_err(|e| render_failed(format!("{:?}", e)))?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(open.scale);
    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| render_failed(format!("{:?}", e)))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page_num,
        image.width(),
        image.height()
    );

    encode::encode_page(&image).map_err(|e| render_failed(format!("PNG encoding failed: {e}")))
}
