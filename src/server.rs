//! MCP server: the two OCR tools, registered on an rmcp `ToolRouter`.
//!
//! The router is built once per [`OcrServer`] value; there is no global
//! registry. Tools always answer with text. Failures are rendered into the
//! reply string by [`OcrService`], so no call ever produces a protocol error.

use crate::convert::OcrService;
use crate::error::OcrError;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*, tool,
    tool_handler, tool_router, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Arguments of `ocr_image_url`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct OcrImageParams {
    /// URL of the image to perform OCR on (http:// or https://)
    pub image_url: String,
}

/// Arguments of `ocr_pdf_url`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct OcrPdfParams {
    /// URL of the PDF to perform OCR on (http:// or https://)
    pub pdf_url: String,
    /// Page to process, 1-indexed. Omit to process every page.
    #[serde(default)]
    pub page_number: Option<i64>,
}

/// The Gemini OCR MCP server.
#[derive(Clone)]
pub struct OcrServer {
    service: Arc<OcrService>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl OcrServer {
    pub fn new(service: OcrService) -> Self {
        Self {
            service: Arc::new(service),
            tool_router: Self::tool_router(),
        }
    }

    pub fn service(&self) -> &OcrService {
        &self.service
    }

    #[tool(
        description = "Performs OCR on an image from a URL using the Google Gemini API.

Returns the extracted text. If no text is found, returns \"No text found in the image.\" \
If an error occurs, returns an error message string."
    )]
    async fn ocr_image_url(&self, Parameters(params): Parameters<OcrImageParams>) -> String {
        self.service.ocr_image_url(&params.image_url).await
    }

    #[tool(
        description = "Performs OCR on a PDF from a URL using the Google Gemini API. \
Converts PDF pages to images and then performs OCR.

page_number is optional and 1-indexed; if omitted, all pages are processed. \
Each page's text is prefixed with '--- Page N ---'. If no text is found, returns \
\"No text found in the PDF.\" If an error occurs, returns an error message string."
    )]
    async fn ocr_pdf_url(&self, Parameters(params): Parameters<OcrPdfParams>) -> String {
        self.service
            .ocr_pdf_url(&params.pdf_url, params.page_number)
            .await
    }

    /// Names of the registered tools, in registration order.
    pub fn tool_names(&self) -> Vec<String> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect()
    }

    /// Serve over stdin/stdout until the client disconnects.
    pub async fn serve_stdio(self) -> Result<(), OcrError> {
        info!("Gemini OCR MCP server listening on stdio");
        let running = self
            .serve(rmcp::transport::stdio())
            .await
            .map_err(|e| OcrError::Transport(e.to_string()))?;

        running
            .waiting()
            .await
            .map_err(|e| OcrError::Transport(e.to_string()))?;

        info!("MCP client disconnected");
        Ok(())
    }
}

#[tool_handler]
impl ServerHandler for OcrServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Gemini OCR extracts text from images and PDFs fetched from http(s) URLs. \
                 Use ocr_image_url for images and ocr_pdf_url for PDFs."
                    .into(),
            ),
            ..Default::default()
        }
    }
}
