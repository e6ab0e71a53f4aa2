//! CLI binary for gemini-ocr-mcp.
//!
//! By default runs the MCP server on stdio. The `image` and `pdf`
//! subcommands run a single OCR call and print the tool reply to stdout,
//! which is handy for checking credentials and pdfium setup by hand.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gemini_ocr_mcp::{OcrConfig, OcrConfigBuilder, OcrServer, OcrService};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENVIRONMENT:
  GEMINI_API_KEY    Google Gemini API key (required for every OCR call)
  GEMINI_MODEL      Gemini model ID (default: gemini-2.5-flash-preview-05-20)
  PDFIUM_LIB_PATH   Path to an existing libpdfium shared library
  RUST_LOG          Log filter; overrides -v / -q

  A .env file in the working directory is loaded at startup and its values
  take precedence over variables already set in the environment.

MCP CLIENT CONFIG:
  {
    "mcpServers": {
      "gemini-ocr": {
        "command": "gemini-ocr-mcp",
        "env": { "GEMINI_API_KEY": "..." }
      }
    }
  }

Logs are written to stderr; stdout carries the MCP protocol.
"#;

/// MCP server exposing image and PDF OCR tools backed by Google Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "gemini-ocr-mcp",
    version,
    about = "MCP server exposing image and PDF OCR tools backed by Google Gemini",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Gemini model ID.
    #[arg(long, global = true, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Pause between consecutive PDF pages, in milliseconds.
    #[arg(long, global = true, env = "GEMINI_OCR_PAGE_DELAY_MS")]
    page_delay_ms: Option<u64>,

    /// Image download timeout in seconds.
    #[arg(long, global = true, env = "GEMINI_OCR_IMAGE_TIMEOUT")]
    image_timeout: Option<u64>,

    /// PDF download timeout in seconds.
    #[arg(long, global = true, env = "GEMINI_OCR_PDF_TIMEOUT")]
    pdf_timeout: Option<u64>,

    /// Per-call Gemini timeout in seconds.
    #[arg(long, global = true, env = "GEMINI_OCR_INFERENCE_TIMEOUT")]
    inference_timeout: Option<u64>,

    /// PDF rasterisation scale (0.5–8.0).
    #[arg(long, global = true, env = "GEMINI_OCR_RENDER_SCALE")]
    render_scale: Option<f32>,

    /// Path to the pdfium shared library.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all logs except errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server on stdio (default).
    Serve,
    /// OCR a single image URL and print the text.
    Image {
        /// http(s) URL of the image.
        url: String,
    },
    /// OCR a PDF URL and print the page sections.
    Pdf {
        /// http(s) URL of the PDF.
        url: String,
        /// 1-indexed page to process; all pages when omitted.
        #[arg(long, allow_negative_numbers = true)]
        page: Option<i64>,
    },
}

impl Cli {
    /// Environment config with command-line overrides applied.
    fn build_config(&self) -> Result<OcrConfig> {
        let mut builder = OcrConfigBuilder::from_config(OcrConfig::from_env());

        if let Some(ref model) = self.model {
            builder = builder.model(model);
        }
        if let Some(ms) = self.page_delay_ms {
            builder = builder.page_delay(Duration::from_millis(ms));
        }
        if let Some(secs) = self.image_timeout {
            builder = builder.image_timeout_secs(secs);
        }
        if let Some(secs) = self.pdf_timeout {
            builder = builder.pdf_timeout_secs(secs);
        }
        if let Some(secs) = self.inference_timeout {
            builder = builder.inference_timeout_secs(secs);
        }
        if let Some(scale) = self.render_scale {
            builder = builder.render_scale(scale);
        }
        if let Some(ref path) = self.pdfium_lib {
            builder = builder.pdfium_lib_path(path);
        }

        builder.build().context("Invalid configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env values win over the inherited environment.
    dotenvy::dotenv_override().ok();

    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    let config = cli.build_config()?;
    if config.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; every OCR call will report an error");
    }
    let service = OcrService::new(config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!(
                "Starting {} v{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            );
            OcrServer::new(service)
                .serve_stdio()
                .await
                .context("MCP server terminated")?;
        }
        Command::Image { url } => {
            println!("{}", service.ocr_image_url(&url).await);
        }
        Command::Pdf { url, page } => {
            println!("{}", service.ocr_pdf_url(&url, page).await);
        }
    }

    Ok(())
}
