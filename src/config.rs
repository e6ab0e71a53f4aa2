//! Configuration for the OCR service.
//!
//! All service behaviour is controlled through [`OcrConfig`], built via its
//! [`OcrConfigBuilder`] or loaded from the process environment with
//! [`OcrConfig::from_env`]. The config is constructed once at startup and
//! shared read-only by every tool invocation; nothing in it changes per call.

use crate::error::OcrError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable selecting the Gemini model.
pub const MODEL_ENV: &str = "GEMINI_MODEL";

/// Environment variable pointing at an existing pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Model used when `GEMINI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-05-20";

/// Configuration for image and PDF OCR.
///
/// # Example
/// ```rust
/// use gemini_ocr_mcp::OcrConfig;
/// use std::time::Duration;
///
/// let config = OcrConfig::builder()
///     .model("gemini-2.0-flash")
///     .page_delay(Duration::from_millis(250))
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gemini-2.0-flash");
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// Gemini API key. `None` is not fatal at startup: each tool call
    /// reports the missing credential as an error string.
    pub api_key: Option<String>,

    /// Gemini model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Fetch timeout for image URLs, in seconds. Default: 60.
    pub image_timeout_secs: u64,

    /// Fetch timeout for PDF URLs, in seconds. Default: 120.
    pub pdf_timeout_secs: u64,

    /// Per-call inference timeout, in seconds. Default: 120.
    pub inference_timeout_secs: u64,

    /// Pause between consecutive PDF pages. Default: 500 ms.
    ///
    /// Keeps the request rate against the inference API low on long
    /// documents. `Duration::ZERO` disables the pause.
    pub page_delay: Duration,

    /// Linear scale applied when rasterising PDF pages. Default: 2.0.
    ///
    /// 2× (4× area) over native resolution keeps small print legible.
    pub render_scale: f32,

    /// Explicit path to a pdfium shared library. When `None` the library is
    /// looked up in the working directory, then system-wide.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Sampling temperature. `None` uses the provider default.
    pub temperature: Option<f32>,

    /// Output token cap per call. `None` uses the provider default.
    pub max_tokens: Option<usize>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            image_timeout_secs: 60,
            pdf_timeout_secs: 120,
            inference_timeout_secs: 120,
            page_delay: Duration::from_millis(500),
            render_scale: 2.0,
            pdfium_lib_path: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("image_timeout_secs", &self.image_timeout_secs)
            .field("pdf_timeout_secs", &self.pdf_timeout_secs)
            .field("inference_timeout_secs", &self.inference_timeout_secs)
            .field("page_delay", &self.page_delay)
            .field("render_scale", &self.render_scale)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load credentials, model and pdfium location from the environment.
    ///
    /// Empty variables are treated as unset.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        Self {
            api_key: var(API_KEY_ENV),
            model: var(MODEL_ENV).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            pdfium_lib_path: var(PDFIUM_LIB_PATH_ENV).map(PathBuf::from),
            ..Self::default()
        }
    }

    /// Return the API key, or [`OcrError::MissingApiKey`] when absent.
    pub fn require_api_key(&self) -> Result<&str, OcrError> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(OcrError::MissingApiKey { var: API_KEY_ENV }),
        }
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }

    pub fn pdf_timeout(&self) -> Duration {
        Duration::from_secs(self.pdf_timeout_secs)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    /// Start from an existing config, e.g. one loaded by [`OcrConfig::from_env`].
    pub fn from_config(config: OcrConfig) -> Self {
        Self { config }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn image_timeout_secs(mut self, secs: u64) -> Self {
        self.config.image_timeout_secs = secs;
        self
    }

    pub fn pdf_timeout_secs(mut self, secs: u64) -> Self {
        self.config.pdf_timeout_secs = secs;
        self
    }

    pub fn inference_timeout_secs(mut self, secs: u64) -> Self {
        self.config.inference_timeout_secs = secs;
        self
    }

    pub fn page_delay(mut self, delay: Duration) -> Self {
        self.config.page_delay = delay;
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(0.5, 8.0);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, OcrError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(OcrError::InvalidConfig("model must not be empty".into()));
        }
        if !c.render_scale.is_finite() {
            return Err(OcrError::InvalidConfig(format!(
                "render scale must be a finite number, got {}",
                c.render_scale
            )));
        }
        if c.temperature.is_some_and(|t| !t.is_finite()) {
            return Err(OcrError::InvalidConfig(
                "temperature must be a finite number".into(),
            ));
        }
        for (name, secs) in [
            ("image timeout", c.image_timeout_secs),
            ("PDF timeout", c.pdf_timeout_secs),
            ("inference timeout", c.inference_timeout_secs),
        ] {
            if secs == 0 {
                return Err(OcrError::InvalidConfig(format!("{name} must be ≥ 1s")));
            }
        }
        Ok(self.config)
    }
}

/// Which pages of a PDF to OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSelection {
    /// Every page, in ascending order (default).
    #[default]
    All,
    /// A single page (0-indexed).
    Single(usize),
}

impl PageSelection {
    /// Validate a caller-supplied 1-indexed page number against the
    /// document's page count.
    pub fn from_request(page_number: Option<i64>, total_pages: usize) -> Result<Self, OcrError> {
        match page_number {
            None => Ok(PageSelection::All),
            Some(p) if p >= 1 && (p as u64) <= total_pages as u64 => {
                Ok(PageSelection::Single(p as usize - 1))
            }
            Some(p) => Err(OcrError::PageOutOfRange {
                page: p,
                total: total_pages,
            }),
        }
    }

    /// Expand the selection into ascending 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(idx) if *idx < total_pages => vec![*idx],
            PageSelection::Single(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn defaults_match_documented_values() {
        let c = OcrConfig::default();
        assert_eq!(c.model, DEFAULT_MODEL);
        assert_eq!(c.image_timeout_secs, 60);
        assert_eq!(c.pdf_timeout_secs, 120);
        assert_eq!(c.page_delay, Duration::from_millis(500));
        assert_eq!(c.render_scale, 2.0);
        assert!(c.api_key.is_none());
    }

    #[test]
    fn require_api_key_rejects_missing_and_blank() {
        let c = OcrConfig::default();
        let err = c.require_api_key().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);

        let c = OcrConfig::builder().api_key("   ").build().unwrap();
        assert!(c.require_api_key().is_err());

        let c = OcrConfig::builder().api_key("k-123").build().unwrap();
        assert_eq!(c.require_api_key().unwrap(), "k-123");
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = OcrConfig::builder().api_key("secret-key").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn build_rejects_zero_timeout_and_empty_model() {
        assert!(OcrConfig::builder().pdf_timeout_secs(0).build().is_err());
        assert!(OcrConfig::builder().model("  ").build().is_err());
    }

    #[test]
    fn render_scale_is_clamped() {
        let c = OcrConfig::builder().render_scale(100.0).build().unwrap();
        assert_eq!(c.render_scale, 8.0);
    }

    #[test]
    fn build_rejects_non_finite_floats() {
        let err = OcrConfig::builder()
            .render_scale(f32::NAN)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
        assert!(err.to_string().contains("render scale"));

        // Infinite values clamp into range.
        let c = OcrConfig::builder()
            .render_scale(f32::INFINITY)
            .build()
            .unwrap();
        assert_eq!(c.render_scale, 8.0);

        assert!(OcrConfig::builder().temperature(f32::NAN).build().is_err());
    }

    #[test]
    fn page_selection_from_request() {
        assert_eq!(
            PageSelection::from_request(None, 4).unwrap(),
            PageSelection::All
        );
        assert_eq!(
            PageSelection::from_request(Some(1), 4).unwrap(),
            PageSelection::Single(0)
        );
        assert_eq!(
            PageSelection::from_request(Some(4), 4).unwrap(),
            PageSelection::Single(3)
        );

        for bad in [0, -2, 5] {
            let err = PageSelection::from_request(Some(bad), 4).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PageOutOfRange);
        }
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::All.to_indices(0), Vec::<usize>::new());
        assert_eq!(PageSelection::Single(1).to_indices(3), vec![1]);
        assert_eq!(PageSelection::Single(9).to_indices(3), Vec::<usize>::new());
    }
}
