//! Configuration types for PDF-to-image conversion.
//!
//! Every option that feeds the render and encode calls lives in
//! [`ConversionConfig`], built via its [`ConversionConfigBuilder`]. The
//! controller snapshots the config when a conversion starts, so changing the
//! format or scale mid-run never affects the pages already in flight.

use crate::error::Pdf2ImgError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default JPEG quality, matching what browsers use for `toDataURL`.
pub const DEFAULT_JPEG_QUALITY: f32 = 0.92;

/// Configuration for a PDF-to-image conversion.
///
/// # Example
/// ```rust
/// use edgequake_pdf2img::{ConversionConfig, OutputFormat, RenderScale};
///
/// let config = ConversionConfig::builder()
///     .format(OutputFormat::Jpeg)
///     .quality(0.5)
///     .scale(RenderScale::X2)
///     .build()
///     .unwrap();
/// assert_eq!(config.effective_quality(), 0.5);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Output encoding for every page. Default: PNG.
    pub format: OutputFormat,

    /// Encoder quality in `0.0..=1.0`. Only JPEG honours it. Default: 0.92.
    pub quality: f32,

    /// Multiplier from PDF points to output pixels. Default: 1.5×.
    pub scale: RenderScale,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Receives per-page events while a conversion runs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            quality: DEFAULT_JPEG_QUALITY,
            scale: RenderScale::default(),
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("format", &self.format)
            .field("quality", &self.quality)
            .field("scale", &self.scale)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The quality actually handed to the encoder.
    ///
    /// PNG is lossless, so it always encodes at full quality.
    pub fn effective_quality(&self) -> f32 {
        match self.format {
            OutputFormat::Jpeg => self.quality,
            OutputFormat::Png => 1.0,
        }
    }

    /// Whether a quality control should be offered for the current format.
    pub fn quality_applies(&self) -> bool {
        self.format == OutputFormat::Jpeg
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.format = format;
        self
    }

    /// Set the encoder quality. Out-of-range values are rejected by [`build`](Self::build).
    pub fn quality(mut self, quality: f32) -> Self {
        self.config.quality = quality;
        self
    }

    pub fn scale(mut self, scale: RenderScale) -> Self {
        self.config.scale = scale;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2ImgError> {
        let q = self.config.quality;
        if !q.is_finite() || !(0.0..=1.0).contains(&q) {
            return Err(Pdf2ImgError::InvalidConfig(format!(
                "Quality must be between 0 and 1, got {q}"
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Encoding applied to every rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless `image/png` (default).
    #[default]
    Png,
    /// Lossy `image/jpeg`, honouring [`ConversionConfig::quality`].
    Jpeg,
}

impl OutputFormat {
    /// The media type, as used in `data:` URLs.
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }

    /// File extension used when saving a page.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    /// Parse a media type. Anything other than JPEG falls back to PNG.
    pub fn from_mime_type(mime: &str) -> Self {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => OutputFormat::Jpeg,
            _ => OutputFormat::Png,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// The fixed set of render scales offered to the user.
///
/// At 1× one PDF point becomes one output pixel, so a US Letter page renders
/// at 612 × 792 px.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderScale {
    /// 0.5× — thumbnails.
    #[serde(rename = "0.5")]
    X0_5,
    /// 1× — one pixel per point.
    #[serde(rename = "1")]
    X1,
    /// 1.5× (default).
    #[default]
    #[serde(rename = "1.5")]
    X1_5,
    /// 2× — crisp on high-DPI displays.
    #[serde(rename = "2")]
    X2,
    /// 3× — print quality.
    #[serde(rename = "3")]
    X3,
}

impl RenderScale {
    /// All scales, smallest first.
    pub const ALL: [RenderScale; 5] = [
        RenderScale::X0_5,
        RenderScale::X1,
        RenderScale::X1_5,
        RenderScale::X2,
        RenderScale::X3,
    ];

    /// The multiplier applied to page dimensions in points.
    pub fn factor(self) -> f32 {
        match self {
            RenderScale::X0_5 => 0.5,
            RenderScale::X1 => 1.0,
            RenderScale::X1_5 => 1.5,
            RenderScale::X2 => 2.0,
            RenderScale::X3 => 3.0,
        }
    }

    /// Match a numeric factor against the offered set.
    pub fn from_factor(factor: f32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| (s.factor() - factor).abs() < f32::EPSILON)
    }
}

impl fmt::Display for RenderScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.factor())
    }
}
