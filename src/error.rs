//! Error types for the edgequake-pdf2img library.
//!
//! Two error types cover two failure modes:
//!
//! * [`Pdf2ImgError`] — **Fatal** for the current operation: the selection is
//!   rejected, the document cannot be decoded, or a page failed to render and
//!   the batch was aborted. Returned as `Err(Pdf2ImgError)` from controller
//!   operations and the `convert_*` entry points.
//!
//! * [`PageError`] — a description of a single page failure, handed to
//!   [`crate::progress::ConversionProgressCallback::on_page_error`] before
//!   the batch is aborted. Serialisable so callers can forward it as-is.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2img library.
#[derive(Debug, Error)]
pub enum Pdf2ImgError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Nothing exists at the selected path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The selected file's declared media type is not `application/pdf`.
    #[error("Please select a valid PDF file. ('{name}' is {media_type})")]
    NotAPdf { name: String, media_type: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The engine could not decode the bytes as a PDF.
    #[error("PDF '{name}' is corrupt: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// Encrypted document, no password configured.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    /// Requested page number is outside the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The engine failed to rasterise a page; the batch stops here.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The rendered surface could not be encoded to the output format.
    #[error("Encoding page {page} as {format} failed: {detail}")]
    EncodingFailed {
        page: usize,
        format: &'static str,
        detail: String,
    },

    // ── Controller errors ─────────────────────────────────────────────────
    /// Convert was requested before any PDF was selected.
    #[error("Please select a PDF file first.")]
    NoFileSelected,

    /// Convert was requested while a previous conversion is still running.
    #[error("A conversion is already in progress")]
    ConversionInProgress,

    /// The in-flight conversion was cancelled before it finished.
    #[error("Conversion cancelled after {completed} of {total} pages")]
    Cancelled { completed: usize, total: usize },

    /// A newer selection replaced the job before its outcome was applied.
    #[error("Conversion job {job_id} was superseded by a newer selection")]
    Superseded { job_id: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output image file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library next to the\n\
pdf2img executable, or install it where the system loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// A blocking worker panicked or similar.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failure on a single page, as reported to
/// [`crate::progress::ConversionProgressCallback::on_page_error`].
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// Encoding the rendered surface failed.
    #[error("Page {page}: encoding failed: {detail}")]
    EncodeFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-based page the failure happened on.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. } | PageError::EncodeFailed { page, .. } => *page,
        }
    }
}

impl Pdf2ImgError {
    /// The per-page view of an error raised while converting `page`.
    ///
    /// Anything that is not an encode failure (a page lookup error, say)
    /// counts as a render failure on `page`.
    pub fn to_page_error(&self, page: usize) -> PageError {
        match self {
            Pdf2ImgError::RasterisationFailed { page, detail } => PageError::RenderFailed {
                page: *page,
                detail: detail.clone(),
            },
            Pdf2ImgError::EncodingFailed { page, detail, .. } => PageError::EncodeFailed {
                page: *page,
                detail: detail.clone(),
            },
            other => PageError::RenderFailed {
                page,
                detail: other.to_string(),
            },
        }
    }
}
