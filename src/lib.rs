//! # edgequake-pdf2img
//!
//! Convert PDF pages to PNG or JPEG images, preview them page by page, and
//! save the one you want.
//!
//! All PDF work is delegated to pdfium via `pdfium-render`. This crate is the
//! orchestration around it: decode once, render pages strictly in order at
//! the requested scale, encode each surface, and keep the result in a
//! controller that knows which page is on screen.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Input    declare / sniff the media type, reject non-PDFs
//!  ├─ 2. Decode   page count via the engine (spawn_blocking)
//!  ├─ 3. Render   page 1..N in order at scale × points
//!  ├─ 4. Encode   PNG, or JPEG at the requested quality
//!  └─ 5. Present  show_page / prev / next / download_current
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2img::{ConversionConfig, ConversionController, OutputFormat, PdfiumEngine};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Arc::new(PdfiumEngine::bind()?);
//!     let config = ConversionConfig::builder()
//!         .format(OutputFormat::Jpeg)
//!         .quality(0.8)
//!         .build()?;
//!
//!     let mut controller = ConversionController::new(engine, config);
//!     controller.select_path(Path::new("document.pdf")).await?;
//!     controller.convert().await?;
//!
//!     controller.show_next();
//!     if let Some(path) = controller.download_current(Path::new("out"))? {
//!         println!("saved {}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2img` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, OutputFormat, RenderScale};
pub use controller::{ConversionController, Phase, ViewState};
pub use convert::{convert_bytes, convert_file, inspect, CancelHandle, ConversionJob, JobOutcome};
pub use error::{PageError, Pdf2ImgError};
pub use output::{download_file_name, ConversionOutput, ConversionStats, DocumentInfo};
pub use pipeline::encode::EncodedImage;
pub use pipeline::input::SelectedFile;
pub use pipeline::render::{PdfEngine, PdfiumEngine, RasterDocument, RasterPage};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
