//! The conversion job: decode once, then render and encode pages in order.
//!
//! A [`ConversionJob`] owns everything it needs (bytes, a config snapshot,
//! the engine), so it can run while the controller that started it keeps
//! serving navigation and status requests. The page loop is a plain ordered
//! `for` on one blocking worker: page N+1 is not touched until page N is
//! rendered and encoded, and the first failure ends the loop with `Err`.
//!
//! [`convert_file`] and [`convert_bytes`] run a single job without a
//! controller, for batch use.

use crate::config::ConversionConfig;
use crate::error::Pdf2ImgError;
use crate::output::{ConversionOutput, ConversionStats, DocumentInfo};
use crate::pipeline::encode::{encode_page, EncodedImage};
use crate::pipeline::input::{self, SelectedFile};
use crate::pipeline::render::{self, viewport_size, PdfEngine, RasterDocument};
use crate::progress::JobProgress;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Cancels an in-flight job. Cheap to clone; all clones share one flag.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the job to stop before its next page.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// A self-contained, single-shot conversion.
pub struct ConversionJob {
    id: u64,
    file: SelectedFile,
    config: ConversionConfig,
    engine: Arc<dyn PdfEngine>,
    cancel: CancelHandle,
    progress: Arc<JobProgress>,
}

/// What a finished job hands back to whoever started it.
#[derive(Debug)]
pub struct JobOutcome {
    /// Id of the job this outcome belongs to.
    pub job_id: u64,
    pub result: Result<ConversionOutput, Pdf2ImgError>,
}

impl ConversionJob {
    pub fn new(
        id: u64,
        file: SelectedFile,
        config: ConversionConfig,
        engine: Arc<dyn PdfEngine>,
    ) -> Self {
        Self {
            id,
            file,
            config,
            engine,
            cancel: CancelHandle::new(),
            progress: JobProgress::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn progress(&self) -> Arc<JobProgress> {
        Arc::clone(&self.progress)
    }

    /// Run to completion on a blocking worker.
    pub async fn run(self) -> JobOutcome {
        let job_id = self.id;
        info!(
            "Starting conversion of '{}' ({}, quality {}, scale {})",
            self.file.name(),
            self.config.format,
            self.config.effective_quality(),
            self.config.scale
        );

        let result = tokio::task::spawn_blocking(move || self.run_blocking())
            .await
            .map_err(|e| Pdf2ImgError::Internal(format!("Render task panicked: {}", e)))
            .and_then(|r| r);

        JobOutcome { job_id, result }
    }

    fn run_blocking(self) -> Result<ConversionOutput, Pdf2ImgError> {
        let total_start = Instant::now();
        let document = self.engine.open(
            self.file.name(),
            self.file.bytes(),
            self.config.password.as_deref(),
        )?;
        let total_pages = document.page_count();
        self.progress.set_total(total_pages);
        info!("PDF loaded: {} pages", total_pages);

        let callback = self.config.progress_callback.as_ref();
        if let Some(cb) = callback {
            cb.on_conversion_start(total_pages);
        }

        let render_start = Instant::now();
        let mut images = Vec::with_capacity(total_pages);

        for page_num in 1..=total_pages {
            if self.cancel.is_cancelled() {
                return Err(Pdf2ImgError::Cancelled {
                    completed: images.len(),
                    total: total_pages,
                });
            }

            self.progress.set_page(page_num);
            if let Some(cb) = callback {
                cb.on_page_start(page_num, total_pages);
            }

            match self.convert_page(&*document, page_num) {
                Ok(image) => {
                    if let Some(cb) = callback {
                        cb.on_page_complete(page_num, total_pages, image.len());
                    }
                    images.push(image);
                }
                Err(e) => {
                    if let Some(cb) = callback {
                        cb.on_page_error(page_num, total_pages, &e.to_page_error(page_num));
                    }
                    return Err(e);
                }
            }
        }

        let stats = ConversionStats {
            total_pages,
            total_bytes: images.iter().map(|i| i.len() as u64).sum(),
            render_duration_ms: render_start.elapsed().as_millis() as u64,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        if let Some(cb) = callback {
            cb.on_conversion_complete(total_pages);
        }
        info!(
            "Conversion complete: {} pages, {} bytes, {}ms",
            total_pages, stats.total_bytes, stats.total_duration_ms
        );

        Ok(ConversionOutput {
            images,
            format: self.config.format,
            stats,
        })
    }

    /// Render and encode one page.
    fn convert_page(
        &self,
        document: &dyn RasterDocument,
        page_num: usize,
    ) -> Result<EncodedImage, Pdf2ImgError> {
        let page = document.page(page_num)?;
        let (width, height) = viewport_size(page.size_points(), self.config.scale.factor());
        let surface = page.render(width, height)?;
        debug!("Rendered page {} → {}x{} px", page_num, width, height);

        encode_page(&surface, self.config.format, self.config.effective_quality()).map_err(|e| {
            Pdf2ImgError::EncodingFailed {
                page: page_num,
                format: self.config.format.mime_type(),
                detail: e.to_string(),
            }
        })
    }
}

// ── Batch entry points ───────────────────────────────────────────────────

/// Convert every page of the PDF at `path`.
///
/// # Errors
/// Fails if the file is missing, is not a PDF, cannot be decoded, or any
/// page fails to render or encode.
pub async fn convert_file(
    engine: Arc<dyn PdfEngine>,
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2ImgError> {
    let file = input::read_file(path.as_ref()).await?;
    convert_selected(engine, file, config).await
}

/// Convert PDF bytes already in memory. `name` only labels errors.
pub async fn convert_bytes(
    engine: Arc<dyn PdfEngine>,
    name: &str,
    bytes: impl Into<Arc<[u8]>>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2ImgError> {
    let file = SelectedFile::sniffed(name, bytes);
    convert_selected(engine, file, config).await
}

async fn convert_selected(
    engine: Arc<dyn PdfEngine>,
    file: SelectedFile,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2ImgError> {
    if !file.is_pdf() {
        return Err(Pdf2ImgError::NotAPdf {
            name: file.name().to_string(),
            media_type: file.media_type().to_string(),
        });
    }
    ConversionJob::new(0, file, config.clone(), engine).run().await.result
}

/// Read page count and page sizes without rendering anything.
pub async fn inspect(
    engine: Arc<dyn PdfEngine>,
    path: impl AsRef<Path>,
    password: Option<String>,
) -> Result<DocumentInfo, Pdf2ImgError> {
    let file = input::read_file(path.as_ref()).await?;
    if !file.is_pdf() {
        return Err(Pdf2ImgError::NotAPdf {
            name: file.name().to_string(),
            media_type: file.media_type().to_string(),
        });
    }
    render::document_info(engine, &file, password).await
}
