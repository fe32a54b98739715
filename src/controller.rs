//! The conversion controller: selection, conversion, navigation, download.
//!
//! One [`ConversionController`] owns all state a front-end needs: the
//! selected file, the converted image list, the current page and the status
//! line. It is driven from a single task and moves through [`Phase`]:
//!
//! ```text
//! NoFile ──select──▶ FileSelected ──convert──▶ Converting ──▶ Converted
//!                        ▲                          │              │
//!                        └──────── error ───────────┘              │
//!                        └──────────────── select ─────────────────┘
//! ```
//!
//! Converting is split in two so front-ends can keep serving events while
//! pages render: [`begin_conversion`](ConversionController::begin_conversion)
//! hands out an owned [`ConversionJob`], and
//! [`finish_conversion`](ConversionController::finish_conversion) applies its
//! outcome. [`convert`](ConversionController::convert) does both in one call.
//! Only one job may be in flight; a second request is rejected with
//! [`Pdf2ImgError::ConversionInProgress`]. Outcomes of jobs that were
//! superseded by a newer selection are discarded.

use crate::config::{ConversionConfig, OutputFormat, RenderScale};
use crate::convert::{CancelHandle, ConversionJob, JobOutcome};
use crate::error::Pdf2ImgError;
use crate::output::save_image;
use crate::pipeline::encode::EncodedImage;
use crate::pipeline::input::{self, SelectedFile};
use crate::pipeline::render::{self, PdfEngine};
use crate::progress::{JobProgress, ProgressCallback};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const STATUS_FILE_SELECTED: &str = "File selected. Click \"Convert to Image\" to proceed.";
const NO_FILE_LABEL: &str = "No file selected";
const STATUS_CONVERTING: &str = "Converting...";

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    NoFile,
    FileSelected,
    Converting,
    Converted,
}

/// Snapshot of everything a front-end displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub phase: Phase,
    /// `Selected: <name>` or `No file selected`.
    pub selected_label: String,
    pub status: String,
    /// `Page n of N`, once a page count is known.
    pub page_label: Option<String>,
    pub page_controls_visible: bool,
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub convert_enabled: bool,
    pub download_enabled: bool,
    /// Quality only matters for JPEG.
    pub quality_control_visible: bool,
    /// 1-based; meaningful only when `page_total > 0`.
    pub current_page: usize,
    pub page_total: usize,
    /// The displayed page as a `data:` URL.
    pub image: Option<String>,
}

struct ActiveJob {
    id: u64,
    cancel: CancelHandle,
    progress: Arc<JobProgress>,
}

/// Scoped state for one conversion front-end.
pub struct ConversionController {
    engine: Arc<dyn PdfEngine>,
    config: ConversionConfig,
    phase: Phase,
    selected: Option<SelectedFile>,
    /// Page count learned when the current selection was decoded.
    loaded_page_count: Option<usize>,
    images: Vec<EncodedImage>,
    converted_format: Option<OutputFormat>,
    current_page: usize,
    status: String,
    page_label: Option<String>,
    page_controls_visible: bool,
    prev_enabled: bool,
    next_enabled: bool,
    active: Option<ActiveJob>,
    next_job_id: u64,
}

impl ConversionController {
    pub fn new(engine: Arc<dyn PdfEngine>, config: ConversionConfig) -> Self {
        Self {
            engine,
            config,
            phase: Phase::NoFile,
            selected: None,
            loaded_page_count: None,
            images: Vec::new(),
            converted_format: None,
            current_page: 1,
            status: String::new(),
            page_label: None,
            page_controls_visible: false,
            prev_enabled: false,
            next_enabled: false,
            active: None,
            next_job_id: 1,
        }
    }

    // ── Options ──────────────────────────────────────────────────────────

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Options for the next conversion; a running job keeps its snapshot.
    pub fn set_format(&mut self, format: OutputFormat) {
        self.config.format = format;
    }

    /// Set JPEG quality, clamped to `0.0..=1.0`.
    pub fn set_quality(&mut self, quality: f32) {
        self.config.quality = if quality.is_finite() {
            quality.clamp(0.0, 1.0)
        } else {
            1.0
        };
    }

    pub fn set_scale(&mut self, scale: RenderScale) {
        self.config.scale = scale;
    }

    pub fn set_password(&mut self, password: Option<String>) {
        self.config.password = password;
    }

    pub fn set_progress_callback(&mut self, cb: Option<ProgressCallback>) {
        self.config.progress_callback = cb;
    }

    // ── Selection ────────────────────────────────────────────────────────

    /// Read `path` from disk and select it.
    pub async fn select_path(&mut self, path: &Path) -> Result<usize, Pdf2ImgError> {
        match input::read_file(path).await {
            Ok(file) => self.select_file(file).await,
            Err(e) => {
                self.status = format!("Error: {e}");
                Err(e)
            }
        }
    }

    /// Select a file and decode it to learn its page count.
    ///
    /// Non-PDF files are rejected without touching the current selection or
    /// the converted images. A decode failure keeps the file selected so the
    /// user can still retry Convert.
    pub async fn select_file(&mut self, file: SelectedFile) -> Result<usize, Pdf2ImgError> {
        if !file.is_pdf() {
            warn!(
                "Rejected selection '{}' ({})",
                file.name(),
                file.media_type()
            );
            self.status = "Please select a valid PDF file.".to_string();
            return Err(Pdf2ImgError::NotAPdf {
                name: file.name().to_string(),
                media_type: file.media_type().to_string(),
            });
        }

        if let Some(job) = self.active.take() {
            info!("New selection supersedes conversion job {}", job.id);
            job.cancel.cancel();
        }

        info!("Selected '{}' ({} bytes)", file.name(), file.len());
        self.phase = Phase::FileSelected;
        self.loaded_page_count = None;
        self.status = STATUS_FILE_SELECTED.to_string();
        self.selected = Some(file.clone());

        match render::page_count(Arc::clone(&self.engine), &file, self.config.password.clone()).await {
            Ok(total) => {
                self.loaded_page_count = Some(total);
                if total > 1 {
                    self.page_label = Some(format!("Page 1 of {total}"));
                    self.page_controls_visible = true;
                } else {
                    self.page_label = None;
                    self.page_controls_visible = false;
                }
                debug!("'{}' has {} pages", file.name(), total);
                Ok(total)
            }
            Err(e) => {
                self.status = format!("Error loading PDF: {e}");
                Err(e)
            }
        }
    }

    // ── Conversion ───────────────────────────────────────────────────────

    /// Convert every page of the selected file, then show page 1.
    ///
    /// Returns the number of pages converted.
    pub async fn convert(&mut self) -> Result<usize, Pdf2ImgError> {
        let job = self.begin_conversion()?;
        let outcome = job.run().await;
        self.finish_conversion(outcome)
    }

    /// Start a conversion and return the job to run.
    ///
    /// Clears the previous images. The job carries a snapshot of the current
    /// options, so later `set_*` calls only affect the next conversion.
    pub fn begin_conversion(&mut self) -> Result<ConversionJob, Pdf2ImgError> {
        if self.active.is_some() {
            warn!("Convert requested while a conversion is in flight");
            return Err(Pdf2ImgError::ConversionInProgress);
        }

        let Some(file) = self.selected.clone() else {
            self.status = Pdf2ImgError::NoFileSelected.to_string();
            return Err(Pdf2ImgError::NoFileSelected);
        };

        self.images.clear();
        self.converted_format = None;
        self.reset_navigation();
        self.phase = Phase::Converting;
        self.status = STATUS_CONVERTING.to_string();

        let id = self.next_job_id;
        self.next_job_id += 1;

        let job = ConversionJob::new(id, file, self.config.clone(), Arc::clone(&self.engine));
        self.active = Some(ActiveJob {
            id,
            cancel: job.cancel_handle(),
            progress: job.progress(),
        });
        Ok(job)
    }

    /// Apply a finished job's outcome.
    ///
    /// On success the images replace the list and page 1 is shown. On failure
    /// any partial output is discarded and the error is surfaced in the
    /// status line.
    pub fn finish_conversion(&mut self, outcome: JobOutcome) -> Result<usize, Pdf2ImgError> {
        match &self.active {
            Some(active) if active.id == outcome.job_id => {}
            _ => {
                warn!("Discarding outcome of superseded job {}", outcome.job_id);
                return Err(Pdf2ImgError::Superseded {
                    job_id: outcome.job_id,
                });
            }
        }
        self.active = None;

        match outcome.result {
            Ok(output) => {
                let total = output.images.len();
                self.images = output.images;
                self.converted_format = Some(output.format);
                self.phase = Phase::Converted;
                self.status = format!("Conversion complete! Converted {total} page(s).");
                self.show_page(1);
                Ok(total)
            }
            Err(e) => {
                warn!("Conversion failed: {}", e);
                self.reset_navigation();
                self.phase = Phase::FileSelected;
                self.status = format!("Error: {e}");
                Err(e)
            }
        }
    }

    /// Cancel handle for the in-flight job, if any.
    pub fn cancel_handle(&self) -> Option<CancelHandle> {
        self.active.as_ref().map(|job| job.cancel.clone())
    }

    // ── Navigation ───────────────────────────────────────────────────────

    /// Back to page 1 with nothing to navigate. The label only survives as
    /// `Page 1 of N` for the loaded document.
    fn reset_navigation(&mut self) {
        self.current_page = 1;
        self.prev_enabled = false;
        self.next_enabled = false;
        self.page_label = self
            .loaded_page_count
            .filter(|&total| total > 1)
            .map(|total| format!("Page 1 of {total}"));
    }

    /// Display page `page_num` (1-based). Returns `false` and changes nothing
    /// when the list is empty or the page is out of range.
    pub fn show_page(&mut self, page_num: usize) -> bool {
        let total = self.images.len();
        if total == 0 || page_num < 1 || page_num > total {
            return false;
        }

        self.current_page = page_num;
        self.page_label = Some(format!("Page {page_num} of {total}"));
        self.prev_enabled = page_num != 1;
        self.next_enabled = page_num != total;
        if total > 1 {
            self.page_controls_visible = true;
        }
        true
    }

    pub fn show_previous(&mut self) -> bool {
        self.current_page > 1 && self.show_page(self.current_page - 1)
    }

    pub fn show_next(&mut self) -> bool {
        self.current_page < self.images.len() && self.show_page(self.current_page + 1)
    }

    // ── Download ─────────────────────────────────────────────────────────

    /// Save the displayed page into `dir` as `converted-page-<N>.<ext>`.
    ///
    /// Returns `Ok(None)` when there is nothing to save.
    pub fn download_current(&self, dir: &Path) -> Result<Option<PathBuf>, Pdf2ImgError> {
        match self.current_image() {
            Some(image) => save_image(dir, self.current_page, image).map(Some),
            None => Ok(None),
        }
    }

    /// Save every converted page into `dir`.
    pub fn download_all(&self, dir: &Path) -> Result<Vec<PathBuf>, Pdf2ImgError> {
        self.images
            .iter()
            .enumerate()
            .map(|(i, image)| save_image(dir, i + 1, image))
            .collect()
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn loaded_page_count(&self) -> Option<usize> {
        self.loaded_page_count
    }

    /// The converted image list, in page order.
    pub fn images(&self) -> &[EncodedImage] {
        &self.images
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn current_image(&self) -> Option<&EncodedImage> {
        self.images.get(self.current_page.checked_sub(1)?)
    }

    /// Format the current image list was encoded in.
    pub fn converted_format(&self) -> Option<OutputFormat> {
        self.converted_format
    }

    pub fn is_converting(&self) -> bool {
        self.active.is_some()
    }

    /// Current status line, including live page progress while converting.
    ///
    /// A message written during the conversion (a rejected selection) takes
    /// precedence over the progress text.
    pub fn status(&self) -> String {
        match &self.active {
            Some(job) if self.phase == Phase::Converting && self.status == STATUS_CONVERTING => {
                job.progress.status()
            }
            _ => self.status.clone(),
        }
    }

    pub fn view(&self) -> ViewState {
        let converting = self.is_converting();
        ViewState {
            phase: self.phase,
            selected_label: self
                .selected
                .as_ref()
                .map(|f| format!("Selected: {}", f.name()))
                .unwrap_or_else(|| NO_FILE_LABEL.to_string()),
            status: self.status(),
            page_label: self.page_label.clone(),
            page_controls_visible: self.page_controls_visible,
            prev_enabled: self.prev_enabled,
            next_enabled: self.next_enabled,
            convert_enabled: self.selected.is_some() && !converting,
            download_enabled: !self.images.is_empty() && !converting,
            quality_control_visible: self.config.quality_applies(),
            current_page: self.current_page,
            page_total: self.images.len(),
            image: self.current_image().map(EncodedImage::data_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::render::RasterDocument;

    struct NullEngine;

    impl PdfEngine for NullEngine {
        fn open<'a>(
            &'a self,
            name: &str,
            _bytes: &'a [u8],
            _password: Option<&'a str>,
        ) -> Result<Box<dyn RasterDocument + 'a>, Pdf2ImgError> {
            Err(Pdf2ImgError::CorruptPdf {
                name: name.to_string(),
                detail: "null engine".into(),
            })
        }
    }

    fn controller() -> ConversionController {
        ConversionController::new(Arc::new(NullEngine), ConversionConfig::default())
    }

    #[test]
    fn initial_view() {
        let view = controller().view();
        assert_eq!(view.phase, Phase::NoFile);
        assert_eq!(view.selected_label, "No file selected");
        assert!(!view.convert_enabled);
        assert!(!view.download_enabled);
        assert!(!view.page_controls_visible);
        assert!(!view.quality_control_visible);
        assert!(view.image.is_none());
    }

    #[test]
    fn navigation_is_noop_when_empty() {
        let mut c = controller();
        assert!(!c.show_page(1));
        assert!(!c.show_next());
        assert!(!c.show_previous());
        assert_eq!(c.current_page(), 1);
        assert!(c.view().page_label.is_none());
    }

    #[test]
    fn download_is_noop_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(controller().download_current(dir.path()).unwrap().is_none());
        assert!(controller().download_all(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn convert_without_selection_reports_error() {
        let mut c = controller();
        let err = c.begin_conversion().err().expect("no file selected");
        assert!(matches!(err, Pdf2ImgError::NoFileSelected));
        assert_eq!(c.status(), "Please select a PDF file first.");
        assert_eq!(c.phase(), Phase::NoFile);
    }

    #[test]
    fn quality_is_clamped_and_control_follows_format() {
        let mut c = controller();
        c.set_quality(1.7);
        assert_eq!(c.config().quality, 1.0);
        c.set_quality(-3.0);
        assert_eq!(c.config().quality, 0.0);
        c.set_format(OutputFormat::Jpeg);
        assert!(c.view().quality_control_visible);
    }

    #[tokio::test]
    async fn decode_failure_keeps_selection() {
        let mut c = controller();
        let file = SelectedFile::new("broken.pdf", "application/pdf", b"%PDF-oops".to_vec());
        let err = c.select_file(file).await.unwrap_err();
        assert!(matches!(err, Pdf2ImgError::CorruptPdf { .. }));
        assert!(c.status().starts_with("Error loading PDF: "));
        assert_eq!(c.phase(), Phase::FileSelected);
        assert!(c.view().convert_enabled);
        assert!(c.loaded_page_count().is_none());
    }
}
