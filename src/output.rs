//! Conversion results and the files they are saved as.

use crate::config::OutputFormat;
use crate::error::Pdf2ImgError;
use crate::pipeline::encode::EncodedImage;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Everything a finished conversion produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// One entry per page, in page order.
    pub images: Vec<EncodedImage>,
    /// Format every image was encoded in.
    pub format: OutputFormat,
    pub stats: ConversionStats,
}

/// Timing and size figures for a conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_pages: usize,
    /// Sum of encoded image sizes in bytes.
    pub total_bytes: u64,
    /// Time spent rasterising and encoding.
    pub render_duration_ms: u64,
    /// Wall-clock time including decode.
    pub total_duration_ms: u64,
}

/// What decoding a document revealed, without rendering it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub name: String,
    pub page_count: usize,
    /// `(width, height)` in PDF points, one per page.
    pub page_sizes: Vec<(f32, f32)>,
}

/// File name a page is saved under: `converted-page-<N>.<ext>`.
pub fn download_file_name(page_num: usize, format: OutputFormat) -> String {
    format!("converted-page-{}.{}", page_num, format.extension())
}

/// Write one page into `dir` and return the full path.
///
/// Uses atomic write (temp file + rename) so a reader never sees a
/// half-written image.
pub fn save_image(dir: &Path, page_num: usize, image: &EncodedImage) -> Result<PathBuf, Pdf2ImgError> {
    let path = dir.join(download_file_name(page_num, image.format));
    let write_err = |source: std::io::Error| Pdf2ImgError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(&image.bytes).map_err(write_err)?;
    tmp.persist(&path).map_err(|e| write_err(e.error))?;

    debug!("Saved page {} → {}", page_num, path.display());
    Ok(path)
}
