//! PDF rasterisation behind a small engine seam.
//!
//! The converter never touches PDF internals. It talks to three traits:
//!
//! * [`PdfEngine`] — decode raw bytes into a document handle
//! * [`RasterDocument`] — page count plus 1-based page lookup
//! * [`RasterPage`] — page size in points and rendering to a pixel surface
//!
//! [`PdfiumEngine`] is the production implementation over `pdfium-render`.
//! Tests swap in scripted engines so the controller can be exercised without
//! a pdfium shared library on the machine.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a synchronous C++ library with internal global state. Every
//! engine call made from async code goes through `tokio::task::spawn_blocking`
//! so the runtime's worker threads never stall on rasterisation.

use crate::error::Pdf2ImgError;
use crate::output::DocumentInfo;
use crate::pipeline::input::SelectedFile;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable naming an explicit pdfium library to bind.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Decodes PDF bytes into a [`RasterDocument`].
pub trait PdfEngine: Send + Sync {
    /// Decode `bytes`. `name` is only used to label errors.
    fn open<'a>(
        &'a self,
        name: &str,
        bytes: &'a [u8],
        password: Option<&'a str>,
    ) -> Result<Box<dyn RasterDocument + 'a>, Pdf2ImgError>;
}

/// A decoded document.
pub trait RasterDocument {
    fn page_count(&self) -> usize;

    /// Look up a page by its 1-based number.
    fn page(&self, number: usize) -> Result<Box<dyn RasterPage + '_>, Pdf2ImgError>;
}

/// One page of a decoded document.
pub trait RasterPage {
    /// Page `(width, height)` in PDF points (1/72 inch).
    fn size_points(&self) -> (f32, f32);

    /// Rasterise into a surface of exactly `width × height` pixels.
    fn render(&self, width: u32, height: u32) -> Result<DynamicImage, Pdf2ImgError>;
}

/// Output pixel dimensions for a page of `points` at `scale`.
///
/// Fractional pixels are dropped, as a canvas does when sized from a
/// viewport. Each side is at least 1 px so degenerate pages still encode.
pub fn viewport_size(points: (f32, f32), scale: f32) -> (u32, u32) {
    let side = |p: f32| -> u32 {
        let px = (p * scale).floor();
        if px.is_finite() && px >= 1.0 {
            px as u32
        } else {
            1
        }
    };
    (side(points.0), side(points.1))
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// [`PdfEngine`] backed by the pdfium C++ library.
pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl PdfiumEngine {
    /// Bind to pdfium, trying in order:
    ///
    /// 1. `PDFIUM_LIB_PATH`, when set
    /// 2. the platform library next to the running executable
    /// 3. the system library search path
    pub fn bind() -> Result<Self, Pdf2ImgError> {
        if let Ok(path) = std::env::var(PDFIUM_LIB_PATH_ENV) {
            if !path.is_empty() {
                return Self::bind_to_path(Path::new(&path));
            }
        }

        let beside_exe = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .map(|dir| library_path_in(&dir));

        let bindings = match beside_exe {
            Some(lib) if lib.exists() => Pdfium::bind_to_library(&lib),
            _ => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| Pdf2ImgError::PdfiumBindingFailed(e.to_string()))?;

        info!("Bound pdfium library");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    /// Bind to the pdfium library at an explicit `path`.
    pub fn bind_to_path(path: &Path) -> Result<Self, Pdf2ImgError> {
        let bindings = Pdfium::bind_to_library(path).map_err(|e| {
            Pdf2ImgError::PdfiumBindingFailed(format!("{}: {}", path.display(), e))
        })?;
        info!("Bound pdfium library at {}", path.display());
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl PdfEngine for PdfiumEngine {
    fn open<'a>(
        &'a self,
        name: &str,
        bytes: &'a [u8],
        password: Option<&'a str>,
    ) -> Result<Box<dyn RasterDocument + 'a>, Pdf2ImgError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, password)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                if err_str.contains("Password") || err_str.contains("password") {
                    if password.is_some() {
                        Pdf2ImgError::WrongPassword {
                            name: name.to_string(),
                        }
                    } else {
                        Pdf2ImgError::PasswordRequired {
                            name: name.to_string(),
                        }
                    }
                } else {
                    Pdf2ImgError::CorruptPdf {
                        name: name.to_string(),
                        detail: err_str,
                    }
                }
            })?;

        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl RasterDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page(&self, number: usize) -> Result<Box<dyn RasterPage + '_>, Pdf2ImgError> {
        let total = self.page_count();
        if number == 0 || number > total {
            return Err(Pdf2ImgError::PageOutOfRange {
                page: number,
                total,
            });
        }

        let page = self
            .document
            .pages()
            .get((number - 1) as u16)
            .map_err(|e| Pdf2ImgError::RasterisationFailed {
                page: number,
                detail: format!("{:?}", e),
            })?;

        Ok(Box::new(PdfiumPage { page, number }))
    }
}

struct PdfiumPage<'a> {
    page: PdfPage<'a>,
    number: usize,
}

impl RasterPage for PdfiumPage<'_> {
    fn size_points(&self) -> (f32, f32) {
        (self.page.width().value, self.page.height().value)
    }

    fn render(&self, width: u32, height: u32) -> Result<DynamicImage, Pdf2ImgError> {
        let config = PdfRenderConfig::new()
            .set_target_size(width as i32, height as i32)
            .render_form_data(true);

        let bitmap = self.page.render_with_config(&config).map_err(|e| {
            Pdf2ImgError::RasterisationFailed {
                page: self.number,
                detail: format!("{:?}", e),
            }
        })?;

        Ok(bitmap.as_image())
    }
}

// ── Async helpers ────────────────────────────────────────────────────────

/// Decode `file` only to learn its page count.
pub async fn page_count(
    engine: Arc<dyn PdfEngine>,
    file: &SelectedFile,
    password: Option<String>,
) -> Result<usize, Pdf2ImgError> {
    Ok(document_info(engine, file, password).await?.page_count)
}

/// Decode `file` and collect page count and page sizes without rendering.
pub async fn document_info(
    engine: Arc<dyn PdfEngine>,
    file: &SelectedFile,
    password: Option<String>,
) -> Result<DocumentInfo, Pdf2ImgError> {
    let name = file.name().to_string();
    let bytes = Arc::clone(file.bytes());

    tokio::task::spawn_blocking(move || {
        document_info_blocking(engine.as_ref(), &name, &bytes, password.as_deref())
    })
    .await
    .map_err(|e| Pdf2ImgError::Internal(format!("Decode task panicked: {}", e)))?
}

fn document_info_blocking(
    engine: &dyn PdfEngine,
    name: &str,
    bytes: &[u8],
    password: Option<&str>,
) -> Result<DocumentInfo, Pdf2ImgError> {
    let document = engine.open(name, bytes, password)?;
    let page_count = document.page_count();

    let page_sizes = (1..=page_count)
        .map(|n| document.page(n).map(|p| p.size_points()))
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Decoded '{}': {} pages", name, page_count);
    Ok(DocumentInfo {
        name: name.to_string(),
        page_count,
        page_sizes,
    })
}

/// Platform library file name inside `dir`, e.g. `dir/libpdfium.so`.
pub fn library_path_in(dir: &Path) -> PathBuf {
    Pdfium::pdfium_platform_library_name_at_path(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_floors_fractional_pixels() {
        // US Letter at 1.5x: 918 × 1188 exactly.
        assert_eq!(viewport_size((612.0, 792.0), 1.5), (918, 1188));
        // A4 at 1x: 595.28 × 841.89 pt.
        assert_eq!(viewport_size((595.28, 841.89), 1.0), (595, 841));
        assert_eq!(viewport_size((595.28, 841.89), 0.5), (297, 420));
    }

    #[test]
    fn viewport_never_collapses_to_zero() {
        assert_eq!(viewport_size((0.4, 0.0), 1.0), (1, 1));
        assert_eq!(viewport_size((f32::NAN, 10.0), 2.0), (1, 20));
    }

    #[test]
    fn library_path_is_inside_dir() {
        let p = library_path_in(Path::new("/opt/pdfium"));
        assert!(p.starts_with("/opt/pdfium"));
        assert!(p.to_string_lossy().contains("pdfium"));
    }
}
