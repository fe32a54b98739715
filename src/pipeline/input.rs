//! Input handling: turn a user-supplied file into a [`SelectedFile`].
//!
//! A selection carries a declared media type the same way a browser file
//! picker does. When the bytes come from disk we declare the type
//! ourselves by sniffing: the `%PDF` magic wins, a handful of common
//! signatures are recognised so rejections can name what was picked, and the
//! file extension is the last resort.

use crate::error::Pdf2ImgError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Media type accepted by the converter.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Fallback media type for unrecognised content.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A file chosen by the user, held fully in memory.
///
/// The bytes are reference-counted so a conversion job can own them without
/// copying while the controller keeps the selection.
#[derive(Clone)]
pub struct SelectedFile {
    name: String,
    media_type: String,
    bytes: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Build a selection whose media type is sniffed from name and content.
    pub fn sniffed(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let name = name.into();
        let bytes = bytes.into();
        let media_type = sniff_media_type(&name, &bytes).to_string();
        Self {
            name,
            media_type,
            bytes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the declared media type is PDF.
    pub fn is_pdf(&self) -> bool {
        self.media_type.eq_ignore_ascii_case(PDF_MEDIA_TYPE)
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Declare a media type for `bytes`, using `name` only when content is inconclusive.
pub fn sniff_media_type(name: &str, bytes: &[u8]) -> &'static str {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"%PDF", PDF_MEDIA_TYPE),
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xFF\xD8\xFF", "image/jpeg"),
        (b"GIF8", "image/gif"),
        (b"PK\x03\x04", "application/zip"),
    ];

    if let Some((_, mime)) = SIGNATURES.iter().find(|(magic, _)| bytes.starts_with(magic)) {
        return mime;
    }

    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => PDF_MEDIA_TYPE,
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("txt") => "text/plain",
        _ => OCTET_STREAM,
    }
}

/// Read a local file into a sniffed [`SelectedFile`].
pub async fn read_file(path: &Path) -> Result<SelectedFile, Pdf2ImgError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Pdf2ImgError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => Pdf2ImgError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => Pdf2ImgError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let file = SelectedFile::sniffed(name, bytes);
    debug!(
        "Read {} ({} bytes, {})",
        path.display(),
        file.len(),
        file.media_type()
    );
    Ok(file)
}
