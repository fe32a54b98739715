//! Image encoding: `DynamicImage` → PNG or JPEG bytes.
//!
//! PNG is lossless and ignores the quality knob. JPEG has no alpha channel,
//! so the surface is flattened to RGB first; the `0.0..=1.0` quality maps
//! onto the encoder's `1..=100` scale the way a canvas `toDataURL` does.

use crate::config::OutputFormat;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use tracing::debug;

/// One encoded page. Serialises with the bytes as a base64 string.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(D::Error::custom)
    }
}

impl EncodedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn file_extension(&self) -> &'static str {
        self.format.extension()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The image as a `data:` URL, ready for an `<img src>` or a download link.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), STANDARD.encode(&self.bytes))
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Map a `0.0..=1.0` quality onto the JPEG encoder's `1..=100`.
pub fn jpeg_quality(quality: f32) -> u8 {
    let q = if quality.is_finite() { quality } else { 1.0 };
    (q * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Encode a rendered page in `format`.
pub fn encode_page(
    img: &DynamicImage,
    format: OutputFormat,
    quality: f32,
) -> Result<EncodedImage, image::ImageError> {
    let mut buf = Vec::new();

    match format {
        OutputFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        }
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality(quality));
            rgb.write_with_encoder(encoder)?;
        }
    }

    debug!(
        "Encoded {}x{} surface → {} bytes {}",
        img.width(),
        img.height(),
        buf.len(),
        format
    );

    Ok(EncodedImage {
        format,
        width: img.width(),
        height: img.height(),
        bytes: buf,
    })
}
