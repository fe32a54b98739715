//! Pipeline stages for PDF-to-image conversion.
//!
//! Each submodule implements exactly one step, so the rendering backend can
//! be swapped (or scripted in tests) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode
//! (sniff)   (engine)   (png/jpeg)
//! ```
//!
//! 1. [`input`]  — hold the selected bytes and their declared media type
//! 2. [`render`] — decode through a [`render::PdfEngine`] and rasterise one
//!    page at a time
//! 3. [`encode`] — turn each surface into PNG or JPEG bytes

pub mod encode;
pub mod input;
pub mod render;
