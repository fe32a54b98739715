//! End-to-end tests against a real pdfium library.
//!
//! The PDFs are generated in-process, so no fixtures are needed, but pdfium
//! must be loadable. Gated behind `E2E_ENABLED` so they do not run in CI
//! unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test e2e -- --nocapture

use edgequake_pdf2img::{
    convert_bytes, convert_file, inspect, ConversionConfig, ConversionController, OutputFormat,
    Pdf2ImgError, PdfEngine, PdfiumEngine, RenderScale,
};
use std::path::Path;
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip unless E2E_ENABLED is set, otherwise bind pdfium or fail loudly.
macro_rules! e2e_engine {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        let engine: Arc<dyn PdfEngine> =
            Arc::new(PdfiumEngine::bind().expect("pdfium must be available for e2e tests"));
        engine
    }};
}

/// Build a minimal valid PDF with one page per `(width, height)` entry.
///
/// Each page draws a filled rectangle so rendered output is not blank.
fn build_pdf(pages: &[(u32, u32)]) -> Vec<u8> {
    let n = pages.len();
    // Objects: 1 catalog, 2 pages, then (page, content) pairs.
    let mut objects: Vec<String> = Vec::with_capacity(2 + 2 * n);
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        n
    ));
    for (i, (w, h)) in pages.iter().enumerate() {
        let content_id = 4 + 2 * i;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {w} {h}] /Contents {content_id} 0 R >>"
        ));
        let stream = format!("0.2 0.4 0.8 rg 10 10 {} {} re f", w / 2, h / 2);
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for off in offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}

fn write_pdf(dir: &Path, name: &str, pages: &[(u32, u32)]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, build_pdf(pages)).unwrap();
    path
}

fn config(format: OutputFormat, scale: RenderScale) -> ConversionConfig {
    ConversionConfig::builder()
        .format(format)
        .scale(scale)
        .build()
        .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn generated_pdf_has_consistent_xref() {
    let pdf = build_pdf(&[(612, 792), (300, 300)]);
    let text = String::from_utf8(pdf).unwrap();
    assert!(text.starts_with("%PDF-1.4"));
    assert!(text.ends_with("%%EOF\n"));
    let startxref: usize = text
        .rsplit("startxref\n")
        .next()
        .and_then(|t| t.lines().next())
        .and_then(|l| l.parse().ok())
        .unwrap();
    assert!(text[startxref..].starts_with("xref"));
}

#[tokio::test]
async fn test_inspect_page_sizes() {
    let engine = e2e_engine!();
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(dir.path(), "sizes.pdf", &[(612, 792), (842, 595)]);

    let info = inspect(engine, &path, None).await.unwrap();
    assert_eq!(info.page_count, 2);
    assert_eq!(info.page_sizes, vec![(612.0, 792.0), (842.0, 595.0)]);
}

#[tokio::test]
async fn test_convert_png_dimensions() {
    let engine = e2e_engine!();
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(dir.path(), "letter.pdf", &[(612, 792), (612, 792), (200, 100)]);

    let output = convert_file(engine, &path, &config(OutputFormat::Png, RenderScale::X1_5))
        .await
        .unwrap();

    assert_eq!(output.images.len(), 3);
    let dims: Vec<_> = output.images.iter().map(|i| (i.width, i.height)).collect();
    assert_eq!(dims, vec![(918, 1188), (918, 1188), (300, 150)]);
    for img in &output.images {
        assert!(img.bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
        let decoded = image::load_from_memory(&img.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (img.width, img.height));
    }
}

#[tokio::test]
async fn test_convert_jpeg_quality() {
    let engine = e2e_engine!();
    let pdf = build_pdf(&[(612, 792)]);

    let low = ConversionConfig::builder()
        .format(OutputFormat::Jpeg)
        .quality(0.1)
        .scale(RenderScale::X1)
        .build()
        .unwrap();
    let high = ConversionConfig::builder()
        .format(OutputFormat::Jpeg)
        .quality(1.0)
        .scale(RenderScale::X1)
        .build()
        .unwrap();

    let low = convert_bytes(engine.clone(), "q.pdf", pdf.clone(), &low).await.unwrap();
    let high = convert_bytes(engine, "q.pdf", pdf, &high).await.unwrap();

    assert!(low.images[0].bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
    assert!(low.images[0].len() < high.images[0].len());
}

#[tokio::test]
async fn test_corrupt_pdf_is_rejected() {
    let engine = e2e_engine!();
    let err = convert_bytes(
        engine,
        "broken.pdf",
        b"%PDF-1.4\nthis is not a pdf".to_vec(),
        &ConversionConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Pdf2ImgError::CorruptPdf { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_controller_full_flow() {
    let engine = e2e_engine!();
    let dir = tempfile::tempdir().unwrap();
    let path = write_pdf(dir.path(), "flow.pdf", &[(300, 400), (400, 300)]);
    let out = dir.path().join("out");

    let mut controller =
        ConversionController::new(engine, config(OutputFormat::Jpeg, RenderScale::X2));
    assert_eq!(controller.select_path(&path).await.unwrap(), 2);
    assert_eq!(controller.convert().await.unwrap(), 2);

    assert!(controller.show_next());
    let saved = controller.download_current(&out).unwrap().unwrap();
    assert_eq!(saved, out.join("converted-page-2.jpg"));

    let decoded = image::open(&saved).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (800, 600));
}
