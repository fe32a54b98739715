//! CLI binary for edgequake-pdf2img.
//!
//! A thin shim over the library crate: flags map onto `ConversionConfig`,
//! the controller does the work, and the pages land in `--output-dir`.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2img::{
    ConversionConfig, ConversionController, ConversionProgressCallback, OutputFormat, PageError,
    PdfiumEngine, ProgressCallback, RenderScale,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num} of {total}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, encoded_len: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<12}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{:>7} KiB", encoded_len / 1024)),
            dim(&format!("{secs:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &PageError) {
        let secs = self.elapsed_secs(page_num);
        let kind = match error {
            PageError::RenderFailed { .. } => "render",
            PageError::EncodeFailed { .. } => "encode",
        };
        let error = error.to_string();
        let msg = if error.chars().count() > 80 {
            format!("{kind}: {}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            format!("{kind}: {error}")
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.2}s")),
        ));
        self.bar.abandon();
    }

    fn on_conversion_complete(&self, total_pages: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages rendered",
            green("✔"),
            bold(&total_pages.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Every page as PNG at 1.5x into the current directory
  pdf2img document.pdf

  # JPEG at 70% quality, 2x scale, into ./pages
  pdf2img --format jpeg --quality 0.7 --scale 2 document.pdf -o pages

  # Only page 3
  pdf2img --page 3 document.pdf

  # Page count and page sizes, no rendering
  pdf2img --inspect-only --json document.pdf

  # Convert, then browse pages and save the ones you want
  pdf2img --interactive document.pdf

INTERACTIVE COMMANDS:
  n, next        show next page
  p, prev        show previous page
  <N>            jump to page N
  d, download    save the displayed page
  a, all         save every page
  q, quit        exit

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium; otherwise the executable's
                          directory and then the system search path are used
  RUST_LOG                Override the log filter (e.g. edgequake_pdf2img=debug)
"#;

/// Convert PDF pages to PNG or JPEG images.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2img",
    version,
    about = "Convert PDF pages to PNG or JPEG images",
    long_about = "Render every page of a PDF with pdfium and save it as PNG or JPEG. \
Pages are rendered one at a time, in order, at a fixed set of scales.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Directory the page images are written to.
    #[arg(short, long, env = "PDF2IMG_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Output image format.
    #[arg(long, env = "PDF2IMG_FORMAT", value_enum, default_value = "png")]
    format: FormatArg,

    /// JPEG quality (0.0–1.0). Ignored for PNG.
    #[arg(long, env = "PDF2IMG_QUALITY", default_value_t = 0.92,
          value_parser = parse_quality)]
    quality: f32,

    /// Render scale: 0.5, 1, 1.5, 2 or 3.
    #[arg(long, env = "PDF2IMG_SCALE", value_enum, default_value = "1.5")]
    scale: ScaleArg,

    /// Save only this page (1-indexed).
    #[arg(long, env = "PDF2IMG_PAGE")]
    page: Option<usize>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2IMG_PASSWORD")]
    password: Option<String>,

    /// Print page count and page sizes only, no rendering.
    #[arg(long, env = "PDF2IMG_INSPECT_ONLY")]
    inspect_only: bool,

    /// Print a JSON summary instead of text.
    #[arg(long, env = "PDF2IMG_JSON")]
    json: bool,

    /// Browse converted pages and pick which ones to save.
    #[arg(short, long, env = "PDF2IMG_INTERACTIVE")]
    interactive: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2IMG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2IMG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2IMG_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    #[value(alias = "jpg")]
    Jpeg,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Jpeg => OutputFormat::Jpeg,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ScaleArg {
    #[value(name = "0.5")]
    Half,
    #[value(name = "1")]
    One,
    #[value(name = "1.5")]
    OneAndHalf,
    #[value(name = "2")]
    Two,
    #[value(name = "3")]
    Three,
}

impl From<ScaleArg> for RenderScale {
    fn from(v: ScaleArg) -> Self {
        match v {
            ScaleArg::Half => RenderScale::X0_5,
            ScaleArg::One => RenderScale::X1,
            ScaleArg::OneAndHalf => RenderScale::X1_5,
            ScaleArg::Two => RenderScale::X2,
            ScaleArg::Three => RenderScale::X3,
        }
    }
}

fn parse_quality(s: &str) -> Result<f32, String> {
    let q: f32 = s.parse().map_err(|e| format!("invalid quality '{s}': {e}"))?;
    if (0.0..=1.0).contains(&q) {
        Ok(q)
    } else {
        Err(format!("quality must be between 0 and 1, got {q}"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar already reports every page; keep library logs quiet
    // while it is on screen.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let engine = Arc::new(PdfiumEngine::bind().context("PDF engine unavailable")?);

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = edgequake_pdf2img::inspect(engine, &cli.input, cli.password.clone())
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize document info")?
            );
        } else {
            println!("File:   {}", cli.input.display());
            println!("Pages:  {}", info.page_count);
            for (i, (w, h)) in info.page_sizes.iter().enumerate() {
                println!("  {:>4}  {:.1} × {:.1} pt", i + 1, w, h);
            }
        }
        return Ok(());
    }

    // ── Build controller ─────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let mut controller = ConversionController::new(engine, config);

    controller
        .select_path(&cli.input)
        .await
        .with_context(|| format!("Failed to load {}", cli.input.display()))?;

    let total = controller.convert().await.context("Conversion failed")?;
    if !cli.quiet && !show_progress && !cli.json {
        eprintln!("{}", controller.status());
    }

    // ── Save ─────────────────────────────────────────────────────────────
    if cli.interactive {
        return interactive(&mut controller, &cli.output_dir).await;
    }

    let saved: Vec<PathBuf> = match cli.page {
        Some(page) => {
            if !controller.show_page(page) {
                anyhow::bail!("Page {page} is out of range (document has {total} pages)");
            }
            controller
                .download_current(&cli.output_dir)
                .context("Failed to save page")?
                .into_iter()
                .collect()
        }
        None => controller
            .download_all(&cli.output_dir)
            .context("Failed to save pages")?,
    };

    if cli.json {
        let summary = serde_json::json!({
            "input": cli.input,
            "pages": total,
            "format": controller.converted_format(),
            "files": saved,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        for path in &saved {
            println!("{}", path.display());
        }
        eprintln!(
            "{}  {} file(s)  →  {}",
            green("✔"),
            saved.len(),
            bold(&cli.output_dir.display().to_string())
        );
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .format(cli.format.into())
        .quality(cli.quality)
        .scale(cli.scale.into());

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Line-based page browser over a converted controller.
async fn interactive(controller: &mut ConversionController, output_dir: &Path) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print_view(controller);
        print!("{} ", cyan("pdf2img>"));
        io::stdout().flush().ok();

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            return Ok(());
        };

        let moved = match line.trim() {
            "" => continue,
            "q" | "quit" | "exit" => return Ok(()),
            "n" | "next" => controller.show_next(),
            "p" | "prev" => controller.show_previous(),
            "d" | "download" => {
                match controller.download_current(output_dir)? {
                    Some(path) => println!("{} {}", green("saved"), path.display()),
                    None => println!("{}", dim("nothing to save")),
                }
                continue;
            }
            "a" | "all" => {
                for path in controller.download_all(output_dir)? {
                    println!("{} {}", green("saved"), path.display());
                }
                continue;
            }
            other => match other.parse::<usize>() {
                Ok(n) => controller.show_page(n),
                Err(_) => {
                    println!("{}", red(&format!("unknown command '{other}'")));
                    continue;
                }
            },
        };

        if !moved {
            println!("{}", dim("no such page"));
        }
    }
}

fn print_view(controller: &ConversionController) {
    let view = controller.view();
    let label = view.page_label.unwrap_or_default();
    let image = controller
        .current_image()
        .map(|img| format!("{}×{} {} {} KiB", img.width, img.height, img.mime_type(), img.len() / 1024))
        .unwrap_or_default();
    let nav = format!(
        "{} {}",
        if view.prev_enabled { "[p]rev" } else { "     " },
        if view.next_enabled { "[n]ext" } else { "" }
    );
    println!("{}  {}  {}", bold(&label), dim(&image), nav);
}
