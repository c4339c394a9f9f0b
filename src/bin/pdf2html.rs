//! CLI binary for edgequake-pdf2html.
//!
//! `serve` runs the HTTP service (the container entry point); `convert` and
//! `inspect` are thin shims over the library crate.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_pdf2html::server::{Server, ServerConfig};
use edgequake_pdf2html::{
    convert, convert_to_file, inspect, ConversionConfig, ConversionProgressCallback,
    ConverterKind, PageSelection, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::info;
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

/// Live progress bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner only; `on_conversion_start` sets the length.
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
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
    }

    fn page_elapsed_secs(&self, page_num: usize) -> f64 {
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
            bold(&format!("Starting conversion of {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, html_len: usize) {
        let elapsed = self.page_elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{html_len:>7} bytes")),
            dim(&format!("{elapsed:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed = self.page_elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{elapsed:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages converted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages converted  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service (container entry point)
  pdf2html serve

  # Same, on another port with four workers
  PORT=9000 WORKERS=4 pdf2html serve

  # Convert a file (stdout)
  pdf2html convert document.pdf

  # Convert to file with the overlay converter
  pdf2html convert --converter overlay --dpi 200 paper.pdf -o paper.html

  # Convert from URL, selected pages only
  pdf2html convert --pages 1-5 https://arxiv.org/pdf/1706.03762 -o attention.html

  # Print PDF metadata
  pdf2html inspect document.pdf

  # Upload to a running service
  curl -F file=@document.pdf http://localhost:8080/convert > document.html

SERVICE ENVIRONMENT (serve):
  PORT                       Listening port (default 8080)
  HOST                       Bind address (default 0.0.0.0)
  WORKERS                    Worker threads and conversion slots (default 1)
  FLASK_APP                  Application name reported by /health
  CONVERTER                  native | overlay | pdf2htmlex
  USE_ALTERNATIVE_CONVERTER  1 selects the overlay converter
  TIMEOUT                    Per-request timeout in seconds, 0 disables (default 120)
  MAX_UPLOAD_MB              Request body limit (default 50)
  SCRATCH_DIR                Directory for temporary files
  REQUIRE_NON_ROOT           1 refuses to start as root
  DPI                        Overlay raster resolution (default 150)

NATIVE DEPENDENCIES:
  PDFIUM_LIB_PATH            Path to libpdfium (else ./, then the system library)
  PDF2HTMLEX_BIN             Path to pdf2htmlEX (else looked up on PATH)

LOGGING:
  RUST_LOG                   Log filter (default info)
  LOG_FORMAT=json            JSON log lines (same as --log-json)
"#;

/// Convert PDF documents to self-contained HTML.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2html",
    version,
    about = "Convert PDF documents to self-contained HTML",
    long_about = "Convert PDF documents to self-contained HTML with pdfium or pdf2htmlEX. \
Runs as an HTTP service (`serve`) or converts single files from the command line.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2HTML_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF2HTML_QUIET")]
    quiet: bool,

    /// Emit JSON log lines.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (`POST /convert`, `GET /health`).
    Serve(ServeArgs),
    /// Convert a local PDF or URL to HTML.
    Convert(ConvertArgs),
    /// Print PDF metadata without converting.
    Inspect(InspectArgs),
}

/// Flags override the environment read by `ServerConfig::from_env`.
#[derive(Args, Debug)]
struct ServeArgs {
    /// Listening port.
    #[arg(long)]
    port: Option<u16>,

    /// Bind address.
    #[arg(long)]
    host: Option<IpAddr>,

    /// Worker threads and concurrent conversion slots.
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=1024))]
    workers: Option<u16>,

    /// Converter backend.
    #[arg(long, value_enum)]
    converter: Option<ConverterArg>,

    /// Per-request timeout in seconds (0 disables it).
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write HTML to this file instead of stdout.
    #[arg(short, long, env = "PDF2HTML_OUTPUT")]
    output: Option<PathBuf>,

    /// Converter backend.
    #[arg(long, env = "PDF2HTML_CONVERTER", value_enum, default_value = "native")]
    converter: ConverterArg,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2HTML_PAGES", default_value = "all")]
    pages: String,

    /// Raster resolution for the overlay converter (72–400).
    #[arg(long, env = "PDF2HTML_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2HTML_PASSWORD")]
    password: Option<String>,

    /// Document title (defaults to the PDF's own title).
    #[arg(long, env = "PDF2HTML_TITLE")]
    title: Option<String>,

    /// Leave images out of the native converter's output.
    #[arg(long, env = "PDF2HTML_NO_IMAGES")]
    no_images: bool,

    /// Multiplier applied to font sizes in the overlay text layer.
    #[arg(long, env = "PDF2HTML_FONT_SCALE", default_value_t = 0.8)]
    font_scale: f32,

    /// Whole-conversion timeout in seconds (0 disables it).
    #[arg(long, env = "PDF2HTML_TIMEOUT", default_value_t = 0)]
    timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2HTML_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Path to the pdf2htmlEX executable.
    #[arg(long, env = "PDF2HTMLEX_BIN")]
    pdf2htmlex_bin: Option<PathBuf>,

    /// Extra argument passed to pdf2htmlEX (repeatable).
    #[arg(long = "tool-arg", allow_hyphen_values = true)]
    tool_args: Vec<String>,

    /// Output structured JSON (ConversionOutput) instead of HTML.
    #[arg(long, env = "PDF2HTML_JSON")]
    json: bool,

    /// Exit non-zero if any page failed.
    #[arg(long)]
    strict: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2HTML_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Print metadata as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ConverterArg {
    Native,
    Overlay,
    Pdf2htmlex,
}

impl From<ConverterArg> for ConverterKind {
    fn from(v: ConverterArg) -> Self {
        match v {
            ConverterArg::Native => ConverterKind::Native,
            ConverterArg::Overlay => ConverterKind::Overlay,
            ConverterArg::Pdf2htmlex => ConverterKind::Pdf2HtmlEx,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(ref args) => {
            init_logging(&cli, default_filter(&cli, false));
            serve(args)
        }
        Command::Convert(ref args) => {
            let show_progress = !cli.quiet && !args.no_progress && !args.json;
            init_logging(&cli, default_filter(&cli, show_progress));
            build_runtime(None)?.block_on(run_convert(&cli, args, show_progress))
        }
        Command::Inspect(ref args) => {
            init_logging(&cli, default_filter(&cli, false));
            build_runtime(None)?.block_on(run_inspect(args))
        }
    }
}

// ── Logging setup ────────────────────────────────────────────────────────────

/// INFO-level library logs are suppressed while the progress bar is active.
fn default_filter(cli: &Cli, show_progress: bool) -> &'static str {
    if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    }
}

fn init_logging(cli: &Cli, default_filter: &str) {
    let json = cli.log_json
        || std::env::var("LOG_FORMAT").is_ok_and(|v| v.trim().eq_ignore_ascii_case("json"));
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_runtime(worker_threads: Option<usize>) -> Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(n) = worker_threads {
        builder.worker_threads(n);
    }
    builder
        .enable_all()
        .build()
        .context("Failed to build the tokio runtime")
}

// ── serve ────────────────────────────────────────────────────────────────────

fn serve(args: &ServeArgs) -> Result<()> {
    let mut config = ServerConfig::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(workers) = args.workers {
        config.workers = usize::from(workers);
    }
    if let Some(converter) = args.converter {
        config.converter = converter.into();
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    config.log_summary();

    let runtime = build_runtime(Some(config.workers))?;
    runtime.block_on(async move {
        Server::builder()
            .config(config)
            .build()
            .context("Invalid service configuration")?
            .bind()
            .await
            .context("Failed to start the service")?
            .run()
            .await
            .context("Service stopped with an error")
    })?;
    info!("Bye");
    Ok(())
}

// ── convert ──────────────────────────────────────────────────────────────────

async fn run_convert(cli: &Cli, args: &ConvertArgs, show_progress: bool) -> Result<()> {
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(args, progress_cb)?;

    if let Some(ref output_path) = args.output {
        let stats = convert_to_file(&args.input, output_path, &config)
            .await
            .context("Conversion failed")?;

        if !cli.quiet {
            eprintln!(
                "{}  {}/{} pages  {} bytes  {}ms  →  {}",
                if stats.failed_pages == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                stats.processed_pages,
                stats.processed_pages + stats.failed_pages,
                stats.html_bytes,
                stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
        if args.strict && stats.failed_pages > 0 {
            anyhow::bail!("{} page(s) failed to convert", stats.failed_pages);
        }
        return Ok(());
    }

    let output = convert(&args.input, &config)
        .await
        .context("Conversion failed")?;

    if args.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.html.as_bytes())
            .context("Failed to write to stdout")?;
        if !output.html.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet && !show_progress {
        eprintln!(
            "Converted {}/{} pages in {}ms ({})",
            output.stats.processed_pages,
            output.stats.processed_pages + output.stats.failed_pages,
            output.stats.total_duration_ms,
            output.converter,
        );
        if output.stats.failed_pages > 0 {
            eprintln!("  {} pages failed", output.stats.failed_pages);
        }
    }

    if args.strict {
        output.into_result().context("Some pages failed")?;
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(args: &ConvertArgs, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let pages: PageSelection = args
        .pages
        .parse()
        .with_context(|| format!("Invalid --pages value '{}'", args.pages))?;

    let mut builder = ConversionConfig::builder()
        .converter(args.converter.into())
        .dpi(args.dpi)
        .pages(pages)
        .embed_images(!args.no_images)
        .font_scale(args.font_scale)
        .timeout_secs(args.timeout)
        .download_timeout_secs(args.download_timeout)
        .tool_args(args.tool_args.clone());

    if let Some(ref pwd) = args.password {
        builder = builder.password(pwd);
    }
    if let Some(ref title) = args.title {
        builder = builder.title(title);
    }
    if let Some(ref lib) = args.pdfium_lib {
        builder = builder.pdfium_library(lib);
    }
    if let Some(ref bin) = args.pdf2htmlex_bin {
        builder = builder.pdf2htmlex_bin(bin);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

// ── inspect ──────────────────────────────────────────────────────────────────

async fn run_inspect(args: &InspectArgs) -> Result<()> {
    let meta = inspect(&args.input)
        .await
        .context("Failed to inspect PDF")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
        );
        return Ok(());
    }

    println!("File:         {}", args.input);
    let fields = [
        ("Title", &meta.title),
        ("Author", &meta.author),
        ("Subject", &meta.subject),
        ("Creator", &meta.creator),
        ("Producer", &meta.producer),
        ("Created", &meta.creation_date),
        ("Modified", &meta.modification_date),
    ];
    for (label, value) in fields {
        if let Some(v) = value {
            println!("{:<14}{}", format!("{label}:"), v);
        }
    }
    println!("Pages:        {}", meta.page_count);
    println!("PDF Version:  {}", meta.pdf_version);
    Ok(())
}
