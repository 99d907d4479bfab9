//! CLI binary for edgequake-pdfqa.
//!
//! `pdfqa serve` runs the HTTP envelope service; `pdfqa ask` ingests one PDF
//! and answers one question from the terminal. Both map the shared flags onto
//! `AnalyzerConfig`.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_pdfqa::server::{self, DEFAULT_MAX_BODY_MB};
use edgequake_pdfqa::{
    AnalyzerConfig, IngestOutcome, IngestProgressCallback, PdfAnalyzer, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

/// Terminal progress for OCR: a spinner until the page count is known, then a
/// bar with one log line per recognised page. Pages may finish out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Rendering PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&page_num)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Leave the bar on screen if ingestion stopped early.
    fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}

impl IngestProgressCallback for CliProgressCallback {
    fn on_ingest_start(&self, filename: &str, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("OCR");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reading {filename} ({total_pages} pages)…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(page_num, Instant::now());
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_recognized(&self, page_num: usize, total: usize, text_len: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_ingest_complete(&self, filename: &str, total_pages: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages of {} read",
            green("✔"),
            bold(&total_pages.to_string()),
            filename
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the JSON envelope protocol on :8000
  pdfqa serve --port 8000

  # Ingest then query over HTTP
  curl -s localhost:8000/mcp/ -d '{"operation":"ingest_pdf",
    "payload":{"file":"'"$(base64 -w0 report.pdf)"'"},
    "context":{"filename":"report.pdf"}}'
  curl -s localhost:8000/mcp/ -d '{"operation":"query_pdf",
    "payload":{"question":"explain the table on page 2"},
    "context":{"filename":"report.pdf"}}'

  # One-shot question from the terminal
  pdfqa ask report.pdf explain the diagram of the cooling loop

  # Use a specific model
  pdfqa --model gpt-4.1-mini --provider openai ask scan.pdf summarise section 3

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (otherwise the system library is used)

SETUP:
  1. Install tesseract and a language pack (e.g. apt install tesseract-ocr-eng)
  2. Install pdfium or point PDFIUM_LIB_PATH at it
  3. Set an API key:  export OPENAI_API_KEY=sk-...
"#;

/// Ask questions about scanned PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "pdfqa",
    version,
    about = "Ask questions about scanned PDFs with OCR and an LLM",
    long_about = "Ingest PDFs (OCR via tesseract) and answer questions about them: a language \
model selects the relevant pages, then analyses each one with a diagram, table or general \
prompt. Runs as an HTTP service or as a one-shot command.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    analyzer: AnalyzerArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFQA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFQA_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON envelope protocol over HTTP.
    Serve {
        #[arg(long, env = "PDFQA_HOST", default_value = "127.0.0.1")]
        host: IpAddr,

        #[arg(long, env = "PDFQA_PORT", default_value_t = 8000)]
        port: u16,

        /// Maximum request body size in MiB.
        #[arg(long, env = "PDFQA_MAX_BODY_MB", default_value_t = DEFAULT_MAX_BODY_MB)]
        max_body_mb: usize,
    },

    /// Ingest one PDF and answer one question.
    Ask {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// The question; remaining words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Print the full QueryResult as JSON.
        #[arg(long, env = "PDFQA_JSON")]
        json: bool,

        /// Disable the OCR progress bar.
        #[arg(long, env = "PDFQA_NO_PROGRESS")]
        no_progress: bool,
    },
}

#[derive(Args, Debug)]
struct AnalyzerArgs {
    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, global = true, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, global = true, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Rendering DPI for OCR (72–600).
    #[arg(long, global = true, env = "PDFQA_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Tesseract language(s), e.g. eng or eng+deu.
    #[arg(long, global = true, env = "PDFQA_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Pages recognised in parallel.
    #[arg(long, global = true, env = "PDFQA_OCR_CONCURRENCY", default_value_t = 4)]
    ocr_concurrency: usize,

    /// Per-page OCR timeout in seconds.
    #[arg(long, global = true, env = "PDFQA_OCR_TIMEOUT", default_value_t = 120)]
    ocr_timeout: u64,

    /// Pages analysed in parallel per question.
    #[arg(short, long, global = true, env = "PDFQA_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, global = true, env = "PDFQA_PASSWORD")]
    password: Option<String>,

    /// Path to libpdfium.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Max LLM output tokens per call.
    #[arg(long, global = true, env = "PDFQA_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, global = true, env = "PDFQA_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Retries per OCR page or LLM call on transient failure.
    #[arg(long, global = true, env = "PDFQA_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, global = true, env = "PDFQA_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Whole-ingest timeout in seconds.
    #[arg(long, global = true, env = "PDFQA_INGEST_TIMEOUT", default_value_t = 1800)]
    ingest_timeout: u64,

    /// Whole-query timeout in seconds.
    #[arg(long, global = true, env = "PDFQA_QUERY_TIMEOUT", default_value_t = 300)]
    query_timeout: u64,

    /// HTTP download timeout in seconds (URL inputs to `ask`).
    #[arg(long, global = true, env = "PDFQA_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs for `ask`; `serve` keeps them.
    let show_progress = match cli.command {
        Command::Ask {
            json, no_progress, ..
        } => !cli.quiet && !no_progress && !json,
        Command::Serve { .. } => false,
    };
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

    match cli.command {
        Command::Serve {
            host,
            port,
            max_body_mb,
        } => {
            let config = build_config(&cli.analyzer, None)?;
            let analyzer =
                PdfAnalyzer::from_config(config).context("Failed to initialise analyzer")?;
            let addr = SocketAddr::new(host, port);
            server::serve(Arc::new(analyzer), addr, max_body_mb * 1024 * 1024)
                .await
                .with_context(|| format!("Server on {addr} failed"))?;
        }
        Command::Ask {
            ref input,
            ref question,
            json,
            ..
        } => {
            let progress = show_progress.then(CliProgressCallback::new);
            let callback = progress
                .clone()
                .map(|cb| cb as Arc<dyn IngestProgressCallback>);
            let config = build_config(&cli.analyzer, callback)?;
            let analyzer =
                PdfAnalyzer::from_config(config).context("Failed to initialise analyzer")?;

            let ingested = analyzer.ingest_input(input).await;
            if let Some(ref cb) = progress {
                cb.abandon();
            }
            let (filename, outcome) = ingested.context("Ingestion failed")?;
            if let IngestOutcome::Ingested { page_count } = outcome {
                if !cli.quiet && !show_progress && !json {
                    eprintln!("Ingested {filename}: {page_count} pages");
                }
            }

            let question = question.join(" ");
            let start = Instant::now();
            let result = analyzer
                .query(&filename, &question)
                .await
                .context("Query failed")?;

            if json {
                let out =
                    serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
                println!("{out}");
            } else {
                let text = if result.has_relevant_pages() {
                    result.response.as_str()
                } else {
                    edgequake_pdfqa::output::NO_RELEVANT_PAGES_MESSAGE
                };
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(text.as_bytes())
                    .context("Failed to write to stdout")?;
                if !text.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
                if !cli.quiet {
                    eprintln!(
                        "{}",
                        dim(&format!(
                            "pages {:?}  ·  {:.1}s",
                            result.pages,
                            start.elapsed().as_secs_f64()
                        ))
                    );
                }
            }
        }
    }

    Ok(())
}

/// Map CLI args to `AnalyzerConfig`.
fn build_config(args: &AnalyzerArgs, progress: Option<ProgressCallback>) -> Result<AnalyzerConfig> {
    let mut builder = AnalyzerConfig::builder()
        .dpi(args.dpi)
        .ocr_language(args.ocr_lang.clone())
        .ocr_concurrency(args.ocr_concurrency)
        .ocr_timeout_secs(args.ocr_timeout)
        .concurrency(args.concurrency)
        .max_tokens(args.max_tokens)
        .temperature(args.temperature)
        .max_retries(args.max_retries)
        .api_timeout_secs(args.api_timeout)
        .ingest_timeout_secs(args.ingest_timeout)
        .query_timeout_secs(args.query_timeout)
        .download_timeout_secs(args.download_timeout);

    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref password) = args.password {
        builder = builder.password(password.clone());
    }
    if let Some(ref path) = args.pdfium_lib {
        builder = builder.pdfium_library(path.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
