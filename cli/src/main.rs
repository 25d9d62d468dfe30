//! pdftext CLI - hybrid PDF text extraction tool

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;

use pdftext::service::ResolvedRequest;
use pdftext::{
    DocumentPipeline, ExtractRequest, ExtractResponse, ExtractService, ExtractionRuleSet,
    LayoutBackend, LopdfBackend, OcrConfig, PipelineOptions, ResponseMode, Submission, TableScope,
    TableSettings, TextSource,
};

#[derive(Parser)]
#[command(name = "pdftext")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Extract text, fields and tables from PDFs, with OCR fallback", long_about = None)]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Pipeline configuration shared by all subcommands.
#[derive(Args)]
struct EngineArgs {
    /// Never run OCR, even for pages without a text layer
    #[arg(long, global = true)]
    no_ocr: bool,

    /// OCR rendering resolution
    #[arg(long, global = true, env = "PDFTEXT_OCR_DPI", default_value_t = pdftext::ocr::DEFAULT_OCR_DPI)]
    dpi: u32,

    /// Tesseract language codes (e.g. "eng+deu")
    #[arg(long, global = true, env = "PDFTEXT_OCR_LANG", default_value = "eng")]
    lang: String,

    /// Tesseract page segmentation mode
    #[arg(long, global = true, default_value_t = 3)]
    psm: u32,

    /// Resolve pages in parallel
    #[arg(long, global = true)]
    parallel: bool,

    /// Per-document time budget in seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the whole-document text of a PDF
    Text {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print per-page text as JSON
    Pages {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Extract key/value fields and tables as JSON
    Fields {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Extraction rules: inline JSON object or path to a JSON file
        #[arg(short, long, value_name = "JSON|FILE")]
        rules: Option<String>,

        /// Table settings: inline JSON object or path to a JSON file
        #[arg(short, long, value_name = "JSON|FILE")]
        tables: Option<String>,

        /// Search every page for tables, not just the first
        #[arg(long)]
        all_pages: bool,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Process a JSON request body (batch, single-file or list shape)
    Request {
        /// Request JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Response envelope
        #[arg(short, long, value_enum, default_value = "text")]
        mode: Mode,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show page count and where each page's text comes from
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// {"raw_text"} per item
    Text,
    /// {"data": [{"pagenumber", "raw_text"}]} per item
    Pages,
    /// {"text_fields", "tables", "raw_text"} per item
    Fields,
}

impl From<Mode> for ResponseMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Text => ResponseMode::Text,
            Mode::Pages => ResponseMode::Pages,
            Mode::Fields => ResponseMode::Fields,
        }
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Text { input, output } => cmd_text(&cli.engine, &input, output.as_deref()),
        Commands::Pages {
            input,
            output,
            compact,
        } => cmd_pages(&cli.engine, &input, output.as_deref(), compact),
        Commands::Fields {
            input,
            rules,
            tables,
            all_pages,
            output,
            compact,
        } => cmd_fields(
            &cli.engine,
            &input,
            rules.as_deref(),
            tables.as_deref(),
            all_pages,
            output.as_deref(),
            compact,
        ),
        Commands::Request {
            input,
            mode,
            output,
            compact,
        } => cmd_request(&cli.engine, &input, mode.into(), output.as_deref(), compact),
        Commands::Info { input } => cmd_info(&cli.engine, &input),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn build_service(engine: &EngineArgs, table_scope: TableScope) -> ExtractService {
    let mut options = PipelineOptions::new()
        .with_parallel(engine.parallel)
        .with_table_scope(table_scope);
    if let Some(secs) = engine.timeout {
        options = options.with_deadline(Duration::from_secs(secs));
    }

    let pipeline = if engine.no_ocr {
        DocumentPipeline::lopdf()
    } else {
        let config = OcrConfig::new()
            .with_dpi(engine.dpi)
            .with_language(engine.lang.clone())
            .with_page_segmentation_mode(engine.psm);
        DocumentPipeline::with_tesseract(config)
    };

    ExtractService::new(pipeline.with_options(options))
}

fn upload(input: &Path) -> Result<Submission, Box<dyn std::error::Error>> {
    let bytes = fs::read(input)?;
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());
    Ok(Submission::upload(name, bytes))
}

/// Parse an argument that is either inline JSON or a path to a JSON file.
fn load_json_arg<T: DeserializeOwned>(value: &str) -> Result<T, Box<dyn std::error::Error>> {
    let text = if value.trim_start().starts_with('{') {
        value.to_string()
    } else {
        fs::read_to_string(value)?
    };
    Ok(serde_json::from_str(&text)?)
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn write_output(output: Option<&Path>, content: &str) -> CliResult {
    if let Some(path) = output {
        fs::write(path, content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

/// Fail when a single-item response carries an error marker.
fn single_item(response: ExtractResponse) -> Result<ExtractResponse, Box<dyn std::error::Error>> {
    let failure = match response.items() {
        [item] if item.is_error() => Some(serde_json::to_string(item)?),
        _ => None,
    };
    match failure {
        Some(message) => Err(message.into()),
        None => Ok(response),
    }
}

fn cmd_text(engine: &EngineArgs, input: &Path, output: Option<&Path>) -> CliResult {
    let service = build_service(engine, TableScope::FirstPage);
    let request = ResolvedRequest::upload(upload(input)?);

    let pb = spinner("Extracting text...");
    let response = single_item(service.handle_resolved(&request, ResponseMode::Text))?;
    pb.finish_and_clear();

    match response.items() {
        [pdftext::service::ItemResponse::Text { raw_text }] => write_output(output, raw_text),
        _ => write_output(output, &response.to_json(true)?),
    }
}

fn cmd_pages(engine: &EngineArgs, input: &Path, output: Option<&Path>, compact: bool) -> CliResult {
    let service = build_service(engine, TableScope::FirstPage);
    let request = ResolvedRequest::upload(upload(input)?);

    let pb = spinner("Extracting pages...");
    let response = single_item(service.handle_resolved(&request, ResponseMode::Pages))?;
    pb.finish_and_clear();

    write_output(output, &response.to_json(!compact)?)
}

fn cmd_fields(
    engine: &EngineArgs,
    input: &Path,
    rules: Option<&str>,
    tables: Option<&str>,
    all_pages: bool,
    output: Option<&Path>,
    compact: bool,
) -> CliResult {
    let scope = if all_pages {
        TableScope::AllPages
    } else {
        TableScope::FirstPage
    };
    let service = build_service(engine, scope);

    let mut request = ResolvedRequest::upload(upload(input)?);
    if let Some(rules) = rules {
        request = request.with_rules(load_json_arg::<ExtractionRuleSet>(rules)?);
    }
    if let Some(tables) = tables {
        request = request.with_table_settings(load_json_arg::<TableSettings>(tables)?);
    }

    let pb = spinner("Extracting fields...");
    let response = single_item(service.handle_resolved(&request, ResponseMode::Fields))?;
    pb.finish_and_clear();

    write_output(output, &response.to_json(!compact)?)
}

fn cmd_request(
    engine: &EngineArgs,
    input: &Path,
    mode: ResponseMode,
    output: Option<&Path>,
    compact: bool,
) -> CliResult {
    let body = fs::read_to_string(input)?;
    let request = ExtractRequest::from_json(&body)?.resolve()?;
    let service = build_service(engine, TableScope::FirstPage);

    let pb = spinner(&format!("Processing {} item(s)...", request.submissions.len()));
    let response = service.handle_resolved(&request, mode);
    pb.finish_and_clear();

    let failed = response.items().iter().filter(|i| i.is_error()).count();
    if failed > 0 {
        eprintln!(
            "{} {} of {} items failed",
            "Warning:".yellow().bold(),
            failed,
            response.items().len()
        );
    }

    write_output(output, &response.to_json(!compact)?)
}

fn cmd_info(engine: &EngineArgs, input: &Path) -> CliResult {
    let format = pdftext::detect_format_from_path(input)?;
    let backend = LopdfBackend::load_file(input)?;
    let service = build_service(engine, TableScope::FirstPage);

    let pb = spinner("Resolving pages...");
    let result = service.pipeline().extract_pages(&fs::read(input)?)?;
    pb.finish_and_clear();

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), format);
    println!("{}: {}", "Version".bold(), backend.version());
    println!("{}: {}", "Pages".bold(), backend.page_count());
    println!(
        "{}: {}",
        "OCR".bold(),
        if service.pipeline().ocr_enabled() {
            "Enabled"
        } else {
            "Disabled"
        }
    );

    println!();
    println!("{}", "Pages".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    for page in &result.pages {
        let source = match page.source {
            TextSource::Native => "native".green(),
            TextSource::Ocr => "ocr".yellow(),
            TextSource::Degraded => "degraded".red(),
        };
        println!(
            "  {:>4}  {:<8}  {} chars",
            page.page_number,
            source,
            page.text.chars().count()
        );
    }

    let stats = result.stats();
    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Native pages".bold(), stats.native_pages);
    println!("{}: {}", "OCR pages".bold(), stats.ocr_pages);
    println!("{}: {}", "Degraded pages".bold(), stats.degraded_pages);
    if stats.skipped_pages > 0 {
        println!("{}: {}", "Skipped (timeout)".bold(), stats.skipped_pages);
    }
    println!("{}: {}", "Words".bold(), result.raw_text.split_whitespace().count());
    println!("{}: {}", "Characters".bold(), stats.char_count);

    Ok(())
}
