//! CLI binary for nutrient-dws.
//!
//! A thin shim over the library crate that maps subcommands onto
//! `DwsClient` operations and writes results to a file or stdout.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use nutrient_dws::{
    ClientConfig, DwsClient, Orientation, PageLayout, PageRange, RedactionOptions,
    WatermarkOptions, API_KEY_ENV,
};
use serde_json::{Map, Value};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Office document to PDF
  dws convert report.docx -o report.pdf

  # Searchable PDF from a scan
  dws ocr scan.pdf --language deu -o scan-ocr.pdf

  # Several steps in one request
  dws run scan.pdf --step ocr-pdf --step 'rotate-pages={"degrees":90}' -o out.pdf

  # Merge in order
  dws merge a.pdf b.pdf c.pdf -o merged.pdf

  # Split into two files
  dws split book.pdf --range 0:10 --range 10: -o part1.pdf -o part2.pdf

ENVIRONMENT VARIABLES:
  NUTRIENT_API_KEY   API key (overridden by --api-key)
  DWS_BASE_URL       Service root (default https://api.pspdfkit.com)
  RUST_LOG           Log filter, e.g. nutrient_dws=debug
"#;

#[derive(Parser, Debug)]
#[command(
    name = "dws",
    version,
    about = "Process documents with the Nutrient Document Web Services API",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    #[arg(long, global = true, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, global = true, env = "DWS_BASE_URL")]
    base_url: Option<String>,

    /// Per-attempt timeout in seconds.
    #[arg(long, global = true, env = "DWS_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    #[arg(long, global = true, env = "DWS_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    #[arg(long, global = true, env = "DWS_NO_PROGRESS")]
    no_progress: bool,

    #[arg(short, long, global = true, env = "DWS_VERBOSE")]
    verbose: bool,

    #[arg(short, long, global = true, env = "DWS_QUIET")]
    quiet: bool,
}

#[derive(Args, Debug)]
struct Io {
    input: PathBuf,

    /// Output file; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert an Office document or image to PDF.
    Convert(Io),

    /// Make a scanned PDF searchable.
    Ocr {
        #[command(flatten)]
        io: Io,
        #[arg(long, default_value = "english")]
        language: String,
    },

    /// Rotate pages clockwise.
    Rotate {
        #[command(flatten)]
        io: Io,
        #[arg(long, default_value_t = 90)]
        degrees: i32,
        /// Pages to rotate (0-based); all pages when omitted.
        #[arg(long, value_delimiter = ',')]
        pages: Option<Vec<i64>>,
    },

    /// Stamp a text or image watermark.
    Watermark {
        #[command(flatten)]
        io: Io,
        #[arg(long, conflicts_with = "image_url", required_unless_present = "image_url")]
        text: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
        #[arg(long)]
        opacity: Option<f64>,
        #[arg(long)]
        position: Option<String>,
    },

    /// Flatten annotations and form fields.
    Flatten(Io),

    /// Redact every occurrence of a text, regex or preset.
    Redact {
        #[command(flatten)]
        io: Io,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        regex: Option<String>,
        #[arg(long)]
        preset: Option<String>,
        /// Only mark matches; do not remove content.
        #[arg(long)]
        mark_only: bool,
    },

    /// Split into one file per range (`start:end`, end exclusive and optional).
    Split {
        input: PathBuf,
        #[arg(long = "range", value_parser = parse_range)]
        ranges: Vec<PageRange>,
        /// One output per range.
        #[arg(short, long = "output", required = true)]
        outputs: Vec<PathBuf>,
    },

    /// Remove pages (0-based).
    Delete {
        #[command(flatten)]
        io: Io,
        #[arg(long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
        pages: Vec<i64>,
    },

    /// Build a document from the listed pages, repeats allowed.
    Duplicate {
        #[command(flatten)]
        io: Io,
        #[arg(long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
        pages: Vec<i64>,
    },

    /// Insert blank pages.
    AddPage {
        #[command(flatten)]
        io: Io,
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// Insert after this page (0-based); at the end when omitted.
        #[arg(long)]
        after: Option<i64>,
        #[arg(long)]
        landscape: bool,
        #[arg(long, default_value = "A4")]
        size: String,
    },

    /// Concatenate documents in order.
    Merge {
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run several tools in one request: `--step tool` or `--step 'tool={json}'`.
    Run {
        #[command(flatten)]
        io: Io,
        #[arg(long = "step", required = true)]
        steps: Vec<String>,
        /// Output options as a JSON object.
        #[arg(long)]
        output_options: Option<String>,
    },
}

fn parse_range(s: &str) -> std::result::Result<PageRange, String> {
    let (start, end) = s
        .split_once(':')
        .ok_or_else(|| format!("expected start:end, got '{s}'"))?;
    let start: i64 = start
        .trim()
        .parse()
        .map_err(|e| format!("bad range start '{start}': {e}"))?;
    let end = end.trim();
    if end.is_empty() {
        Ok(PageRange::from_start(start))
    } else {
        let end: i64 = end.parse().map_err(|e| format!("bad range end '{end}': {e}"))?;
        Ok(PageRange::new(start, end))
    }
}

fn parse_step(step: &str) -> Result<(String, Value)> {
    match step.split_once('=') {
        None => Ok((step.to_string(), Value::Null)),
        Some((tool, json)) => {
            let options: Value = serde_json::from_str(json)
                .with_context(|| format!("Invalid JSON options for step '{tool}'"))?;
            Ok((tool.to_string(), options))
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let g = &cli.global;

    let show_progress = !g.quiet && !g.no_progress;
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || show_progress {
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

    let mut builder = ClientConfig::builder()
        .timeout_secs(g.timeout)
        .max_retries(g.max_retries);
    if let Some(ref key) = g.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref url) = g.base_url {
        builder = builder.base_url(url.clone());
    }
    let config = builder.build().context("Invalid client configuration")?;
    let mut client = DwsClient::with_config(config).context("Failed to create client")?;

    let spinner = show_progress.then(|| spinner(command_label(&cli.command)));
    let start = Instant::now();
    let written = run(&client, &cli.command);
    if let Some(ref bar) = spinner {
        bar.finish_and_clear();
    }
    client.close();
    let written = written?;

    if !g.quiet {
        for path in &written {
            eprintln!(
                "{}  {}  {}",
                green("✔"),
                bold(&path.display().to_string()),
                dim(&format!("{}ms", start.elapsed().as_millis())),
            );
        }
    }
    Ok(())
}

/// Execute the command; returns the files written.
fn run(client: &DwsClient, command: &Command) -> Result<Vec<PathBuf>> {
    let (result, output) = match command {
        Command::Convert(io) => (client.convert_to_pdf(&*io.input, out(io))?, &io.output),
        Command::Ocr { io, language } => (client.ocr_pdf(&*io.input, language, out(io))?, &io.output),
        Command::Rotate { io, degrees, pages } => (
            client.rotate_pages(&*io.input, *degrees, pages.clone(), out(io))?,
            &io.output,
        ),
        Command::Watermark {
            io,
            text,
            image_url,
            opacity,
            position,
        } => {
            let options = WatermarkOptions {
                text: text.clone(),
                image_url: image_url.clone(),
                opacity: *opacity,
                position: position.clone(),
                ..WatermarkOptions::default()
            };
            (client.watermark_pdf(&*io.input, options, out(io))?, &io.output)
        }
        Command::Flatten(io) => (client.flatten_annotations(&*io.input, out(io))?, &io.output),
        Command::Redact {
            io,
            text,
            regex,
            preset,
            mark_only,
        } => {
            let options = match (text, regex, preset) {
                (Some(t), _, _) => RedactionOptions::text(t.clone()),
                (_, Some(r), _) => RedactionOptions::regex(r.clone()),
                (_, _, Some(p)) => RedactionOptions::preset(p.clone()),
                _ => bail!("one of --text, --regex or --preset is required"),
            };
            let mut wf = client
                .build(&*io.input)
                .add_tool(nutrient_dws::Tool::CreateRedactions(options))?;
            if !*mark_only {
                wf = wf.add_tool(nutrient_dws::Tool::ApplyRedactions)?;
            }
            (wf.execute(out(io))?, &io.output)
        }
        Command::Split {
            input,
            ranges,
            outputs,
        } => {
            let ranges = (!ranges.is_empty()).then_some(ranges.as_slice());
            client
                .split_pdf(&**input, ranges, Some(outputs.as_slice()))
                .context("Split failed")?;
            return Ok(outputs.clone());
        }
        Command::Delete { io, pages } => {
            (client.delete_pdf_pages(&*io.input, pages, out(io))?, &io.output)
        }
        Command::Duplicate { io, pages } => (
            client.duplicate_pdf_pages(&*io.input, pages, out(io))?,
            &io.output,
        ),
        Command::AddPage {
            io,
            count,
            after,
            landscape,
            size,
        } => {
            let layout = PageLayout {
                orientation: if *landscape {
                    Orientation::Landscape
                } else {
                    Orientation::Portrait
                },
                size: size.clone(),
                ..PageLayout::default()
            };
            (
                client.add_page(&*io.input, *count, *after, layout, out(io))?,
                &io.output,
            )
        }
        Command::Merge { inputs, output } => {
            let inputs = inputs.iter().map(|p| p.as_path());
            (client.merge_pdfs(inputs, output.as_deref())?, output)
        }
        Command::Run {
            io,
            steps,
            output_options,
        } => {
            let mut wf = client.build(&*io.input);
            for step in steps {
                let (tool, options) = parse_step(step)?;
                wf = wf
                    .add_step(&tool, options)
                    .with_context(|| format!("Invalid step '{tool}'"))?;
            }
            if let Some(raw) = output_options {
                let options: Map<String, Value> =
                    serde_json::from_str(raw).context("--output-options must be a JSON object")?;
                wf = wf.set_output_options(options);
            }
            (wf.execute(out(io))?, &io.output)
        }
    };

    match (result, output) {
        (Some(bytes), None) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(&bytes)
                .context("Failed to write to stdout")?;
            handle.flush().ok();
            Ok(Vec::new())
        }
        (_, Some(path)) => Ok(vec![path.clone()]),
        (None, None) => Ok(Vec::new()),
    }
}

fn out(io: &Io) -> Option<&Path> {
    io.output.as_deref()
}

fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Convert(_) => "Converting",
        Command::Ocr { .. } => "Running OCR",
        Command::Rotate { .. } => "Rotating",
        Command::Watermark { .. } => "Watermarking",
        Command::Flatten(_) => "Flattening",
        Command::Redact { .. } => "Redacting",
        Command::Split { .. } => "Splitting",
        Command::Delete { .. } => "Deleting pages",
        Command::Duplicate { .. } => "Duplicating pages",
        Command::AddPage { .. } => "Adding pages",
        Command::Merge { .. } => "Merging",
        Command::Run { .. } => "Processing",
    }
}

fn spinner(prefix: &'static str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {elapsed}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
    bar.set_style(style);
    bar.set_prefix(prefix);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_parse() {
        assert_eq!(parse_range("0:3").unwrap(), PageRange::new(0, 3));
        assert_eq!(parse_range("5:").unwrap(), PageRange::from_start(5));
        assert!(parse_range("5").is_err());
    }

    #[test]
    fn steps_parse() {
        let (tool, opts) = parse_step(r#"rotate-pages={"degrees":90}"#).unwrap();
        assert_eq!(tool, "rotate-pages");
        assert_eq!(opts["degrees"], 90);
        let (tool, opts) = parse_step("flatten-annotations").unwrap();
        assert_eq!(tool, "flatten-annotations");
        assert!(opts.is_null());
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
