//! CLI commands implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use prospectus::config::Settings;
use prospectus::ocr::{check_tools, extract_text, PdfEngine, PopplerEngine};
use prospectus::scrapers::NoBrowser;
use prospectus::span::detect_span;
use prospectus::{AcquireError, Acquirer};

#[derive(Parser)]
#[command(name = "prospectus")]
#[command(about = "Property prospectus acquisition and condition-report isolation")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ./prospectus.toml when present)
    #[arg(long, global = true, env = "PROSPECTUS_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for artifacts and failcases
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// User agent string, or "impersonate"
    #[arg(long, global = true)]
    user_agent: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    request_timeout: Option<u64>,

    /// Skip the headless-browser stage
    #[arg(long, global = true)]
    no_browser: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire the prospectus for a listing and persist it
    Acquire {
        /// Listing URL (e.g. a finn.no ad)
        url: String,
        /// Return the isolated condition report when one is found
        #[arg(long)]
        isolated: bool,
        /// Fetch only; skip span detection and persistence
        #[arg(long)]
        no_persist: bool,
        /// Write the returned document here
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the accumulated debug metadata as JSON
        #[arg(long)]
        debug: bool,
    },

    /// Locate the condition report inside a local PDF
    DetectSpan {
        file: PathBuf,
    },

    /// Print the text of a local PDF
    ExtractText {
        file: PathBuf,
    },

    /// Report availability of external tools
    CheckTools,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    match cli.command {
        Commands::Acquire {
            url,
            isolated,
            no_persist,
            output,
            debug,
        } => {
            cmd_acquire(
                settings,
                cli.no_browser,
                &url,
                isolated,
                no_persist,
                output.as_deref(),
                debug,
            )
            .await
        }
        Commands::DetectSpan { file } => cmd_detect_span(&settings, &file),
        Commands::ExtractText { file } => cmd_extract_text(&file),
        Commands::CheckTools => {
            cmd_check_tools();
            Ok(())
        }
    }
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = dir.clone();
    }
    if let Some(ua) = &cli.user_agent {
        settings.user_agent = Some(ua.clone());
    }
    if let Some(secs) = cli.request_timeout {
        settings.request_timeout_seconds = secs;
    }
    if cli.no_browser {
        settings.browser.enabled = false;
    }
    settings.validate()?;
    Ok(settings)
}

async fn cmd_acquire(
    settings: Settings,
    no_browser: bool,
    url: &str,
    isolated: bool,
    no_persist: bool,
    output: Option<&Path>,
    show_debug: bool,
) -> anyhow::Result<()> {
    let prefer_isolated = isolated || settings.prefer_isolated_report;
    let mut acquirer = Acquirer::new(settings)?;
    if no_browser {
        acquirer = acquirer.with_browser(Arc::new(NoBrowser));
    }

    let result = if no_persist {
        acquirer.acquire_prospectus(url).await.map(|a| (a, None))
    } else {
        acquirer
            .acquire_and_persist(url, prefer_isolated)
            .await
            .map(|(a, outcome)| (a, Some(outcome)))
    };

    let (acquisition, outcome) = match result {
        Ok(ok) => ok,
        Err(e) => {
            report_failure(&e, show_debug)?;
            return Err(e.into());
        }
    };

    println!("Listing:  {}", acquisition.listing.listing_code);
    println!("Source:   {}", acquisition.source_url);
    println!("Bytes:    {}", acquisition.bytes.len());
    if let Some(outcome) = &outcome {
        if let Some(bundle) = &outcome.bundle {
            println!("Bundle:   {}", bundle.path.display());
        }
        if let Some(report) = &outcome.isolated {
            match report.page_range {
                Some((start, end)) => println!(
                    "Report:   {} (pages {}-{})",
                    report.path.display(),
                    start + 1,
                    end + 1
                ),
                None => println!("Report:   {}", report.path.display()),
            }
        }
        match outcome.returned_artifact() {
            Some(artifact) => println!(
                "Returned: {} ({})",
                outcome.returned.as_str(),
                artifact.path.display()
            ),
            None => println!("Returned: {}", outcome.returned.as_str()),
        }
    }

    if let Some(path) = output {
        std::fs::write(path, &acquisition.bytes)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    if show_debug {
        println!("{}", serde_json::to_string_pretty(&acquisition.debug)?);
    }
    Ok(())
}

fn report_failure(error: &AcquireError, show_debug: bool) -> anyhow::Result<()> {
    eprintln!(
        "Acquisition failed at step {}: {}",
        error.step().unwrap_or("unknown"),
        error
    );
    if show_debug {
        eprintln!("{}", serde_json::to_string_pretty(error.debug())?);
    }
    Ok(())
}

fn read_pdf(file: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(file).with_context(|| format!("reading {}", file.display()))
}

fn cmd_detect_span(settings: &Settings, file: &Path) -> anyhow::Result<()> {
    let bytes = read_pdf(file)?;
    let engine = PopplerEngine::new();
    let pages = engine.page_texts(&bytes)?;

    match detect_span(&pages, &settings.thresholds) {
        Some(span) => {
            println!(
                "Pages {}-{} of {} via {}",
                span.start + 1,
                span.end + 1,
                pages.len(),
                span.method.as_str()
            );
            println!("{}", serde_json::to_string_pretty(&span.confidence_meta)?);
        }
        None => println!("No condition report found in {} pages", pages.len()),
    }
    Ok(())
}

fn cmd_extract_text(file: &Path) -> anyhow::Result<()> {
    let bytes = read_pdf(file)?;
    let text = extract_text(&PopplerEngine::new(), &bytes)?;
    println!("{}", text);
    Ok(())
}

fn cmd_check_tools() {
    println!("External tools:");
    for (tool, available) in check_tools() {
        println!(
            "  {:<12} {}",
            tool,
            if available { "found" } else { "missing" }
        );
    }
}
