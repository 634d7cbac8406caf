use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use inlinker_core::crawl::{CrawlEvent, CrawlOptions, CrawlProgressCallback, execute_crawl};
use inlinker_core::input::{Table, build_pairs, is_spreadsheet, unique_target_urls};
use inlinker_core::model::CrawlReport;
use inlinker_core::report::{
    ReportData, ReportFormat, generate_report, save_report, write_template_csv, write_template_xlsx,
};
use std::fmt::Display;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

pub fn print_banner() {
    println!(
        "{}",
        r#"
  _       _ _       _
 (_)_ __ | (_)_ __ | | _____ _ __
 | | '_ \| | | '_ \| |/ / _ \ '__|
 | | | | | | | | | |   <  __/ |
 |_|_| |_|_|_|_| |_|_|\_\___|_|
"#
        .bright_cyan()
        .bold()
    );
    println!(
        "  {} {}\n",
        "internal linking opportunities".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}

/// True when the chosen subcommand writes its table or report to stdout.
/// Nothing else may be printed there in that case.
pub fn payload_on_stdout(matches: &ArgMatches) -> bool {
    match matches.subcommand() {
        Some(("scan", args)) => args.get_one::<String>("output").is_none(),
        Some(("template", args)) => args
            .get_one::<String>("output")
            .is_none_or(|output| output == "-"),
        _ => false,
    }
}

/// Print a status line, on stderr when stdout carries a report
fn status(to_stderr: bool, line: impl Display) {
    if to_stderr {
        eprintln!("{}", line);
    } else {
        println!("{}", line);
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Expand a leading `~` in a user supplied path
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Extract the path component from a URL for compact progress messages
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Explicit `--format` wins; otherwise the output file's extension decides,
/// falling back to text on screen.
pub fn resolve_format(format: Option<&str>, output: Option<&Path>) -> ReportFormat {
    if let Some(format) = format.and_then(ReportFormat::from_str) {
        return format;
    }
    output
        .and_then(|path| path.extension())
        .and_then(|ext| ext.to_str())
        .and_then(ReportFormat::from_str)
        .unwrap_or(ReportFormat::Text)
}

/// Load a CSV or workbook keyword sheet. A sheet without rows is valid and
/// simply yields an empty crawl.
pub fn load_keyword_table(path: &Path) -> Result<Table> {
    Table::from_path(path)
        .with_context(|| format!("Failed to read keyword sheet {}", path.display()))
}

pub fn progress_message(index: usize, total: usize, url: &str) -> String {
    format!("{}/{} {}", index, total, extract_url_path(url))
}

pub fn handle_template(args: &ArgMatches) {
    let output = args
        .get_one::<String>("output")
        .map(String::as_str)
        .unwrap_or("-");
    let force = args.get_flag("force");

    if let Err(e) = write_template(output, force) {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

pub fn write_template(output: &str, force: bool) -> Result<()> {
    if output == "-" {
        let stdout = io::stdout();
        write_template_csv(stdout.lock())?;
        return Ok(());
    }

    let path = expand_path(output);
    if path.exists() && !force {
        bail!(
            "{} already exists, use --force to overwrite it",
            path.display()
        );
    }

    if is_spreadsheet(&path) {
        write_template_xlsx(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
    } else {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        write_template_csv(file)?;
    }
    println!(
        "{} Template written to {}",
        "✓".green().bold(),
        path.display().to_string().bright_white()
    );
    Ok(())
}

pub async fn handle_scan(args: &ArgMatches, quiet: bool) {
    if let Err(e) = run_scan(args, quiet).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run_scan(args: &ArgMatches, quiet: bool) -> Result<()> {
    let input = args
        .get_one::<String>("input")
        .context("--input is required")?;
    let keyword_column = args
        .get_one::<String>("keyword-column")
        .map(String::as_str)
        .unwrap_or("Keyword");
    let url_column = args
        .get_one::<String>("url-column")
        .map(String::as_str)
        .unwrap_or("URL");
    let output = args.get_one::<String>("output").map(|o| expand_path(o));
    let format = resolve_format(
        args.get_one::<String>("format").map(String::as_str),
        output.as_deref(),
    );
    if format == ReportFormat::Xlsx && output.is_none() {
        bail!("xlsx reports are binary, use --output to choose a file");
    }
    // stdout carries the report itself unless --output is given
    let to_stderr = output.is_none();

    let options = CrawlOptions {
        timeout: Duration::from_secs(*args.get_one::<u64>("timeout").unwrap_or(&10)),
        user_agent: args.get_one::<String>("user-agent").cloned(),
        pacing_delay: Duration::from_millis(*args.get_one::<u64>("delay-ms").unwrap_or(&500)),
        workers: *args.get_one::<u64>("workers").unwrap_or(&1) as usize,
    };

    let input_path = expand_path(input);
    let table = load_keyword_table(&input_path)?;
    info!("Loaded {} rows from {}", table.len(), input_path.display());
    let urls = unique_target_urls(&table, url_column)?;
    let pairs = build_pairs(&table, keyword_column, url_column)?;

    if !quiet {
        status(
            to_stderr,
            format!(
                "{} Found {} unique URLs to analyze",
                "→".blue(),
                urls.len().to_string().cyan()
            ),
        );
        status(
            to_stderr,
            format!(
                "{} Created {} keyword-URL pairs",
                "→".blue(),
                pairs.len().to_string().cyan()
            ),
        );
        status(
            to_stderr,
            format!(
                "{} Timeout {}s, delay {}ms, {} worker(s)\n",
                "→".blue(),
                options.timeout.as_secs(),
                options.pacing_delay.as_millis(),
                options.workers
            ),
        );
    }

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping crawl");
            cancel_on_signal.cancel();
        }
    });

    let progress_bar = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(urls.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {msg}")
                .context("Invalid progress bar template")?
                .progress_chars("=>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };

    let pb_clone = progress_bar.clone();
    let progress_callback: CrawlProgressCallback = Arc::new(move |event| match event {
        CrawlEvent::Progress { index, total, url } => {
            pb_clone.set_position(index.saturating_sub(1) as u64);
            pb_clone.set_message(progress_message(index, total, &url));
        }
        CrawlEvent::Skipped { url, reason } => {
            pb_clone.println(format!(
                "{} Failed to retrieve {}: {}",
                "⚠".yellow().bold(),
                url,
                reason
            ));
        }
        CrawlEvent::Completed { processed, .. } => {
            pb_clone.set_position(processed as u64);
        }
    });

    let report = execute_crawl(&urls, &pairs, options, Some(progress_callback), cancel).await;
    progress_bar.finish_and_clear();
    let report = report?;

    if !quiet {
        print_outcome(&report, to_stderr);
    }

    let data = ReportData::new(&report, pairs.len());
    let content = generate_report(&data, format)?;

    match output {
        Some(path) => {
            save_report(&content, &path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&content)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

fn print_outcome(report: &CrawlReport, to_stderr: bool) {
    if report.cancelled {
        status(
            to_stderr,
            format!(
                "{} Crawl cancelled after {}/{} URLs, keeping partial results",
                "⚠".yellow().bold(),
                report.processed,
                report.total
            ),
        );
    } else {
        status(to_stderr, format!("{} Crawl complete!", "✓".green().bold()));
    }

    if report.opportunities.is_empty() {
        status(
            to_stderr,
            format!(
                "{} No inlink opportunities found. Try adjusting your keywords or URLs.",
                "ℹ".blue()
            ),
        );
    } else {
        status(
            to_stderr,
            format!(
                "{} Found {} potential inlink opportunities!",
                "✓".green().bold(),
                report.opportunities.len().to_string().bright_white()
            ),
        );
    }

    if !report.skipped.is_empty() {
        status(
            to_stderr,
            format!(
                "{} {} URL(s) could not be retrieved",
                "⚠".yellow().bold(),
                report.skipped.len()
            ),
        );
    }
    status(to_stderr, "");
}
