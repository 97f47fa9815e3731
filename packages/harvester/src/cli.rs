//! Command-line interface for the harvester.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{
    validate_date, HarvestConfig, TimeWindow, DEFAULT_DAYS_BACK, DEFAULT_ENDPOINT,
    DEFAULT_MAX_PAGES, DEFAULT_PAGE_DELAY_MS,
};
use crate::error::{HarvesterError, Result};
use crate::harvester::Harvester;
use crate::normalize::Normalizer;
use crate::output::{read_documents, write_documents, OutputFormat};
use crate::types::RawDocument;
use crate::xml::Namespaces;

/// PMC Harvester - Harvest PubMed Central metadata over OAI-PMH.
#[derive(Parser)]
#[command(name = "pmc-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Harvest records and normalize them.
    Harvest {
        /// Harvest records changed in the last N days
        #[arg(short, long, default_value_t = DEFAULT_DAYS_BACK, conflicts_with = "from")]
        days_back: u32,

        /// Harvest records changed since this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// OAI-PMH endpoint
        #[arg(long, default_value = DEFAULT_ENDPOINT)]
        endpoint: String,

        /// Write raw documents instead of normalized records
        #[arg(long)]
        raw: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pause between pages in milliseconds
        #[arg(long, default_value_t = DEFAULT_PAGE_DELAY_MS)]
        page_delay_ms: u64,

        /// Maximum pages per metadata format
        #[arg(long, default_value_t = DEFAULT_MAX_PAGES as u64, value_parser = clap::value_parser!(u64).range(1..))]
        max_pages: u64,
    },

    /// Normalize raw documents saved with `harvest --raw`.
    Normalize {
        /// File with raw documents (YAML or JSON)
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Harvest {
            days_back,
            from,
            endpoint,
            raw,
            format,
            output,
            page_delay_ms,
            max_pages,
        } => {
            let window = match from {
                Some(date) => TimeWindow::since(validate_date(&date)?),
                None => TimeWindow::from_days_back(days_back),
            };
            let config = HarvestConfig::with_endpoint(endpoint)
                .page_delay(Duration::from_millis(page_delay_ms))
                .max_pages(usize::try_from(max_pages).unwrap_or(usize::MAX));
            harvest_command(config, &window, raw, format, output.as_deref())
        }
        Commands::Normalize {
            input,
            format,
            output,
        } => normalize_command(&input, format, output.as_deref()),
    }
}

/// Current time as the run timestamp.
fn run_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Execute the harvest command.
fn harvest_command(
    config: HarvestConfig,
    window: &TimeWindow,
    raw: bool,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    ensure_parent_dir(output)?;

    eprintln!(
        "{} {} since {}",
        style("Harvesting").bold(),
        style(&config.endpoint).cyan(),
        style(window.from_param()).green()
    );

    let pb = spinner("Harvesting records...");
    let harvester = Harvester::over_http(config)?;
    let documents = match harvester.harvest_window(window) {
        Ok(documents) => documents,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };
    pb.finish_and_clear();

    eprintln!("  Records: {}", documents.len());

    if raw {
        return write_documents(&documents, format, output);
    }

    let (records, failures) = harvester
        .normalizer()
        .normalize_all(&documents, &run_timestamp());
    report(records.len(), &failures);
    write_documents(&records, format, output)
}

/// Execute the normalize command.
fn normalize_command(input: &Path, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    ensure_parent_dir(output)?;

    let documents: Vec<RawDocument> = read_documents(input)?;
    let normalizer = Normalizer::new(&Namespaces::default())?;
    let (records, failures) = normalizer.normalize_all(&documents, &run_timestamp());
    report(records.len(), &failures);
    write_documents(&records, format, output)
}

fn report(normalized: usize, failures: &[(String, HarvesterError)]) {
    eprintln!("  Normalized: {}", style(normalized).green());
    if !failures.is_empty() {
        eprintln!("  Failed: {}", style(failures.len()).yellow().bold());
        for (doc_id, error) in failures {
            eprintln!("    {doc_id}: {error}");
        }
    }
}

/// Fail before harvesting if the output directory does not exist.
fn ensure_parent_dir(output: Option<&Path>) -> Result<()> {
    let Some(parent) = output.and_then(Path::parent) else {
        return Ok(());
    };
    if !parent.as_os_str().is_empty() && !parent.is_dir() {
        return Err(HarvesterError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Output directory does not exist: {}", parent.display()),
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_harvest_defaults() {
        let cli = Cli::parse_from(["pmc-harvester", "harvest"]);

        let Commands::Harvest {
            days_back,
            from,
            endpoint,
            raw,
            format,
            output,
            page_delay_ms,
            max_pages,
        } = cli.command
        else {
            panic!("expected harvest command");
        };
        assert_eq!(days_back, 0);
        assert!(from.is_none());
        assert_eq!(endpoint, DEFAULT_ENDPOINT);
        assert!(!raw);
        assert_eq!(format, OutputFormat::Yaml);
        assert!(output.is_none());
        assert_eq!(page_delay_ms, 500);
        assert_eq!(max_pages, DEFAULT_MAX_PAGES as u64);
    }

    #[test]
    fn test_cli_parse_harvest_options() {
        let cli = Cli::parse_from([
            "pmc-harvester",
            "harvest",
            "--days-back",
            "7",
            "--format",
            "json",
            "--raw",
        ]);

        let Commands::Harvest {
            days_back,
            format,
            raw,
            ..
        } = cli.command
        else {
            panic!("expected harvest command");
        };
        assert_eq!(days_back, 7);
        assert_eq!(format, OutputFormat::Json);
        assert!(raw);
    }

    #[test]
    fn test_cli_days_back_conflicts_with_from() {
        let result = Cli::try_parse_from([
            "pmc-harvester",
            "harvest",
            "--days-back",
            "7",
            "--from",
            "2020-03-07",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_zero_max_pages() {
        let result = Cli::try_parse_from(["pmc-harvester", "harvest", "--max-pages", "0"]);
        assert!(result.is_err());

        let cli = Cli::parse_from(["pmc-harvester", "harvest", "--max-pages", "1"]);
        let Commands::Harvest { max_pages, .. } = cli.command else {
            panic!("expected harvest command");
        };
        assert_eq!(max_pages, 1);
    }

    #[test]
    fn test_cli_parse_normalize() {
        let cli = Cli::parse_from(["pmc-harvester", "normalize", "raw.yaml", "-o", "out.json"]);

        let Commands::Normalize { input, output, .. } = cli.command else {
            panic!("expected normalize command");
        };
        assert_eq!(input, PathBuf::from("raw.yaml"));
        assert_eq!(output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_ensure_parent_dir() {
        assert!(ensure_parent_dir(None).is_ok());
        assert!(ensure_parent_dir(Some(Path::new("out.yaml"))).is_ok());
        assert!(ensure_parent_dir(Some(Path::new("/definitely/missing/out.yaml"))).is_err());
    }
}
