//! CLI binary for the reference resolver.
//!
//! Usage: refbib resolve references.json --output json

#[cfg(feature = "cli")]
mod cli {
    use clap::{Parser, Subcommand};
    use refbib_resolver::{
        BatchResolver, DiscoveryResult, DiscoveryService, ReferenceStub, ResolveReport,
        ResolverConfig,
    };
    use std::path::{Path, PathBuf};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    #[derive(Parser)]
    #[command(
        name = "refbib",
        about = "Resolve reference stubs to BibTeX via CrossRef, Semantic Scholar, and DBLP",
        version
    )]
    struct Cli {
        /// Output format
        #[arg(long, global = true, default_value = "table")]
        output: OutputFormat,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Clone, Copy, clap::ValueEnum)]
    enum OutputFormat {
        Table,
        Json,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Resolve a JSON array of reference stubs to BibTeX
        Resolve {
            /// Path to the stubs file
            input: PathBuf,
        },
        /// Check which indexed sources know each reference
        Discover {
            /// Path to the stubs file
            input: PathBuf,
        },
    }

    fn read_stubs(path: &Path) -> refbib_resolver::Result<Vec<ReferenceStub>> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn shorten(text: &str, max: usize) -> String {
        if text.chars().count() > max {
            let head: String = text.chars().take(max.saturating_sub(3)).collect();
            format!("{head}...")
        } else {
            text.to_string()
        }
    }

    fn print_report_table(report: &ResolveReport) {
        use comfy_table::{ContentArrangement, Table};

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["#", "Key", "Status", "Source", "Title"]);

        for r in &report.references {
            let title = shorten(r.stub.title().unwrap_or("-"), 60);
            table.add_row(vec![
                r.index().to_string(),
                r.citation_key.clone(),
                r.match_status.as_str().to_string(),
                r.match_source.to_string(),
                title,
            ]);
        }

        println!("{table}");
        println!(
            "{} references: {} matched, {} fuzzy, {} unmatched ({:.2}s)",
            report.total_count,
            report.matched_count,
            report.fuzzy_count,
            report.unmatched_count,
            report.processing_time_seconds
        );
    }

    fn print_discovery_table(results: &[DiscoveryResult]) {
        use comfy_table::{ContentArrangement, Table};

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["#", "Status", "Found on", "Confidence", "URL"]);

        for r in results {
            let sources = r
                .available_on
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let confidence = r
                .best_confidence
                .map(|c| format!("{c:.2}"))
                .unwrap_or_default();
            table.add_row(vec![
                r.index.to_string(),
                r.discovery_status.as_str().to_string(),
                sources,
                confidence,
                r.best_url.clone().or_else(|| r.reason.clone()).unwrap_or_default(),
            ]);
        }

        println!("{table}");
    }

    pub async fn run() -> refbib_resolver::Result<()> {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "refbib_resolver=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();

        let cli = Cli::parse();
        let config = ResolverConfig::from_env()?;

        match cli.command {
            Commands::Resolve { input } => {
                let stubs = read_stubs(&input)?;
                let resolver = BatchResolver::from_config(config)?;
                let report = resolver.resolve_report(&stubs).await;

                match cli.output {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                    OutputFormat::Table => print_report_table(&report),
                }
            }

            Commands::Discover { input } => {
                let stubs = read_stubs(&input)?;
                let service = DiscoveryService::from_config(config)?;
                let results = service.check_all(&stubs).await;

                match cli.output {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
                    OutputFormat::Table => print_discovery_table(&results),
                }
            }
        }

        Ok(())
    }
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature. Build with: cargo build --features cli");
    std::process::exit(1);
}
