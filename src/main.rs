use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use threadpress::build::build_site;
use threadpress::config::Config;
use threadpress::source::JsonFileSource;

/// Generates a static site from discussion threads.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The project directory. `site.yaml` is searched for here and in every
    /// parent directory.
    #[arg(short, long, default_value = ".")]
    project: PathBuf,

    /// Overrides the output directory from `site.yaml`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overrides the records file from `site.yaml`.
    #[arg(short, long)]
    records: Option<PathBuf>,

    /// Logs more detail. Repeat for more.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project = std::fs::canonicalize(&cli.project)
        .with_context(|| format!("resolving project directory `{}`", cli.project.display()))?;
    let mut config = Config::from_directory(&project)
        .with_context(|| format!("loading configuration from `{}`", project.display()))?;
    if let Some(output) = cli.output {
        config.output_directory = output;
    }
    if let Some(records) = cli.records {
        config.records = records;
    }

    let source = JsonFileSource::new(&config.records);
    build_site(config, &source).context("building site")?;
    Ok(())
}
