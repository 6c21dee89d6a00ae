// SPDX-License-Identifier: PMPL-1.0-or-later
//! Visibilitybot CLI - AI Visibility Audit Bot

use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use visibilitybot::bots::builtin_bots;
use visibilitybot::classifier::LinkClassifier;
use visibilitybot::fetch::HttpFetcher;
use visibilitybot::orchestrator::Orchestrator;
use visibilitybot::report::{generate_report, OutputFormat};

/// AI visibility audit bot
#[derive(Parser)]
#[command(name = "visibilitybot")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full check battery against a URL
    Audit {
        /// Page URL to audit
        url: String,

        /// Output format
        #[arg(long, default_value = "text")]
        format: FormatArg,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<std::path::PathBuf>,

        /// Enable verbose logging
        #[arg(long, short)]
        verbose: bool,
    },

    /// Classify a URL or domain into a link category
    Classify {
        /// URL or bare domain
        input: String,
    },

    /// List the known bot identities
    Bots,
}

/// Output format CLI argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("visibilitybot=debug")
    } else {
        EnvFilter::new("visibilitybot=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Audit {
            url,
            format,
            output,
            verbose,
        } => {
            init_logging(verbose);

            let fetcher = Arc::new(HttpFetcher::new()?);
            let orchestrator = Orchestrator::new(fetcher);

            // Ctrl-C flips the cancellation channel; the in-flight
            // pacing delay aborts and the run stops
            let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = cancel_tx.send(true);
                }
            });

            let report = orchestrator.run(&url, cancel_rx).await?;
            let rendered = generate_report(&report, format.into());
            write_output(&rendered, output.as_deref())?;

            if report.percentage < 50.0 {
                std::process::exit(1);
            }
        }

        Commands::Classify { input } => {
            let classifier = LinkClassifier::with_default_rules();
            let code = classifier.classify(&input);
            match classifier.category_name(code) {
                Some(name) => println!("{} ({})", code, name),
                None => println!("{}", code),
            }
        }

        Commands::Bots => {
            for bot in builtin_bots() {
                let tags: Vec<String> = bot.tags.iter().map(|t| t.to_string()).collect();
                println!("{:<20} {:<28} [{}]", bot.identifier, bot.name, tags.join(", "));
            }
        }
    }

    Ok(())
}

/// Write output to file or stdout
fn write_output(content: &str, path: Option<&std::path::Path>) -> anyhow::Result<()> {
    match path {
        Some(p) => {
            std::fs::write(p, content)?;
            eprintln!("Report written to {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
