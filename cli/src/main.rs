use clap::{Parser, Subcommand};
use deck_core::contracts::{PipelineError, PipelineErrorKind};
use deck_core::data_models::metrics::ActivityLogItem;
use deck_core::data_models::slide::StyleMode;
use deck_core::orchestrator::{DeckEngine, DeckRequest};
use deck_core::utils::logger::{init_logger, ProgressSink};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dgn", about = "Generate slide decks from a topic with a multi-agent pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a full deck for a topic and print it as JSON.
    Generate {
        /// Topic to build the deck around.
        #[arg(long)]
        topic: String,
        /// Style mode: corporate, professional, or serendipitous.
        #[arg(long, default_value = "professional")]
        style: String,
        /// Write the deck JSON to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Suppress the live activity feed on stderr.
        #[arg(long)]
        quiet: bool,
    },
}

fn exit_code_for(err: &PipelineError) -> i32 {
    match err.kind {
        PipelineErrorKind::ConfigError | PipelineErrorKind::ValidationError => 1,
        PipelineErrorKind::ServiceUnavailable => 2,
        PipelineErrorKind::ContractViolation => 3,
        _ => 1,
    }
}

async fn run(command: Commands) -> Result<(), PipelineError> {
    match command {
        Commands::Generate {
            topic,
            style,
            out,
            quiet,
        } => {
            let style_mode: StyleMode = style
                .parse()
                .map_err(PipelineError::config)?;
            let engine = DeckEngine::from_env()?;
            let progress: Option<Arc<ProgressSink>> = if quiet {
                None
            } else {
                Some(Arc::new(|item: &ActivityLogItem| {
                    eprintln!("[{:?}] {}", item.kind, item.message);
                }))
            };
            let deck = engine
                .generate_deck(
                    DeckRequest {
                        topic,
                        style_mode,
                    },
                    progress,
                )
                .await?;
            let rendered = serde_json::to_string_pretty(&deck)
                .map_err(|e| PipelineError::internal(e.to_string()))?;
            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .map_err(|e| PipelineError::internal(format!("write {}: {e}", path.display())))?;
                    eprintln!(
                        "deck '{}' written to {} ({} slides, ${})",
                        deck.id,
                        path.display(),
                        deck.slides.len(),
                        deck.metrics.total_cost
                    );
                }
                None => println!("{rendered}"),
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let _ = init_logger();
    let cli = Cli::parse();
    if let Err(err) = run(cli.command).await {
        eprintln!("error: {err}");
        std::process::exit(exit_code_for(&err));
    }
}
