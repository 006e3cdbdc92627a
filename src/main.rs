//! `citecheck` command line entrypoint.
//!
//! Every subcommand prints JSON to stdout; logs go to stderr.
use std::{fs, path::Path, path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use citecheck::{
    config::Config,
    extraction::{ExtractedPage, LayoutExtractor},
    logging,
    metrics::MetricsSnapshot,
    processing::{
        ClaimSummary, GroundingService, VerifiedClaim, build_context, chunk_text,
        parse_generation_response,
    },
    store::{DocumentId, InMemoryStore},
};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_WIDTH: f64 = 612.0;
const DEFAULT_PAGE_HEIGHT: f64 = 792.0;

#[derive(Parser)]
#[command(
    name = "citecheck",
    about = "Chunk documents, retrieve context, and verify cited quotes against the source"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split a text file into overlapping chunks.
    Chunk {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        chunk_size: Option<usize>,
        #[arg(long)]
        overlap: Option<usize>,
    },
    /// Rank the chunks of a pages file against a question.
    Retrieve {
        #[arg(long)]
        pages: PathBuf,
        #[arg(long)]
        question: String,
        #[arg(long)]
        top_n: Option<usize>,
        /// Print the rendered model context instead of JSON.
        #[arg(long)]
        context: bool,
    },
    /// Verify the claims of a model response against a pages file.
    Verify {
        #[arg(long)]
        pages: PathBuf,
        #[arg(long)]
        response: PathBuf,
    },
}

/// One entry of a pages file.
#[derive(Deserialize)]
struct PageInput {
    document_id: DocumentId,
    page_number: u32,
    text: String,
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
}

#[derive(Serialize)]
struct VerifyOutput {
    answer: String,
    claims: Vec<VerifiedClaim>,
    summary: ClaimSummary,
    metrics: MetricsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_warning: Option<String>,
}

#[tokio::main]
async fn main() {
    logging::init_tracing("warn");
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env().context("failed to load configuration")?;

    match cli.command {
        Command::Chunk {
            input,
            chunk_size,
            overlap,
        } => {
            let chunker = config
                .chunker
                .resized(
                    chunk_size.unwrap_or(config.chunker.chunk_size()),
                    overlap.unwrap_or(config.chunker.overlap()),
                )
                .context("invalid chunk settings")?;
            let text = fs::read_to_string(&input)
                .with_context(|| format!("failed to read input at {}", input.display()))?;
            print_json(&chunk_text(&text, &chunker))
        }
        Command::Retrieve {
            pages,
            question,
            top_n,
            context,
        } => {
            if let Some(top_n) = top_n {
                config.top_n = top_n;
            }
            let (service, document_ids) = load_service(&pages, config).await?;
            let retrieval = service
                .retrieve(&document_ids, &question)
                .await
                .context("retrieval failed")?;
            if context {
                println!(
                    "{}",
                    build_context(retrieval.chunks.iter().map(|hit| &hit.chunk))
                );
                Ok(())
            } else {
                print_json(&retrieval)
            }
        }
        Command::Verify { pages, response } => {
            let (service, document_ids) = load_service(&pages, config).await?;
            let raw = fs::read_to_string(&response)
                .with_context(|| format!("failed to read response at {}", response.display()))?;
            let generation = parse_generation_response(&raw);
            let report = service
                .verify_claims(&document_ids, generation.claims)
                .await;
            print_json(&VerifyOutput {
                answer: generation.answer,
                claims: report.claims,
                summary: report.summary,
                metrics: service.metrics_snapshot(),
                parse_warning: generation.parse_warning,
            })
        }
    }
}

/// Register a pages file with an in-memory extractor and ingest every document in it.
///
/// Document ids are returned in order of first appearance.
async fn load_service(path: &Path, config: Config) -> Result<(GroundingService, Vec<DocumentId>)> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read pages file at {}", path.display()))?;
    let inputs: Vec<PageInput> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse pages file at {}", path.display()))?;
    if inputs.is_empty() {
        bail!("pages file {} contains no pages", path.display());
    }

    let extractor = Arc::new(LayoutExtractor::new());
    let mut document_ids: Vec<DocumentId> = Vec::new();
    for input in inputs {
        if !document_ids.contains(&input.document_id) {
            document_ids.push(input.document_id);
        }
        extractor.add_page(
            input.document_id,
            ExtractedPage {
                text: input.text,
                width: input.width.unwrap_or(DEFAULT_PAGE_WIDTH),
                height: input.height.unwrap_or(DEFAULT_PAGE_HEIGHT),
                page_number: input.page_number,
            },
        );
    }

    let service = GroundingService::new(Arc::new(InMemoryStore::new()), extractor, config);
    for &document_id in &document_ids {
        let outcome = service
            .ingest_document(document_id)
            .await
            .with_context(|| format!("failed to ingest document {document_id}"))?;
        tracing::info!(
            document_id,
            pages = outcome.pages_processed,
            chunks = outcome.chunks_created,
            "Loaded document"
        );
    }
    Ok((service, document_ids))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_verify_subcommand() {
        let cli = Cli::try_parse_from([
            "citecheck",
            "verify",
            "--pages",
            "pages.json",
            "--response",
            "answer.json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Verify { .. }));
    }

    #[test]
    fn page_dimensions_are_optional() {
        let pages: Vec<PageInput> =
            serde_json::from_str(r#"[{"document_id": 1, "page_number": 2, "text": "x"}]"#)
                .unwrap();
        assert_eq!(pages[0].page_number, 2);
        assert!(pages[0].width.is_none());
    }
}
