use chrono::Utc;
use clap::{Parser, Subcommand};
use lexrag_core::{
    build_index, embedder_from_env, ingest_corpus, EmbeddingConfig, RebuildMode, Retriever,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_TOP_K,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "lexrag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the raw corpus (.pdf and .csv files)
    #[arg(long, global = true, default_value = "./data/raw")]
    raw_dir: PathBuf,

    /// Directory for processed chunk artifacts
    #[arg(long, global = true, default_value = "./data/processed")]
    processed_dir: PathBuf,

    /// Directory of the persisted vector index
    #[arg(long, global = true, default_value = "./vector_store")]
    index_dir: PathBuf,

    /// Embedding model identifier
    #[arg(long, global = true, default_value = DEFAULT_EMBEDDING_MODEL)]
    model: String,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, normalize, and chunk every raw document into artifacts.
    Ingest,
    /// Embed all processed chunks and persist the vector index.
    BuildIndex {
        /// Merge into the existing index instead of replacing it.
        #[arg(long, default_value_t = false)]
        append: bool,
    },
    /// Retrieve the most similar chunks for a query.
    Query {
        /// Query text
        query: String,

        /// Number of results to return.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        k: usize,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "lexrag boot"
    );

    match cli.command {
        Command::Ingest => {
            let report = ingest_corpus(&cli.raw_dir, &cli.processed_dir)?;

            for skipped in &report.skipped {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped source");
            }

            if report.sources.is_empty() && report.skipped.is_empty() {
                println!("no source documents found in {}", cli.raw_dir.display());
                return Ok(());
            }

            for summary in &report.sources {
                println!(
                    "{}: {} chunks (sha256 {})",
                    summary.source,
                    summary.num_chunks,
                    &summary.checksum[..12]
                );
            }
            println!(
                "{} chunks from {} sources written to {}",
                report.total_chunks(),
                report.sources.len(),
                cli.processed_dir.display()
            );
        }
        Command::BuildIndex { append } => {
            let embedder = embedder_from_env(EmbeddingConfig::with_model(cli.model))?;
            let mode = if append {
                RebuildMode::Append
            } else {
                RebuildMode::Replace
            };

            let report = build_index(&cli.processed_dir, &cli.index_dir, embedder.as_ref(), mode)?;
            if report.wrote_index {
                println!(
                    "{} entries from {} sources indexed at {}",
                    report.entry_count,
                    report.source_count,
                    report.index_file.display()
                );
            } else {
                println!(
                    "no processed chunks found in {}; index untouched",
                    cli.processed_dir.display()
                );
            }
        }
        Command::Query { query, k } => {
            let embedder = embedder_from_env(EmbeddingConfig::with_model(cli.model))?;
            let retriever = Retriever::open(&cli.index_dir, embedder)?;

            let hits = retriever.retrieve(&query, k)?;
            if hits.is_empty() {
                println!("no results");
                return Ok(());
            }

            for (rank, hit) in hits.iter().enumerate() {
                println!(
                    "[{}] score={:.4} source={} chunk={}",
                    rank + 1,
                    hit.score,
                    hit.source,
                    hit.chunk_id
                );
                println!("  {}", snippet(&hit.content, 400));
            }
        }
    }

    Ok(())
}

fn snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_flags_are_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "lexrag",
            "ingest",
            "--raw-dir",
            "./corpus",
            "--processed-dir",
            "./out",
        ])
        .unwrap();

        assert_eq!(cli.raw_dir, PathBuf::from("./corpus"));
        assert_eq!(cli.processed_dir, PathBuf::from("./out"));
        assert!(matches!(cli.command, Command::Ingest));
    }

    #[test]
    fn query_accepts_k_and_index_dir_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "lexrag",
            "query",
            "freedom of speech",
            "--k",
            "5",
            "--index-dir",
            "./idx",
        ])
        .unwrap();

        assert_eq!(cli.index_dir, PathBuf::from("./idx"));
        match cli.command {
            Command::Query { query, k } => {
                assert_eq!(query, "freedom of speech");
                assert_eq!(k, 5);
            }
            _ => panic!("expected the query subcommand"),
        }
    }
}
