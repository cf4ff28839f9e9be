//! Ingestion job: load PDFs, chunk, embed and upsert into the vector index
//!
//! Run with: cargo run -p medical-rag --bin medical-rag-ingest -- --data-dir data

use anyhow::Context;
use clap::Parser;
use medical_rag::{
    config::RagConfig, embeddings::create_embedder, ingestion::IngestPipeline, providers::PineconeStore,
    Credentials,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "medical-rag-ingest", version, about = "Index a directory of PDFs for the medical chat")]
struct Args {
    /// Directory containing the PDFs (non-recursive)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Vector index to create or update
    #[arg(long)]
    index_name: Option<String>,

    /// Skip PDFs that fail to load instead of aborting
    #[arg(long)]
    skip_bad_files: bool,

    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medical_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let credentials = Credentials::from_env()?;
    let mut config = RagConfig::load(args.config.as_deref())?;
    if let Some(data_dir) = args.data_dir {
        config.ingestion.data_dir = data_dir;
    }
    if let Some(index_name) = args.index_name {
        config.vector_db.index_name = index_name;
    }
    if args.skip_bad_files {
        config.ingestion.skip_bad_files = true;
    }

    let embedder = create_embedder(&config.embeddings).await?;
    let store = Arc::new(PineconeStore::new(&config.vector_db, &credentials.pinecone_api_key)?);
    let pipeline = IngestPipeline::new(&config, store, embedder)?;

    let report = pipeline
        .run(&config.ingestion.data_dir, &config.vector_db.index_name)
        .await
        .with_context(|| format!("Ingestion into '{}' failed", config.vector_db.index_name))?;

    println!("\nIngestion complete");
    println!("  Pages:   {}", report.pages);
    println!("  Chunks:  {}", report.chunks);
    println!("  Records: {}", report.records);
    println!(
        "  Index:   {} ({})",
        config.vector_db.index_name,
        if report.index_created { "created" } else { "existing" }
    );

    Ok(())
}
