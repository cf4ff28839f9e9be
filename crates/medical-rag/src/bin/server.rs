//! Chat server binary
//!
//! Run with: cargo run -p medical-rag --bin medical-rag-server

use clap::Parser;
use medical_rag::{config::RagConfig, server::RagServer, Credentials};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "medical-rag-server", version, about = "Serve the medical chat page and /chat endpoint")]
struct Args {
    /// TOML configuration file; defaults are used for anything it omits
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medical_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let credentials = Credentials::from_env()?;
    let config = RagConfig::load(args.config.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Index: {}", config.vector_db.index_name);
    tracing::info!("  - LLM model: {}", config.llm.model);
    tracing::info!("  - Top k: {}", config.retrieval.top_k);

    let server = RagServer::new(config, &credentials).await?;

    println!("\nServer starting...");
    println!("  Chat:   http://{}/", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
