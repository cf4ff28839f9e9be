//! Ingestion pipeline orchestration

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};

use super::chunker::RecursiveTextSplitter;
use super::filter::filter_to_minimal_docs;
use super::indexer::Indexer;
use super::loader::{LoaderOptions, PdfLoader};

/// Summary of one ingestion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Pages loaded from the PDFs
    pub pages: usize,
    /// Chunks produced by the splitter
    pub chunks: usize,
    /// Records written to the index
    pub records: usize,
    /// Whether this run created the index
    pub index_created: bool,
}

/// Main ingestion pipeline: load, filter, chunk, embed and upsert
pub struct IngestPipeline {
    loader: PdfLoader,
    splitter: RecursiveTextSplitter,
    indexer: Indexer,
}

impl IngestPipeline {
    /// Create a pipeline from configuration and providers
    pub fn new(
        config: &RagConfig,
        store: Arc<dyn VectorStoreProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        Ok(Self {
            loader: PdfLoader::new(LoaderOptions {
                skip_bad_files: config.ingestion.skip_bad_files,
            }),
            splitter: RecursiveTextSplitter::from_config(&config.chunking)?,
            indexer: Indexer::new(store, embedder, config),
        })
    }

    /// Run the whole job against `data_dir`, writing into `index_name`
    ///
    /// Any error aborts the run. Records already upserted stay in the index;
    /// re-running overwrites them by id.
    pub async fn run(&self, data_dir: &Path, index_name: &str) -> Result<IngestReport> {
        tracing::info!("Loading PDFs from {}", data_dir.display());

        let loader = self.loader.clone();
        let dir: PathBuf = data_dir.to_path_buf();
        let documents = tokio::task::spawn_blocking(move || loader.load(dir))
            .await
            .map_err(|e| Error::internal(format!("PDF loading task failed: {}", e)))??;
        tracing::info!("Loaded {} pages", documents.len());

        let minimal = filter_to_minimal_docs(&documents);
        let chunks = self.splitter.split_documents(&minimal);
        tracing::info!(
            "Split into {} chunks (size {})",
            chunks.len(),
            self.splitter.chunk_size()
        );

        let index_created = self.indexer.ensure_index(index_name).await?;
        let records = self.indexer.embed_and_upsert(index_name, &chunks).await?;

        Ok(IngestReport {
            pages: documents.len(),
            chunks: chunks.len(),
            records,
            index_created,
        })
    }
}
