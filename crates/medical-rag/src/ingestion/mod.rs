//! Offline ingestion: PDF pages to chunk embeddings in the vector index

pub mod chunker;
pub mod filter;
pub mod indexer;
pub mod loader;
mod processor;

pub use chunker::RecursiveTextSplitter;
pub use filter::filter_to_minimal_docs;
pub use indexer::Indexer;
pub use loader::{LoaderOptions, PdfLoader};
pub use processor::{IngestPipeline, IngestReport};
