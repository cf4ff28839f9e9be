//! Core types for the RAG system

pub mod document;
pub mod response;

pub use document::{Chunk, Document, Metadata};
pub use response::{ChatAnswer, RetrievedRecord};
