//! Retrieval layer: corpus chunking, the vector store, and the engine that
//! ties embedding and similarity search together for the comparison path.

pub mod engine;
pub mod splitter;
pub mod sqlite;
pub mod store;

pub use engine::RagEngine;
pub use splitter::split_into_chunks;
pub use sqlite::SqliteRagStore;
pub use store::{ChunkSearchResult, RagStore, StoredChunk};
