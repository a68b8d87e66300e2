pub mod chunker;
pub mod embedding;
pub mod pipeline;

pub use chunker::{split, ChunkConfig, ChunkError};
pub use embedding::{Embedder, EmbeddingError, GeminiEmbedder};
pub use pipeline::{ingest_chunks, IngestReport, StoredChunk};
