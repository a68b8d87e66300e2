pub mod gemini;
pub mod traits;

pub use gemini::GeminiEmbedder;
pub use traits::{Embedder, EmbeddingError};
