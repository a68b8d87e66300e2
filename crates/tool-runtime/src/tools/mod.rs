//! The tools served over MCP.
//!
//! Each tool keeps its text rendering in a plain function next to it so the
//! output format can be tested without any service.

pub mod generate_embedding;
pub mod generate_response;
pub mod search_documents;
pub mod store_document;

pub use generate_embedding::GenerateEmbeddingTool;
pub use generate_response::GenerateResponseTool;
pub use search_documents::SearchDocumentsTool;
pub use store_document::StoreDocumentTool;
