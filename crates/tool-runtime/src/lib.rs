//! Tool contract, registry and the document tools served over MCP.

pub mod context;
pub mod registry;
pub mod tool;
pub mod tools;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use context::{GenerationSettings, SearchDefaults, ToolContext};
pub use registry::{RegistryError, ToolRegistry};
pub use tool::{parse_input, Tool, ToolDefinition, ToolError, ToolResult};
pub use tools::{GenerateEmbeddingTool, GenerateResponseTool, SearchDocumentsTool, StoreDocumentTool};
