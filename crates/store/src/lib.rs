//! Vector persistence and similarity search against a hosted store.
//!
//! The store itself (index, persistence) is external; this crate only speaks
//! to it. [`VectorStore`] is the seam used by ingestion and search, and
//! [`SupabaseStore`] implements it over the PostgREST API of a Supabase
//! project with a pgvector table and a `match_documents` function.

pub mod supabase;
pub mod traits;
pub mod types;

pub use supabase::SupabaseStore;
pub use traits::{StoreError, VectorStore};
pub use types::{DocumentId, DocumentMatch, UpsertOutcome};
