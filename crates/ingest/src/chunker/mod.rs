//! Boundary-aware text chunking.
//!
//! Splits a document into overlapping windows of at most `chunk_size`
//! characters. A window is cut back to the last `.` or `\n` it contains when
//! that boundary lies in the back half of the window; otherwise it is cut hard.
//! Consecutive windows share `overlap` characters.

mod types;
mod window;

pub use types::{ChunkConfig, ChunkError};
pub use window::split;
