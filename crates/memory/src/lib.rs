//! Memory and retrieval implementations for Git Buddy.
//!
//! - [`WindowMemory`]: per-session windows of recent exchanges
//! - [`InMemoryVectorStore`]: cosine-ranked documents held in process
//! - [`PineconeStore`]: the hosted documentation index

pub mod pinecone;
pub mod vector;
pub mod window;

pub use pinecone::PineconeStore;
pub use vector::{InMemoryVectorStore, cosine_similarity};
pub use window::WindowMemory;
