pub mod memory;
pub mod pg;
pub mod store;
pub mod types;

pub use memory::MemoryStore;
pub use pg::PgStore;
pub use store::Store;
pub use types::{CitationLink, CitationWrite, MentionRow, MentionWrite, RunWithMentions, RunWrite};
