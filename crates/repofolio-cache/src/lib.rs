// Persistent local state: the TTL response cache and the description overrides
// Keeps API calls down and makes offline mode possible

pub mod cache;
pub mod descriptions;
pub mod error;

pub use cache::{
    CacheRead, CacheStore, Clock, MemoryStore, ResponseCache, SqliteStore, StoredEntry,
    SystemClock, DEFAULT_TTL_MS,
};
pub use descriptions::{
    DescriptionOverride, DescriptionStore, MemoryDescriptionStore, SqliteDescriptionStore,
};
pub use error::{CacheError, Result};
