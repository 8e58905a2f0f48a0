use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cached payload could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store lock was poisoned by a panicking writer")]
    Poisoned,

    #[error("Repository id {0} does not fit in an SQLite integer")]
    IdOutOfRange(u64),
}

pub type Result<T> = std::result::Result<T, CacheError>;
