#![forbid(unsafe_code)]

pub mod cache;
pub mod repository;
pub mod sqlite;

pub use cache::{InMemoryCache, JsonFileCache, LocalCache};
pub use repository::{
    InMemoryRemote, RemoteProfile, RemoteProgressRepository, Storage, StorageError,
};
