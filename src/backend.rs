//! Hosted-backend collaborators.
//!
//! The publishing flow needs three services: object storage for `.torrent`
//! files, a record store holding the `folders`, `files` and `user_roles`
//! tables, and an identity provider. Each is an async trait so callers pass
//! concrete clients in explicitly; nothing here reaches for a global handle.
//!
//! The `memory` implementations keep everything in process. They back the
//! tests and the CLI's `publish` command.

mod error;
mod memory;
mod records;

pub use error::BackendError;
pub use memory::{MemoryIdentity, MemoryObjectStorage, MemoryRecordStore};
pub use records::{
    Credentials, FileRecord, Filter, FolderRecord, NewFileRecord, Record, RecordStoreExt, Role,
    User, UserRoleRecord,
};

use async_trait::async_trait;
use bytes::Bytes;

pub type Result<T> = std::result::Result<T, BackendError>;

/// Blob storage addressed by bucket and path.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `data` at `path`, replacing any existing object.
    async fn upload(&self, bucket: &str, path: &str, data: Bytes, content_type: &str) -> Result<()>;

    async fn download(&self, bucket: &str, path: &str) -> Result<Bytes>;

    async fn remove(&self, bucket: &str, path: &str) -> Result<()>;

    /// URL under which a stored object is publicly readable.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Table-oriented record store with equality filters.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts a record and returns its id. Missing `id` and `created_at`
    /// columns are filled in by the store.
    async fn insert(&self, table: &str, record: Record) -> Result<String>;

    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Record>>;

    /// Deletes matching records and returns how many were removed.
    async fn delete(&self, table: &str, filter: &Filter) -> Result<usize>;
}

/// Password-based identity with a single current session.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self) -> Option<User>;

    async fn sign_in(&self, credentials: &Credentials) -> Result<User>;

    /// Registers an account. Does not sign it in.
    async fn sign_up(&self, credentials: &Credentials, display_name: Option<&str>) -> Result<User>;

    async fn sign_out(&self) -> Result<()>;
}
