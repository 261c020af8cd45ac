use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{BackendError, RecordStore, Result};
use crate::metainfo::InfoHash;

/// One row: column name to JSON value.
pub type Record = serde_json::Map<String, Value>;

/// Conjunction of `column = value` conditions. An empty filter matches all.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(column, value)| record.get(column) == Some(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Row of the `folders` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    /// System folders (Documents, Share, ...) are created by the backend and
    /// shared by every user.
    #[serde(default)]
    pub is_system: bool,
}

/// Row of the `files` table as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub folder_id: String,
    pub owner_id: String,
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub magnet_uri: Option<String>,
    #[serde(default)]
    pub info_hash: Option<InfoHash>,
    #[serde(default)]
    pub torrent_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Row of the `files` table before insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewFileRecord {
    pub folder_id: String,
    pub owner_id: String,
    pub name: String,
    pub size: u64,
    pub magnet_uri: Option<String>,
    pub info_hash: Option<InfoHash>,
    pub torrent_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// Row of the `user_roles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoleRecord {
    pub user_id: String,
    pub role: Role,
}

/// Typed access on top of any [`RecordStore`].
#[async_trait]
pub trait RecordStoreExt: RecordStore {
    async fn insert_as<T: Serialize + Sync>(&self, table: &str, row: &T) -> Result<String> {
        match serde_json::to_value(row)? {
            Value::Object(record) => self.insert(table, record).await,
            other => Err(BackendError::Record(format!(
                "rows must be objects, got {other}"
            ))),
        }
    }

    async fn select_as<T: DeserializeOwned + Send>(&self, table: &str, filter: &Filter) -> Result<Vec<T>> {
        self.select(table, filter)
            .await?
            .into_iter()
            .map(|record| serde_json::from_value(Value::Object(record)).map_err(BackendError::from))
            .collect()
    }
}

impl<S: RecordStore + ?Sized> RecordStoreExt for S {}
