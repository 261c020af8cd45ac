use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{
    BackendError, Credentials, Filter, IdentityProvider, ObjectStorage, Record, RecordStore,
    Result, User,
};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

/// Object storage kept in a concurrent map.
#[derive(Debug)]
pub struct MemoryObjectStorage {
    objects: DashMap<(String, String), StoredObject>,
    public_base: String,
}

impl MemoryObjectStorage {
    /// `public_base` prefixes the URLs returned by [`ObjectStorage::public_url`].
    pub fn new(public_base: impl Into<String>) -> Self {
        Self {
            objects: DashMap::new(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn content_type(&self, bucket: &str, path: &str) -> Option<String> {
        self.objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|o| o.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for MemoryObjectStorage {
    fn default() -> Self {
        Self::new("memory://storage")
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn upload(&self, bucket: &str, path: &str, data: Bytes, content_type: &str) -> Result<()> {
        if path.is_empty() || path.starts_with('/') {
            return Err(BackendError::Storage(format!("invalid object path {path:?}")));
        }
        tracing::trace!(bucket, path, bytes = data.len(), "storing object");
        self.objects.insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Bytes> {
        self.objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|o| o.data.clone())
            .ok_or_else(|| BackendError::NotFound(format!("{bucket}/{path}")))
    }

    async fn remove(&self, bucket: &str, path: &str) -> Result<()> {
        self.objects
            .remove(&(bucket.to_string(), path.to_string()))
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(format!("{bucket}/{path}")))
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/object/public/{bucket}/{path}", self.public_base)
    }
}

/// Record store holding every table in memory.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, table: &str, mut record: Record) -> Result<String> {
        let id = match record.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(other) => {
                return Err(BackendError::Record(format!("id must be a string, got {other}")))
            }
            None => {
                let id = Uuid::new_v4().to_string();
                record.insert("id".into(), Value::String(id.clone()));
                id
            }
        };
        record.entry("created_at").or_insert_with(|| {
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
        });

        let mut tables = self.tables.write();
        let rows = tables.entry(table.to_string()).or_default();
        if rows
            .iter()
            .any(|row| row.get("id").and_then(Value::as_str) == Some(id.as_str()))
        {
            return Err(BackendError::Conflict(format!("{table}: duplicate id {id}")));
        }
        rows.push(record);
        Ok(id)
    }

    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Record>> {
        let tables = self.tables.read();
        Ok(tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<usize> {
        let mut tables = self.tables.write();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !filter.matches(r));
        Ok(before - rows.len())
    }
}

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password_hash: [u8; 32],
}

/// Email/password identity with a single session.
#[derive(Debug, Default)]
pub struct MemoryIdentity {
    accounts: RwLock<HashMap<String, Account>>,
    session: RwLock<Option<User>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn password_hash(email: &str, password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update([0u8]);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn current_user(&self) -> Option<User> {
        self.session.read().clone()
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<User> {
        let email = normalize_email(&credentials.email);
        let hash = password_hash(&email, &credentials.password);

        let user = self
            .accounts
            .read()
            .get(&email)
            .filter(|account| account.password_hash == hash)
            .map(|account| account.user.clone())
            .ok_or_else(|| BackendError::Auth("invalid login credentials".into()))?;

        *self.session.write() = Some(user.clone());
        tracing::debug!(user = %user.id, "signed in");
        Ok(user)
    }

    async fn sign_up(&self, credentials: &Credentials, display_name: Option<&str>) -> Result<User> {
        let email = normalize_email(&credentials.email);
        if !email.contains('@') {
            return Err(BackendError::Auth(format!("invalid email {email:?}")));
        }
        if credentials.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BackendError::Auth(format!(
                "password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let mut accounts = self.accounts.write();
        if accounts.contains_key(&email) {
            return Err(BackendError::Conflict("user already registered".into()));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            display_name: display_name.map(String::from),
        };
        accounts.insert(
            email.clone(),
            Account {
                user: user.clone(),
                password_hash: password_hash(&email, &credentials.password),
            },
        );
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        self.session.write().take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FolderRecord, RecordStoreExt};

    #[tokio::test]
    async fn test_object_storage_upserts() {
        let storage = MemoryObjectStorage::new("https://cdn.example/");
        storage
            .upload("torrents", "u/a.torrent", Bytes::from_static(b"one"), "text/plain")
            .await
            .unwrap();
        storage
            .upload("torrents", "u/a.torrent", Bytes::from_static(b"two"), "application/x-bittorrent")
            .await
            .unwrap();

        assert_eq!(storage.len(), 1);
        assert_eq!(
            storage.download("torrents", "u/a.torrent").await.unwrap(),
            Bytes::from_static(b"two")
        );
        assert_eq!(
            storage.content_type("torrents", "u/a.torrent").as_deref(),
            Some("application/x-bittorrent")
        );
        assert_eq!(
            storage.public_url("torrents", "u/a.torrent"),
            "https://cdn.example/object/public/torrents/u/a.torrent"
        );

        storage.remove("torrents", "u/a.torrent").await.unwrap();
        assert!(matches!(
            storage.download("torrents", "u/a.torrent").await,
            Err(BackendError::NotFound(_))
        ));
        assert!(storage.upload("torrents", "", Bytes::new(), "x").await.is_err());
    }

    #[tokio::test]
    async fn test_record_store_crud() {
        let store = MemoryRecordStore::new();
        let docs = store
            .insert_as(
                "folders",
                &serde_json::json!({ "name": "Documents", "is_system": true }),
            )
            .await
            .unwrap();
        store
            .insert_as("folders", &serde_json::json!({ "id": "mine", "name": "Mine", "owner_id": "u1" }))
            .await
            .unwrap();

        let all: Vec<FolderRecord> = store.select_as("folders", &Filter::all()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, docs);
        assert!(all[0].is_system);

        let mine: Vec<FolderRecord> = store
            .select_as("folders", &Filter::all().eq("owner_id", "u1"))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "Mine");

        assert!(matches!(
            store.insert_as("folders", &serde_json::json!({ "id": "mine" })).await,
            Err(BackendError::Conflict(_))
        ));
        assert!(store.insert_as("folders", &42).await.is_err());

        assert_eq!(store.delete("folders", &Filter::all().eq("id", "mine")).await.unwrap(), 1);
        assert_eq!(store.delete("nothing", &Filter::all()).await.unwrap(), 0);
        assert!(store.select("nothing", &Filter::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identity_flow() {
        let identity = MemoryIdentity::new();
        let creds = Credentials::new("Ann@Example.com ", "hunter22");

        let user = identity.sign_up(&creds, Some("Ann")).await.unwrap();
        assert_eq!(user.email, "ann@example.com");
        assert!(identity.current_user().await.is_none());

        assert!(matches!(
            identity.sign_up(&creds, None).await,
            Err(BackendError::Conflict(_))
        ));
        assert!(identity
            .sign_in(&Credentials::new("ann@example.com", "wrong-pass"))
            .await
            .is_err());

        let signed_in = identity.sign_in(&creds).await.unwrap();
        assert_eq!(signed_in, user);
        assert_eq!(identity.current_user().await, Some(user));

        identity.sign_out().await.unwrap();
        assert!(identity.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_identity_rejects_weak_signups() {
        let identity = MemoryIdentity::new();
        assert!(identity.sign_up(&Credentials::new("a@b.c", "12345"), None).await.is_err());
        assert!(identity.sign_up(&Credentials::new("nobody", "123456"), None).await.is_err());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("a@b.c", "secret-pass");
        let debug = format!("{creds:?}");
        assert!(debug.contains("a@b.c"));
        assert!(!debug.contains("secret-pass"));
    }
}
