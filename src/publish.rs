//! Publishing built torrents to the hosted backend.
//!
//! [`TorrentPublisher`] owns handles to the three collaborators and runs the
//! create, list and delete flows against them. A created torrent is uploaded
//! to `<user-id>/<name>.torrent` in the torrent bucket and then recorded in
//! the `files` table. The upload comes first, so a failed upload leaves no
//! record behind.

mod error;

pub use error::PublishError;

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;

use crate::backend::{
    BackendError, FileRecord, Filter, FolderRecord, IdentityProvider, NewFileRecord,
    ObjectStorage, RecordStore, RecordStoreExt, Role, User, UserRoleRecord,
};
use crate::config::Config;
use crate::constants::{
    FILES_TABLE, FOLDERS_TABLE, TORRENT_CONTENT_TYPE, USER_ROLES_TABLE,
};
use crate::metainfo::{TorrentArtifact, TorrentBuilder, TrackerList};

/// Content to build a torrent from.
#[derive(Debug, Clone)]
pub enum TorrentSource {
    Bytes(Bytes),
    Path(PathBuf),
}

#[derive(Debug, Clone)]
pub struct CreateTorrentRequest {
    pub folder_id: Option<String>,
    /// Display name, also used for the stored object's file name.
    pub name: String,
    pub source: TorrentSource,
    /// Overrides the configured piece length.
    pub piece_length: Option<i64>,
    /// Overrides the configured trackers.
    pub trackers: Option<TrackerList>,
}

impl CreateTorrentRequest {
    pub fn new(folder_id: impl Into<String>, name: impl Into<String>, source: TorrentSource) -> Self {
        Self {
            folder_id: Some(folder_id.into()),
            name: name.into(),
            source,
            piece_length: None,
            trackers: None,
        }
    }
}

/// Result of a successful [`TorrentPublisher::create_torrent`].
#[derive(Debug, Clone)]
pub struct PublishedTorrent {
    pub record: FileRecord,
    pub artifact: TorrentArtifact,
}

pub struct TorrentPublisher {
    storage: Arc<dyn ObjectStorage>,
    records: Arc<dyn RecordStore>,
    identity: Arc<dyn IdentityProvider>,
    config: Arc<Config>,
}

impl TorrentPublisher {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        records: Arc<dyn RecordStore>,
        identity: Arc<dyn IdentityProvider>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            storage,
            records,
            identity,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn require_user(&self) -> Result<User, PublishError> {
        self.identity
            .current_user()
            .await
            .ok_or(PublishError::NotSignedIn)
    }

    /// Builds, uploads and records a torrent for the signed-in user.
    pub async fn create_torrent(
        &self,
        request: CreateTorrentRequest,
    ) -> Result<PublishedTorrent, PublishError> {
        let user = self.require_user().await?;
        let folder_id = request
            .folder_id
            .filter(|id| !id.is_empty())
            .ok_or(PublishError::MissingFolder)?;

        let builder = TorrentBuilder::new(request.name)
            .piece_length(request.piece_length.unwrap_or(self.config.piece_length))
            .trackers(
                request
                    .trackers
                    .unwrap_or_else(|| self.config.tracker_list()),
            )
            .workers(self.config.workers);
        let source = request.source;

        let artifact = tokio::task::spawn_blocking(move || match source {
            TorrentSource::Bytes(data) => builder.build(&data),
            TorrentSource::Path(path) => builder.build_from_path(path),
        })
        .await??;

        let torrent_path = format!("{}/{}", user.id, artifact.file_name());
        self.storage
            .upload(
                &self.config.bucket,
                &torrent_path,
                artifact.document.clone(),
                TORRENT_CONTENT_TYPE,
            )
            .await?;

        let row = NewFileRecord {
            folder_id,
            owner_id: user.id.clone(),
            name: artifact.name.clone(),
            size: artifact.length,
            magnet_uri: Some(artifact.magnet_uri.clone()),
            info_hash: Some(artifact.info_hash),
            torrent_path: Some(torrent_path),
        };
        let id = self.records.insert_as(FILES_TABLE, &row).await?;
        let record = self
            .records
            .select_as::<FileRecord>(FILES_TABLE, &Filter::all().eq("id", id.as_str()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("{FILES_TABLE}/{id}")))?;

        tracing::info!(
            user = %user.id,
            info_hash = %artifact.info_hash,
            pieces = artifact.piece_count,
            "{} uploaded",
            artifact.file_name()
        );

        Ok(PublishedTorrent { record, artifact })
    }

    /// The configured default folder if it exists, otherwise the first
    /// folder the store returns.
    pub async fn default_folder(&self) -> Result<Option<FolderRecord>, PublishError> {
        let folders: Vec<FolderRecord> = self
            .records
            .select_as(FOLDERS_TABLE, &Filter::all())
            .await?;
        let preferred = folders
            .iter()
            .position(|f| f.name == self.config.default_folder)
            .unwrap_or(0);
        Ok(folders.into_iter().nth(preferred))
    }

    /// Files owned by the signed-in user, newest first.
    pub async fn my_torrents(&self) -> Result<Vec<FileRecord>, PublishError> {
        let Some(user) = self.identity.current_user().await else {
            return Ok(Vec::new());
        };
        self.files(Filter::all().eq("owner_id", user.id)).await
    }

    /// Files in the system share folder, newest first.
    pub async fn shared_torrents(&self) -> Result<Vec<FileRecord>, PublishError> {
        let share: Option<FolderRecord> = self
            .records
            .select_as::<FolderRecord>(
                FOLDERS_TABLE,
                &Filter::all()
                    .eq("name", self.config.share_folder.as_str())
                    .eq("is_system", true),
            )
            .await?
            .into_iter()
            .next();

        match share {
            Some(folder) => self.files(Filter::all().eq("folder_id", folder.id)).await,
            None => Ok(Vec::new()),
        }
    }

    async fn files(&self, filter: Filter) -> Result<Vec<FileRecord>, PublishError> {
        let mut files: Vec<FileRecord> = self.records.select_as(FILES_TABLE, &filter).await?;
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files)
    }

    pub async fn is_admin(&self) -> Result<bool, PublishError> {
        let Some(user) = self.identity.current_user().await else {
            return Ok(false);
        };
        let roles: Vec<UserRoleRecord> = self
            .records
            .select_as(USER_ROLES_TABLE, &Filter::all().eq("user_id", user.id))
            .await?;
        Ok(roles.iter().any(|r| r.role == Role::Admin))
    }

    /// Deletes one of the signed-in user's files along with its stored
    /// `.torrent` object.
    pub async fn delete_torrent(&self, file_id: &str) -> Result<(), PublishError> {
        let user = self.require_user().await?;
        let filter = Filter::all()
            .eq("id", file_id)
            .eq("owner_id", user.id.as_str());

        let existing: Vec<FileRecord> = self.records.select_as(FILES_TABLE, &filter).await?;
        let Some(file) = existing.into_iter().next() else {
            return Err(BackendError::NotFound(format!("{FILES_TABLE}/{file_id}")).into());
        };

        // Object first: a failed removal leaves the record in place for a retry.
        if let Some(path) = &file.torrent_path {
            match self.storage.remove(&self.config.bucket, path).await {
                Ok(()) | Err(BackendError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.records.delete(FILES_TABLE, &filter).await?;

        tracing::info!(user = %user.id, file = file_id, "torrent deleted");
        Ok(())
    }

    /// Public URL of a stored `.torrent`, `None` for records without one.
    pub fn torrent_url(&self, path: Option<&str>) -> Option<String> {
        path.filter(|p| !p.is_empty())
            .map(|p| self.storage.public_url(&self.config.bucket, p))
    }
}
