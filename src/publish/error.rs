use thiserror::Error;

use crate::backend::BackendError;
use crate::metainfo::MetainfoError;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("please sign in first")]
    NotSignedIn,

    #[error("select target folder")]
    MissingFolder,

    #[error("building torrent failed: {0}")]
    Metainfo(#[from] MetainfoError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
