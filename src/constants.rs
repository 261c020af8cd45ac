//! Defaults shared by the builder, the publisher and the CLI.

/// Default piece length (256 KiB).
pub const DEFAULT_PIECE_LENGTH: i64 = 262_144;

/// Tracker pre-filled in the "Create .torrent" form.
pub const DEFAULT_TRACKER: &str = "udp://tracker.opentrackr.org:1337/announce";

/// MIME type of uploaded `.torrent` files.
pub const TORRENT_CONTENT_TYPE: &str = "application/x-bittorrent";

/// Object storage bucket holding `.torrent` files.
pub const TORRENT_BUCKET: &str = "torrents";

/// Folder picked as the upload target when it exists.
pub const DEFAULT_FOLDER_NAME: &str = "Documents";

/// System folder whose files are listed as shared.
pub const SHARE_FOLDER_NAME: &str = "Share";

/// Role name that grants admin screens.
pub const ADMIN_ROLE: &str = "admin";

// Table names in the record store.
pub const FILES_TABLE: &str = "files";
pub const FOLDERS_TABLE: &str = "folders";
pub const USER_ROLES_TABLE: &str = "user_roles";
