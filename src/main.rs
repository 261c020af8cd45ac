//! bdesk - build, inspect and publish `.torrent` files.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bdesk::backend::{
    Credentials, IdentityProvider, MemoryIdentity, MemoryObjectStorage, MemoryRecordStore,
    RecordStoreExt,
};
use bdesk::constants::FOLDERS_TABLE;
use bdesk::metainfo::{FileSource, MagnetLink, Metainfo, TorrentBuilder, TrackerList};
use bdesk::{Config, CreateTorrentRequest, TorrentPublisher, TorrentSource};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "bdesk")]
#[command(about = "Create and publish single-file torrents")]
struct Cli {
    /// Config file to use instead of the per-user one.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More output; repeat for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Hash a file and write its .torrent
    Create {
        path: PathBuf,
        /// Display name, defaults to the file name.
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        piece_length: Option<i64>,
        /// Announce URL; may be repeated or comma separated.
        #[arg(short, long = "tracker")]
        trackers: Vec<String>,
        #[arg(short, long)]
        workers: Option<usize>,
        /// Output path, defaults to `<name>.torrent` in the current directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the contents of a .torrent
    Inspect { torrent: PathBuf },
    /// Check a file against a .torrent's piece hashes
    Verify { torrent: PathBuf, path: PathBuf },
    /// Decode a magnet URI
    Magnet { uri: String },
    /// Run the publish flow against in-memory storage
    Publish {
        path: PathBuf,
        #[arg(long, default_value = "demo@example.com")]
        email: String,
        #[arg(long, default_value = "demo-password")]
        password: String,
    },
}

fn file_name(path: &Path) -> Result<String, Box<dyn Error>> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .ok_or_else(|| format!("{} has no usable file name", path.display()).into())
}

fn trackers_from_args(args: &[String], config: &Config) -> TrackerList {
    if args.is_empty() {
        config.tracker_list()
    } else {
        TrackerList::parse(&args.join(","))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = Arc::new(Config::load(cli.config.as_deref())?);

    let level = match cli.verbose {
        0 => config.log_level.parse().unwrap_or(Level::INFO),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .without_time()
        .with_target(false)
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Command::Create {
            path,
            name,
            piece_length,
            trackers,
            workers,
            output,
        } => {
            let name = match name {
                Some(name) => name,
                None => file_name(&path)?,
            };
            let builder = TorrentBuilder::new(name)
                .piece_length(piece_length.unwrap_or(config.piece_length))
                .trackers(trackers_from_args(&trackers, &config))
                .workers(workers.unwrap_or(config.workers));

            let artifact =
                tokio::task::spawn_blocking(move || builder.build_from_path(path)).await??;
            let output = output.unwrap_or_else(|| PathBuf::from(artifact.file_name()));
            tokio::fs::write(&output, &artifact.document).await?;

            tracing::info!(
                pieces = artifact.piece_count,
                "wrote {}",
                output.display()
            );
            println!("info hash: {}", artifact.info_hash);
            println!("magnet:    {}", artifact.magnet_uri);
        }
        Command::Inspect { torrent } => {
            let data = tokio::fs::read(&torrent).await?;
            let metainfo = Metainfo::from_bytes(&data)?;

            println!("name:         {}", metainfo.info.name);
            println!("length:       {}", metainfo.info.length);
            println!("piece length: {}", metainfo.info.piece_length);
            println!("pieces:       {}", metainfo.info.piece_count());
            println!("info hash:    {}", metainfo.info_hash);
            for tracker in metainfo.trackers() {
                println!("tracker:      {tracker}");
            }
            println!("magnet:       {}", metainfo.magnet());
        }
        Command::Verify { torrent, path } => {
            let data = tokio::fs::read(&torrent).await?;
            let metainfo = Metainfo::from_bytes(&data)?;
            let workers = config.workers;

            let report = tokio::task::spawn_blocking(
                move || -> Result<_, Box<dyn Error + Send + Sync>> {
                    let source = FileSource::open(&path)?;
                    Ok(metainfo.verify(&source, workers)?)
                },
            )
            .await?
            .map_err(|e| e as Box<dyn Error>)?;

            if !report.is_valid() {
                return Err(format!(
                    "{} of {} bytes, {} bad pieces: {:?}",
                    report.source_length,
                    report.expected_length,
                    report.mismatched.len(),
                    report.mismatched
                )
                .into());
            }
            println!("ok");
        }
        Command::Magnet { uri } => {
            let link = MagnetLink::parse(&uri)?;
            println!("info hash: {}", link.info_hash);
            if let Some(name) = &link.display_name {
                println!("name:      {name}");
            }
            for tracker in &link.trackers {
                println!("tracker:   {tracker}");
            }
        }
        Command::Publish {
            path,
            email,
            password,
        } => {
            let storage = Arc::new(MemoryObjectStorage::new(config.storage_url.clone()));
            let records = Arc::new(MemoryRecordStore::new());
            let identity = Arc::new(MemoryIdentity::new());

            let credentials = Credentials::new(email, password);
            identity.sign_up(&credentials, None).await?;
            identity.sign_in(&credentials).await?;
            records
                .insert_as(
                    FOLDERS_TABLE,
                    &serde_json::json!({ "name": config.default_folder, "is_system": true }),
                )
                .await?;

            let publisher =
                TorrentPublisher::new(storage, records, identity, config.clone());
            let folder = publisher
                .default_folder()
                .await?
                .ok_or("no folder to publish into")?;

            let name = file_name(&path)?;
            let published = publisher
                .create_torrent(CreateTorrentRequest::new(
                    folder.id,
                    name,
                    TorrentSource::Path(path),
                ))
                .await?;

            println!("{}", serde_json::to_string_pretty(&published.record)?);
            if let Some(url) = publisher.torrent_url(published.record.torrent_path.as_deref()) {
                println!("url: {url}");
            }
        }
    }

    Ok(())
}
