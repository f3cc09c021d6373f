//! Stowage command-line client.
//!
//! Resolves the configured backend once, then runs a single storage operation.
//!
//! Usage: stowage <COMMAND> (see `stowage --help`)

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use serde_json::json;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::info;

use stowage_core::storage::{
    ListPage, ListRequest, ObjectAcl, PresignedUrlRequest, StorageProvider, StorageService,
    UploadBody, UploadRequest,
};
use stowage_shared::{AppConfig, telemetry};

#[derive(Parser)]
#[command(name = "stowage")]
#[command(about = "Upload, fetch, list and sign objects on the configured storage backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file
    Put {
        /// Object key
        key: String,

        /// File to upload
        file: PathBuf,

        /// Content type (MIME type)
        #[arg(short = 't', long)]
        content_type: Option<String>,

        /// User metadata entry, repeatable
        #[arg(short, long = "meta", value_parser = parse_meta)]
        metadata: Vec<(String, String)>,

        /// Access-control hint: private, public-read
        #[arg(long)]
        acl: Option<ObjectAcl>,
    },

    /// Download an object
    Get {
        /// Object key
        key: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete an object
    Rm {
        /// Object key
        key: String,
    },

    /// List objects
    Ls {
        /// Key prefix
        #[arg(short, long)]
        prefix: Option<String>,

        /// Maximum objects per page
        #[arg(short, long)]
        max_keys: Option<usize>,

        /// Cursor returned by a previous page
        #[arg(short, long)]
        cursor: Option<String>,

        /// Follow cursors until the listing is complete
        #[arg(long)]
        all: bool,
    },

    /// Check whether an object exists
    Exists {
        /// Object key
        key: String,
    },

    /// Sign a download URL
    PresignGet {
        /// Object key
        key: String,

        /// Lifetime in seconds
        #[arg(long, default_value = "3600")]
        ttl: u64,
    },

    /// Sign an upload URL
    PresignPut {
        /// Object key
        key: String,

        /// Lifetime in seconds
        #[arg(long, default_value = "3600")]
        ttl: u64,

        /// Content type the upload must carry
        #[arg(short = 't', long)]
        content_type: Option<String>,
    },

    /// Print the public URL of a key
    Url {
        /// Object key
        key: String,
    },
}

fn parse_meta(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::load().context("failed to load configuration")?;
    telemetry::init(&config.telemetry).context("failed to initialise tracing")?;

    // The backend must resolve before any command runs.
    let storage =
        StorageService::from_settings(&config.storage).context("failed to resolve storage backend")?;
    info!(
        provider = storage.provider_name(),
        bucket = storage.bucket(),
        "storage ready"
    );

    run(&storage, cli.command).await
}

async fn run(storage: &StorageService, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Put {
            key,
            file,
            content_type,
            metadata,
            acl,
        } => {
            let handle = tokio::fs::File::open(&file)
                .await
                .with_context(|| format!("cannot open {}", file.display()))?;

            let mut req = UploadRequest::new(key, UploadBody::stream(ReaderStream::new(handle)));
            req.content_type = content_type;
            req.metadata = metadata.into_iter().collect();
            req.acl = acl;

            let result = storage.upload(req).await?;
            print_json(&result)?;
        }
        Commands::Get { key, output } => {
            let object = storage.get(&key).await?;
            let mut sink: Box<dyn AsyncWrite + Unpin + Send> = match &output {
                Some(path) => Box::new(
                    tokio::fs::File::create(path)
                        .await
                        .with_context(|| format!("cannot create {}", path.display()))?,
                ),
                None => Box::new(tokio::io::stdout()),
            };

            let mut body = object.body;
            while let Some(chunk) = body.next().await {
                sink.write_all(&chunk?).await?;
            }
            sink.flush().await?;
        }
        Commands::Rm { key } => {
            storage.delete(&key).await?;
            print_json(&json!({ "key": key, "deleted": true }))?;
        }
        Commands::Ls {
            prefix,
            max_keys,
            cursor,
            all,
        } => {
            let request = ListRequest {
                prefix,
                max_keys,
                cursor,
            };
            let page = if all {
                list_all(storage, request).await?
            } else {
                storage.list(request).await?
            };
            print_json(&page)?;
        }
        Commands::Exists { key } => {
            let exists = storage.exists(&key).await?;
            print_json(&json!({ "key": key, "exists": exists }))?;
        }
        Commands::PresignGet { key, ttl } => {
            let signed = storage
                .presigned_url(PresignedUrlRequest::new(key).with_ttl_secs(ttl))
                .await?;
            print_json(&signed)?;
        }
        Commands::PresignPut {
            key,
            ttl,
            content_type,
        } => {
            let mut req = PresignedUrlRequest::new(key).with_ttl_secs(ttl);
            req.content_type = content_type;
            let signed = storage.presigned_upload_url(req).await?;
            print_json(&signed)?;
        }
        Commands::Url { key } => {
            println!("{}", storage.public_url(&key));
        }
    }

    Ok(())
}

/// Follow cursors and merge every page into one.
async fn list_all(storage: &StorageService, mut request: ListRequest) -> anyhow::Result<ListPage> {
    let mut objects = Vec::new();
    loop {
        let page = storage.list(request.clone()).await?;
        objects.extend(page.objects);
        match page.cursor {
            Some(cursor) if page.truncated => request.cursor = Some(cursor),
            Some(_) => bail!("backend returned a cursor on a complete page"),
            None => break,
        }
    }

    Ok(ListPage {
        objects,
        cursor: None,
        truncated: false,
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meta() {
        assert_eq!(
            parse_meta("owner=42"),
            Ok(("owner".to_string(), "42".to_string()))
        );
        assert_eq!(
            parse_meta("note=a=b"),
            Ok(("note".to_string(), "a=b".to_string()))
        );
        assert!(parse_meta("novalue").is_err());
        assert!(parse_meta("=x").is_err());
    }

    #[test]
    fn test_cli_parses_commands() {
        let cli = Cli::try_parse_from([
            "stowage",
            "put",
            "avatars/me.png",
            "me.png",
            "-t",
            "image/png",
            "--meta",
            "owner=42",
            "--acl",
            "private",
        ])
        .expect("put should parse");
        match cli.command {
            Commands::Put {
                key,
                content_type,
                metadata,
                acl,
                ..
            } => {
                assert_eq!(key, "avatars/me.png");
                assert_eq!(content_type.as_deref(), Some("image/png"));
                assert_eq!(metadata, vec![("owner".to_string(), "42".to_string())]);
                assert_eq!(acl, Some(ObjectAcl::Private));
            }
            _ => panic!("expected put"),
        }

        let cli = Cli::try_parse_from(["stowage", "ls", "--prefix", "a/", "--max-keys", "2", "--all"])
            .expect("ls should parse");
        assert!(matches!(
            cli.command,
            Commands::Ls {
                max_keys: Some(2),
                all: true,
                ..
            }
        ));
    }

    #[test]
    fn test_cli_rejects_unknown_acl() {
        assert!(Cli::try_parse_from(["stowage", "put", "k", "f", "--acl", "world-writable"]).is_err());
    }
}
