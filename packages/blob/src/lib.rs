#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Object-storage upload for generated snapshot files.
//!
//! Pushes a local snapshot directory to an S3-compatible bucket and
//! writes a `manifest.json` mapping each file's relative path to its
//! public URL. Uploads use **size comparison** to skip files whose
//! remote object already has the same byte length, which keeps
//! incremental snapshot runs cheap since most country files don't change
//! between runs.
//!
//! # Environment Variables
//!
//! | Variable | Required | Description |
//! |---|---|---|
//! | `BLOB_ENDPOINT_URL` | Yes | S3-compatible endpoint URL |
//! | `BLOB_ACCESS_KEY_ID` | Yes | Access key for the bucket |
//! | `BLOB_SECRET_ACCESS_KEY` | Yes | Secret key for the bucket |
//! | `BLOB_PUBLIC_BASE_URL` | No | Public URL prefix recorded in the manifest; defaults to `<endpoint>/<bucket>` |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use aws_config::Region;
use aws_sdk_s3::config::{Credentials, StalledStreamProtectionConfig};

/// Bucket name for snapshot data.
const BUCKET: &str = "displacement-globe-data";

/// Errors that can occur during blob-storage operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// Missing required environment variable.
    #[error("Missing environment variable: {name}")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: String,
    },

    /// S3 `PutObject` failed.
    #[error("Failed to upload s3://{bucket}/{key}: {source}")]
    Upload {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// S3 `HeadObject` failed.
    #[error("Failed to head s3://{bucket}/{key}: {source}")]
    Head {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// I/O error reading local files or writing the manifest.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest serialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result of an upload batch: how many files were transferred vs skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct UploadStats {
    /// Number of files actually uploaded.
    pub uploaded: u64,
    /// Number of files skipped because the remote size already matched.
    pub skipped: u64,
}

impl std::fmt::Display for UploadStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} uploaded, {} skipped (unchanged)",
            self.uploaded, self.skipped
        )
    }
}

/// Client for pushing snapshot files to object storage.
pub struct BlobClient {
    client: aws_sdk_s3::Client,
    public_base_url: String,
}

impl BlobClient {
    /// Creates a client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::MissingEnv`] if any required variable is
    /// unset.
    pub fn from_env() -> Result<Self, BlobError> {
        let endpoint = require_env("BLOB_ENDPOINT_URL")?;
        let access_key = require_env("BLOB_ACCESS_KEY_ID")?;
        let secret_key = require_env("BLOB_SECRET_ACCESS_KEY")?;
        let public_base_url = std::env::var("BLOB_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("{}/{BUCKET}", endpoint.trim_end_matches('/')));

        let creds = Credentials::new(&access_key, &secret_key, None, None, "blob-env");

        let config = aws_sdk_s3::Config::builder()
            .endpoint_url(&endpoint)
            .region(Region::new("auto"))
            .credentials_provider(creds)
            .force_path_style(true)
            .stalled_stream_protection(StalledStreamProtectionConfig::disabled())
            .build();

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(config),
            public_base_url: public_base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Uploads every JSON file under `dir`, then writes and uploads a
    /// `manifest.json` mapping relative paths to public URLs.
    ///
    /// The manifest itself is always uploaded, even when every data file
    /// was skipped, so consumers can trust it as the index of the most
    /// recent push.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError`] on the first upload or filesystem failure.
    pub async fn push_snapshots(&self, dir: &Path) -> Result<UploadStats, BlobError> {
        let files = collect_json_files(dir)?;
        log::info!("Pushing {} snapshot file(s) from {}", files.len(), dir.display());

        let mut stats = UploadStats::default();
        let mut manifest: BTreeMap<String, String> = BTreeMap::new();

        for path in &files {
            let key = object_key(dir, path)?;
            if self.upload(&key, path).await? {
                stats.uploaded += 1;
            } else {
                stats.skipped += 1;
            }
            manifest.insert(key.clone(), format!("{}/{key}", self.public_base_url));
        }

        let manifest_path = dir.join("manifest.json");
        tokio::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?).await?;
        self.upload("manifest.json", &manifest_path).await?;
        stats.uploaded += 1;

        log::info!("Snapshot push complete: {stats}");
        Ok(stats)
    }

    /// Uploads one file, returning whether a transfer actually happened.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Upload`] on S3 failures, [`BlobError::Io`] on
    /// local read failures.
    pub async fn upload(&self, key: &str, local_path: &Path) -> Result<bool, BlobError> {
        let data = tokio::fs::read(local_path).await?;

        if let Some(remote_size) = self.head_size(key).await?
            && remote_size == data.len() as u64
        {
            log::info!("  {key}: skipped (unchanged)");
            return Ok(false);
        }

        let size = data.len();
        let body = aws_sdk_s3::primitives::ByteStream::from(data);

        self.client
            .put_object()
            .bucket(BUCKET)
            .key(key)
            .body(body)
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| BlobError::Upload {
                bucket: BUCKET.to_owned(),
                key: key.to_owned(),
                source: Box::new(e),
            })?;

        log::info!("  uploaded {key} ({size} bytes)");
        Ok(true)
    }

    /// Remote object size from `HeadObject`, or `None` if absent.
    async fn head_size(&self, key: &str) -> Result<Option<u64>, BlobError> {
        let result = self
            .client
            .head_object()
            .bucket(BUCKET)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let size = output.content_length().unwrap_or(0);
                #[allow(clippy::cast_sign_loss)] // S3 content-length is non-negative
                let size = size as u64;
                Ok(Some(size))
            }
            Err(err) => {
                // NotFound just means the object hasn't been pushed yet.
                let service_err = err.as_service_error();
                if service_err
                    .is_some_and(aws_sdk_s3::operation::head_object::HeadObjectError::is_not_found)
                {
                    return Ok(None);
                }
                Err(BlobError::Head {
                    bucket: BUCKET.to_owned(),
                    key: key.to_owned(),
                    source: Box::new(err),
                })
            }
        }
    }
}

fn require_env(name: &str) -> Result<String, BlobError> {
    std::env::var(name).map_err(|_| BlobError::MissingEnv {
        name: name.to_owned(),
    })
}

/// All `.json` files under `dir`, recursively, excluding any existing
/// manifest (it is regenerated per push).
fn collect_json_files(dir: &Path) -> Result<Vec<PathBuf>, BlobError> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "json")
                && path.file_name().is_none_or(|name| name != "manifest.json")
            {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Object key for a file: its path relative to the snapshot root, with
/// forward slashes.
fn object_key(root: &Path, path: &Path) -> Result<String, BlobError> {
    let relative = path.strip_prefix(root).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is outside the snapshot root", path.display()),
        )
    })?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_keys_are_relative_with_forward_slashes() {
        let root = Path::new("/snapshots");
        let path = Path::new("/snapshots/conflict/SYR.json");
        assert_eq!(object_key(root, path).unwrap(), "conflict/SYR.json");
    }

    #[test]
    fn files_outside_root_are_rejected() {
        let root = Path::new("/snapshots");
        let path = Path::new("/elsewhere/SYR.json");
        assert!(object_key(root, path).is_err());
    }

    #[test]
    fn collects_only_json_and_skips_manifest() {
        let dir = std::env::temp_dir().join(format!("dg-blob-test-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("conflict")).unwrap();
        std::fs::write(dir.join("idp-data.json"), "{}").unwrap();
        std::fs::write(dir.join("manifest.json"), "{}").unwrap();
        std::fs::write(dir.join("notes.txt"), "x").unwrap();
        std::fs::write(dir.join("conflict").join("SYR.json"), "{}").unwrap();

        let files = collect_json_files(&dir).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| object_key(&dir, p).unwrap())
            .collect();
        assert_eq!(names, vec!["conflict/SYR.json", "idp-data.json"]);

        std::fs::remove_dir_all(&dir).ok();
    }
}
