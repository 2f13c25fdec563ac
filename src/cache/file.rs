use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::cache::{CacheKey, CacheStore, StoredRow};
use crate::error::DgitError;

const CACHE_DIR_ENV: &str = "DGIT_CACHE_DIR";

/// Resolves the cache directory: `DGIT_CACHE_DIR`, else the XDG cache dir.
pub fn dgit_cache_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    match dirs::cache_dir() {
        Some(dir) => dir.join("dgit"),
        None => std::env::temp_dir().join("dgit"),
    }
}

pub fn file_name(key: &CacheKey) -> String {
    format!("{:x}.json", md5::compute(key.storage_id().as_bytes()))
}

#[derive(Debug, Serialize, Deserialize)]
struct FileRecord {
    key: CacheKey,
    #[serde(flatten)]
    row: StoredRow,
}

/// One JSON document per key, named by the md5 of the key.
#[derive(Debug, Clone)]
pub(crate) struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(file_name(key))
    }
}

/// Writes `content` to a sibling temp file, then hard-links it to `path`.
///
/// Returns `false` without touching `path` when it already exists, including
/// when another writer published it first.
async fn save_atomic(path: &Path, content: &str) -> Result<bool, DgitError> {
    if tokio::fs::metadata(path).await.is_ok() {
        return Ok(false);
    }

    let Some(dir) = path.parent() else {
        return Err(DgitError::InvalidArgument(
            "Invalid cache path (no parent directory)".into(),
        ));
    };
    tokio::fs::create_dir_all(dir).await?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut opened = None;
    for attempt in 0..32_u32 {
        let candidate = dir.join(format!(
            ".{stem}.{}.{}.tmp",
            std::process::id(),
            seed.saturating_add(attempt as u128)
        ));
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => {
                opened = Some((candidate, file));
                break;
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err.into()),
        }
    }
    let Some((tmp_path, mut file)) = opened else {
        return Err(DgitError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "Unable to allocate temporary cache file",
        )));
    };

    file.write_all(content.as_bytes()).await?;
    file.flush().await?;
    drop(file);

    // Linking never replaces an existing file, unlike rename.
    let published = match tokio::fs::hard_link(&tmp_path, path).await {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(err.into()),
    };
    let _ = tokio::fs::remove_file(&tmp_path).await;
    published
}

#[async_trait::async_trait]
impl CacheStore for FileStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<StoredRow>, DgitError> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let record: FileRecord = serde_json::from_slice(&bytes)?;
        if record.key != *key {
            warn!(
                path = %path.display(),
                "cache file belongs to a different key; ignoring"
            );
            return Ok(None);
        }
        Ok(Some(record.row))
    }

    async fn put(&self, key: &CacheKey, row: StoredRow) -> Result<bool, DgitError> {
        let record = FileRecord {
            key: key.clone(),
            row,
        };
        let content = serde_json::to_string(&record)?;
        save_atomic(&self.path_for(key), &content).await
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}
