//! File storage for profile images.
//!
//! Storage names are relative, `/`-separated paths such as
//! `users_images/alice.png`. Saving never overwrites: a taken name gets a
//! random suffix and the name actually used is returned.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use model::media::MediaUrls;
use rand::distributions::{Alphanumeric, DistString};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

use crate::error::Result;

const SUFFIX_LEN: usize = 7;

/// A store of binary blobs addressed by name.
#[async_trait]
pub trait FileStorage: MediaUrls + Send + Sync {
    /// Stores `content` under `name`, or a free variant of it, and returns
    /// the name used.
    async fn save(&self, name: &str, content: &[u8]) -> Result<String>;

    /// Reads back the blob stored under `name`.
    async fn open(&self, name: &str) -> Result<Vec<u8>>;

    /// Removes `name`. Removing a missing name is not an error.
    async fn delete(&self, name: &str) -> Result<()>;

    async fn exists(&self, name: &str) -> Result<bool>;
}

/// Returns `name` with a random suffix inserted before its extension.
fn alternative_name(name: &str) -> String {
    let suffix = Alphanumeric.sample_string(&mut rand::thread_rng(), SUFFIX_LEN);
    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let file_name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext),
        None => format!("{}_{}", stem, suffix),
    };
    match name.rsplit_once('/') {
        Some((dir, _)) => format!("{}/{}", dir, file_name),
        None => file_name,
    }
}

async fn write_contents(file: &mut tokio::fs::File, content: &[u8]) -> io::Result<()> {
    file.write_all(content).await?;
    file.flush().await
}

/// Files under a media root directory on the local filesystem.
#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `name` below the root, refusing anything that escapes it.
    fn path(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if name.is_empty() || escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage name '{}'", name),
            )
            .into());
        }
        Ok(self.root.join(relative))
    }
}

impl MediaUrls for LocalFileStorage {
    fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    #[instrument(skip(self, content), fields(size = content.len()))]
    async fn save(&self, name: &str, content: &[u8]) -> Result<String> {
        let mut candidate = name.to_string();
        loop {
            let path = self.path(&candidate)?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            // `create_new` claims the name atomically, so concurrent saves
            // of the same name never share a file.
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    trace!("{} is taken", candidate);
                    candidate = alternative_name(name);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if let Err(e) = write_contents(&mut file, content).await {
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e.into());
            }
            debug!("Stored {} bytes at {}", content.len(), path.display());
            return Ok(candidate);
        }
    }

    async fn open(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path(name)?;
        trace!("Reading {}", path.display());
        Ok(tokio::fs::read(path).await?)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let path = self.path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path(name)?).await?)
    }
}

/// Blobs kept in memory, for tests and throwaway setups.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    base_url: String,
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            files: RwLock::default(),
        }
    }

    /// Number of stored blobs.
    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

impl MediaUrls for MemoryStorage {
    fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl FileStorage for MemoryStorage {
    async fn save(&self, name: &str, content: &[u8]) -> Result<String> {
        let mut files = self.files.write().await;
        let mut candidate = name.to_string();
        while files.contains_key(&candidate) {
            candidate = alternative_name(name);
        }
        files.insert(candidate.clone(), content.to_vec());
        Ok(candidate)
    }

    async fn open(&self, name: &str) -> Result<Vec<u8>> {
        self.files.read().await.get(name).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such file '{}'", name)).into()
        })
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.files.write().await.remove(name);
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.files.read().await.contains_key(name))
    }
}
