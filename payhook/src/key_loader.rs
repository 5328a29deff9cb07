//! Key loading.
//!
//! Keys are read fresh for every operation; nothing is cached across calls. Wrap a
//! [`KeyLoader`] in your own caching layer if repeated reads matter.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::KeyPaths;
use crate::errors::{Error, Result};
use crate::signing::keys::{KeyMaterial, KeyRole, parse_private_key, parse_public_key};

pub const DEFAULT_PRIVATE_KEY_PATH: &str = "./keys/private.pem";
pub const DEFAULT_PUBLIC_KEY_PATH: &str = "./keys/public.pem";

/// Source of PEM key text.
#[async_trait]
pub trait KeyLoader: Send + Sync {
    /// Return the raw PEM text for the key with the given role.
    async fn load_key_text(&self, role: KeyRole) -> Result<String>;

    /// Load and parse the private key.
    async fn private_key(&self) -> Result<KeyMaterial> {
        parse_private_key(&self.load_key_text(KeyRole::Private).await?)
    }

    /// Load and parse the public key.
    async fn public_key(&self) -> Result<KeyMaterial> {
        parse_public_key(&self.load_key_text(KeyRole::Public).await?)
    }
}

/// Read a key file, telling a missing file apart from other I/O failures.
pub async fn load_key_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::KeyNotFound { path: path.to_path_buf() },
        _ => Error::KeyRead {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

/// Loads PEM files from disk.
#[derive(Debug, Clone)]
pub struct FileKeyLoader {
    private: PathBuf,
    public: PathBuf,
}

impl FileKeyLoader {
    pub fn new(private: impl Into<PathBuf>, public: impl Into<PathBuf>) -> Self {
        Self {
            private: private.into(),
            public: public.into(),
        }
    }

    pub fn path(&self, role: KeyRole) -> &Path {
        match role {
            KeyRole::Private => &self.private,
            KeyRole::Public => &self.public,
        }
    }
}

impl Default for FileKeyLoader {
    fn default() -> Self {
        Self::new(DEFAULT_PRIVATE_KEY_PATH, DEFAULT_PUBLIC_KEY_PATH)
    }
}

impl From<&KeyPaths> for FileKeyLoader {
    fn from(paths: &KeyPaths) -> Self {
        Self::new(&paths.private, &paths.public)
    }
}

#[async_trait]
impl KeyLoader for FileKeyLoader {
    async fn load_key_text(&self, role: KeyRole) -> Result<String> {
        let path = self.path(role);
        tracing::debug!(role = %role, path = %path.display(), "Loading key file");
        load_key_text(path).await
    }
}

/// Serves PEM text held in memory, e.g. keys injected from a secret store.
#[derive(Clone, Default)]
pub struct InMemoryKeyLoader {
    private: Option<String>,
    public: Option<String>,
}

impl InMemoryKeyLoader {
    pub fn new(private: Option<String>, public: Option<String>) -> Self {
        Self { private, public }
    }
}

impl std::fmt::Debug for InMemoryKeyLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKeyLoader")
            .field("private", &self.private.as_ref().map(|_| "[REDACTED]"))
            .field("public", &self.public.is_some())
            .finish()
    }
}

#[async_trait]
impl KeyLoader for InMemoryKeyLoader {
    async fn load_key_text(&self, role: KeyRole) -> Result<String> {
        let text = match role {
            KeyRole::Private => &self.private,
            KeyRole::Public => &self.public,
        };
        text.clone().ok_or_else(|| Error::KeyNotFound {
            path: PathBuf::from(format!("<memory:{role}>")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::keys::fixtures::*;

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("private.pem");

        let err = load_key_text(&path).await.unwrap_err();
        assert!(matches!(err, Error::KeyNotFound { path: p } if p == path));
    }

    #[tokio::test]
    async fn test_directory_is_read_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = load_key_text(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::KeyRead { .. }));
    }

    #[tokio::test]
    async fn test_file_loader_reads_both_roles() {
        let dir = tempfile::tempdir().unwrap();
        let private = dir.path().join("private.pem");
        let public = dir.path().join("public.pem");
        std::fs::write(&private, PRIVATE_PEM).unwrap();
        std::fs::write(&public, PUBLIC_PEM).unwrap();

        let loader = FileKeyLoader::new(&private, &public);
        assert_eq!(loader.private_key().await.unwrap().role(), KeyRole::Private);
        assert_eq!(loader.public_key().await.unwrap().role(), KeyRole::Public);
    }

    #[tokio::test]
    async fn test_file_loader_rereads_on_every_call() {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public.pem");
        std::fs::write(&public, PUBLIC_PEM).unwrap();

        let loader = FileKeyLoader::new(dir.path().join("private.pem"), &public);
        let first = loader.public_key().await.unwrap();

        std::fs::write(&public, OTHER_PUBLIC_PEM).unwrap();
        let second = loader.public_key().await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_wrong_key_file_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let private = dir.path().join("private.pem");
        std::fs::write(&private, PUBLIC_PEM).unwrap();

        let loader = FileKeyLoader::new(&private, dir.path().join("public.pem"));
        assert!(matches!(loader.private_key().await, Err(Error::KeyFormat { .. })));
    }

    #[test]
    fn test_default_paths() {
        let loader = FileKeyLoader::default();
        assert_eq!(loader.path(KeyRole::Private), Path::new("./keys/private.pem"));
        assert_eq!(loader.path(KeyRole::Public), Path::new("./keys/public.pem"));
    }

    #[tokio::test]
    async fn test_in_memory_loader() {
        let loader = InMemoryKeyLoader::new(Some(PRIVATE_PEM.to_string()), None);
        assert!(loader.private_key().await.is_ok());
        assert!(matches!(loader.public_key().await, Err(Error::KeyNotFound { .. })));
    }
}
