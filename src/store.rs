//! Persistent artifact storage for challenge material (tokens, ephemeral keys,
//! self-signed certificates).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AcmeError;

/// The only group this core writes to; other groups (accounts, issued certs)
/// belong to a renewal-scheduling layer built on top of this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Challenges,
}

impl Group {
    fn as_str(self) -> &'static str {
        match self {
            Group::Challenges => "challenges",
        }
    }
}

/// The shape of a stored artifact, used by filesystem implementations to pick
/// file permissions/extensions; purely informational for in-memory stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Text,
    PKey,
    Cert,
}

impl Kind {
    fn extension(self) -> &'static str {
        match self {
            Kind::Text => "txt",
            Kind::PKey => "key.der",
            Kind::Cert => "crt.der",
        }
    }
}

pub const HTTP01: &str = "http01";
pub const TLS_ALPN_01_PKEY: &str = "tls-alpn-01-pkey";
pub const TLS_ALPN_01_CERT: &str = "tls-alpn-01-cert";
pub const TLS_SNI_01_PKEY: &str = "tls-sni-01-pkey";
pub const TLS_SNI_01_CERT: &str = "tls-sni-01-cert";

/// Where challenge handlers persist and re-read artifacts across invocations.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn load(
        &self,
        group: Group,
        dir: &str,
        filename: &str,
        kind: Kind,
    ) -> Result<Option<Vec<u8>>, AcmeError>;

    async fn save(
        &self,
        group: Group,
        dir: &str,
        filename: &str,
        kind: Kind,
        value: &[u8],
    ) -> Result<(), AcmeError>;
}

/// In-memory artifact store, used by tests and by callers with no filesystem.
#[derive(Default)]
pub struct MemoryArtifactStore {
    entries: Mutex<HashMap<(Group, String, String), Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn load(
        &self,
        group: Group,
        dir: &str,
        filename: &str,
        _kind: Kind,
    ) -> Result<Option<Vec<u8>>, AcmeError> {
        let key = (group, dir.to_string(), filename.to_string());
        Ok(self.entries.lock().unwrap().get(&key).cloned())
    }

    async fn save(
        &self,
        group: Group,
        dir: &str,
        filename: &str,
        _kind: Kind,
        value: &[u8],
    ) -> Result<(), AcmeError> {
        let key = (group, dir.to_string(), filename.to_string());
        self.entries.lock().unwrap().insert(key, value.to_vec());
        Ok(())
    }
}

/// Filesystem artifact store: `<base>/<group>/<dir>/<filename>.<ext>`.
pub struct DirArtifactStore {
    base: PathBuf,
}

impl DirArtifactStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn path(&self, group: Group, dir: &str, filename: &str, kind: Kind) -> PathBuf {
        self.base
            .join(group.as_str())
            .join(dir)
            .join(format!("{filename}.{}", kind.extension()))
    }
}

#[async_trait]
impl ArtifactStore for DirArtifactStore {
    async fn load(
        &self,
        group: Group,
        dir: &str,
        filename: &str,
        kind: Kind,
    ) -> Result<Option<Vec<u8>>, AcmeError> {
        let path = self.path(group, dir, filename, kind);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AcmeError::Io(e)),
        }
    }

    async fn save(
        &self,
        group: Group,
        dir: &str,
        filename: &str,
        kind: Kind,
        value: &[u8],
    ) -> Result<(), AcmeError> {
        let path = self.path(group, dir, filename, kind);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, value).await?;
        Ok(())
    }
}
