//! Raw artifact content.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Zip local file header signature.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
/// Zip end-of-central-directory signature (empty archive).
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";

/// Size, media type and checksum of an artifact's content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub size: u64,
    pub media_type: String,
    /// Hex-encoded SHA-256 of the content bytes.
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

/// Filename plus immutable, cheaply cloned bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactContent {
    filename: String,
    bytes: Arc<[u8]>,
}

impl ArtifactContent {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, naming the content after the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(filename, bytes))
    }

    /// Filename as uploaded, possibly with directories.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Last path segment of the filename.
    pub fn base_name(&self) -> &str {
        base_name(&self.filename)
    }

    /// Lowercase extension without the dot.
    pub fn extension(&self) -> Option<String> {
        let base = self.base_name();
        base.rfind('.')
            .filter(|&i| i > 0 && i + 1 < base.len())
            .map(|i| base[i + 1..].to_ascii_lowercase())
    }

    pub fn has_extension(&self, ext: &str) -> bool {
        self.extension().as_deref() == Some(ext)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the content starts with a zip signature.
    pub fn is_zip(&self) -> bool {
        self.bytes.starts_with(ZIP_MAGIC) || self.bytes.starts_with(ZIP_EMPTY_MAGIC)
    }

    /// Whether the first non-whitespace character is `<`.
    pub fn looks_like_xml(&self) -> bool {
        let bytes = self.bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&self.bytes[..]);
        bytes
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|&b| b == b'<')
    }

    pub fn checksum(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }

    /// Media type guessed from the filename.
    pub fn media_type(&self) -> String {
        mime_guess::from_path(self.base_name())
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }

    pub fn metadata(&self) -> ContentMetadata {
        ContentMetadata {
            size: self.bytes.len() as u64,
            media_type: self.media_type(),
            checksum: self.checksum(),
            encoding: None,
        }
    }
}

/// Last `/`-separated segment of a path.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
