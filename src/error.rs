//! Error types for ingestion operations.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors that can occur while detecting, deriving, linking or expanding
/// artifacts.
///
/// Unresolved relationship targets are not errors; they are reported as
/// [`UnresolvedReference`](crate::link::UnresolvedReference) diagnostics.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Malformed XML, bytecode or descriptor content.
    #[error("Failed to parse '{path}': {message}")]
    ContentParse { path: String, message: String },

    /// Corrupt zip or missing required archive entry.
    #[error("Archive error: {0}")]
    ArchiveFormat(String),

    /// Temporary directory creation or deletion failure.
    #[error("Resource error: {message}: {source}")]
    Resource {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// A builder failed while deriving from the given file.
    #[error("Derivation failed for '{path}': {source}")]
    Derive {
        path: String,
        #[source]
        source: Box<IngestError>,
    },

    /// An archive entry could not be expanded.
    #[error("Expansion failed for '{path}': {source}")]
    Expansion {
        path: String,
        #[source]
        source: Box<IngestError>,
    },

    /// Entry path is empty, absolute or escapes the archive root.
    #[error("Invalid archive entry path: {0}")]
    InvalidEntry(String),

    /// Entry path already present in the container.
    #[error("Archive entry already exists: {0}")]
    DuplicateEntry(String),

    /// Sidecar metadata could not be read or written.
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Low-level XML reader error.
    #[error("XML error: {0}")]
    Xml(String),

    /// XPath expression could not be compiled.
    #[error("XPath error: {0}")]
    XPath(String),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Create a content parse error for the given file.
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ContentParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an archive format error.
    pub fn archive(message: impl Into<String>) -> Self {
        Self::ArchiveFormat(message.into())
    }

    /// Create a resource error wrapping an IO failure.
    pub fn resource(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Resource {
            message: message.into(),
            source,
        }
    }

    /// Create a metadata error.
    pub fn metadata(message: impl Into<String>) -> Self {
        Self::Metadata(message.into())
    }

    /// Create an XML error.
    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml(message.into())
    }

    /// Create an XPath error.
    pub fn xpath(message: impl Into<String>) -> Self {
        Self::XPath(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Wrap a builder failure with the offending filename.
    ///
    /// Already-wrapped errors are returned unchanged so the innermost path
    /// is the one reported.
    pub fn derive(path: impl Into<String>, source: IngestError) -> Self {
        match source {
            wrapped @ Self::Derive { .. } => wrapped,
            other => Self::Derive {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }

    /// Wrap an expansion failure with the offending archive path.
    pub fn expansion(path: impl Into<String>, source: IngestError) -> Self {
        Self::Expansion {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Whether this failure is scoped to one artifact's content.
    pub fn is_content_error(&self) -> bool {
        match self {
            Self::ContentParse { .. } | Self::Xml(_) => true,
            Self::Derive { source, .. } | Self::Expansion { source, .. } => {
                source.is_content_error()
            }
            _ => false,
        }
    }
}
