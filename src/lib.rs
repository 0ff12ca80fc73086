//! # artificer
//!
//! Artifact ingestion core: content type detection, two-phase derivation
//! and linking, a zip-based archive container, and recursive archive
//! expansion.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! pipeline    → Ingestor: single uploads, batches, archive ingestion
//!   ↓
//! registry    → Registry / RegistryBuilder (detectors, builders, providers)
//!   ↓
//! integration → Kie, Teiid, SwitchYard detectors/builders/expander providers
//!   ↓
//! expand      → ArchiveExpander, ArtifactFilter, MetaDataFactory, ArchiveContext
//!   ↓
//! archive     → ArchiveContainer (zip + sidecar metadata), ArchiveEntry
//!   ↓
//! derive      → ArtifactBuilder framework, per-format builders, DerivationBatch
//!   ↓
//! link        → LinkerContext, UnresolvedReference
//!   ↓
//! detect      → ArtifactTypeDetector, DetectorChain
//!   ↓
//! xml         → namespace-aware DOM, XPath subset
//!   ↓
//! model       → ArtifactType, Artifact, Relationship, ArtifactContent
//!   ↓
//! error/config
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use artificer::{IngestConfig, Ingestor, Registry, Upload};
//!
//! # fn main() -> artificer::Result<()> {
//! let config = IngestConfig::default();
//! let registry = Registry::with_defaults(&config);
//! let ingest = Ingestor::new(&registry, &config).ingest_archive(Upload::from_file("app.jar")?)?;
//! for artifact in ingest.artifacts() {
//!     println!("{} {}", artifact.artifact_type, artifact.name);
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// MODULES (dependency order: error/config → model → xml → detect → link →
// derive → archive → expand → integration → registry → pipeline)
// ============================================================================

/// Error taxonomy
pub mod error;

/// Ingestion settings
pub mod config;

/// Artifacts, types, relationships and content
pub mod model;

/// Namespace-aware DOM and XPath subset
pub mod xml;

/// Content type detection
pub mod detect;

/// Identity keys and reference resolution
pub mod link;

/// Per-format builders and the two-phase batch driver
pub mod derive;

/// Zip container with sidecar metadata
pub mod archive;

/// Recursive archive expansion
pub mod expand;

/// Kie, Teiid and SwitchYard support
pub mod integration;

/// Registration of pluggable pieces
pub mod registry;

/// Ingestion entry points
pub mod pipeline;

// Re-export commonly needed items
pub use archive::{ArchiveContainer, ArchiveEntry};
pub use config::IngestConfig;
pub use derive::{ArtifactBuilder, ArtifactBuilderFactory, DerivationBatch, DerivationResult};
pub use detect::{ArtifactTypeDetector, DetectorChain};
pub use error::{IngestError, Result};
pub use expand::{ArchiveContext, ArchiveExpander, ArtifactFilter, ExpanderProvider, MetaDataFactory};
pub use link::{LinkerContext, UnresolvedReference};
pub use model::{
    Artifact, ArtifactContent, ArtifactKind, ArtifactType, IdentityKey, Relationship,
    RelationshipTarget,
};
pub use pipeline::{ArchiveIngest, IngestResult, Ingestor, Upload};
pub use registry::{Registry, RegistryBuilder};
