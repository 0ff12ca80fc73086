//! Per-pass expansion context.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::Result;
use crate::model::ArtifactType;

/// Side-channel accompanying one archive expansion pass.
///
/// A context is created per archive and handed by reference to filters,
/// metadata factories and detectors. Nested archives get a child context
/// that extends the parent UUID chain.
pub struct ArchiveContext {
    archive_type: Option<ArtifactType>,
    parent_chain: Vec<Uuid>,
    expanded_from_archive: bool,
    depth: usize,
    max_depth: usize,
    work_dir: PathBuf,
    entries: Vec<String>,
    custom: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl ArchiveContext {
    /// Context for a top-level archive.
    ///
    /// `parent` is the UUID of the archive artifact being expanded, if known.
    pub fn new(
        archive_type: Option<ArtifactType>,
        parent: Option<Uuid>,
        work_dir: impl Into<PathBuf>,
        entries: Vec<String>,
        max_depth: usize,
    ) -> Self {
        Self {
            archive_type,
            parent_chain: parent.into_iter().collect(),
            expanded_from_archive: false,
            depth: 1,
            max_depth,
            work_dir: work_dir.into(),
            entries,
            custom: HashMap::new(),
        }
    }

    /// Context for an archive found inside this one.
    ///
    /// Custom context does not carry over; each archive builds its own.
    pub fn child(
        &self,
        nested_archive: Uuid,
        archive_type: Option<ArtifactType>,
        work_dir: impl Into<PathBuf>,
        entries: Vec<String>,
    ) -> Self {
        let mut parent_chain = self.parent_chain.clone();
        parent_chain.push(nested_archive);
        Self {
            archive_type,
            parent_chain,
            expanded_from_archive: true,
            depth: self.depth + 1,
            max_depth: self.max_depth,
            work_dir: work_dir.into(),
            entries,
            custom: HashMap::new(),
        }
    }

    pub fn archive_type(&self) -> Option<&ArtifactType> {
        self.archive_type.as_ref()
    }

    /// Whether the archive is explicitly typed as the given extended type.
    pub fn is_extended_type_archive(&self, extended_type: &str) -> bool {
        self.archive_type
            .as_ref()
            .is_some_and(|t| t.is_extended_type(extended_type))
    }

    /// Whether this archive was itself found inside another archive.
    pub fn is_expanded_from_archive(&self) -> bool {
        self.expanded_from_archive
    }

    /// UUID of the archive whose entries are being expanded.
    pub fn parent_uuid(&self) -> Option<Uuid> {
        self.parent_chain.last().copied()
    }

    /// Provenance chain, outermost archive first.
    pub fn parent_chain(&self) -> &[Uuid] {
        &self.parent_chain
    }

    /// Nesting depth; the top-level archive is 1.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether archives found here may still be expanded.
    pub fn can_descend(&self) -> bool {
        self.depth < self.max_depth
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Entry paths in physical order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn has_entry(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        self.entries.iter().any(|e| e == path)
    }

    /// On-disk location of an entry, if present.
    pub fn entry_file(&self, path: &str) -> Option<PathBuf> {
        let path = path.trim_start_matches('/');
        self.has_entry(path).then(|| self.work_dir.join(path))
    }

    /// Read an entry's bytes, if present.
    pub fn read_entry(&self, path: &str) -> Result<Option<Vec<u8>>> {
        match self.entry_file(path) {
            Some(file) => Ok(Some(std::fs::read(file)?)),
            None => Ok(None),
        }
    }

    pub fn set_custom<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.custom.insert(key.into(), Box::new(value));
    }

    pub fn custom<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.custom.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn has_custom(&self, key: &str) -> bool {
        self.custom.contains_key(key)
    }
}

impl fmt::Debug for ArchiveContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveContext")
            .field("archive_type", &self.archive_type)
            .field("parent_chain", &self.parent_chain)
            .field("depth", &self.depth)
            .field("work_dir", &self.work_dir)
            .field("entries", &self.entries.len())
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_extends_chain_and_depth() {
        let top = Uuid::new_v4();
        let nested = Uuid::new_v4();
        let ctx = ArchiveContext::new(None, Some(top), "/tmp/a", vec!["x.xml".into()], 3);
        let child = ctx.child(nested, None, "/tmp/b", Vec::new());

        assert!(!ctx.is_expanded_from_archive());
        assert!(child.is_expanded_from_archive());
        assert_eq!(child.parent_chain(), &[top, nested]);
        assert_eq!(child.parent_uuid(), Some(nested));
        assert_eq!(child.depth(), 2);
        assert!(child.can_descend());
        assert!(!child.child(Uuid::new_v4(), None, "/tmp/c", Vec::new()).can_descend());
    }

    #[test]
    fn test_entry_lookup() {
        let ctx = ArchiveContext::new(None, None, "/work", vec!["META-INF/vdb.xml".into()], 8);
        assert!(ctx.has_entry("/META-INF/vdb.xml"));
        assert_eq!(
            ctx.entry_file("META-INF/vdb.xml"),
            Some(PathBuf::from("/work/META-INF/vdb.xml"))
        );
        assert_eq!(ctx.entry_file("missing"), None);
    }

    #[test]
    fn test_custom_context_is_typed() {
        let mut ctx = ArchiveContext::new(
            Some(ArtifactType::extended_document("SwitchYardApplication")),
            None,
            "/work",
            Vec::new(),
            8,
        );
        ctx.set_custom("index", vec!["a.B".to_string()]);
        assert_eq!(ctx.custom::<Vec<String>>("index").map(Vec::len), Some(1));
        assert!(ctx.custom::<String>("index").is_none());
        assert!(ctx.is_extended_type_archive("SwitchYardApplication"));
    }
}
