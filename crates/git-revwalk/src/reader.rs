//! The `ObjectReader` contract: the narrow seam through which this engine
//! consumes an external object store.
//!
//! Everything about *how* objects are stored — loose files, packfiles,
//! alternates, a commit-graph file's on-disk layout, a bitmap index's
//! on-disk layout — is out of scope for this crate. Callers hand the
//! walker something that implements [`ObjectReader`]; the walker never
//! looks past that trait boundary.

use std::collections::HashSet;

use git_hash::ObjectId;

use crate::bitmap::BitmapIndex;
use crate::commit_graph::CommitGraph;
use crate::pool::ObjectKind;
use crate::RevWalkError;

/// The not-yet-validated bytes of a single object plus its declared type,
/// as handed back by an [`ObjectReader`] before a validator in
/// [`crate::validate`] has accepted it.
#[derive(Debug, Clone)]
pub enum RawObject {
    Commit(Box<[u8]>),
    Tree(Box<[u8]>),
    Blob(Box<[u8]>),
    Tag(Box<[u8]>),
}

impl RawObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            RawObject::Commit(_) => ObjectKind::Commit,
            RawObject::Tree(_) => ObjectKind::Tree,
            RawObject::Blob(_) => ObjectKind::Blob,
            RawObject::Tag(_) => ObjectKind::Tag,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            RawObject::Commit(b) | RawObject::Tree(b) | RawObject::Blob(b) | RawObject::Tag(b) => b,
        }
    }
}

/// External collaborator: anything capable of handing back raw object
/// bytes by identifier. Implemented by the pack/loose object store layer,
/// which is out of scope for this crate.
pub trait ObjectReader {
    /// Open an object, optionally hinting at its expected type so readers
    /// backed by a typed store can validate eagerly. Fails with
    /// [`RevWalkError::MissingObject`] if the id is unknown to the store.
    fn open(&self, id: &ObjectId, type_hint: Option<ObjectKind>) -> Result<RawObject, RevWalkError>;

    /// Whether the store has an object for this id, without reading it.
    fn has(&self, id: &ObjectId) -> bool;

    /// Hint that the reader may want to warm its cache for the given ids
    /// before they are opened one at a time. The engine itself is strictly
    /// synchronous (§5); this is a non-blocking hint only, standing in for
    /// the spec's `open_async`. The default implementation does nothing.
    fn prefetch(&self, _ids: &[ObjectId]) {}

    /// Commits the requesting peer only has shallow copies of. Their
    /// parent lists are replaced with the empty list for the duration of
    /// the walk (§6).
    fn shallow_commits(&self) -> HashSet<ObjectId> {
        HashSet::new()
    }

    /// The precomputed bitmap index for this store, if any.
    fn bitmap_index(&self) -> Option<&dyn BitmapIndex> {
        None
    }

    /// The commit-graph supplementary index for this store, if any.
    fn commit_graph(&self) -> Option<&dyn CommitGraph> {
        None
    }
}

/// A progress/cancellation handle threaded through long-running queries.
/// The walker checks `is_cancelled` at emission boundaries (per commit, per
/// object) and unwinds with [`RevWalkError::Cancelled`].
pub trait ProgressMonitor {
    fn update(&mut self, n: u64);
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// The always-available zero-cost default: no progress display, never
/// cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressMonitor for NullProgress {
    fn update(&mut self, _n: u64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_progress_never_cancels() {
        let mut p = NullProgress;
        p.update(100);
        assert!(!p.is_cancelled());
    }

    #[test]
    fn raw_object_kind_matches_variant() {
        let obj = RawObject::Tree(Box::from(&b""[..]));
        assert_eq!(obj.kind(), ObjectKind::Tree);
    }
}
