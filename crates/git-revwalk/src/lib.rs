//! Revision and object graph traversal engine.
//!
//! Given an append-only object database of commits, trees, blobs, and
//! annotated tags, this crate provides topologically-aware commit
//! iteration (pluggable ordering, history simplification, shallow/depth
//! limits), object-level iteration over trees and blobs, bitmap-accelerated
//! reachability queries, and strict validators for the canonical commit,
//! tag, and tree byte formats.
//!
//! The pack/loose object store, the commit-graph file's on-disk layout, the
//! bitmap index's on-disk layout, rename detection, and any CLI/config
//! plumbing are external collaborators, referenced here only through the
//! narrow trait contracts in [`reader`] and [`commit_graph`].

pub mod bitmap;
pub mod commit_graph;
pub mod filter;
mod generators;
pub mod merge_base;
pub mod objectwalk;
pub mod pool;
pub mod queue;
pub mod reachability;
pub mod reader;
pub mod validate;
pub mod walk;

mod flags;

pub use flags::{FlagAllocator, Flags};
pub use pool::{CommitData, ObjectKind, Pool, RevObject, RevObjectData, TagData};
pub use reader::{NullProgress, ObjectReader, ProgressMonitor, RawObject};
pub use walk::{RevWalk, Sorting, WalkBuilder};

use git_hash::ObjectId;

/// Unknown-generation sentinel: a commit whose generation number has not
/// been computed (no commit-graph coverage, or not yet derived by the
/// classical topo sorter).
pub const GENERATION_UNKNOWN: u32 = u32::MAX;

/// Errors produced by this crate's public API.
///
/// `StopWalk`, the control-flow signal filters use to request early
/// termination, is deliberately not a variant here: per the spec it must
/// never be user-visible. It lives as a crate-private type in
/// [`filter`].
#[derive(Debug, thiserror::Error)]
pub enum RevWalkError {
    #[error("missing object {id}")]
    MissingObject { id: ObjectId },

    #[error("object {id} has type {actual:?}, expected {expected:?}")]
    IncorrectObjectType {
        id: ObjectId,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    #[error("object {id} exceeds the retained-body size limit")]
    LargeObject { id: ObjectId },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("rev-walk failed: {0}")]
    RevWalk(#[source] Box<RevWalkError>),

    #[error("query cancelled")]
    Cancelled,
}

/// Maximum size, in bytes, of an object body the pool will retain in full.
/// Exceeding this while retaining bodies fails with [`RevWalkError::LargeObject`].
pub const MAX_RETAINED_BODY: usize = 5 * 1024 * 1024;
