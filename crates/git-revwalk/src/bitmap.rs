//! Bitmap-accelerated reachability: the optional fast path taken whenever
//! a pack has a bitmap index covering part of the start set (§4.5).
//!
//! The bitmap format itself — EWAH-compressed words, the on-disk index
//! header, the commit-to-bitmap table — is an external collaborator's
//! concern. This module only defines the trait seam ([`Bitmap`],
//! [`BitmapIndex`], [`BitmapBuilder`]) and the engine logic that walks
//! the object graph while reusing precomputed bitmaps wherever they
//! cover a commit, falling back to a pedestrian walk for anything they
//! don't.

use std::collections::HashSet;

use git_hash::ObjectId;

use crate::pool::Pool;
use crate::reader::{ObjectReader, ProgressMonitor};
use crate::RevWalkError;

/// An immutable, already-built bitmap over some object id space.
pub trait Bitmap {
    fn contains(&self, id: &ObjectId) -> bool;
    fn ids(&self) -> Box<dyn Iterator<Item = ObjectId> + '_>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// External collaborator: a precomputed index mapping some commits to
/// their full reachable-object bitmap.
pub trait BitmapIndex {
    /// The precomputed bitmap for `id`, if this index covers it.
    fn get_bitmap(&self, id: &ObjectId) -> Option<Box<dyn Bitmap>>;

    /// Start building a fresh bitmap, seeded empty.
    fn new_builder(&self) -> Box<dyn BitmapBuilder>;
}

/// A mutable accumulator used while extending bitmap coverage with a
/// pedestrian walk over commits the index doesn't cover.
pub trait BitmapBuilder {
    /// OR another bitmap's bits into this one in place.
    fn or(&mut self, other: &dyn Bitmap);
    fn contains(&self, id: &ObjectId) -> bool;
    fn add_object(&mut self, id: &ObjectId);
    fn build(self: Box<Self>) -> Box<dyn Bitmap>;
}

/// A plain `HashSet`-backed bitmap, used as the engine's own builder
/// implementation when a store's `BitmapIndex` needs one and also
/// wherever tests need a concrete [`Bitmap`] without a real index.
#[derive(Debug, Default, Clone)]
pub struct HashSetBitmap {
    ids: HashSet<ObjectId>,
}

impl HashSetBitmap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = ObjectId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }
}

impl Bitmap for HashSetBitmap {
    fn contains(&self, id: &ObjectId) -> bool {
        self.ids.contains(id)
    }

    fn ids(&self) -> Box<dyn Iterator<Item = ObjectId> + '_> {
        Box::new(self.ids.iter().cloned())
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

impl BitmapBuilder for HashSetBitmap {
    fn or(&mut self, other: &dyn Bitmap) {
        for id in other.ids() {
            self.ids.insert(id);
        }
    }

    fn contains(&self, id: &ObjectId) -> bool {
        self.ids.contains(id)
    }

    fn add_object(&mut self, id: &ObjectId) {
        self.ids.insert(id.clone());
    }

    fn build(self: Box<Self>) -> Box<dyn Bitmap> {
        self
    }
}

/// Outcome of a bitmap reachability query: every reachable object id,
/// plus how many starting commits had to fall back to a pedestrian walk
/// because the index didn't cover them.
#[derive(Debug)]
pub struct ReachabilityResult {
    pub reachable: Box<dyn Bitmap>,
    pub misses: u32,
}

/// Compute the full set of objects reachable from `starts`, reusing any
/// bitmap coverage the reader's index provides and walking the
/// uncovered remainder by hand.
///
/// `ignore_missing`, when true, treats a [`RevWalkError::MissingObject`]
/// encountered while walking an individual start commit as a miss for
/// that commit rather than an aborting error for the whole query (§4.5).
pub fn reachability_bitmap(
    pool: &mut Pool,
    reader: &dyn ObjectReader,
    progress: &mut dyn ProgressMonitor,
    starts: &[ObjectId],
    seen: &HashSet<ObjectId>,
    ignore_missing: bool,
) -> Result<ReachabilityResult, RevWalkError> {
    let mut result = HashSetBitmap::new();
    let mut misses = 0u32;

    let index = reader.bitmap_index();

    for start in starts {
        if progress.is_cancelled() {
            return Err(RevWalkError::Cancelled);
        }
        if seen.contains(start) {
            continue;
        }

        if let Some(index) = index {
            if let Some(bitmap) = index.get_bitmap(start) {
                result.or(bitmap.as_ref());
                progress.update(1);
                continue;
            }
        }

        match walk_one(pool, reader, start, &result) {
            Ok(extra) => {
                for id in extra {
                    result.add_object(&id);
                }
                progress.update(1);
            }
            Err(RevWalkError::MissingObject { .. }) if ignore_missing => {
                misses += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(ReachabilityResult {
        reachable: Box::new(result),
        misses,
    })
}

/// A plain recursive closure walk for one start commit's tree/parent
/// reachable set, used whenever the bitmap index doesn't cover it. Not
/// the same traversal as [`crate::walk::RevWalk`]: this one materializes
/// the full object-level reachable set for a single commit, with no
/// pipeline machinery, since it only ever needs to run on the handful of
/// starts an index misses.
fn walk_one(
    pool: &mut Pool,
    reader: &dyn ObjectReader,
    start: &ObjectId,
    already: &HashSetBitmap,
) -> Result<HashSet<ObjectId>, RevWalkError> {
    use crate::pool::RevObjectData;

    let mut out = HashSet::new();
    let mut stack = vec![start.clone()];
    let mut visited = HashSet::new();

    while let Some(id) = stack.pop() {
        if !visited.insert(id.clone()) || already.contains(&id) {
            continue;
        }
        out.insert(id.clone());

        let obj = pool.lookup_or_parse_any(reader, &id)?;
        match &obj.data {
            RevObjectData::Commit(c) => {
                stack.push(c.tree.clone());
                for p in &c.parents {
                    stack.push(p.clone());
                }
            }
            RevObjectData::Tag(t) => {
                stack.push(t.target.clone());
            }
            RevObjectData::Tree(entries) => {
                for entry in entries {
                    stack.push(entry.id.clone());
                }
            }
            RevObjectData::Blob => {}
        }
    }

    Ok(out)
}
