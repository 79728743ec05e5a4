//! Reachability queries: "is this object reachable from that set of
//! starting commits" (§4.5), answered one of two ways depending on what
//! the object store exposes.
//!
//! [`BitmappedReachability`] reuses [`crate::bitmap::reachability_bitmap`]'s
//! precomputed-index fast path. [`PedestrianReachability`] has no index to
//! lean on, so it answers each query by running an ordinary [`RevWalk`]:
//! mark the candidate target as the sole start and every starting commit as
//! uninteresting, then drain it. If nothing is emitted, the target's entire
//! ancestry (including the target itself) was already covered by the
//! starts — the target is reachable from them. This reuses the walker's own
//! UNINTERESTING propagation instead of a bespoke BFS, the same way
//! [`crate::merge_base::is_ancestor`] reuses the paint algorithm rather than
//! hand-rolling ancestry checks.

use std::collections::HashSet;

use git_hash::ObjectId;

use crate::bitmap::reachability_bitmap;
use crate::pool::Pool;
use crate::reader::{NullProgress, ObjectReader};
use crate::walk::WalkBuilder;
use crate::RevWalkError;

/// Outcome of a batch reachability query: which of the queried targets
/// were found reachable from the starts, and which weren't.
#[derive(Debug, Default)]
pub struct ReachabilityReport {
    pub reachable: HashSet<ObjectId>,
    pub unreachable: HashSet<ObjectId>,
}

impl ReachabilityReport {
    pub fn is_reachable(&self, id: &ObjectId) -> bool {
        self.reachable.contains(id)
    }
}

/// Answers "which of these targets are reachable from these starts",
/// without committing callers to one particular strategy.
pub trait ReachabilityChecker {
    fn targets_reachable_from(
        &mut self,
        starts: &[ObjectId],
        targets: &[ObjectId],
    ) -> Result<ReachabilityReport, RevWalkError>;
}

/// Picks [`BitmappedReachability`] when the reader exposes a bitmap index,
/// [`PedestrianReachability`] otherwise. Mirrors the same `is_some()` check
/// [`crate::walk::RevWalk`]'s pipeline assembly uses to pick the
/// commit-graph-accelerated topo stage over the classical one.
pub fn reachability_checker<'r>(reader: &'r dyn ObjectReader) -> Box<dyn ReachabilityChecker + 'r> {
    if reader.bitmap_index().is_some() {
        Box::new(BitmappedReachability::new(reader))
    } else {
        Box::new(PedestrianReachability::new(reader))
    }
}

/// Bitmap-index-backed reachability: computes the full reachable-object
/// bitmap for `starts` once, then answers every target as a membership
/// test against it.
pub struct BitmappedReachability<'r> {
    pool: Pool,
    reader: &'r dyn ObjectReader,
}

impl<'r> BitmappedReachability<'r> {
    pub fn new(reader: &'r dyn ObjectReader) -> Self {
        Self { pool: Pool::new(), reader }
    }
}

impl<'r> ReachabilityChecker for BitmappedReachability<'r> {
    fn targets_reachable_from(
        &mut self,
        starts: &[ObjectId],
        targets: &[ObjectId],
    ) -> Result<ReachabilityReport, RevWalkError> {
        let mut progress = NullProgress;
        let result = reachability_bitmap(
            &mut self.pool,
            self.reader,
            &mut progress,
            starts,
            &HashSet::new(),
            false,
        )?;

        let mut report = ReachabilityReport::default();
        for &target in targets {
            if result.reachable.contains(&target) {
                report.reachable.insert(target);
            } else {
                report.unreachable.insert(target);
            }
        }
        Ok(report)
    }
}

/// No-index fallback: answers each target with a dedicated commit walk
/// rather than materializing a full reachable set up front, since without
/// an index there is no shared structure worth amortizing across targets.
pub struct PedestrianReachability<'r> {
    reader: &'r dyn ObjectReader,
}

impl<'r> PedestrianReachability<'r> {
    pub fn new(reader: &'r dyn ObjectReader) -> Self {
        Self { reader }
    }
}

impl<'r> ReachabilityChecker for PedestrianReachability<'r> {
    fn targets_reachable_from(
        &mut self,
        starts: &[ObjectId],
        targets: &[ObjectId],
    ) -> Result<ReachabilityReport, RevWalkError> {
        let mut report = ReachabilityReport::default();
        for &target in targets {
            let mut walker = WalkBuilder::new().build(self.reader);
            walker.mark_start(target)?;
            for &start in starts {
                walker.mark_uninteresting(start)?;
            }
            let covered = walker.next_commit()?.is_none();
            if covered {
                report.reachable.insert(target);
            } else {
                report.unreachable.insert(target);
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::RawObject;
    use std::collections::HashMap as Map;

    struct FakeReader {
        objects: Map<ObjectId, RawObject>,
    }

    impl ObjectReader for FakeReader {
        fn open(&self, id: &ObjectId, _hint: Option<crate::pool::ObjectKind>) -> Result<RawObject, RevWalkError> {
            self.objects.get(id).cloned().ok_or(RevWalkError::MissingObject { id: *id })
        }
        fn has(&self, id: &ObjectId) -> bool {
            self.objects.contains_key(id)
        }
    }

    fn id(byte: u8) -> ObjectId {
        let mut bytes = [0u8; 20];
        bytes[19] = byte;
        ObjectId::from_bytes(&bytes, git_hash::HashAlgorithm::Sha1).unwrap()
    }

    fn commit(tree: ObjectId, parents: &[ObjectId], time: i64) -> RawObject {
        let mut s = format!("tree {}\n", tree.to_hex());
        for p in parents {
            s.push_str(&format!("parent {}\n", p.to_hex()));
        }
        s.push_str(&format!("author A <a@b.com> {time} +0000\n"));
        s.push_str(&format!("committer A <a@b.com> {time} +0000\n"));
        s.push_str("\nmsg\n");
        RawObject::Commit(s.into_bytes().into_boxed_slice())
    }

    #[test]
    fn pedestrian_finds_ancestor_reachable_from_tip() {
        let tree = ObjectId::NULL_SHA1;
        let base = id(1);
        let tip = id(2);
        let mut objects = Map::new();
        objects.insert(base, commit(tree, &[], 100));
        objects.insert(tip, commit(tree, &[base], 200));
        let reader = FakeReader { objects };

        let mut checker = PedestrianReachability::new(&reader);
        let report = checker.targets_reachable_from(&[tip], &[base]).unwrap();
        assert!(report.is_reachable(&base));
    }

    #[test]
    fn pedestrian_rejects_unrelated_commit() {
        let tree = ObjectId::NULL_SHA1;
        let base = id(1);
        let tip = id(2);
        let unrelated = id(3);
        let mut objects = Map::new();
        objects.insert(base, commit(tree, &[], 100));
        objects.insert(tip, commit(tree, &[base], 200));
        objects.insert(unrelated, commit(tree, &[], 50));
        let reader = FakeReader { objects };

        let mut checker = PedestrianReachability::new(&reader);
        let report = checker.targets_reachable_from(&[tip], &[unrelated]).unwrap();
        assert!(!report.is_reachable(&unrelated));
    }

    #[test]
    fn factory_picks_pedestrian_without_bitmap_index() {
        let reader = FakeReader { objects: Map::new() };
        let checker = reachability_checker(&reader);
        // No direct way to downcast a trait object in this crate; the
        // absence of a bitmap index is enough to exercise the selection
        // branch without panicking.
        drop(checker);
    }
}
