//! The innermost pipeline stage: walks parent edges commit-time-first,
//! propagating [`crate::Flags::UNINTERESTING`] to every ancestor and
//! applying the configured [`RevFilter`] (§4.3 step 1).

use std::collections::HashSet;

use git_hash::ObjectId;

use crate::filter::{FilterDecision, RevFilter};
use crate::flags::Flags;
use crate::generators::Generator;
use crate::pool::{Pool, RevObjectData};
use crate::queue::DateQueue;
use crate::reader::ObjectReader;
use crate::RevWalkError;

pub struct PendingGenerator {
    queue: DateQueue,
    queued: HashSet<ObjectId>,
    filter: Box<dyn RevFilter>,
    /// When true, commits carrying UNINTERESTING are still emitted (the
    /// boundary-commit variant); otherwise they are walked for
    /// propagation only and never yielded.
    emit_uninteresting: bool,
    /// Application flags a caller has registered with [`crate::walk::RevWalk::carry`].
    /// OR'd from a popped commit onto each of its parents as they are
    /// enqueued, matching the generic "carry(flag)" contract; UNINTERESTING
    /// itself is always carried regardless of this mask (see
    /// [`propagate_uninteresting`]).
    carry_mask: u32,
}

impl PendingGenerator {
    pub fn new(filter: Box<dyn RevFilter>, emit_uninteresting: bool) -> Self {
        Self::with_carry_mask(filter, emit_uninteresting, 0)
    }

    pub fn with_carry_mask(filter: Box<dyn RevFilter>, emit_uninteresting: bool, carry_mask: u32) -> Self {
        Self {
            queue: DateQueue::new(),
            queued: HashSet::new(),
            filter,
            emit_uninteresting,
            carry_mask,
        }
    }

    /// Seed the walk with a starting commit. Idempotent per id.
    pub fn mark_start(
        &mut self,
        pool: &mut Pool,
        reader: &dyn ObjectReader,
        id: &ObjectId,
    ) -> Result<(), RevWalkError> {
        self.enqueue(pool, reader, id)
    }

    /// Mark a commit (and, transitively, everything reachable from it)
    /// as excluded from output.
    pub fn mark_uninteresting(
        &mut self,
        pool: &mut Pool,
        reader: &dyn ObjectReader,
        id: &ObjectId,
    ) -> Result<(), RevWalkError> {
        self.enqueue(pool, reader, id)?;
        let obj = pool.lookup_commit(reader, id)?;
        obj.set_flag(Flags::UNINTERESTING.bits());
        propagate_uninteresting(pool, reader, id)
    }

    fn enqueue(
        &mut self,
        pool: &mut Pool,
        reader: &dyn ObjectReader,
        id: &ObjectId,
    ) -> Result<(), RevWalkError> {
        if self.queued.contains(id) {
            return Ok(());
        }
        let obj = pool.lookup_commit(reader, id)?;
        obj.set_flag(Flags::SEEN.bits());
        let commit_time = match &obj.data {
            RevObjectData::Commit(c) => c.commit_time,
            _ => unreachable!("lookup_commit guarantees a Commit payload"),
        };
        self.queued.insert(*id);
        self.queue.push(commit_time, *id);
        Ok(())
    }
}

/// Walk every ancestor of `id` that is not already UNINTERESTING,
/// setting the flag. Stops descending once a commit is found that
/// already carries it, since everything below it was already covered by
/// an earlier call.
fn propagate_uninteresting(
    pool: &mut Pool,
    reader: &dyn ObjectReader,
    id: &ObjectId,
) -> Result<(), RevWalkError> {
    let mut stack = vec![*id];
    while let Some(current) = stack.pop() {
        let parents = {
            let obj = pool.lookup_commit(reader, &current)?;
            match &obj.data {
                RevObjectData::Commit(c) => c.parents.clone(),
                _ => unreachable!(),
            }
        };
        for parent in parents {
            let pobj = pool.lookup_commit(reader, &parent)?;
            let already = pobj.has_flag(Flags::UNINTERESTING.bits());
            pobj.set_flag(Flags::UNINTERESTING.bits() | Flags::SEEN.bits());
            if !already {
                stack.push(parent);
            }
        }
    }
    Ok(())
}

impl Generator for PendingGenerator {
    fn next(
        &mut self,
        pool: &mut Pool,
        reader: &dyn ObjectReader,
    ) -> Result<Option<ObjectId>, RevWalkError> {
        loop {
            let Some(id) = self.queue.pop() else {
                return Ok(None);
            };

            let parents = {
                let obj = pool.lookup_commit(reader, &id)?;
                match &obj.data {
                    RevObjectData::Commit(c) => c.parents.clone(),
                    _ => unreachable!(),
                }
            };
            let is_uninteresting = pool.get(&id).unwrap().has_flag(Flags::UNINTERESTING.bits());
            let carried = pool.get(&id).unwrap().flags & self.carry_mask;

            for parent in &parents {
                self.enqueue(pool, reader, parent)?;
                if carried != 0 {
                    pool.get_mut(parent).unwrap().set_flag(carried);
                }
                if is_uninteresting {
                    let pobj = pool.lookup_commit(reader, parent)?;
                    let already = pobj.has_flag(Flags::UNINTERESTING.bits());
                    pobj.set_flag(Flags::UNINTERESTING.bits());
                    if !already {
                        propagate_uninteresting(pool, reader, parent)?;
                    }
                }
            }

            if is_uninteresting && !self.emit_uninteresting {
                continue;
            }

            if matches!(self.filter.decide(pool, &id), FilterDecision::Exclude) {
                continue;
            }

            return Ok(Some(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::AcceptAll;
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
    fn linear_history_in_commit_time_desc_order() {
        let tree = ObjectId::NULL_SHA1;
        let c1 = id(1);
        let c2 = id(2);
        let c3 = id(3);
        let mut objects = Map::new();
        objects.insert(c1, commit(tree, &[], 100));
        objects.insert(c2, commit(tree, &[c1], 200));
        objects.insert(c3, commit(tree, &[c2], 300));
        let reader = FakeReader { objects };

        let mut pool = Pool::new();
        let mut gen = PendingGenerator::new(Box::new(AcceptAll), false);
        gen.mark_start(&mut pool, &reader, &c3).unwrap();

        let mut out = Vec::new();
        while let Some(next) = gen.next(&mut pool, &reader).unwrap() {
            out.push(next);
        }
        assert_eq!(out, vec![c3, c2, c1]);
    }

    #[test]
    fn uninteresting_frontier_excludes_ancestors() {
        let tree = ObjectId::NULL_SHA1;
        let base = id(1);
        let branch = id(2);
        let tip = id(3);
        let mut objects = Map::new();
        objects.insert(base, commit(tree, &[], 100));
        objects.insert(branch, commit(tree, &[base], 200));
        objects.insert(tip, commit(tree, &[branch], 300));
        let reader = FakeReader { objects };

        let mut pool = Pool::new();
        let mut gen = PendingGenerator::new(Box::new(AcceptAll), false);
        gen.mark_start(&mut pool, &reader, &tip).unwrap();
        gen.mark_uninteresting(&mut pool, &reader, &branch).unwrap();

        let mut out = Vec::new();
        while let Some(next) = gen.next(&mut pool, &reader).unwrap() {
            out.push(next);
        }
        assert_eq!(out, vec![tip]);
    }
}
