//! Object-level traversal: walks commits the same way [`RevWalk`] does, but
//! additionally descends into each commit's tree and yields every tree and
//! blob reachable from it, skipping whatever has already been marked
//! uninteresting by the underlying commit walk.
//!
//! Grounded on the teacher's `objects.rs`, whose `collect_reachable` and
//! `collect_reachable_filtered` walk a commit's tree with a plain stack and
//! an exclusion set; the same shape here is driven incrementally (one
//! object per `next_object` call) rather than collected eagerly, so it
//! composes with the commit walk's own laziness (§4.5).

use std::collections::HashSet;

use git_hash::ObjectId;

use crate::flags::Flags;
use crate::pool::{ObjectKind, RevObjectData};
use crate::reader::ObjectReader;
use crate::walk::RevWalk;
use crate::RevWalkError;

/// Wraps a [`RevWalk`] and additionally enumerates every tree and blob
/// reachable from the commits it emits, honoring the same uninteresting
/// boundary: objects reachable only from uninteresting commits are never
/// surfaced (§4.5 "two-phase export").
pub struct ObjectWalk<'r> {
    commits: RevWalk<'r>,
    /// Objects already yielded (commit, tree, or blob) so a blob shared by
    /// many trees is only emitted once.
    seen: HashSet<ObjectId>,
    /// Trees/blobs queued for emission from the most recently popped
    /// commit, in the order discovered.
    pending: Vec<ObjectId>,
    /// Commit ids whose ancestry is uninteresting; their trees are walked
    /// only far enough to seed `seen` so a later interesting commit that
    /// happens to share a subtree doesn't re-emit it, never yielded.
    uninteresting_trees_sunk: bool,
}

impl<'r> ObjectWalk<'r> {
    pub fn new(commits: RevWalk<'r>) -> Self {
        Self {
            commits,
            seen: HashSet::new(),
            pending: Vec::new(),
            uninteresting_trees_sunk: false,
        }
    }

    pub fn pool(&self) -> &crate::pool::Pool {
        self.commits.pool()
    }

    /// Pull the next commit from the underlying walk, same as
    /// [`RevWalk::next_commit`]. Callers that only want commit ids (and not
    /// their trees/blobs) can drive the walk with this alone.
    pub fn next_commit(&mut self) -> Result<Option<ObjectId>, RevWalkError> {
        self.commits.next_commit()
    }

    /// Pull the next object — commit, tree, or blob — from the combined
    /// traversal. Returns `None` once both the commit walk and every queued
    /// tree/blob are exhausted.
    pub fn next_object(&mut self) -> Result<Option<ObjectId>, RevWalkError> {
        loop {
            if let Some(id) = self.pending.pop() {
                if self.seen.insert(id) {
                    return Ok(Some(id));
                }
                continue;
            }

            self.sink_uninteresting_trees()?;

            let Some(commit_id) = self.commits.next_commit()? else {
                return Ok(None);
            };
            if !self.seen.insert(commit_id) {
                continue;
            }

            let tree_id = {
                let obj = self.commits.pool().get(&commit_id).expect("just emitted by RevWalk");
                match &obj.data {
                    RevObjectData::Commit(c) => c.tree,
                    _ => unreachable!("commit walk only emits commits"),
                }
            };
            self.queue_tree(tree_id)?;
            return Ok(Some(commit_id));
        }
    }

    /// Walk every uninteresting commit's tree once, purely to populate
    /// `seen` (never yielding), so shared subtrees are excluded from
    /// output even though the uninteresting commits themselves are never
    /// returned by [`RevWalk::next_commit`]. Mirrors the teacher's
    /// exclusion-set pass over hidden tips in `collect_reachable_filtered`.
    fn sink_uninteresting_trees(&mut self) -> Result<(), RevWalkError> {
        if self.uninteresting_trees_sunk {
            return Ok(());
        }
        self.uninteresting_trees_sunk = true;
        let uninteresting: Vec<ObjectId> = self
            .commits
            .pool()
            .iter()
            .filter(|o| o.kind == ObjectKind::Commit && o.has_flag(Flags::UNINTERESTING.bits()))
            .map(|o| o.id)
            .collect();
        for commit_id in uninteresting {
            let tree_id = match &self.commits.pool().get(&commit_id).unwrap().data {
                RevObjectData::Commit(c) => c.tree,
                _ => continue,
            };
            self.sink_tree(tree_id)?;
        }
        Ok(())
    }

    fn sink_tree(&mut self, tree_id: ObjectId) -> Result<(), RevWalkError> {
        if !self.seen.insert(tree_id) {
            return Ok(());
        }
        let mut stack = vec![tree_id];
        while let Some(id) = stack.pop() {
            let reader = self.commits.reader();
            let entries = {
                let obj = self.commits.pool_mut().lookup_or_parse_any(reader, &id)?;
                match &obj.data {
                    RevObjectData::Tree(entries) => entries.clone(),
                    _ => continue,
                }
            };
            for entry in entries {
                if !self.seen.insert(entry.id) {
                    continue;
                }
                if entry.mode.is_tree() {
                    stack.push(entry.id);
                }
            }
        }
        Ok(())
    }

    /// Push the tree and every subtree/blob beneath it onto `pending`, deepest
    /// first is not required: the stack order here only needs to guarantee
    /// the tree itself is queued before anything nested under it, matching
    /// `collect_tree_objects`'s structural (not reachability) recursion.
    fn queue_tree(&mut self, tree_id: ObjectId) -> Result<(), RevWalkError> {
        if self.seen.contains(&tree_id) {
            return Ok(());
        }
        let mut stack = vec![tree_id];
        let mut discovered = Vec::new();
        while let Some(id) = stack.pop() {
            if self.seen.contains(&id) {
                continue;
            }
            discovered.push(id);
            let reader = self.commits.reader();
            let entries = {
                let obj = self.commits.pool_mut().lookup_or_parse_any(reader, &id)?;
                match &obj.data {
                    RevObjectData::Tree(entries) => entries.clone(),
                    RevObjectData::Blob => Vec::new(),
                    _ => continue,
                }
            };
            for entry in entries {
                if entry.mode.is_tree() {
                    stack.push(entry.id);
                } else if !self.seen.contains(&entry.id) {
                    discovered.push(entry.id);
                }
            }
        }
        // Emit in reverse discovery order so the tree itself comes out
        // before its nested entries once popped from `pending`.
        discovered.reverse();
        self.pending.extend(discovered);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::RawObject;
    use crate::walk::WalkBuilder;
    use std::collections::HashMap as Map;

    struct FakeReader {
        objects: Map<ObjectId, RawObject>,
    }

    impl ObjectReader for FakeReader {
        fn open(&self, id: &ObjectId, _hint: Option<ObjectKind>) -> Result<RawObject, RevWalkError> {
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

    fn tree(entries: &[(&str, ObjectId, bool)]) -> RawObject {
        let mut body = Vec::new();
        for (name, id, is_tree) in entries {
            let mode = if *is_tree { "40000" } else { "100644" };
            body.extend_from_slice(mode.as_bytes());
            body.push(b' ');
            body.extend_from_slice(name.as_bytes());
            body.push(0);
            body.extend_from_slice(id.as_bytes());
        }
        RawObject::Tree(body.into_boxed_slice())
    }

    #[test]
    fn commit_and_blob_both_emitted() {
        let blob = id(10);
        let subtree_blob = id(11);
        let subtree = id(20);
        let top_tree = id(21);
        let root = id(1);

        let mut objects = Map::new();
        objects.insert(subtree, tree(&[("leaf", subtree_blob, false)]));
        objects.insert(top_tree, tree(&[("a", blob, false), ("sub", subtree, true)]));
        objects.insert(blob, RawObject::Blob(Box::from(&b"hi"[..])));
        objects.insert(subtree_blob, RawObject::Blob(Box::from(&b"leaf"[..])));
        objects.insert(root, commit(top_tree, &[], 100));
        let reader = FakeReader { objects };

        let mut walker = WalkBuilder::new().build(&reader);
        walker.mark_start(root).unwrap();
        let mut objwalk = ObjectWalk::new(walker);

        let mut out = Vec::new();
        while let Some(next) = objwalk.next_object().unwrap() {
            out.push(next);
        }
        assert!(out.contains(&root));
        assert!(out.contains(&top_tree));
        assert!(out.contains(&subtree));
        assert!(out.contains(&blob));
        assert!(out.contains(&subtree_blob));
    }
}
