//! Merge-base computation via the paint algorithm (§4.6.1).
//!
//! Ported from the teacher's own `merge_base.rs`: commits reachable from
//! each input are painted with a distinct color as the walk descends
//! through parent edges; a commit carrying every input's color is a common
//! ancestor, and colors that have already reached one are pruned from
//! further descent (`STALE`). The teacher hard-codes two colors
//! (`PARENT1`/`PARENT2`) because it only ever compares two commits; here
//! one application flag is allocated per input commit through
//! [`crate::walk::RevWalk::new_flag`], so the same algorithm answers
//! `merge_base` for an arbitrary number of commits at once, and the
//! engine's own [`Flags::TEMP_MARK`] stands in for the teacher's ad hoc
//! `STALE` bit.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet, VecDeque};

use git_hash::ObjectId;

use crate::flags::Flags;
use crate::pool::RevObjectData;
use crate::walk::RevWalk;
use crate::{RevWalkError, GENERATION_UNKNOWN};

struct PaintEntry {
    oid: ObjectId,
    date: i64,
}

impl PartialEq for PaintEntry {
    fn eq(&self, other: &Self) -> bool {
        self.oid == other.oid
    }
}

impl Eq for PaintEntry {}

impl PartialOrd for PaintEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PaintEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.date.cmp(&other.date)
    }
}

/// Find every merge base of `commits`: the common ancestors that are not
/// themselves ancestors of another common ancestor. A single input (after
/// deduplication) is trivially its own merge base.
pub fn merge_base(walker: &mut RevWalk, commits: &[ObjectId]) -> Result<Vec<ObjectId>, RevWalkError> {
    let mut unique = Vec::new();
    for &id in commits {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    if unique.len() <= 1 {
        return Ok(unique);
    }

    let bases = paint_down_to_common(walker, &unique)?;
    remove_redundant(walker, bases)
}

/// The single best merge base, or `None` if `commits` share no ancestor.
pub fn merge_base_one(walker: &mut RevWalk, commits: &[ObjectId]) -> Result<Option<ObjectId>, RevWalkError> {
    Ok(merge_base(walker, commits)?.into_iter().next())
}

/// Whether `ancestor` is reachable by following parent edges from
/// `descendant` (equal ids count as ancestors of themselves).
pub fn is_ancestor(walker: &mut RevWalk, ancestor: &ObjectId, descendant: &ObjectId) -> Result<bool, RevWalkError> {
    if ancestor == descendant {
        return Ok(true);
    }
    let bases = merge_base(walker, &[*ancestor, *descendant])?;
    Ok(bases.contains(ancestor))
}

/// Whether `base` is merged into `tip` — an alias for ancestry, answered
/// through [`crate::reachability`] instead of the paint algorithm, since a
/// single yes/no query between two commits doesn't need the full
/// common-ancestor machinery `is_ancestor` runs.
pub fn is_merged_into(walker: &mut RevWalk, base: &ObjectId, tip: &ObjectId) -> Result<bool, RevWalkError> {
    if base == tip {
        return Ok(true);
    }
    let mut checker = crate::reachability::reachability_checker(walker.reader());
    let report = checker.targets_reachable_from(&[*tip], &[*base])?;
    Ok(report.is_reachable(base))
}

/// How `merged_into` should stop once it has enough information about
/// `refs`. Grouped refs resolving to the same commit always share one
/// answer regardless of strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergedIntoStrategy {
    /// Stop checking haystacks as soon as one reports `commit` merged.
    FirstFound,
    /// Stop checking haystacks as soon as one reports `commit` not merged.
    FirstNotFound,
    /// Check every distinct haystack and report all of them.
    EvaluateAll,
}

/// For every named ref in `refs`, whether `commit` is merged into the
/// commit it resolves to. Refs resolving to the same commit are checked
/// once and share the result (§4.6.1). Haystacks whose generation number is
/// known and lower than `commit`'s are rejected without a walk, since a
/// commit can never be an ancestor of something with a strictly smaller
/// generation.
pub fn merged_into(
    walker: &mut RevWalk,
    commit: ObjectId,
    refs: &[(String, ObjectId)],
    strategy: MergedIntoStrategy,
) -> Result<Vec<(String, bool)>, RevWalkError> {
    let commit_generation = walker.commit_generation(&commit)?;

    let mut haystacks: Vec<ObjectId> = Vec::new();
    for (_, oid) in refs {
        if !haystacks.contains(oid) {
            haystacks.push(*oid);
        }
    }

    let mut answers: Vec<(ObjectId, bool)> = Vec::new();
    for haystack in haystacks {
        let merged = if commit_generation != GENERATION_UNKNOWN {
            let haystack_generation = walker.commit_generation(&haystack)?;
            if haystack_generation != GENERATION_UNKNOWN && haystack_generation < commit_generation {
                false
            } else {
                is_merged_into(walker, &commit, &haystack)?
            }
        } else {
            is_merged_into(walker, &commit, &haystack)?
        };
        answers.push((haystack, merged));

        match strategy {
            MergedIntoStrategy::FirstFound if merged => break,
            MergedIntoStrategy::FirstNotFound if !merged => break,
            _ => {}
        }
    }

    let mut out = Vec::with_capacity(refs.len());
    for (name, oid) in refs {
        if let Some(&(_, merged)) = answers.iter().find(|(haystack, _)| haystack == oid) {
            out.push((name.clone(), merged));
        }
    }
    Ok(out)
}

fn paint_down_to_common(walker: &mut RevWalk, commits: &[ObjectId]) -> Result<Vec<ObjectId>, RevWalkError> {
    let mut color_flags = Vec::with_capacity(commits.len());
    for _ in commits {
        color_flags.push(walker.new_flag());
    }
    let combined: u32 = color_flags.iter().fold(0, |acc, f| acc | f);

    let mut queue: BinaryHeap<PaintEntry> = BinaryHeap::new();
    let mut results = Vec::new();

    for (i, id) in commits.iter().enumerate() {
        let commit_time = {
            let reader = walker.reader();
            let obj = walker.pool_mut().lookup_commit(reader, id)?;
            obj.set_flag(color_flags[i]);
            match &obj.data {
                RevObjectData::Commit(c) => c.commit_time,
                _ => unreachable!(),
            }
        };
        queue.push(PaintEntry { oid: *id, date: commit_time });
    }

    while let Some(entry) = queue.pop() {
        let current_flags = walker.pool().get(&entry.oid).map(|o| o.flags).unwrap_or(0);

        if current_flags & Flags::TEMP_MARK.bits() != 0 {
            continue;
        }

        if current_flags & combined == combined {
            walker.pool_mut().get_mut(&entry.oid).unwrap().set_flag(Flags::TEMP_MARK.bits());
            results.push(entry.oid);
            if !queue_has_nonstale(&queue, walker) {
                break;
            }
            continue;
        }

        let parents = {
            let reader = walker.reader();
            let obj = walker.pool_mut().lookup_commit(reader, &entry.oid)?;
            match &obj.data {
                RevObjectData::Commit(c) => c.parents.clone(),
                _ => unreachable!(),
            }
        };
        let this_color = current_flags & combined;

        for parent in parents {
            let reader = walker.reader();
            let pobj = walker.pool_mut().lookup_commit(reader, &parent)?;
            let parent_color = pobj.flags & combined;
            let new_color = parent_color | this_color;
            if new_color != parent_color {
                pobj.set_flag(this_color);
                let commit_time = match &pobj.data {
                    RevObjectData::Commit(c) => c.commit_time,
                    _ => unreachable!(),
                };
                queue.push(PaintEntry { oid: parent, date: commit_time });
            }
        }
    }

    for obj in walker.pool_mut().iter_mut() {
        obj.clear_flag(combined | Flags::TEMP_MARK.bits());
    }
    for flag in color_flags {
        walker.free_flag(flag);
    }

    Ok(results)
}

fn queue_has_nonstale(queue: &BinaryHeap<PaintEntry>, walker: &RevWalk) -> bool {
    queue.iter().any(|entry| {
        let flags = walker.pool().get(&entry.oid).map(|o| o.flags).unwrap_or(0);
        flags & Flags::TEMP_MARK.bits() == 0
    })
}

/// Drop any base that is itself an ancestor of another base, leaving only
/// the lowest common ancestors.
fn remove_redundant(walker: &mut RevWalk, bases: Vec<ObjectId>) -> Result<Vec<ObjectId>, RevWalkError> {
    if bases.len() <= 1 {
        return Ok(bases);
    }

    let mut to_remove: HashSet<usize> = HashSet::new();
    for i in 0..bases.len() {
        if to_remove.contains(&i) {
            continue;
        }
        for j in (i + 1)..bases.len() {
            if to_remove.contains(&j) {
                continue;
            }
            if is_ancestor_direct(walker, &bases[i], &bases[j])? {
                to_remove.insert(i);
                break;
            } else if is_ancestor_direct(walker, &bases[j], &bases[i])? {
                to_remove.insert(j);
            }
        }
    }

    Ok(bases.into_iter().enumerate().filter(|(idx, _)| !to_remove.contains(idx)).map(|(_, oid)| oid).collect())
}

/// Plain BFS ancestry check with no dependency on `merge_base`, so
/// `remove_redundant` doesn't recurse back into the paint algorithm it is
/// cleaning up after.
fn is_ancestor_direct(walker: &mut RevWalk, ancestor: &ObjectId, descendant: &ObjectId) -> Result<bool, RevWalkError> {
    if ancestor == descendant {
        return Ok(true);
    }

    let mut queue = VecDeque::new();
    let mut visited = HashSet::new();
    queue.push_back(*descendant);
    visited.insert(*descendant);

    while let Some(current) = queue.pop_front() {
        if current == *ancestor {
            return Ok(true);
        }
        let reader = walker.reader();
        let parents = {
            let obj = walker.pool_mut().lookup_commit(reader, &current)?;
            match &obj.data {
                RevObjectData::Commit(c) => c.parents.clone(),
                _ => unreachable!(),
            }
        };
        for parent in parents {
            if visited.insert(parent) {
                queue.push_back(parent);
            }
        }
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{ObjectReader, RawObject};
    use crate::walk::WalkBuilder;
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

    /// Two branches diverge from a common base; merge_base should report
    /// exactly that base.
    fn diamond() -> (FakeReader, ObjectId, ObjectId, ObjectId) {
        let tree = ObjectId::NULL_SHA1;
        let base = id(1);
        let left = id(2);
        let right = id(3);
        let mut objects = Map::new();
        objects.insert(base, commit(tree, &[], 100));
        objects.insert(left, commit(tree, &[base], 200));
        objects.insert(right, commit(tree, &[base], 200));
        let reader = FakeReader { objects };
        (reader, base, left, right)
    }

    #[test]
    fn merge_base_of_diverged_branches_is_common_ancestor() {
        let (reader, base, left, right) = diamond();
        let mut walker = WalkBuilder::new().build(&reader);
        let bases = merge_base(&mut walker, &[left, right]).unwrap();
        assert_eq!(bases, vec![base]);
    }

    #[test]
    fn merge_base_of_identical_commits_is_itself() {
        let (reader, base, _, _) = diamond();
        let mut walker = WalkBuilder::new().build(&reader);
        let bases = merge_base(&mut walker, &[base, base]).unwrap();
        assert_eq!(bases, vec![base]);
    }

    #[test]
    fn is_ancestor_true_for_base_of_diverged_branches() {
        let (reader, base, left, _right) = diamond();
        let mut walker = WalkBuilder::new().build(&reader);
        assert!(is_ancestor(&mut walker, &base, &left).unwrap());
    }

    #[test]
    fn is_ancestor_false_between_siblings() {
        let (reader, _base, left, right) = diamond();
        let mut walker = WalkBuilder::new().build(&reader);
        assert!(!is_ancestor(&mut walker, &left, &right).unwrap());
    }

    #[test]
    fn merged_into_groups_refs_by_resolved_commit() {
        let (reader, base, left, right) = diamond();
        let mut walker = WalkBuilder::new().build(&reader);
        let refs = vec![
            ("refs/heads/a".to_string(), left),
            ("refs/heads/b".to_string(), left),
            ("refs/heads/c".to_string(), right),
        ];
        let results = merged_into(&mut walker, base, &refs, MergedIntoStrategy::EvaluateAll).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|(_, merged)| *merged));
    }
}
