//! Commit and tree filtering: the two ways a walk can be narrowed before
//! it ever reaches the caller (§4.3 step 1, §4.3.2).
//!
//! A [`RevFilter`] decides, per commit, whether to keep it in the output
//! at all. A [`TreeFilter`] additionally restricts history to commits
//! that touch a given set of paths, driving the REWRITE-flagged history
//! simplification the rewrite generator performs.

use git_hash::ObjectId;
use git_utils::path::GitPath;

use crate::flags::Flags;
use crate::pool::{ObjectKind, Pool, RevObjectData, TreeEntry};
use crate::reader::ObjectReader;
use crate::RevWalkError;

/// Per-commit verdict a [`RevFilter`] or [`TreeFilter`] can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Keep the commit in the output.
    Include,
    /// Drop the commit, but still visit its parents.
    Exclude,
}

/// A predicate over commits, evaluated by the filter generator before a
/// commit reaches later pipeline stages.
pub trait RevFilter {
    fn decide(&self, pool: &Pool, commit_id: &git_hash::ObjectId) -> FilterDecision;
}

/// The default filter: every commit is included.
pub struct AcceptAll;

impl RevFilter for AcceptAll {
    fn decide(&self, _pool: &Pool, _commit_id: &git_hash::ObjectId) -> FilterDecision {
        FilterDecision::Include
    }
}

/// Internal control-flow signal a filter can use to request early
/// termination of the whole walk (e.g. "stop once we've seen N
/// commits"). Deliberately not part of [`crate::RevWalkError`]: it must
/// never escape past the generator pipeline into caller-visible state.
pub(crate) struct StopWalk;

/// Restricts history to commits whose tree differs, under any of a set
/// of path prefixes, from every one of its parents' trees (§4.3.2).
/// Matching commits are flagged [`crate::Flags::REWRITE`] by the rewrite
/// generator; commits whose only difference from their parents lies
/// outside the filter are elided and their adjacency is rewritten
/// around them.
#[derive(Clone)]
pub struct TreeFilter {
    paths: Vec<GitPath>,
}

impl TreeFilter {
    pub fn new(paths: impl IntoIterator<Item = GitPath>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }

    fn path_is_relevant(&self, name: &[u8]) -> bool {
        self.paths.iter().any(|p| {
            let bytes = p.as_bytes();
            bytes == name || name.starts_with(bytes)
        })
    }

    /// Whether `tree` differs, within the filter's paths, from
    /// `parent_tree`. `None` for `parent_tree` means "no parent" (a root
    /// commit is always considered to touch the filtered paths if its
    /// tree has any relevant entry).
    pub fn trees_differ_under_filter(
        &self,
        pool: &mut Pool,
        reader: &dyn ObjectReader,
        tree: &git_hash::ObjectId,
        parent_tree: Option<&git_hash::ObjectId>,
    ) -> Result<bool, RevWalkError> {
        let entries = relevant_entries(self, pool, reader, tree)?;
        let parent_entries = match parent_tree {
            Some(pt) => relevant_entries(self, pool, reader, pt)?,
            None => Vec::new(),
        };

        if entries.len() != parent_entries.len() {
            return Ok(true);
        }
        for (a, b) in entries.iter().zip(parent_entries.iter()) {
            if a.name != b.name || a.id != b.id {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Compute and cache, on the pool entry itself, whether `id`'s tree
/// touches `filter` relative to every one of its parents. Idempotent:
/// a commit already carrying [`Flags::TREE_FILTER_APPLIED`] is left
/// alone. Callable for any commit id regardless of whether it has been
/// emitted by the generator stream yet, since the decision only depends
/// on tree content already reachable through the pool.
pub(crate) fn ensure_filter_applied(
    pool: &mut Pool,
    reader: &dyn ObjectReader,
    filter: &TreeFilter,
    id: &ObjectId,
) -> Result<(), RevWalkError> {
    if pool.get(id).unwrap().has_flag(Flags::TREE_FILTER_APPLIED.bits()) {
        return Ok(());
    }

    let (tree, parents) = match &pool.lookup_commit(reader, id)?.data {
        RevObjectData::Commit(c) => (c.tree, c.parents.clone()),
        _ => unreachable!("tree filter only ever sees commits"),
    };

    let touches_filter = if parents.is_empty() {
        filter.trees_differ_under_filter(pool, reader, &tree, None)?
    } else {
        let mut differs_from_all = true;
        for parent in &parents {
            let parent_tree = match &pool.lookup_commit(reader, parent)?.data {
                RevObjectData::Commit(c) => c.tree,
                _ => unreachable!(),
            };
            if !filter.trees_differ_under_filter(pool, reader, &tree, Some(&parent_tree))? {
                differs_from_all = false;
                break;
            }
        }
        differs_from_all
    };

    let obj = pool.get_mut(id).unwrap();
    obj.set_flag(Flags::TREE_FILTER_APPLIED.bits());
    if !touches_filter {
        obj.set_flag(Flags::REWRITE.bits());
    }
    Ok(())
}

fn relevant_entries(
    filter: &TreeFilter,
    pool: &mut Pool,
    reader: &dyn ObjectReader,
    tree: &git_hash::ObjectId,
) -> Result<Vec<TreeEntry>, RevWalkError> {
    let obj = pool.lookup_or_parse_any(reader, tree)?;
    match &obj.data {
        RevObjectData::Tree(entries) => Ok(entries
            .iter()
            .filter(|e| filter.path_is_relevant(&e.name))
            .cloned()
            .collect()),
        _ => Err(RevWalkError::IncorrectObjectType {
            id: *tree,
            expected: ObjectKind::Tree,
            actual: obj.kind,
        }),
    }
}
