//! The commit walker: the public entry point that assembles the generator
//! pipeline (§4.3) from a [`WalkBuilder`]'s configuration and a caller's
//! start/uninteresting sets, then streams commits one at a time.
//!
//! Mirrors the teacher's own `RevWalk<'a>`: a plain borrow of the object
//! store (`reader: &'r dyn ObjectReader`), no interior synchronization, and
//! an [`Iterator`] impl over the emitted ids. Unlike the teacher's single
//! fixed-shape walk, the pipeline here is assembled lazily at the first
//! `next()` call, since the spec requires the start shape to depend on
//! whatever sorting/filters were configured up to that point (§4.3).

use std::rc::Rc;

use bitflags::bitflags;
use git_hash::ObjectId;

use crate::filter::{AcceptAll, RevFilter, TreeFilter};
use crate::flags::FlagAllocator;
use crate::generators::{
    AcceleratedTopoGenerator, BoundaryGenerator, ClassicalTopoGenerator, DepthGenerator, Generator,
    PendingGenerator, ReverseGenerator, RewriteGenerator, TreeFilterGenerator,
};
use crate::pool::Pool;
use crate::reader::{NullProgress, ObjectReader, ProgressMonitor};
use crate::RevWalkError;

bitflags! {
    /// The sort/shape toggles exposed by `sort(strategy, enable)` (§6).
    /// Several bits compose: `TOPO_KEEP_BRANCH_TOGETHER` implies `TOPO`;
    /// `BOUNDARY` and `REVERSE` wrap whatever ordering the rest of the set
    /// produces. `COMMIT_TIME_DESC` is the pending generator's native order
    /// and needs no pipeline stage of its own — it is the default shape
    /// when no other bit is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Sorting: u32 {
        const NONE = 0;
        const COMMIT_TIME_DESC = 1 << 0;
        const TOPO = 1 << 1;
        const TOPO_KEEP_BRANCH_TOGETHER = 1 << 2;
        const REVERSE = 1 << 3;
        const BOUNDARY = 1 << 4;
    }
}

/// Thin adapter so a filter stored behind an `Rc` (and therefore cheap to
/// re-share across [`RevWalk::reset`]-triggered pipeline rebuilds) can still
/// satisfy the `Box<dyn RevFilter>` a fresh [`PendingGenerator`] wants to own.
struct SharedFilter(Rc<dyn RevFilter>);

impl RevFilter for SharedFilter {
    fn decide(&self, pool: &Pool, commit_id: &ObjectId) -> crate::filter::FilterDecision {
        self.0.decide(pool, commit_id)
    }
}

/// Configuration for a [`RevWalk`], independent of any particular object
/// store. Collected here so construction reads as one expression
/// (`WalkBuilder::new().sorting(...).build(&reader)`) instead of a sequence
/// of setter calls on a half-built walker.
pub struct WalkBuilder {
    sorting: Sorting,
    rev_filter: Rc<dyn RevFilter>,
    tree_filter: Option<TreeFilter>,
    max_depth: Option<u32>,
}

impl WalkBuilder {
    pub fn new() -> Self {
        Self {
            sorting: Sorting::NONE,
            rev_filter: Rc::new(AcceptAll),
            tree_filter: None,
            max_depth: None,
        }
    }

    pub fn sorting(mut self, sorting: Sorting) -> Self {
        self.sorting = sorting;
        self
    }

    pub fn rev_filter<F: RevFilter + 'static>(mut self, filter: F) -> Self {
        self.rev_filter = Rc::new(filter);
        self
    }

    pub fn tree_filter(mut self, filter: TreeFilter) -> Self {
        self.tree_filter = Some(filter);
        self
    }

    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Attach the object store and produce a live walker. Nothing is parsed
    /// or enqueued yet — the pipeline is only assembled on the first
    /// `next()` call, once every `mark_start`/`mark_uninteresting` call has
    /// had a chance to run.
    pub fn build<'r>(self, reader: &'r dyn ObjectReader) -> RevWalk<'r> {
        RevWalk {
            reader,
            pool: Pool::new(),
            flags: FlagAllocator::new(),
            sorting: self.sorting,
            rev_filter: self.rev_filter,
            tree_filter: self.tree_filter,
            max_depth: self.max_depth,
            starts: Vec::new(),
            uninteresting_starts: Vec::new(),
            carry_mask: 0,
            retain_mask: 0,
            progress: Box::new(NullProgress),
            pipeline: None,
            started: false,
        }
    }
}

impl Default for WalkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A live commit walk: the object pool plus everything needed to assemble
/// and drive the generator pipeline against `reader`. Strictly
/// single-threaded cooperative (§5) — nothing here is `Send`/`Sync`, which
/// falls out for free from the plain `&'r dyn ObjectReader` borrow and the
/// `Rc`-based filter sharing, matching the teacher's own unsynchronized
/// `RevWalk`.
pub struct RevWalk<'r> {
    reader: &'r dyn ObjectReader,
    pool: Pool,
    flags: FlagAllocator,
    sorting: Sorting,
    rev_filter: Rc<dyn RevFilter>,
    tree_filter: Option<TreeFilter>,
    max_depth: Option<u32>,
    starts: Vec<ObjectId>,
    uninteresting_starts: Vec<ObjectId>,
    carry_mask: u32,
    retain_mask: u32,
    progress: Box<dyn ProgressMonitor + 'r>,
    pipeline: Option<Box<dyn Generator + 'r>>,
    started: bool,
}

impl<'r> RevWalk<'r> {
    /// Seed the walk with a starting (interesting) commit. Per §6, only
    /// valid before the first `next()` call; calling it afterward is a
    /// programmer error; like flag-allocation exhaustion it is not a
    /// recoverable condition (§7).
    pub fn mark_start(&mut self, id: ObjectId) -> Result<(), RevWalkError> {
        assert!(!self.started, "mark_start: walker already started");
        self.starts.push(id);
        Ok(())
    }

    /// Mark a commit (and its whole ancestry) as excluded from output.
    pub fn mark_uninteresting(&mut self, id: ObjectId) -> Result<(), RevWalkError> {
        assert!(!self.started, "mark_uninteresting: walker already started");
        self.uninteresting_starts.push(id);
        Ok(())
    }

    /// Toggle a sort/shape bit. Only valid before the first `next()` call.
    pub fn sort(&mut self, which: Sorting, enable: bool) {
        assert!(!self.started, "sort: walker already started");
        if enable {
            self.sorting.insert(which);
        } else {
            self.sorting.remove(which);
        }
    }

    pub fn set_rev_filter<F: RevFilter + 'static>(&mut self, filter: F) {
        assert!(!self.started, "set_rev_filter: walker already started");
        self.rev_filter = Rc::new(filter);
    }

    pub fn set_tree_filter(&mut self, filter: TreeFilter) {
        assert!(!self.started, "set_tree_filter: walker already started");
        self.tree_filter = Some(filter);
    }

    pub fn set_max_depth(&mut self, max_depth: u32) {
        assert!(!self.started, "set_max_depth: walker already started");
        self.max_depth = Some(max_depth);
    }

    pub fn set_progress(&mut self, progress: Box<dyn ProgressMonitor + 'r>) {
        self.progress = progress;
    }

    /// Allocate a fresh application flag. Panics once all 21 bits are
    /// outstanding — a programmer error, per §7, not a recoverable one.
    pub fn new_flag(&mut self) -> u32 {
        self.flags.alloc().expect("new_flag: all application flags in use")
    }

    /// Release a flag previously obtained from [`RevWalk::new_flag`] for
    /// reuse by a later caller. Used by short-lived callers such as
    /// [`crate::merge_base::merge_base`], which allocate one flag per input
    /// commit for the life of a single call.
    pub fn free_flag(&mut self, flag: u32) {
        self.flags.free(flag);
    }

    /// Register `flag` to be OR'd from a commit onto its parents as the
    /// pending generator walks past it (§4.3 step 1). UNINTERESTING itself
    /// is always carried regardless of this call.
    pub fn carry(&mut self, flag: u32) {
        assert!(!self.started, "carry: walker already started");
        self.carry_mask |= flag;
    }

    /// Register `flag` to survive a future [`RevWalk::reset`].
    pub fn retain_on_reset(&mut self, flag: u32) {
        self.retain_mask |= flag;
    }

    /// Clear every flag not covered by `retain_mask` (unioned with flags
    /// already registered via [`RevWalk::retain_on_reset`]) from every
    /// object the pool currently holds, then drop the assembled pipeline so
    /// the next `next()` call rebuilds it from the still-recorded
    /// start/uninteresting sets and filters.
    pub fn reset(&mut self, retain_mask: u32) {
        let effective = retain_mask | self.retain_mask;
        for obj in self.pool.iter_mut() {
            obj.flags &= effective;
        }
        self.pipeline = None;
        self.started = false;
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut Pool {
        &mut self.pool
    }

    pub fn reader(&self) -> &'r dyn ObjectReader {
        self.reader
    }

    /// Parse (if needed) `id` as a commit and return its generation number,
    /// which is `GENERATION_UNKNOWN` absent commit-graph coverage. Used by
    /// [`crate::merge_base::merged_into`]'s generation-cutoff pruning.
    pub fn commit_generation(&mut self, id: &ObjectId) -> Result<u32, RevWalkError> {
        use crate::pool::RevObjectData;
        match &self.pool.lookup_commit(self.reader, id)?.data {
            RevObjectData::Commit(c) => Ok(c.generation),
            _ => unreachable!("lookup_commit guarantees a Commit payload"),
        }
    }

    fn ensure_pipeline(&mut self) -> Result<(), RevWalkError> {
        if self.pipeline.is_some() {
            return Ok(());
        }
        self.started = true;

        let filter: Box<dyn RevFilter> = Box::new(SharedFilter(self.rev_filter.clone()));
        let mut pending = PendingGenerator::with_carry_mask(filter, false, self.carry_mask);
        for start in &self.starts {
            pending.mark_start(&mut self.pool, self.reader, start)?;
        }
        for uninteresting in &self.uninteresting_starts {
            pending.mark_uninteresting(&mut self.pool, self.reader, uninteresting)?;
        }

        let mut gen: Box<dyn Generator + 'r> = Box::new(pending);

        if let Some(tree_filter) = self.tree_filter.clone() {
            gen = Box::new(TreeFilterGenerator::new(gen, tree_filter.clone()));
            gen = Box::new(RewriteGenerator::new(gen, tree_filter));
        }

        let wants_topo =
            self.sorting.contains(Sorting::TOPO) || self.sorting.contains(Sorting::TOPO_KEEP_BRANCH_TOGETHER);
        if wants_topo {
            // Open question (§9): when both a time-only and a generation-aware
            // ordering are available, generation is authoritative and the two
            // are never mixed in one priority queue — so the commit-graph path
            // is taken whenever the reader exposes one, never as a tie-break.
            if let Some(graph) = self.reader.commit_graph() {
                gen = Box::new(AcceleratedTopoGenerator::new(gen, graph));
            } else {
                let keep_branch_together = self.sorting.contains(Sorting::TOPO_KEEP_BRANCH_TOGETHER);
                gen = Box::new(ClassicalTopoGenerator::new(gen, keep_branch_together));
            }
        }

        if let Some(max_depth) = self.max_depth {
            gen = Box::new(DepthGenerator::new(gen, self.starts.clone(), max_depth));
        }

        if self.sorting.contains(Sorting::BOUNDARY) {
            gen = Box::new(BoundaryGenerator::new(gen));
        }

        if self.sorting.contains(Sorting::REVERSE) {
            gen = Box::new(ReverseGenerator::new(gen));
        }

        self.pipeline = Some(gen);
        Ok(())
    }

    /// Pull the next commit id out of the assembled pipeline, or `None` once
    /// exhausted. The pipeline is assembled lazily on the first call (§4.3:
    /// "start shape is chosen at `next()` time").
    pub fn next_commit(&mut self) -> Result<Option<ObjectId>, RevWalkError> {
        if self.progress.is_cancelled() {
            return Err(RevWalkError::Cancelled);
        }
        self.ensure_pipeline()?;
        let next = self.pipeline.as_mut().unwrap().next(&mut self.pool, self.reader)?;
        if next.is_some() {
            self.progress.update(1);
        }
        Ok(next)
    }
}

impl<'r> Iterator for RevWalk<'r> {
    type Item = Result<ObjectId, RevWalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_commit().transpose()
    }
}
