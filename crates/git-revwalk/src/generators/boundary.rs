//! Surfaces boundary commits: the UNINTERESTING commits directly
//! adjacent to an emitted interesting commit (§4.3 step 5).
//!
//! The underlying walk never emits UNINTERESTING commits itself (they
//! exist purely to be excluded); this stage watches every emitted
//! commit's parents and queues up the UNINTERESTING ones, draining them
//! — in commit-time order, like the rest of the stream — once the
//! upstream is exhausted. Callers distinguish a boundary commit from an
//! interesting one by checking [`crate::Flags::UNINTERESTING`] on it.

use git_hash::ObjectId;

use crate::flags::Flags;
use crate::generators::Generator;
use crate::pool::{Pool, RevObjectData};
use crate::queue::DateQueue;
use crate::reader::ObjectReader;
use crate::RevWalkError;
use std::collections::HashSet;

pub struct BoundaryGenerator<G> {
    upstream: G,
    queued_boundary: HashSet<ObjectId>,
    boundary: DateQueue,
    upstream_done: bool,
}

impl<G: Generator> BoundaryGenerator<G> {
    pub fn new(upstream: G) -> Self {
        Self {
            upstream,
            queued_boundary: HashSet::new(),
            boundary: DateQueue::new(),
            upstream_done: false,
        }
    }
}

impl<G: Generator> Generator for BoundaryGenerator<G> {
    fn next(
        &mut self,
        pool: &mut Pool,
        reader: &dyn ObjectReader,
    ) -> Result<Option<ObjectId>, RevWalkError> {
        if !self.upstream_done {
            if let Some(id) = self.upstream.next(pool, reader)? {
                let parents = match &pool.get(&id).unwrap().data {
                    RevObjectData::Commit(c) => c.parents.clone(),
                    _ => unreachable!(),
                };
                for parent in parents {
                    let pobj = pool.get(&parent).unwrap();
                    if pobj.has_flag(Flags::UNINTERESTING.bits())
                        && self.queued_boundary.insert(parent)
                    {
                        let commit_time = match &pobj.data {
                            RevObjectData::Commit(c) => c.commit_time,
                            _ => unreachable!(),
                        };
                        self.boundary.push(commit_time, parent);
                    }
                }
                return Ok(Some(id));
            }
            self.upstream_done = true;
        }

        Ok(self.boundary.pop())
    }
}
