//! Topological ordering: no commit is emitted before all of its
//! children in the output set have been (§4.3 step 4).
//!
//! Two variants share the same Kahn's-algorithm shape (drain upstream,
//! compute in-degree over the post-filter/post-rewrite parent edges,
//! repeatedly emit an in-degree-zero commit and decrement its parents)
//! and differ only in how the ready set is ordered: the classical
//! variant by commit time (or, with `keep_branch_together`, by
//! preferring to continue the branch just emitted); the accelerated
//! variant by commit-graph generation number, which is a strictly
//! stronger ordering guarantee when available.

use std::collections::{HashMap, HashSet};

use git_hash::ObjectId;

use crate::commit_graph::CommitGraph;
use crate::generators::Generator;
use crate::pool::{Pool, RevObjectData};
use crate::queue::{DateQueue, GenerationQueue};
use crate::reader::ObjectReader;
use crate::RevWalkError;

/// Drain `upstream` and return, for each visited commit, its parents
/// restricted to the visited set (so in-degree only counts edges inside
/// the output, per §4.3 step 4's "in the output set" qualifier).
fn drain_and_index<G: Generator>(
    upstream: &mut G,
    pool: &mut Pool,
    reader: &dyn ObjectReader,
) -> Result<(Vec<ObjectId>, HashMap<ObjectId, Vec<ObjectId>>), RevWalkError> {
    let mut order = Vec::new();
    while let Some(id) = upstream.next(pool, reader)? {
        order.push(id);
    }
    let set: HashSet<ObjectId> = order.iter().cloned().collect();

    let mut parents_of = HashMap::with_capacity(order.len());
    for id in &order {
        let parents = match &pool.get(id).unwrap().data {
            RevObjectData::Commit(c) => c.parents.clone(),
            _ => unreachable!("topo sort only ever sees commits"),
        };
        let in_set: Vec<ObjectId> = parents.into_iter().filter(|p| set.contains(p)).collect();
        parents_of.insert(*id, in_set);
    }
    Ok((order, parents_of))
}

fn initial_in_degree(
    order: &[ObjectId],
    parents_of: &HashMap<ObjectId, Vec<ObjectId>>,
) -> HashMap<ObjectId, u32> {
    let mut in_degree: HashMap<ObjectId, u32> = order.iter().map(|id| (*id, 0)).collect();
    for parents in parents_of.values() {
        for p in parents {
            *in_degree.get_mut(p).unwrap() += 1;
        }
    }
    in_degree
}

pub struct ClassicalTopoGenerator<G> {
    upstream: Option<G>,
    parents_of: HashMap<ObjectId, Vec<ObjectId>>,
    in_degree: HashMap<ObjectId, u32>,
    ready: DateQueue,
    ready_stack: Vec<ObjectId>,
    keep_branch_together: bool,
    initialized: bool,
}

impl<G: Generator> ClassicalTopoGenerator<G> {
    pub fn new(upstream: G, keep_branch_together: bool) -> Self {
        Self {
            upstream: Some(upstream),
            parents_of: HashMap::new(),
            in_degree: HashMap::new(),
            ready: DateQueue::new(),
            ready_stack: Vec::new(),
            keep_branch_together,
            initialized: false,
        }
    }

    fn initialize(&mut self, pool: &mut Pool, reader: &dyn ObjectReader) -> Result<(), RevWalkError> {
        let mut upstream = self.upstream.take().expect("initialize called once");
        let (order, parents_of) = drain_and_index(&mut upstream, pool, reader)?;
        self.in_degree = initial_in_degree(&order, &parents_of);
        self.parents_of = parents_of;

        for id in &order {
            if self.in_degree[id] == 0 {
                self.push_ready(pool, *id);
            }
        }
        self.initialized = true;
        Ok(())
    }

    fn push_ready(&mut self, pool: &Pool, id: ObjectId) {
        if self.keep_branch_together {
            self.ready_stack.push(id);
        } else {
            let commit_time = match &pool.get(&id).unwrap().data {
                RevObjectData::Commit(c) => c.commit_time,
                _ => unreachable!(),
            };
            self.ready.push(commit_time, id);
        }
    }

    fn pop_ready(&mut self) -> Option<ObjectId> {
        if self.keep_branch_together {
            self.ready_stack.pop()
        } else {
            self.ready.pop()
        }
    }
}

impl<G: Generator> Generator for ClassicalTopoGenerator<G> {
    fn next(
        &mut self,
        pool: &mut Pool,
        reader: &dyn ObjectReader,
    ) -> Result<Option<ObjectId>, RevWalkError> {
        if !self.initialized {
            self.initialize(pool, reader)?;
        }

        let Some(id) = self.pop_ready() else {
            return Ok(None);
        };

        let parents = self.parents_of.get(&id).cloned().unwrap_or_default();
        for parent in &parents {
            let degree = self.in_degree.get_mut(parent).unwrap();
            *degree -= 1;
            if *degree == 0 {
                self.push_ready(pool, *parent);
            }
        }

        Ok(Some(id))
    }
}

pub struct AcceleratedTopoGenerator<'g, G> {
    upstream: Option<G>,
    parents_of: HashMap<ObjectId, Vec<ObjectId>>,
    in_degree: HashMap<ObjectId, u32>,
    ready: GenerationQueue,
    graph: &'g dyn CommitGraph,
    initialized: bool,
}

impl<'g, G: Generator> AcceleratedTopoGenerator<'g, G> {
    pub fn new(upstream: G, graph: &'g dyn CommitGraph) -> Self {
        Self {
            upstream: Some(upstream),
            parents_of: HashMap::new(),
            in_degree: HashMap::new(),
            ready: GenerationQueue::new(),
            graph,
            initialized: false,
        }
    }

    fn generation_of(&self, pool: &Pool, id: &ObjectId) -> u32 {
        if let Some(pos) = self.graph.find_graph_position(id) {
            if let Some(data) = self.graph.get_commit_data(pos) {
                return data.generation;
            }
        }
        match &pool.get(id).unwrap().data {
            RevObjectData::Commit(c) => c.generation,
            _ => crate::GENERATION_UNKNOWN,
        }
    }

    fn initialize(&mut self, pool: &mut Pool, reader: &dyn ObjectReader) -> Result<(), RevWalkError> {
        let mut upstream = self.upstream.take().expect("initialize called once");
        let (order, parents_of) = drain_and_index(&mut upstream, pool, reader)?;
        self.in_degree = initial_in_degree(&order, &parents_of);
        self.parents_of = parents_of;

        for id in &order {
            if self.in_degree[id] == 0 {
                self.push_ready(pool, *id);
            }
        }
        self.initialized = true;
        Ok(())
    }

    fn push_ready(&mut self, pool: &Pool, id: ObjectId) {
        let generation = self.generation_of(pool, &id);
        let commit_time = match &pool.get(&id).unwrap().data {
            RevObjectData::Commit(c) => c.commit_time,
            _ => unreachable!(),
        };
        self.ready.push(generation, commit_time, id);
    }
}

impl<'g, G: Generator> Generator for AcceleratedTopoGenerator<'g, G> {
    fn next(
        &mut self,
        pool: &mut Pool,
        reader: &dyn ObjectReader,
    ) -> Result<Option<ObjectId>, RevWalkError> {
        if !self.initialized {
            self.initialize(pool, reader)?;
        }

        let Some(id) = self.ready.pop() else {
            return Ok(None);
        };

        let parents = self.parents_of.get(&id).cloned().unwrap_or_default();
        for parent in &parents {
            let degree = self.in_degree.get_mut(parent).unwrap();
            *degree -= 1;
            if *degree == 0 {
                self.push_ready(pool, *parent);
            }
        }

        Ok(Some(id))
    }
}
