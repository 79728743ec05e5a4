//! Collapses [`Flags::REWRITE`]-flagged commits out of the output and
//! splices their parents onto the nearest surviving ancestor, so a
//! path-filtered walk reads like a history that only ever touched the
//! filtered paths (§4.3 step 3).

use std::collections::HashSet;

use git_hash::ObjectId;

use crate::filter::{ensure_filter_applied, TreeFilter};
use crate::flags::Flags;
use crate::generators::Generator;
use crate::pool::{Pool, RevObjectData};
use crate::reader::ObjectReader;
use crate::RevWalkError;

pub struct RewriteGenerator<G> {
    upstream: G,
    filter: TreeFilter,
}

impl<G: Generator> RewriteGenerator<G> {
    pub fn new(upstream: G, filter: TreeFilter) -> Self {
        Self { upstream, filter }
    }
}

impl<G: Generator> Generator for RewriteGenerator<G> {
    fn next(
        &mut self,
        pool: &mut Pool,
        reader: &dyn ObjectReader,
    ) -> Result<Option<ObjectId>, RevWalkError> {
        loop {
            let Some(id) = self.upstream.next(pool, reader)? else {
                return Ok(None);
            };

            ensure_filter_applied(pool, reader, &self.filter, &id)?;
            if pool.get(&id).unwrap().has_flag(Flags::REWRITE.bits()) {
                continue;
            }

            let parents = match &pool.get(&id).unwrap().data {
                RevObjectData::Commit(c) => c.parents.clone(),
                _ => unreachable!(),
            };
            let mut resolved = Vec::new();
            let mut seen = HashSet::new();
            for parent in &parents {
                resolve_into(pool, reader, &self.filter, parent, &mut resolved, &mut seen)?;
            }
            pool.rewrite_parents(&id, resolved);

            return Ok(Some(id));
        }
    }
}

/// Append the nearest non-[`Flags::REWRITE`] ancestors of `id` (or `id`
/// itself) onto `out`, recursing through chains of elided commits.
fn resolve_into(
    pool: &mut Pool,
    reader: &dyn ObjectReader,
    filter: &TreeFilter,
    id: &ObjectId,
    out: &mut Vec<ObjectId>,
    seen: &mut HashSet<ObjectId>,
) -> Result<(), RevWalkError> {
    ensure_filter_applied(pool, reader, filter, id)?;
    if !pool.get(id).unwrap().has_flag(Flags::REWRITE.bits()) {
        if seen.insert(*id) {
            out.push(*id);
        }
        return Ok(());
    }
    let parents = match &pool.get(id).unwrap().data {
        RevObjectData::Commit(c) => c.parents.clone(),
        _ => unreachable!(),
    };
    for parent in &parents {
        resolve_into(pool, reader, filter, parent, out, seen)?;
    }
    Ok(())
}
