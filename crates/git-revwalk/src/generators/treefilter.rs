//! Applies a [`TreeFilter`] to the commit stream, marking each commit
//! with [`Flags::TREE_FILTER_APPLIED`] and, when the commit's tree
//! doesn't differ from every parent under the filter's paths, flagging
//! it [`Flags::REWRITE`] for the rewrite generator to collapse (§4.3
//! step 2).

use git_hash::ObjectId;

use crate::filter::{ensure_filter_applied, TreeFilter};
use crate::generators::Generator;
use crate::pool::Pool;
use crate::reader::ObjectReader;
use crate::RevWalkError;

pub struct TreeFilterGenerator<G> {
    upstream: G,
    filter: TreeFilter,
}

impl<G: Generator> TreeFilterGenerator<G> {
    pub fn new(upstream: G, filter: TreeFilter) -> Self {
        Self { upstream, filter }
    }
}

impl<G: Generator> Generator for TreeFilterGenerator<G> {
    fn next(
        &mut self,
        pool: &mut Pool,
        reader: &dyn ObjectReader,
    ) -> Result<Option<ObjectId>, RevWalkError> {
        let Some(id) = self.upstream.next(pool, reader)? else {
            return Ok(None);
        };
        ensure_filter_applied(pool, reader, &self.filter, &id)?;
        Ok(Some(id))
    }
}
