//! The generator pipeline (§4.3): a chain of composable, lazily-pulled
//! stages. Each stage is a [`Generator`] over the one beneath it;
//! `RevWalk::next` simply pulls from the outermost stage.
//!
//! Stage order, outside-in as assembled by [`crate::walk::RevWalk`]:
//! reverse (optional) → boundary (optional) → depth (optional) →
//! topo (optional) → rewrite (optional, requires a tree filter) →
//! tree-filter (optional) → pending. Each optional stage is skipped
//! entirely when not configured, so a plain commit-time walk is just
//! `pending` with no wrapping at all.

mod boundary;
mod depth;
mod pending;
mod reverse;
mod rewrite;
mod topo;
mod treefilter;

pub use boundary::BoundaryGenerator;
pub use depth::DepthGenerator;
pub use pending::PendingGenerator;
pub use reverse::ReverseGenerator;
pub use rewrite::RewriteGenerator;
pub use topo::{AcceleratedTopoGenerator, ClassicalTopoGenerator};
pub use treefilter::TreeFilterGenerator;

use git_hash::ObjectId;

use crate::pool::Pool;
use crate::reader::ObjectReader;
use crate::RevWalkError;

/// One stage of the generator pipeline.
///
/// `next` pulls (and validates, via the pool) the next commit id in this
/// stage's order, or `None` once the stage is exhausted. Stages that
/// need to buffer ahead (topo sort, reverse) do so internally and are
/// free to pull their upstream to exhaustion before yielding anything.
pub trait Generator {
    fn next(
        &mut self,
        pool: &mut Pool,
        reader: &dyn ObjectReader,
    ) -> Result<Option<ObjectId>, RevWalkError>;
}

/// Lets a boxed stage stand in for a concrete one, so [`crate::walk::RevWalk`]
/// can assemble a pipeline whose shape depends on runtime configuration
/// (which sort flags, which filters) instead of being fixed at compile time.
impl<'a> Generator for Box<dyn Generator + 'a> {
    fn next(
        &mut self,
        pool: &mut Pool,
        reader: &dyn ObjectReader,
    ) -> Result<Option<ObjectId>, RevWalkError> {
        (**self).next(pool, reader)
    }
}
