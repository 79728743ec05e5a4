//! Reverses the entire output of the pipeline (§4.3 step 7).
//!
//! Since every upstream ordering is computed lazily commit-by-commit, a
//! reverse necessarily materializes the whole stream once before it can
//! yield its first (i.e. chronologically last) element.

use git_hash::ObjectId;

use crate::generators::Generator;
use crate::pool::Pool;
use crate::reader::ObjectReader;
use crate::RevWalkError;

pub struct ReverseGenerator<G> {
    upstream: Option<G>,
    buffered: Vec<ObjectId>,
    initialized: bool,
}

impl<G: Generator> ReverseGenerator<G> {
    pub fn new(upstream: G) -> Self {
        Self {
            upstream: Some(upstream),
            buffered: Vec::new(),
            initialized: false,
        }
    }

    fn initialize(&mut self, pool: &mut Pool, reader: &dyn ObjectReader) -> Result<(), RevWalkError> {
        let mut upstream = self.upstream.take().expect("initialize called once");
        while let Some(id) = upstream.next(pool, reader)? {
            self.buffered.push(id);
        }
        self.buffered.reverse();
        self.initialized = true;
        Ok(())
    }
}

impl<G: Generator> Generator for ReverseGenerator<G> {
    fn next(
        &mut self,
        pool: &mut Pool,
        reader: &dyn ObjectReader,
    ) -> Result<Option<ObjectId>, RevWalkError> {
        if !self.initialized {
            self.initialize(pool, reader)?;
        }
        Ok(self.buffered.pop())
    }
}
