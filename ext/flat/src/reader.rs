//! `FlatReader` — engine over a [`FlatSource`] with line-located errors.

use crate::{FlatError, FlatSchema, FlatSource, RecordLayout};
use std::fmt::Debug;
use std::io::BufRead;
use strata::{HierarchyReader, NodeId, ReadError, Tree};

/// Reads targets out of one flat input.
#[derive(Debug)]
pub struct FlatReader<R> {
    name: String,
    inner: HierarchyReader<RecordLayout, FlatSource<R>>,
}

impl<R: BufRead + Debug> FlatReader<R> {
    /// Create a reader for `input`. `name` only appears in error messages.
    pub fn new(name: impl Into<String>, schema: &FlatSchema, input: R) -> Self {
        let source = FlatSource::new(input, schema.layout());
        let mut inner = HierarchyReader::new(schema.decls().clone(), source);
        if let Some(filter) = schema.filter() {
            inner = inner.with_filter(filter.clone());
        }
        Self {
            name: name.into(),
            inner,
        }
    }

    /// Read the next target; `Ok(None)` at end of input.
    ///
    /// # Errors
    ///
    /// [`FlatError::Read`] wrapping the engine or source failure.
    pub fn read(&mut self) -> Result<Option<NodeId>, FlatError> {
        self.inner.read().map_err(|source| self.locate(source))
    }

    fn locate(&self, source: ReadError) -> FlatError {
        FlatError::Read {
            input: self.name.clone(),
            line: self.inner.source().line(),
            source,
        }
    }

    /// Release a target returned by [`read`](Self::read).
    pub fn release(&mut self, target: NodeId) {
        self.inner.release(target);
    }

    /// Returns the output tree targets live in.
    #[must_use]
    pub fn tree(&self) -> &Tree {
        self.inner.tree()
    }

    /// Returns the input name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
