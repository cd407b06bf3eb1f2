//! `EdiReader` — engine over a [`SegmentSource`] with segment-located errors.

use crate::{EdiError, EdiSchema, SegmentLayout, SegmentSource};
use std::fmt::Debug;
use std::io::BufRead;
use strata::{HierarchyReader, NodeId, ReadError, Tree};

/// Reads targets out of one EDI document.
#[derive(Debug)]
pub struct EdiReader<R> {
    name: String,
    inner: HierarchyReader<SegmentLayout, SegmentSource<R>>,
}

impl<R: BufRead + Debug> EdiReader<R> {
    /// Create a reader for `input`. `name` only appears in error messages.
    pub fn new(name: impl Into<String>, schema: &EdiSchema, input: R) -> Self {
        let source = SegmentSource::new(input, schema.delimiters());
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
    /// - [`EdiError::FewerThanMinOccurs`] — a segment's minimum was not met
    /// - [`EdiError::UnexpectedSegment`] — a segment no declaration accepts here
    /// - [`EdiError::Read`] — malformed segments and I/O failures
    pub fn read(&mut self) -> Result<Option<NodeId>, EdiError> {
        self.inner.read().map_err(|err| self.locate(err))
    }

    fn locate(&self, err: ReadError) -> EdiError {
        let source = self.inner.source();
        let input = self.name.clone();
        let segment = source.segment();
        let line = source.line();
        match err {
            ReadError::FewerThanMinOccurs {
                path,
                required,
                actual,
            } => EdiError::FewerThanMinOccurs {
                input,
                segment,
                line,
                path,
                required,
                actual,
            },
            ReadError::UnexpectedTrailingData => EdiError::UnexpectedSegment {
                input,
                segment,
                line,
                name: source.pending_name().unwrap_or_default().to_owned(),
            },
            source => EdiError::Read {
                input,
                segment,
                line,
                source,
            },
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
