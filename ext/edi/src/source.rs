//! Raw-unit source over a segment stream.

use crate::{Delimiters, RawSegment, SegmentLayout, SegmentScanner};
use std::fmt::Debug;
use std::io::BufRead;
use strata::{Decl, MatchOutcome, RawUnitSource, ReadError, Tree};

/// Supplies EDI segments to the engine.
///
/// Holds at most one unprocessed segment. A leaf declaration matches it iff the
/// names are equal.
#[derive(Debug)]
pub struct SegmentSource<R> {
    scanner: SegmentScanner<R>,
    pending: Option<RawSegment>,
    last: (usize, usize),
}

impl<R: BufRead> SegmentSource<R> {
    /// Create a source over `input`.
    pub fn new(input: R, delimiters: Delimiters) -> Self {
        Self {
            scanner: SegmentScanner::new(input, delimiters),
            pending: None,
            last: (0, 1),
        }
    }

    /// Ordinal of the unprocessed segment, or of the last one read.
    #[must_use]
    pub fn segment(&self) -> usize {
        self.pending.as_ref().map_or(self.last.0, |s| s.ordinal)
    }

    /// Line of the unprocessed segment, or of the last one read.
    #[must_use]
    pub fn line(&self) -> usize {
        self.pending.as_ref().map_or(self.last.1, |s| s.line)
    }

    /// Name of the unprocessed segment.
    #[must_use]
    pub fn pending_name(&self) -> Option<&str> {
        self.pending.as_ref().map(|s| s.name.as_str())
    }

    fn fill(&mut self) -> Result<Option<&RawSegment>, ReadError> {
        if self.pending.is_none() {
            self.pending = self.scanner.next_segment()?;
            if let Some(segment) = &self.pending {
                self.last = (segment.ordinal, segment.line);
            }
        }
        Ok(self.pending.as_ref())
    }
}

fn materialize(
    decl: &Decl<SegmentLayout>,
    segment: &RawSegment,
    tree: &mut Tree,
) -> Result<strata::NodeId, ReadError> {
    let node = tree.create(decl.name());
    let Some(layout) = decl.payload() else {
        return Ok(node);
    };
    for element in &layout.elements {
        let value = match segment.value(element.index, element.component) {
            Some(value) => value.to_owned(),
            None => match (&element.default, element.empty_if_missing) {
                (Some(default), _) => default.clone(),
                (None, true) => String::new(),
                (None, false) => {
                    tree.release(node);
                    return Err(ReadError::Malformed(format!(
                        "segment '{}' is missing element '{}' at index {} component {}",
                        decl.path(),
                        element.name,
                        element.index,
                        element.component
                    )));
                }
            },
        };
        let child = tree.create_value(element.name.as_str(), value);
        tree.append_child(node, child);
    }
    Ok(node)
}

impl<R: BufRead + Debug> RawUnitSource<SegmentLayout> for SegmentSource<R> {
    fn has_more_input(&mut self) -> Result<bool, ReadError> {
        Ok(self.fill()?.is_some())
    }

    fn try_match(
        &mut self,
        decl: &Decl<SegmentLayout>,
        tree: &mut Tree,
        materialize_node: bool,
    ) -> Result<MatchOutcome, ReadError> {
        match self.fill()? {
            Some(segment) if segment.name == decl.name() => {}
            _ => return Ok(MatchOutcome::NoMatch),
        }
        if !materialize_node {
            return Ok(MatchOutcome::Matched);
        }
        let Some(segment) = self.pending.take() else {
            return Ok(MatchOutcome::NoMatch);
        };
        let node = materialize(decl, &segment, tree)?;
        tracing::trace!(
            segment = decl.path(),
            ordinal = segment.ordinal,
            line = segment.line,
            "segment materialized"
        );
        Ok(MatchOutcome::Materialized(node))
    }
}
