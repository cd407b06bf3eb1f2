//! Line-buffering raw-unit source for flat files.

use crate::{split_fields, Column, Envelope, Layout, LineSelector, Locator, RecordLayout};
use std::collections::VecDeque;
use std::fmt::Debug;
use std::io::BufRead;
use strata::{Decl, MatchOutcome, RawUnitSource, ReadError, Tree};

#[derive(Debug)]
struct Line {
    number: usize,
    text: String,
}

/// Supplies flat records to the engine.
///
/// Lines are read on demand into a lookahead buffer. A record is matched against the
/// front of the buffer and only removed from it when materialized. Blank lines are
/// skipped but still counted for line numbers.
#[derive(Debug)]
pub struct FlatSource<R> {
    input: R,
    layout: Layout,
    buffer: VecDeque<Line>,
    lines_read: usize,
    eof: bool,
}

impl<R: BufRead> FlatSource<R> {
    /// Create a source over `input`.
    pub fn new(input: R, layout: Layout) -> Self {
        Self {
            input,
            layout,
            buffer: VecDeque::new(),
            lines_read: 0,
            eof: false,
        }
    }

    /// Line number of the next unconsumed line, or of the last line read at end of input.
    #[must_use]
    pub fn line(&self) -> usize {
        self.buffer
            .front()
            .map_or(self.lines_read, |line| line.number)
    }

    /// Buffer until at least `n` lines are available or input ends.
    fn fill(&mut self, n: usize) -> Result<(), ReadError> {
        while self.buffer.len() < n && !self.eof {
            let mut text = String::new();
            if self.input.read_line(&mut text)? == 0 {
                self.eof = true;
                break;
            }
            self.lines_read += 1;
            let text = text.trim_end_matches(['\n', '\r']);
            if text.trim().is_empty() {
                continue;
            }
            self.buffer.push_back(Line {
                number: self.lines_read,
                text: text.to_owned(),
            });
        }
        Ok(())
    }

    /// Number of buffered lines making up the next record, or `None` on no match.
    ///
    /// An envelope cut short by end of input does not match.
    fn record_len(&mut self, layout: &RecordLayout) -> Result<Option<usize>, ReadError> {
        self.fill(1)?;
        let Some(first) = self.buffer.front() else {
            return Ok(None);
        };

        let (header, footer) = match &layout.envelope {
            Envelope::Rows(rows) => {
                let rows = *rows;
                self.fill(rows)?;
                return Ok((self.buffer.len() >= rows).then_some(rows));
            }
            Envelope::Header { header, footer } => (header, footer),
        };

        if !header.matches(&first.text) {
            return Ok(None);
        }
        let Some(footer) = footer else {
            return Ok(Some(1));
        };
        for len in 1.. {
            self.fill(len)?;
            let Some(line) = self.buffer.get(len - 1) else {
                break;
            };
            if footer.matches(&line.text) {
                return Ok(Some(len));
            }
        }
        Ok(None)
    }
}

fn column_value(layout: Layout, lines: &[Line], column: &Column) -> String {
    let line = match &column.line {
        LineSelector::Index(i) => lines.get(*i),
        LineSelector::Pattern(m) => lines.iter().find(|l| m.matches(&l.text)),
    };
    let Some(line) = line else {
        return String::new();
    };
    match (layout, column.locator) {
        (Layout::Delimited { delimiter, quote }, Locator::Field(index)) => {
            split_fields(&line.text, delimiter, quote)
                .into_iter()
                .nth(index)
                .unwrap_or_default()
        }
        (_, Locator::Span { start, len }) => char_span(&line.text, start, len).to_owned(),
        // Schema loading only builds field locators for delimited layouts.
        (Layout::FixedWidth, Locator::Field(_)) => String::new(),
    }
}

/// `len` characters of `text` starting at character `start`, clipped to the line.
fn char_span(text: &str, start: usize, len: usize) -> &str {
    let mut bounds = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()));
    let Some(from) = bounds.nth(start) else {
        return "";
    };
    if len == 0 {
        return "";
    }
    let to = bounds.nth(len - 1).unwrap_or(text.len());
    &text[from..to]
}

impl<R: BufRead + Debug> RawUnitSource<RecordLayout> for FlatSource<R> {
    fn has_more_input(&mut self) -> Result<bool, ReadError> {
        self.fill(1)?;
        Ok(!self.buffer.is_empty())
    }

    fn try_match(
        &mut self,
        decl: &Decl<RecordLayout>,
        tree: &mut Tree,
        materialize: bool,
    ) -> Result<MatchOutcome, ReadError> {
        let Some(layout) = decl.payload() else {
            return Ok(MatchOutcome::NoMatch);
        };
        let Some(len) = self.record_len(layout)? else {
            return Ok(MatchOutcome::NoMatch);
        };
        if !materialize {
            return Ok(MatchOutcome::Matched);
        }

        let lines: Vec<Line> = self.buffer.drain(..len).collect();
        let node = tree.create(decl.name());
        for column in &layout.columns {
            let child = tree.create_value(
                column.name.as_str(),
                column_value(self.layout, &lines, column),
            );
            tree.append_child(node, child);
        }

        tracing::trace!(
            record = decl.path(),
            line = lines[0].number,
            lines = len,
            "record materialized"
        );
        Ok(MatchOutcome::Materialized(node))
    }
}
