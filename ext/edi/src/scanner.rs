//! Segment scanner: bytes in, unescaped segments out.

use crate::Delimiters;
use std::io::BufRead;
use strata::ReadError;

/// One segment, split and unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSegment {
    /// Segment name (element 0, surrounding whitespace trimmed).
    pub name: String,
    /// Elements including the name at index 0; each element is its list of components.
    pub elements: Vec<Vec<String>>,
    /// 1-based ordinal among non-empty segments.
    pub ordinal: usize,
    /// 1-based line the segment starts on.
    pub line: usize,
}

impl RawSegment {
    /// Value at a 1-based element `index` and 1-based `component`.
    #[must_use]
    pub fn value(&self, index: usize, component: usize) -> Option<&str> {
        self.elements
            .get(index)?
            .get(component.checked_sub(1)?)
            .map(String::as_str)
    }
}

/// Splits a byte stream into [`RawSegment`]s.
///
/// A delimiter preceded by an odd run of release characters is data, not a
/// delimiter. Release characters are removed from values after splitting.
#[derive(Debug)]
pub struct SegmentScanner<R> {
    input: R,
    delimiters: Delimiters,
    line: usize,
    ordinal: usize,
    eof: bool,
}

impl<R: BufRead> SegmentScanner<R> {
    /// Create a scanner over `input`.
    pub fn new(input: R, delimiters: Delimiters) -> Self {
        Self {
            input,
            delimiters,
            line: 1,
            ordinal: 0,
            eof: false,
        }
    }

    /// Current line (after the last segment read).
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Number of segments produced so far.
    #[must_use]
    pub fn segments_read(&self) -> usize {
        self.ordinal
    }

    /// Read the next non-empty segment; `Ok(None)` at end of input.
    ///
    /// # Errors
    ///
    /// I/O failures, and segments that are not valid UTF-8.
    pub fn next_segment(&mut self) -> Result<Option<RawSegment>, ReadError> {
        loop {
            let Some((raw, terminated)) = self.read_raw()? else {
                return Ok(None);
            };

            let leading_newlines = raw
                .iter()
                .take_while(|b| matches!(b, b'\r' | b'\n'))
                .filter(|&&b| b == b'\n')
                .count();
            let start_line = self.line + leading_newlines;
            self.line += raw.iter().filter(|&&b| b == b'\n').count();
            if terminated && self.delimiters.segment == b'\n' {
                self.line += 1;
            }

            let bytes = if self.delimiters.ignore_crlf {
                raw.into_iter()
                    .filter(|b| !matches!(b, b'\r' | b'\n'))
                    .collect()
            } else {
                raw
            };
            if bytes.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let text = String::from_utf8(bytes).map_err(|e| {
                ReadError::Malformed(format!("segment on line {start_line} is not valid UTF-8: {e}"))
            })?;
            self.ordinal += 1;
            return Ok(Some(self.split(&text, start_line)));
        }
    }

    fn split(&self, text: &str, line: usize) -> RawSegment {
        let Delimiters {
            element,
            component,
            release,
            ..
        } = self.delimiters;

        let elements: Vec<Vec<String>> = split_unreleased(text, element, release)
            .into_iter()
            .map(|raw| match component {
                Some(component) => split_unreleased(raw, component, release)
                    .into_iter()
                    .map(|c| unescape(c, release))
                    .collect(),
                None => vec![unescape(raw, release)],
            })
            .collect();
        let name = elements
            .first()
            .and_then(|e| e.first())
            .map_or_else(String::new, |n| n.trim().to_owned());

        RawSegment {
            name,
            elements,
            ordinal: self.ordinal,
            line,
        }
    }

    /// Bytes up to the next unreleased segment delimiter (exclusive), and whether
    /// that delimiter was consumed.
    fn read_raw(&mut self) -> Result<Option<(Vec<u8>, bool)>, ReadError> {
        if self.eof {
            return Ok(None);
        }
        let terminator = self.delimiters.segment;
        let mut raw = Vec::new();
        loop {
            let n = self.input.read_until(terminator, &mut raw)?;
            if n == 0 || raw.last() != Some(&terminator) {
                // The last segment may be unterminated.
                self.eof = true;
                return Ok((!raw.is_empty()).then_some((raw, false)));
            }
            if !self.is_released(&raw[..raw.len() - 1]) {
                raw.pop();
                return Ok(Some((raw, true)));
            }
        }
    }

    fn is_released(&self, before: &[u8]) -> bool {
        self.delimiters.release.is_some_and(|release| {
            before.iter().rev().take_while(|&&b| b == release).count() % 2 == 1
        })
    }
}

/// Split on ASCII `delimiter`, skipping delimiters escaped by `release`.
fn split_unreleased(text: &str, delimiter: u8, release: Option<u8>) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if Some(bytes[i]) == release {
            i += 2;
            continue;
        }
        if bytes[i] == delimiter {
            parts.push(&text[start..i]);
            start = i + 1;
        }
        i += 1;
    }
    parts.push(&text[start..]);
    parts
}

fn unescape(value: &str, release: Option<u8>) -> String {
    let Some(release) = release.map(char::from) else {
        return value.to_owned();
    };
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == release {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}
