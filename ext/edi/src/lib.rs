//! strata-edi: EDI segment streams
//!
//! An EDI document is a flat run of segments (`ISA*00*...~GS*PO*...~ST*850*0001~`).
//! The schema declares which segments nest under which, and each segment
//! declaration names the elements to keep.
//!
//! - [`SegmentScanner`] splits raw bytes into segments, elements and components,
//!   honoring the release character, and unescapes values
//! - [`SegmentSource`] caches at most one unprocessed segment and matches it by name
//! - [`EdiReader`] drives the engine and reports errors by segment ordinal and line
//!
//! # Example
//!
//! ```
//! use strata_edi::prelude::*;
//!
//! let config: EdiSchemaConfig = serde_json::from_str(r#"{
//!     "segment_delimiter": "~",
//!     "element_delimiter": "*",
//!     "ignore_crlf": true,
//!     "segments": [{
//!         "name": "ST", "is_target": true, "max": -1,
//!         "elements": [{ "name": "id", "index": 2 }],
//!         "child_segments": [{ "name": "SE" }]
//!     }]
//! }"#).unwrap();
//!
//! let schema = EdiSchema::new(&config).unwrap();
//! let input = "ST*850*0001~\nSE*2*0001~\nST*850*0002~\nSE*2*0002~\n";
//! let mut reader = EdiReader::new("po.edi", &schema, input.as_bytes());
//!
//! let ids: Vec<String> = std::iter::from_fn(|| {
//!     let target = reader.read().unwrap()?;
//!     Some(reader.tree().value_at(target, "id").unwrap().to_owned())
//! })
//! .collect();
//! assert_eq!(ids, ["0001", "0002"]);
//! ```

mod reader;
mod scanner;
mod schema;
mod source;

pub use reader::EdiReader;
pub use scanner::{RawSegment, SegmentScanner};
pub use schema::{
    Delimiters, EdiSchema, EdiSchemaConfig, Element, ElementConfig, SegmentConfig, SegmentLayout,
};
pub use source::SegmentSource;

use strata::{ReadError, SchemaError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{EdiError, EdiReader, EdiSchema, EdiSchemaConfig, SegmentLayout};
}

/// Errors from EDI schemas and reads.
///
/// Read errors carry the 1-based ordinal of the segment they are located at (the
/// unprocessed segment, or the last one read at end of input) and its line.
#[derive(Debug, thiserror::Error)]
pub enum EdiError {
    /// The schema failed to load or validate.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A segment declaration's minimum was not met.
    #[error("input '{input}' at segment no.{segment} (line {line}): segment '{path}' needs min occur {required}, but only got {actual}")]
    FewerThanMinOccurs {
        /// Input name given to the reader.
        input: String,
        /// Segment ordinal.
        segment: usize,
        /// Line of that segment.
        line: usize,
        /// Declaration path.
        path: String,
        /// Declared minimum.
        required: usize,
        /// Occurrences seen.
        actual: usize,
    },
    /// A segment arrived that no declaration accepts at this point.
    #[error("input '{input}' at segment no.{segment} (line {line}): segment '{name}' is either not declared in schema or appears in an invalid order")]
    UnexpectedSegment {
        /// Input name given to the reader.
        input: String,
        /// Segment ordinal.
        segment: usize,
        /// Line of that segment.
        line: usize,
        /// Name of the offending segment.
        name: String,
    },
    /// Any other read failure (I/O, malformed segment).
    #[error("input '{input}' at segment no.{segment} (line {line}): {source}")]
    Read {
        /// Input name given to the reader.
        input: String,
        /// Segment ordinal.
        segment: usize,
        /// Line of that segment.
        line: usize,
        /// The engine or source error.
        source: ReadError,
    },
}
