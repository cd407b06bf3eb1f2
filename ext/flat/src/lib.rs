//! strata-flat: delimited and fixed-width flat files
//!
//! Each leaf declaration in a flat schema describes one record: how many lines it
//! spans (a fixed row count, or a header line through an optional footer line) and
//! which columns to pull out of those lines. The [`FlatSource`] turns buffered lines
//! into record nodes; [`FlatReader`] drives the engine over it and locates errors by
//! input name and line.
//!
//! # Architecture
//!
//! ```text
//! FlatSchemaConfig (JSON/YAML)
//!         ↓ FlatSchema::delimited() / FlatSchema::fixed_width()
//! FlatSchema { DeclTree<RecordLayout>, Layout, filter }
//!         ↓ FlatReader::new(name, &schema, input)
//! HierarchyReader<RecordLayout, FlatSource<R>>
//!         ↓ read()
//! target NodeId
//! ```
//!
//! # Example
//!
//! ```
//! use strata_flat::prelude::*;
//!
//! let config: FlatSchemaConfig = serde_json::from_str(r#"{
//!     "delimiter": "|",
//!     "records": [{
//!         "name": "ORDER", "type": "record_group", "is_target": true, "max": -1,
//!         "child_records": [
//!             { "name": "HDR", "min": 1, "header": "^H\\|", "columns": [{ "name": "id", "index": 2 }] },
//!             { "name": "LINE", "max": -1, "header": "^L\\|", "columns": [{ "name": "sku", "index": 2 }] }
//!         ]
//!     }]
//! }"#).unwrap();
//!
//! let schema = FlatSchema::delimited(&config).unwrap();
//! let input = "H|1\nL|A\nL|B\nH|2\n";
//! let mut reader = FlatReader::new("orders.txt", &schema, input.as_bytes());
//!
//! let first = reader.read().unwrap().unwrap();
//! assert_eq!(
//!     reader.tree().to_json(first),
//!     serde_json::json!({ "HDR": { "id": "1" }, "LINE": [{ "sku": "A" }, { "sku": "B" }] })
//! );
//! let second = reader.read().unwrap().unwrap();
//! assert_eq!(reader.tree().value_at(second, "HDR/id"), Some("2"));
//! assert!(reader.read().unwrap().is_none());
//! ```

mod delimited;
mod reader;
mod schema;
mod source;

pub use delimited::split_fields;
pub use reader::FlatReader;
pub use schema::{
    Column, ColumnConfig, Envelope, FlatSchema, FlatSchemaConfig, Layout, LineSelector, Locator,
    RecordConfig, RecordLayout,
};
pub use source::FlatSource;

use strata::{ReadError, SchemaError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        FlatError, FlatReader, FlatSchema, FlatSchemaConfig, FlatSource, Layout, RecordLayout,
    };
}

/// Errors from flat-file schemas and reads.
#[derive(Debug, thiserror::Error)]
pub enum FlatError {
    /// The schema failed to load or validate.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Reading the input failed at `line` (1-based; blank lines count).
    #[error("input '{input}' line {line}: {source}")]
    Read {
        /// Input name given to the reader.
        input: String,
        /// Line the failure is located at.
        line: usize,
        /// The engine or source error.
        source: ReadError,
    },
}
