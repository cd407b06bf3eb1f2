//! Flat schema config and its compiled form.

use serde::Deserialize;
use std::sync::Arc;
use strata::{
    load_decls, DeclConfig, DeclTree, FieldFilter, FormatProfile, PatternCache, SchemaError,
    TargetFilterConfig, TargetPolicy, ValueMatcher,
};

/// A flat-file schema as written in JSON/YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct FlatSchemaConfig {
    /// Field delimiter for delimited files (a single character). Defaults to `,`.
    #[serde(default)]
    pub delimiter: Option<String>,
    /// Optional quote character for delimited files.
    #[serde(default)]
    pub quote: Option<String>,
    /// Overrides the flat default of promoting the first top-level record to target.
    #[serde(default)]
    pub target_policy: Option<TargetPolicy>,
    /// Only surface targets this filter accepts.
    #[serde(default)]
    pub target_filter: Option<TargetFilterConfig>,
    /// Top-level record declarations.
    #[serde(alias = "decls")]
    pub records: Vec<DeclConfig<RecordConfig>>,
}

/// Leaf payload of a flat record as written in the schema.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordConfig {
    /// Exact number of lines the record spans.
    #[serde(default)]
    pub rows: Option<usize>,
    /// Regex the record's first line must match.
    #[serde(default)]
    pub header: Option<String>,
    /// Regex of the record's last line; requires `header`.
    #[serde(default)]
    pub footer: Option<String>,
    /// Columns extracted from the record's lines.
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

/// One column as written in the schema.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnConfig {
    /// Output field name.
    pub name: String,
    /// 1-based field index (delimited layout).
    #[serde(default)]
    pub index: Option<usize>,
    /// 1-based start character (fixed-width layout).
    #[serde(default)]
    pub start_pos: Option<usize>,
    /// Width in characters (fixed-width layout).
    #[serde(default)]
    pub length: Option<usize>,
    /// 0-based line within the record to read from.
    #[serde(default)]
    pub line_index: Option<usize>,
    /// Regex selecting the first record line to read from.
    #[serde(default)]
    pub line_pattern: Option<String>,
}

/// Physical layout of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Fields separated by a delimiter, optionally quoted.
    Delimited {
        /// Field separator.
        delimiter: char,
        /// Quote character, if quoting is honored.
        quote: Option<char>,
    },
    /// Fields at fixed character positions.
    FixedWidth,
}

/// How many lines a record spans.
#[derive(Debug, Clone)]
pub enum Envelope {
    /// Exactly this many lines; matches while that many lines remain.
    Rows(usize),
    /// Starts at a line matching `header`; ends at the first line matching `footer`
    /// (searched from the header line on), or is the header line alone. A footer
    /// missing before end of input is no match.
    Header {
        /// First-line test.
        header: ValueMatcher,
        /// Last-line test.
        footer: Option<ValueMatcher>,
    },
}

/// Where a column's value sits within a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// 0-based field index.
    Field(usize),
    /// 0-based start character and width.
    Span {
        /// First character.
        start: usize,
        /// Number of characters.
        len: usize,
    },
}

/// Which line of a multi-line record a column reads.
#[derive(Debug, Clone)]
pub enum LineSelector {
    /// 0-based line index.
    Index(usize),
    /// First line matching.
    Pattern(ValueMatcher),
}

/// A compiled column.
#[derive(Debug, Clone)]
pub struct Column {
    /// Output field name.
    pub name: String,
    /// Position within the line.
    pub locator: Locator,
    /// Line within the record.
    pub line: LineSelector,
}

/// Compiled leaf payload of a flat record.
#[derive(Debug, Clone)]
pub struct RecordLayout {
    /// Line span.
    pub envelope: Envelope,
    /// Columns in output order.
    pub columns: Vec<Column>,
}

/// A validated flat-file schema.
#[derive(Debug, Clone)]
pub struct FlatSchema {
    decls: Arc<DeclTree<RecordLayout>>,
    layout: Layout,
    filter: Option<FieldFilter>,
}

impl FlatSchema {
    /// Load a delimited schema.
    ///
    /// # Errors
    ///
    /// [`SchemaError`] for bad delimiters, columns without `index`, bad patterns, or
    /// an invalid declaration tree.
    pub fn delimited(config: &FlatSchemaConfig) -> Result<Self, SchemaError> {
        let delimiter = single_char("delimiter", config.delimiter.as_deref().unwrap_or(","))?;
        let quote = config
            .quote
            .as_deref()
            .map(|q| single_char("quote", q))
            .transpose()?;
        if quote == Some(delimiter) {
            return Err(invalid(format!(
                "quote and delimiter are both '{delimiter}'"
            )));
        }
        Self::build(config, Layout::Delimited { delimiter, quote })
    }

    /// Load a fixed-width schema.
    ///
    /// # Errors
    ///
    /// [`SchemaError`] for columns without `start_pos`/`length`, bad patterns, or an
    /// invalid declaration tree.
    pub fn fixed_width(config: &FlatSchemaConfig) -> Result<Self, SchemaError> {
        Self::build(config, Layout::FixedWidth)
    }

    fn build(config: &FlatSchemaConfig, layout: Layout) -> Result<Self, SchemaError> {
        let profile = config
            .target_policy
            .map_or(FormatProfile::FLAT, |policy| {
                FormatProfile::FLAT.with_target_policy(policy)
            });

        let mut cache = PatternCache::default();
        let decls = load_decls(&config.records, &profile, |name, record| {
            compile_record(name, record, layout, &mut cache)
        })?;
        let filter = config
            .target_filter
            .as_ref()
            .map(|f| f.compile(&mut cache))
            .transpose()?;

        tracing::debug!(
            decls = decls.len(),
            target = decls.target().path(),
            patterns = %cache.stats(),
            "flat schema loaded"
        );
        Ok(Self {
            decls: Arc::new(decls),
            layout,
            filter,
        })
    }

    /// Returns the declaration tree.
    #[must_use]
    pub fn decls(&self) -> &Arc<DeclTree<RecordLayout>> {
        &self.decls
    }

    /// Returns the line layout.
    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Returns the target filter, if configured.
    #[must_use]
    pub fn filter(&self) -> Option<&FieldFilter> {
        self.filter.as_ref()
    }
}

fn invalid(reason: String) -> SchemaError {
    SchemaError::InvalidConfig { reason }
}

fn single_char(what: &str, value: &str) -> Result<char, SchemaError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(invalid(format!(
            "{what} must be a single character, got \"{value}\""
        ))),
    }
}

fn regex(cache: &mut PatternCache, pattern: &str) -> Result<ValueMatcher, SchemaError> {
    cache.get_or_compile(pattern).map(ValueMatcher::Regex)
}

fn compile_record(
    name: &str,
    record: &RecordConfig,
    layout: Layout,
    cache: &mut PatternCache,
) -> Result<RecordLayout, SchemaError> {
    let envelope = match (&record.header, &record.footer, record.rows) {
        (None, Some(_), _) => {
            return Err(invalid(format!("record '{name}' has a footer but no header")))
        }
        (Some(_), _, Some(_)) => {
            return Err(invalid(format!(
                "record '{name}' sets both rows and header"
            )))
        }
        (_, _, Some(0)) => return Err(invalid(format!("record '{name}' has rows: 0"))),
        (Some(header), footer, None) => Envelope::Header {
            header: regex(cache, header)?,
            footer: footer.as_deref().map(|f| regex(cache, f)).transpose()?,
        },
        (None, None, rows) => Envelope::Rows(rows.unwrap_or(1)),
    };

    let columns = record
        .columns
        .iter()
        .map(|column| compile_column(name, column, layout, cache))
        .collect::<Result<_, _>>()?;

    Ok(RecordLayout { envelope, columns })
}

fn compile_column(
    record: &str,
    column: &ColumnConfig,
    layout: Layout,
    cache: &mut PatternCache,
) -> Result<Column, SchemaError> {
    let locator = match layout {
        Layout::Delimited { .. } => match column.index {
            Some(index) if index >= 1 => Locator::Field(index - 1),
            _ => {
                return Err(invalid(format!(
                    "column '{record}/{}' needs a 1-based index",
                    column.name
                )))
            }
        },
        Layout::FixedWidth => match (column.start_pos, column.length) {
            (Some(start), Some(len)) if start >= 1 => Locator::Span {
                start: start - 1,
                len,
            },
            _ => {
                return Err(invalid(format!(
                    "column '{record}/{}' needs a 1-based start_pos and a length",
                    column.name
                )))
            }
        },
    };

    let line = match (&column.line_pattern, column.line_index) {
        (Some(_), Some(_)) => {
            return Err(invalid(format!(
                "column '{record}/{}' sets both line_index and line_pattern",
                column.name
            )))
        }
        (Some(pattern), None) => LineSelector::Pattern(regex(cache, pattern)?),
        (None, index) => LineSelector::Index(index.unwrap_or(0)),
    };

    Ok(Column {
        name: column.name.clone(),
        locator,
        line,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(json: serde_json::Value) -> FlatSchemaConfig {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn delimited_defaults() {
        let schema = FlatSchema::delimited(&config(serde_json::json!({
            "records": [{ "name": "R", "columns": [{ "name": "a", "index": 1 }] }]
        })))
        .unwrap();

        assert_eq!(
            schema.layout(),
            Layout::Delimited {
                delimiter: ',',
                quote: None
            }
        );
        let target = schema.decls().target();
        assert_eq!(target.name(), "R");
        let layout = target.payload().unwrap();
        assert!(matches!(layout.envelope, Envelope::Rows(1)));
        assert_eq!(layout.columns[0].locator, Locator::Field(0));
        assert!(matches!(layout.columns[0].line, LineSelector::Index(0)));
    }

    #[test]
    fn fixed_width_span_is_zero_based() {
        let schema = FlatSchema::fixed_width(&config(serde_json::json!({
            "records": [{ "name": "R", "rows": 2, "columns": [
                { "name": "a", "start_pos": 3, "length": 4, "line_index": 1 }
            ] }]
        })))
        .unwrap();
        let layout = schema.decls().target().payload().unwrap();
        assert!(matches!(layout.envelope, Envelope::Rows(2)));
        assert_eq!(layout.columns[0].locator, Locator::Span { start: 2, len: 4 });
        assert!(matches!(layout.columns[0].line, LineSelector::Index(1)));
    }

    #[test]
    fn header_footer_envelope() {
        let schema = FlatSchema::fixed_width(&config(serde_json::json!({
            "records": [{ "name": "R", "header": "^BEGIN", "footer": "^END", "columns": [
                { "name": "a", "start_pos": 1, "length": 1, "line_pattern": "^DATA" }
            ] }]
        })))
        .unwrap();
        let layout = schema.decls().target().payload().unwrap();
        match &layout.envelope {
            Envelope::Header { header, footer } => {
                assert!(header.matches("BEGIN 1"));
                assert!(footer.as_ref().unwrap().matches("END"));
            }
            Envelope::Rows(_) => panic!("expected header envelope"),
        }
        assert!(matches!(layout.columns[0].line, LineSelector::Pattern(_)));
    }

    #[test]
    fn delimited_column_without_index_is_rejected() {
        let err = FlatSchema::delimited(&config(serde_json::json!({
            "records": [{ "name": "R", "columns": [{ "name": "a" }] }]
        })))
        .unwrap_err();
        assert!(err.to_string().contains("column 'R/a' needs a 1-based index"));
    }

    #[test]
    fn fixed_column_without_length_is_rejected() {
        let err = FlatSchema::fixed_width(&config(serde_json::json!({
            "records": [{ "name": "R", "columns": [{ "name": "a", "start_pos": 1 }] }]
        })))
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidConfig { .. }));
    }

    #[test]
    fn footer_requires_header() {
        let err = FlatSchema::delimited(&config(serde_json::json!({
            "records": [{ "name": "R", "footer": "^END" }]
        })))
        .unwrap_err();
        assert!(err.to_string().contains("footer but no header"));
    }

    #[test]
    fn multi_char_delimiter_is_rejected() {
        let err = FlatSchema::delimited(&config(serde_json::json!({
            "delimiter": "||",
            "records": [{ "name": "R" }]
        })))
        .unwrap_err();
        assert!(err.to_string().contains("single character"));
    }

    #[test]
    fn bad_header_regex_is_rejected() {
        let err = FlatSchema::delimited(&config(serde_json::json!({
            "records": [{ "name": "R", "header": "[" }]
        })))
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { .. }));
    }

    #[test]
    fn explicit_target_policy_is_honored() {
        let err = FlatSchema::delimited(&config(serde_json::json!({
            "target_policy": "explicit",
            "records": [{ "name": "R" }]
        })))
        .unwrap_err();
        assert_eq!(err, SchemaError::NoTarget);
    }

    #[test]
    fn target_filter_is_compiled() {
        let schema = FlatSchema::delimited(&config(serde_json::json!({
            "target_filter": { "path": "a", "value_match": { "Exact": "x" } },
            "records": [{ "name": "R", "columns": [{ "name": "a", "index": 1 }] }]
        })))
        .unwrap();
        assert_eq!(schema.filter().unwrap().path(), "a");
    }

    #[test]
    fn yaml_schema_with_nested_records() {
        let config: FlatSchemaConfig = serde_yaml::from_str(
            r#"
delimiter: "|"
records:
  - name: FILE
    type: record_group
    min: 1
    child_records:
      - { name: HDR, min: 1, header: "^H" }
      - name: DTL
        is_target: true
        max: -1
        header: "^D"
        columns:
          - { name: amount, index: 3 }
"#,
        )
        .unwrap();
        let schema = FlatSchema::delimited(&config).unwrap();
        assert_eq!(schema.decls().target().path(), "FILE/DTL");
        assert_eq!(schema.decls().target().occurs().max, None);
        let dtl = schema.decls().target().payload().unwrap();
        assert_eq!(dtl.columns[0].locator, Locator::Field(2));
    }
}
