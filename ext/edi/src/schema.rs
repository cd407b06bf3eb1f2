//! EDI schema config and its compiled form.

use serde::Deserialize;
use std::sync::Arc;
use strata::{
    load_decls, DeclConfig, DeclTree, FieldFilter, FormatProfile, PatternCache, SchemaError,
    TargetFilterConfig, TargetPolicy,
};

/// An EDI schema as written in JSON/YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct EdiSchemaConfig {
    /// Ends a segment (`~` for X12, `'` for EDIFACT).
    pub segment_delimiter: String,
    /// Separates elements (`*` for X12, `+` for EDIFACT).
    pub element_delimiter: String,
    /// Separates components within an element.
    #[serde(default)]
    pub component_delimiter: Option<String>,
    /// Escapes the next character (`?` for EDIFACT).
    #[serde(default)]
    pub release_character: Option<String>,
    /// Drop CR and LF bytes from the stream before splitting.
    #[serde(default)]
    pub ignore_crlf: bool,
    /// Overrides the EDI default of requiring an explicit target.
    #[serde(default)]
    pub target_policy: Option<TargetPolicy>,
    /// Only surface targets this filter accepts.
    #[serde(default)]
    pub target_filter: Option<TargetFilterConfig>,
    /// Top-level segment declarations.
    #[serde(alias = "decls")]
    pub segments: Vec<DeclConfig<SegmentConfig>>,
}

/// Leaf payload of a segment declaration as written in the schema.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentConfig {
    /// Elements to extract.
    #[serde(default)]
    pub elements: Vec<ElementConfig>,
}

/// One element to extract from a segment.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementConfig {
    /// Output field name.
    pub name: String,
    /// 1-based element position after the segment name.
    pub index: usize,
    /// 1-based component position within the element.
    #[serde(default)]
    pub component_index: Option<usize>,
    /// Value used when the element is missing.
    #[serde(default)]
    pub default: Option<String>,
    /// Use an empty value when the element is missing.
    #[serde(default)]
    pub empty_if_missing: bool,
}

/// Validated delimiter set. All delimiters are single ASCII bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    /// Segment terminator.
    pub segment: u8,
    /// Element separator.
    pub element: u8,
    /// Component separator.
    pub component: Option<u8>,
    /// Release (escape) character.
    pub release: Option<u8>,
    /// Drop CR/LF bytes.
    pub ignore_crlf: bool,
}

/// A compiled element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Output field name.
    pub name: String,
    /// 1-based element index.
    pub index: usize,
    /// 1-based component index.
    pub component: usize,
    /// Fallback value when missing.
    pub default: Option<String>,
    /// Missing becomes empty instead of an error.
    pub empty_if_missing: bool,
}

/// Compiled leaf payload of a segment declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentLayout {
    /// Elements in output order.
    pub elements: Vec<Element>,
}

/// A validated EDI schema.
#[derive(Debug, Clone)]
pub struct EdiSchema {
    decls: Arc<DeclTree<SegmentLayout>>,
    delimiters: Delimiters,
    filter: Option<FieldFilter>,
}

impl EdiSchema {
    /// Load and validate a schema.
    ///
    /// # Errors
    ///
    /// [`SchemaError`] for bad delimiters, bad element positions, or an invalid
    /// declaration tree.
    pub fn new(config: &EdiSchemaConfig) -> Result<Self, SchemaError> {
        let delimiters = Delimiters {
            segment: ascii_char("segment_delimiter", &config.segment_delimiter)?,
            element: ascii_char("element_delimiter", &config.element_delimiter)?,
            component: config
                .component_delimiter
                .as_deref()
                .map(|d| ascii_char("component_delimiter", d))
                .transpose()?,
            release: config
                .release_character
                .as_deref()
                .map(|d| ascii_char("release_character", d))
                .transpose()?,
            ignore_crlf: config.ignore_crlf,
        };
        let mut seen = vec![delimiters.segment, delimiters.element];
        seen.extend(delimiters.component);
        seen.extend(delimiters.release);
        let count = seen.len();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != count {
            return Err(invalid("delimiters and release character must all differ".to_owned()));
        }

        let profile = config
            .target_policy
            .map_or(FormatProfile::EDI, |policy| {
                FormatProfile::EDI.with_target_policy(policy)
            });
        let decls = load_decls(&config.segments, &profile, compile_segment)?;

        let mut cache = PatternCache::default();
        let filter = config
            .target_filter
            .as_ref()
            .map(|f| f.compile(&mut cache))
            .transpose()?;

        tracing::debug!(
            decls = decls.len(),
            target = decls.target().path(),
            "edi schema loaded"
        );
        Ok(Self {
            decls: Arc::new(decls),
            delimiters,
            filter,
        })
    }

    /// Returns the declaration tree.
    #[must_use]
    pub fn decls(&self) -> &Arc<DeclTree<SegmentLayout>> {
        &self.decls
    }

    /// Returns the delimiter set.
    #[must_use]
    pub fn delimiters(&self) -> Delimiters {
        self.delimiters
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

fn ascii_char(what: &str, value: &str) -> Result<u8, SchemaError> {
    match value.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(invalid(format!(
            "{what} must be a single ASCII character, got \"{value}\""
        ))),
    }
}

fn compile_segment(name: &str, config: &SegmentConfig) -> Result<SegmentLayout, SchemaError> {
    let elements = config
        .elements
        .iter()
        .map(|e| {
            let component = e.component_index.unwrap_or(1);
            if e.index == 0 || component == 0 {
                return Err(invalid(format!(
                    "element '{name}/{}' positions are 1-based",
                    e.name
                )));
            }
            Ok(Element {
                name: e.name.clone(),
                index: e.index,
                component,
                default: e.default.clone(),
                empty_if_missing: e.empty_if_missing,
            })
        })
        .collect::<Result<_, _>>()?;
    Ok(SegmentLayout { elements })
}
