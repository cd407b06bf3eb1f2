//! Config types for schema-driven declaration trees.
//!
//! These types mirror the runtime declaration types but are serde-deserializable,
//! so a schema file can be turned into a validated [`DeclTree`] with [`load_decls()`].
//!
//! # Relationship to runtime types
//!
//! | Config type | Runtime type | Loader |
//! |-------------|-------------|--------|
//! | [`DeclConfig<C>`] | [`RecDecl<P>`] then [`DeclTree<P>`] | [`load_decls()`] |
//! | [`TargetFilterConfig`] | [`FieldFilter`] | [`TargetFilterConfig::compile()`] |
//!
//! `C` is the format's raw leaf payload (what the schema says about columns or
//! elements) and `P` is its compiled form. The format crate supplies the `C → P`
//! step as a closure.

use crate::{
    DeclTree, FieldFilter, FormatProfile, PatternCache, RecDecl, SchemaError, StringMatchSpec,
};
use serde::Deserialize;

/// The two declaration kinds as spelled in schema files.
///
/// Flat-file schemas say `record` / `record_group`; EDI schemas say `segment` /
/// `segment_group`. Both spellings are accepted everywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclType {
    /// A leaf matched against one raw unit.
    #[default]
    #[serde(alias = "segment")]
    Record,
    /// A group identified by its first leaf descendant.
    #[serde(alias = "segment_group")]
    RecordGroup,
}

/// Configuration for one declaration.
///
/// ```json
/// {
///   "name": "LINE", "type": "record", "min": 1, "max": -1,
///   "child_records": [ ... ],
///   "columns": [ ... ]
/// }
/// ```
///
/// A negative `max` means unbounded. Omitted `min` / `max` take the format's
/// [`FormatProfile`] defaults. Fields not listed here are handed to the payload `C`.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "C: Deserialize<'de>"))]
pub struct DeclConfig<C> {
    /// Declaration name (segment name for EDI).
    pub name: String,

    /// Leaf or group. Defaults to a leaf.
    #[serde(rename = "type", default)]
    pub kind: DeclType,

    /// Marks the target declaration.
    #[serde(default)]
    pub is_target: bool,

    /// Minimum occurrences.
    #[serde(default)]
    pub min: Option<usize>,

    /// Maximum occurrences; negative means unbounded.
    #[serde(default)]
    pub max: Option<i64>,

    /// Child declarations in document order.
    #[serde(
        rename = "children",
        alias = "child_records",
        alias = "child_segments",
        default
    )]
    pub children: Vec<DeclConfig<C>>,

    /// Format-specific leaf payload.
    #[serde(flatten)]
    pub payload: C,
}

/// Empty payload for formats whose leaves carry nothing beyond a name.
///
/// Accepts and ignores whatever fields are left over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitPayload;

impl<'de> Deserialize<'de> for UnitPayload {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Flattened payloads only support map-shaped deserialization.
        std::collections::BTreeMap::<String, serde::de::IgnoredAny>::deserialize(deserializer)?;
        Ok(UnitPayload)
    }
}

/// Configuration for a [`FieldFilter`].
///
/// ```json
/// { "path": "LINE/sku", "value_match": { "Prefix": "B" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TargetFilterConfig {
    /// Path below the target, `/`-separated.
    pub path: String,
    /// How to match the selected values.
    pub value_match: StringMatchSpec,
}

impl TargetFilterConfig {
    /// Compile into a runtime [`FieldFilter`].
    ///
    /// # Errors
    ///
    /// Pattern errors from [`StringMatchSpec::compile`].
    pub fn compile(&self, cache: &mut PatternCache) -> Result<FieldFilter, SchemaError> {
        Ok(FieldFilter::new(
            self.path.clone(),
            self.value_match.compile(cache)?,
        ))
    }
}

/// Load declaration configs into a validated [`DeclTree`].
///
/// `compile_payload` turns each leaf's raw payload into its runtime form; it receives
/// the leaf's name for error messages. Group payloads are ignored.
///
/// # Errors
///
/// Any [`SchemaError`] from `compile_payload` or from [`DeclTree::new`] validation.
///
/// # Example
///
/// ```
/// use strata::{load_decls, DeclConfig, FormatProfile, UnitPayload};
///
/// let configs: Vec<DeclConfig<UnitPayload>> = serde_json::from_str(r#"[
///     { "name": "HDR" },
///     { "name": "LINE", "is_target": true, "max": -1 }
/// ]"#).unwrap();
///
/// let tree = load_decls(&configs, &FormatProfile::FLAT, |_, _| Ok(())).unwrap();
/// assert_eq!(tree.target().path(), "LINE");
/// assert_eq!(tree.target().occurs().max, None);
/// ```
pub fn load_decls<C, P, F>(
    configs: &[DeclConfig<C>],
    profile: &FormatProfile,
    mut compile_payload: F,
) -> Result<DeclTree<P>, SchemaError>
where
    F: FnMut(&str, &C) -> Result<P, SchemaError>,
{
    let top = configs
        .iter()
        .map(|config| to_rec_decl(config, &mut compile_payload))
        .collect::<Result<Vec<_>, _>>()?;
    DeclTree::new(top, profile)
}

fn to_rec_decl<C, P, F>(config: &DeclConfig<C>, compile_payload: &mut F) -> Result<RecDecl<P>, SchemaError>
where
    F: FnMut(&str, &C) -> Result<P, SchemaError>,
{
    let mut decl = match config.kind {
        DeclType::Record => RecDecl::leaf(&config.name, compile_payload(&config.name, &config.payload)?),
        DeclType::RecordGroup => RecDecl::group(&config.name),
    }
    .with_target(config.is_target);

    if let Some(min) = config.min {
        decl = decl.min(min);
    }
    match config.max {
        Some(max) if max < 0 => decl = decl.unbounded(),
        Some(max) => {
            let max = usize::try_from(max).map_err(|_| SchemaError::InvalidConfig {
                reason: format!("declaration '{}' has max {max} out of range", config.name),
            })?;
            decl = decl.max(max);
        }
        None => {}
    }

    let children = config
        .children
        .iter()
        .map(|child| to_rec_decl(child, compile_payload))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(decl.with_children(children))
}
