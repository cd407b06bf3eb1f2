//! Schema files: format selection, loading, and declaration listings.

use serde::Deserialize;
use std::path::Path;
use strata::DeclTree;
use strata_edi::{EdiSchema, EdiSchemaConfig};
use strata_flat::{FlatSchema, FlatSchemaConfig};

/// A schema file as written on disk; `format` selects the variant.
#[derive(Debug, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum SchemaFile {
    Delimited(FlatSchemaConfig),
    FixedWidth(FlatSchemaConfig),
    Edi(EdiSchemaConfig),
}

/// A validated schema for one of the supported formats.
#[derive(Debug)]
pub enum Schema {
    Flat(FlatSchema),
    Edi(EdiSchema),
}

impl Schema {
    /// Read and validate a schema file. `.json` is parsed as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read \"{}\": {e}", path.display()))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        Self::parse(&content, is_json)
    }

    /// Parse and validate schema text.
    pub fn parse(content: &str, is_json: bool) -> Result<Self, String> {
        let file: SchemaFile = if is_json {
            serde_json::from_str(content).map_err(|e| format!("JSON parse error: {e}"))?
        } else {
            serde_yaml::from_str(content).map_err(|e| format!("YAML parse error: {e}"))?
        };

        let schema = match file {
            SchemaFile::Delimited(config) => FlatSchema::delimited(&config).map(Schema::Flat),
            SchemaFile::FixedWidth(config) => FlatSchema::fixed_width(&config).map(Schema::Flat),
            SchemaFile::Edi(config) => EdiSchema::new(&config).map(Schema::Edi),
        };
        schema.map_err(|e| format!("schema invalid: {e}"))
    }

    /// Number of declarations, excluding the synthetic root.
    pub fn decl_count(&self) -> usize {
        match self {
            Schema::Flat(flat) => flat.decls().len(),
            Schema::Edi(edi) => edi.decls().len(),
        }
    }

    /// Path of the target declaration.
    pub fn target_path(&self) -> &str {
        match self {
            Schema::Flat(flat) => flat.decls().target().path(),
            Schema::Edi(edi) => edi.decls().target().path(),
        }
    }
}

/// One line per declaration in document order: path, kind, occurs, target marker.
pub fn describe<P>(decls: &DeclTree<P>) -> Vec<String> {
    let width = decls.iter().map(|d| d.path().len()).max().unwrap_or(0);
    decls
        .iter()
        .map(|decl| {
            let kind = if decl.is_group() { "group" } else { "leaf" };
            let marker = if decl.is_target() { "  (target)" } else { "" };
            format!("{:<width$}  {kind:<5}  {}{marker}", decl.path(), decl.occurs())
        })
        .collect()
}
