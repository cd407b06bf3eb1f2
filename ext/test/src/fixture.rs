//! Conformance test fixture runner
//!
//! Loads YAML fixtures and runs them against the strata engine with a
//! [`ScriptedSource`].
//!
//! ```yaml
//! name: optional child absent
//! description: B may be skipped, C must appear once or twice
//! decls:
//!   - name: A
//!     is_target: true
//!     children:
//!       - { name: B, max: 1 }
//!       - { name: C, min: 1, max: 2 }
//! cases:
//!   - name: both children
//!     input: A B C
//!     expect:
//!       targets: ["A(B,C)"]
//! ```

use crate::{render, ScriptedSource};
use serde::Deserialize;
use std::sync::Arc;
use strata::prelude::*;
use strata::{load_decls, UnitPayload};

/// A complete test fixture.
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Which format defaults to validate `decls` with.
    #[serde(default)]
    pub profile: Profile,
    pub decls: Vec<DeclConfig<UnitPayload>>,
    /// Substring expected in the schema error; `decls` must fail to load.
    #[serde(default)]
    pub schema_error: Option<String>,
    #[serde(default)]
    pub cases: Vec<TestCase>,
}

/// Format defaults a fixture is loaded with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    #[default]
    Flat,
    Edi,
}

impl Profile {
    #[must_use]
    pub fn format_profile(self) -> FormatProfile {
        match self {
            Profile::Flat => FormatProfile::FLAT,
            Profile::Edi => FormatProfile::EDI,
        }
    }
}

/// One input run against the fixture's declarations.
#[derive(Debug, Deserialize)]
pub struct TestCase {
    pub name: String,
    /// Whitespace-separated `NAME` / `NAME=value` units.
    pub input: String,
    pub expect: Expect,
}

/// Expected outcome: targets in order, optionally followed by an error.
#[derive(Debug, Default, Deserialize)]
pub struct Expect {
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub error: Option<ExpectedError>,
}

/// Expected read error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpectedError {
    FewerThanMinOccurs {
        path: String,
        required: usize,
        actual: usize,
    },
    UnexpectedTrailingData,
}

impl ExpectedError {
    fn matches(&self, err: &ReadError) -> bool {
        match (self, err) {
            (
                ExpectedError::FewerThanMinOccurs {
                    path,
                    required,
                    actual,
                },
                ReadError::FewerThanMinOccurs {
                    path: p,
                    required: r,
                    actual: a,
                },
            ) => path == p && required == r && actual == a,
            (ExpectedError::UnexpectedTrailingData, ReadError::UnexpectedTrailingData) => true,
            _ => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Runner
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of running a single test case.
#[derive(Debug)]
pub struct CaseResult {
    pub case_name: String,
    pub passed: bool,
    pub expected_targets: Vec<String>,
    pub actual_targets: Vec<String>,
    pub expected_error: Option<ExpectedError>,
    pub actual_error: Option<String>,
}

impl Fixture {
    /// Parse a fixture from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Parse multiple fixtures from a YAML file with `---` separators.
    pub fn from_yaml_multi(yaml: &str) -> Result<Vec<Self>, serde_yaml::Error> {
        let mut fixtures = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(yaml) {
            fixtures.push(Self::deserialize(doc)?);
        }
        Ok(fixtures)
    }

    /// Load the fixture's declarations.
    ///
    /// # Errors
    ///
    /// The [`SchemaError`] validation produced.
    pub fn load(&self) -> Result<DeclTree<()>, SchemaError> {
        load_decls(&self.decls, &self.profile.format_profile(), |_, _| Ok(()))
    }

    /// Run all test cases and return results.
    ///
    /// # Panics
    ///
    /// Panics if the declarations fail to load.
    pub fn run(&self) -> Vec<CaseResult> {
        let decls = Arc::new(
            self.load()
                .unwrap_or_else(|e| panic!("fixture '{}': schema failed to load: {e}", self.name)),
        );
        self.cases
            .iter()
            .map(|case| {
                let mut reader =
                    HierarchyReader::new(Arc::clone(&decls), ScriptedSource::parse(&case.input));
                let mut actual_targets = Vec::new();
                let outcome = loop {
                    match reader.read() {
                        Ok(Some(target)) => actual_targets.push(render(reader.tree(), target)),
                        Ok(None) => break Ok(()),
                        Err(err) => break Err(err),
                    }
                };
                let error_ok = match (&case.expect.error, &outcome) {
                    (None, Ok(())) => true,
                    (Some(expected), Err(err)) => expected.matches(err),
                    _ => false,
                };
                CaseResult {
                    case_name: case.name.clone(),
                    passed: error_ok && actual_targets == case.expect.targets,
                    expected_targets: case.expect.targets.clone(),
                    actual_targets,
                    expected_error: case.expect.error.clone(),
                    actual_error: outcome.err().map(|e| format!("{e:?}")),
                }
            })
            .collect()
    }

    /// Run the fixture and panic on the first failure.
    pub fn run_and_assert(&self) {
        if let Some(expected) = &self.schema_error {
            match self.load() {
                Ok(_) => panic!("fixture '{}': expected schema error containing {expected:?}", self.name),
                Err(err) => assert!(
                    err.to_string().contains(expected.as_str()),
                    "fixture '{}': schema error {:?} does not contain {expected:?}",
                    self.name,
                    err.to_string()
                ),
            }
            return;
        }
        for result in self.run() {
            assert!(
                result.passed,
                "Fixture '{}' case '{}' failed: expected {:?} then {:?}, got {:?} then {:?}",
                self.name,
                result.case_name,
                result.expected_targets,
                result.expected_error,
                result.actual_targets,
                result.actual_error
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
name: abc
decls:
  - name: A
    is_target: true
    children:
      - { name: B, max: 1 }
      - { name: C, min: 1, max: 2 }
cases:
  - name: full
    input: A B C
    expect: { targets: ["A(B,C)"] }
  - name: missing C
    input: A
    expect:
      error: { kind: fewer_than_min_occurs, path: A/C, required: 1, actual: 0 }
"#;

    #[test]
    fn parses_and_runs() {
        let fixture = Fixture::from_yaml(FIXTURE).unwrap();
        assert_eq!(fixture.profile, Profile::Flat);
        let results = fixture.run();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed), "{results:?}");
    }

    #[test]
    fn wrong_expectation_fails() {
        let yaml = FIXTURE.replace("A(B,C)", "A(C)");
        let results = Fixture::from_yaml(&yaml).unwrap().run();
        assert!(!results[0].passed);
        assert_eq!(results[0].actual_targets, ["A(B,C)"]);
    }

    #[test]
    fn multi_document() {
        let yaml = format!("{FIXTURE}\n---\n{FIXTURE}");
        assert_eq!(Fixture::from_yaml_multi(&yaml).unwrap().len(), 2);
    }

    #[test]
    fn schema_error_fixture() {
        let fixture = Fixture::from_yaml(
            "name: bad\nprofile: edi\nschema_error: no declaration is marked as target\ndecls: [{ name: A }]\n",
        )
        .unwrap();
        fixture.run_and_assert();
    }
}
