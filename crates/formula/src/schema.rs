//! Attribute schema: the legal `(group, attribute)` references per entity kind.
//!
//! The schema is pure data. It is built once at content-load time and then
//! only borrowed; the parser validates every attribute path against it so
//! that a registered formula can never reference an attribute that does not
//! exist.

use indexmap::IndexMap;
use serde::Deserialize;

/// Declared type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Scalar number (f64 at runtime).
    Number,
    /// String value.
    Text,
    /// List of strings (e.g. known secrets). Not directly readable from
    /// formulas; reachable through queries.
    List,
    /// Mapping of string to number (e.g. grievance scores). Not directly
    /// readable from formulas; reachable through queries.
    Map,
}

/// Grouped attribute declarations for one entity kind.
///
/// Group and attribute names are unique by construction (insertion into an
/// existing slot overwrites it, which only happens if a loader declares the
/// same attribute twice).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct AttributeSchema {
    groups: IndexMap<String, IndexMap<String, ValueType>>,
}

impl AttributeSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare one attribute.
    pub fn add(&mut self, group: &str, attribute: &str, ty: ValueType) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(attribute.to_string(), ty);
    }

    /// Look up the declared type of `(group, attribute)`.
    pub fn lookup(&self, group: &str, attribute: &str) -> Option<ValueType> {
        self.groups.get(group)?.get(attribute).copied()
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// Iterate declared group names in declaration order.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Iterate `(attribute, type)` pairs of one group.
    pub fn attributes(&self, group: &str) -> impl Iterator<Item = (&str, ValueType)> {
        self.groups
            .get(group)
            .into_iter()
            .flat_map(|attrs| attrs.iter().map(|(name, ty)| (name.as_str(), *ty)))
    }
}
