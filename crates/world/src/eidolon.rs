//! The Eidolon: one agent in the simulation.
//!
//! Attributes live in four tiers: `core` (the foundation), `personality`
//! (OCEAN disposition), `dynamic` (moment-to-moment states), and `ledger`
//! (history: trauma, secrets, grievances, reputation). Affinities toward
//! other eidolons are stored per kind ("platonic", "trust", ...).

use animaloom_formula::{AttributeSchema, ValueType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A stored attribute value.
///
/// Broader than the formula engine's runtime values: lists and maps exist
/// on the entity but are only reachable from formulas through queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
    Map(IndexMap<String, f64>),
}

impl AttributeValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            AttributeValue::Number(_) => ValueType::Number,
            AttributeValue::Text(_) => ValueType::Text,
            AttributeValue::List(_) => ValueType::List,
            AttributeValue::Map(_) => ValueType::Map,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(v) => Some(*v),
            _ => None,
        }
    }
}

/// One agent: name, tiered attributes, and affinities toward others.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Eidolon {
    name: String,
    attributes: IndexMap<String, IndexMap<String, AttributeValue>>,
    /// other-eidolon name -> affinity kind -> strength
    affinities: IndexMap<String, IndexMap<String, f64>>,
}

impl Eidolon {
    /// Create an eidolon with the default tiers and starting values.
    pub fn new(name: impl Into<String>) -> Self {
        let mut eidolon = Self {
            name: name.into(),
            attributes: IndexMap::new(),
            affinities: IndexMap::new(),
        };
        for attr in [
            "strength",
            "agility",
            "intellect",
            "charisma",
            "resilience",
            "passion",
            "perception",
            "composure",
        ] {
            eidolon.set_attribute("core", attr, AttributeValue::Number(0.0));
        }
        for attr in [
            "openness",
            "conscientiousness",
            "extraversion",
            "agreeableness",
            "neuroticism",
        ] {
            eidolon.set_attribute("personality", attr, AttributeValue::Number(0.0));
        }
        for (attr, value) in [
            ("health", AttributeValue::Number(100.0)),
            ("stamina", AttributeValue::Number(100.0)),
            ("social_battery", AttributeValue::Number(100.0)),
            ("emotional_state", AttributeValue::Text("neutral".into())),
            ("sanity", AttributeValue::Number(100.0)),
        ] {
            eidolon.set_attribute("dynamic", attr, value);
        }
        eidolon.set_attribute("ledger", "trauma", AttributeValue::Number(0.0));
        eidolon.set_attribute("ledger", "secrets", AttributeValue::List(Vec::new()));
        eidolon.set_attribute("ledger", "grievances", AttributeValue::Map(IndexMap::new()));
        eidolon.set_attribute("ledger", "reputation", AttributeValue::Number(0.0));
        eidolon
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_attribute(&mut self, group: &str, attribute: &str, value: AttributeValue) {
        self.attributes
            .entry(group.to_string())
            .or_default()
            .insert(attribute.to_string(), value);
    }

    pub fn attribute(&self, group: &str, attribute: &str) -> Option<&AttributeValue> {
        self.attributes.get(group)?.get(attribute)
    }

    pub fn set_affinity(&mut self, other: &str, kind: &str, strength: f64) {
        self.affinities
            .entry(other.to_string())
            .or_default()
            .insert(kind.to_string(), strength);
    }

    /// Affinity of the given kind toward another eidolon; unset pairs read
    /// as 0.0.
    pub fn affinity(&self, other: &str, kind: &str) -> f64 {
        self.affinities
            .get(other)
            .and_then(|kinds| kinds.get(kind))
            .copied()
            .unwrap_or(0.0)
    }

    /// Grievance score against another eidolon; unset reads as 0.0.
    pub fn grievance(&self, other: &str) -> f64 {
        match self.attribute("ledger", "grievances") {
            Some(AttributeValue::Map(map)) => map.get(other).copied().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn record_grievance(&mut self, other: &str, score: f64) {
        let entry = self
            .attributes
            .entry("ledger".to_string())
            .or_default()
            .entry("grievances".to_string())
            .or_insert_with(|| AttributeValue::Map(IndexMap::new()));
        if let AttributeValue::Map(map) = entry {
            map.insert(other.to_string(), score);
        }
    }

    /// Recompute derived stats from their sources: sanity from resilience
    /// and composure, reputation from charisma, extraversion, and
    /// accumulated grievances.
    pub fn calculate_derived_stats(&mut self) {
        let resilience = self.number_or_zero("core", "resilience");
        let composure = self.number_or_zero("core", "composure");
        self.set_attribute(
            "dynamic",
            "sanity",
            AttributeValue::Number((resilience + composure) / 2.0),
        );

        let charisma = self.number_or_zero("core", "charisma");
        let extraversion = self.number_or_zero("personality", "extraversion");
        let grievance_total = match self.attribute("ledger", "grievances") {
            Some(AttributeValue::Map(map)) => map.values().sum(),
            _ => 0.0,
        };
        self.set_attribute(
            "ledger",
            "reputation",
            AttributeValue::Number(charisma + extraversion - grievance_total),
        );
    }

    fn number_or_zero(&self, group: &str, attribute: &str) -> f64 {
        self.attribute(group, attribute)
            .and_then(AttributeValue::as_number)
            .unwrap_or(0.0)
    }
}

/// The attribute schema matching [`Eidolon::new`]'s default tiers.
pub fn base_schema() -> AttributeSchema {
    let mut schema = AttributeSchema::new();
    for attr in [
        "strength",
        "agility",
        "intellect",
        "charisma",
        "resilience",
        "passion",
        "perception",
        "composure",
    ] {
        schema.add("core", attr, ValueType::Number);
    }
    for attr in [
        "openness",
        "conscientiousness",
        "extraversion",
        "agreeableness",
        "neuroticism",
    ] {
        schema.add("personality", attr, ValueType::Number);
    }
    for attr in ["health", "stamina", "social_battery", "sanity"] {
        schema.add("dynamic", attr, ValueType::Number);
    }
    schema.add("dynamic", "emotional_state", ValueType::Text);
    schema.add("ledger", "trauma", ValueType::Number);
    schema.add("ledger", "secrets", ValueType::List);
    schema.add("ledger", "grievances", ValueType::Map);
    schema.add("ledger", "reputation", ValueType::Number);
    schema
}
