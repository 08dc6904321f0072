//! TOML content loading: characters and formulas.
//!
//! Character files declare `[characters.<id>]` tables whose tier entries
//! are either static values or procedural `{ type = "range", min, max }`
//! definitions resolved at load time. Formula files declare
//! `[formulas.<name>]` tables with an expression and an optional
//! `requires_target` flag; a bad formula is logged and skipped so one
//! typo cannot take down a whole content pack.

use crate::eidolon::{AttributeValue, Eidolon};
use crate::error::{Result, WorldError};
use animaloom_formula::{AttributeSchema, FormulaRegistry, ValueType};
use indexmap::IndexMap;
use rand::Rng;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct CharacterFile {
    #[serde(default)]
    characters: IndexMap<String, CharacterDef>,
}

#[derive(Debug, Deserialize)]
struct CharacterDef {
    name: Option<String>,
    #[serde(flatten)]
    tiers: IndexMap<String, IndexMap<String, AttributeDef>>,
}

/// One attribute entry: a literal value or a procedural definition.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AttributeDef {
    Procedural(Procedural),
    Static(StaticValue),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Procedural {
    Range {
        #[serde(default)]
        min: f64,
        #[serde(default = "default_range_max")]
        max: f64,
    },
}

fn default_range_max() -> f64 {
    100.0
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StaticValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
    Map(IndexMap<String, f64>),
}

/// Load characters from a TOML file. Every attribute is validated against
/// the schema; procedural ranges are resolved with the given rng.
pub fn load_characters(
    path: impl AsRef<Path>,
    schema: &AttributeSchema,
    rng: &mut impl Rng,
) -> Result<Vec<Eidolon>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| WorldError::Io {
        path: path.display().to_string(),
        source,
    })?;
    characters_from_str(&text, schema, rng).map_err(|err| match err {
        WorldError::TomlDecode { source, .. } => WorldError::TomlDecode {
            path: path.display().to_string(),
            source,
        },
        other => other,
    })
}

/// Parse characters from TOML text. See [`load_characters`].
pub fn characters_from_str(
    text: &str,
    schema: &AttributeSchema,
    rng: &mut impl Rng,
) -> Result<Vec<Eidolon>> {
    let file: CharacterFile = toml::from_str(text).map_err(|source| WorldError::TomlDecode {
        path: "<inline>".to_string(),
        source,
    })?;

    let mut eidolons = Vec::with_capacity(file.characters.len());
    for (id, def) in file.characters {
        let name = def.name.clone().unwrap_or_else(|| id.clone());
        let mut eidolon = Eidolon::new(&name);
        for (group, attrs) in &def.tiers {
            for (attribute, attr_def) in attrs {
                let declared = schema.lookup(group, attribute).ok_or_else(|| {
                    WorldError::UnknownAttribute {
                        character: name.clone(),
                        group: group.clone(),
                        attribute: attribute.clone(),
                    }
                })?;
                let value = resolve_attribute(&name, group, attribute, attr_def, declared, rng)?;
                eidolon.set_attribute(group, attribute, value);
            }
        }
        eidolon.calculate_derived_stats();
        debug!(name = eidolon.name(), "character loaded");
        eidolons.push(eidolon);
    }
    info!(count = eidolons.len(), "characters loaded");
    Ok(eidolons)
}

fn resolve_attribute(
    character: &str,
    group: &str,
    attribute: &str,
    def: &AttributeDef,
    declared: ValueType,
    rng: &mut impl Rng,
) -> Result<AttributeValue> {
    let type_error = || WorldError::AttributeType {
        character: character.to_string(),
        group: group.to_string(),
        attribute: attribute.to_string(),
        expected: match declared {
            ValueType::Number => "number",
            ValueType::Text => "text",
            ValueType::List => "list of strings",
            ValueType::Map => "map of numbers",
        },
    };

    match def {
        AttributeDef::Procedural(Procedural::Range { min, max }) => {
            if declared != ValueType::Number {
                return Err(type_error());
            }
            if min > max {
                return Err(WorldError::InvalidRange {
                    character: character.to_string(),
                    group: group.to_string(),
                    attribute: attribute.to_string(),
                    min: *min,
                    max: *max,
                });
            }
            Ok(AttributeValue::Number(rng.gen_range(*min..=*max).round()))
        }
        AttributeDef::Static(value) => {
            let value = match value {
                StaticValue::Number(v) => AttributeValue::Number(*v),
                StaticValue::Text(s) => AttributeValue::Text(s.clone()),
                StaticValue::List(items) => AttributeValue::List(items.clone()),
                StaticValue::Map(map) => AttributeValue::Map(map.clone()),
            };
            if value.value_type() != declared {
                return Err(type_error());
            }
            Ok(value)
        }
    }
}

#[derive(Debug, Deserialize)]
struct FormulaFile {
    #[serde(default)]
    formulas: IndexMap<String, FormulaDef>,
}

#[derive(Debug, Deserialize)]
struct FormulaDef {
    expression: String,
    #[serde(default)]
    requires_target: bool,
    #[allow(dead_code)]
    description: Option<String>,
}

/// Outcome of a formula load: how many registered, and what was skipped.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub registered: usize,
    pub skipped: Vec<(String, animaloom_formula::Error)>,
}

impl LoadReport {
    pub fn all_registered(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Load formulas from a TOML file into the registry. Bad formulas are
/// logged and skipped; the report carries the per-formula errors for
/// callers that treat them as fatal.
pub fn load_formulas(
    registry: &mut FormulaRegistry,
    schema: &AttributeSchema,
    path: impl AsRef<Path>,
) -> Result<LoadReport> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| WorldError::Io {
        path: path.display().to_string(),
        source,
    })?;
    formulas_from_str(registry, schema, &text).map_err(|err| match err {
        WorldError::TomlDecode { source, .. } => WorldError::TomlDecode {
            path: path.display().to_string(),
            source,
        },
        other => other,
    })
}

/// Parse and register formulas from TOML text. See [`load_formulas`].
pub fn formulas_from_str(
    registry: &mut FormulaRegistry,
    schema: &AttributeSchema,
    text: &str,
) -> Result<LoadReport> {
    let file: FormulaFile = toml::from_str(text).map_err(|source| WorldError::TomlDecode {
        path: "<inline>".to_string(),
        source,
    })?;

    let mut report = LoadReport::default();
    for (name, def) in file.formulas {
        match registry.register(&name, &def.expression, def.requires_target, schema) {
            Ok(()) => report.registered += 1,
            Err(err) => {
                warn!(formula = %name, error = %err, "skipping formula");
                report.skipped.push((name, err));
            }
        }
    }
    info!(
        registered = report.registered,
        skipped = report.skipped.len(),
        "formulas loaded"
    );
    Ok(report)
}
