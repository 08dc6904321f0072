//! End-to-end registry tests: register source text, evaluate against views.

use animaloom_formula::{
    AttributeSchema, EntityView, Error, EvalError, FormulaRegistry, ParseError, QueryError, Value,
    ValueType,
};
use std::collections::HashMap;

struct Character {
    name: String,
    attrs: HashMap<(String, String), Value>,
    affinities: HashMap<(String, String), f64>,
    grievances: HashMap<String, f64>,
}

impl Character {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: HashMap::new(),
            affinities: HashMap::new(),
            grievances: HashMap::new(),
        }
    }

    fn set(&mut self, group: &str, attribute: &str, value: impl Into<Value>) {
        self.attrs
            .insert((group.to_string(), attribute.to_string()), value.into());
    }
}

impl EntityView for Character {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, group: &str, attribute: &str) -> Option<Value> {
        self.attrs
            .get(&(group.to_string(), attribute.to_string()))
            .cloned()
    }

    fn query(&self, name: &str, args: &[Value]) -> Result<Value, QueryError> {
        match name {
            "relationship" => {
                let other = args[0].as_text().unwrap_or_default().to_string();
                let kind = args[1].as_text().unwrap_or_default().to_string();
                Ok(Value::Number(
                    self.affinities.get(&(other, kind)).copied().unwrap_or(0.0),
                ))
            }
            "grievance" => {
                let other = args[0].as_text().unwrap_or_default();
                Ok(Value::Number(
                    self.grievances.get(other).copied().unwrap_or(0.0),
                ))
            }
            other => Err(QueryError::new(format!("unhandled query '{other}'"))),
        }
    }
}

fn schema() -> AttributeSchema {
    let mut schema = AttributeSchema::new();
    schema.add("core", "charisma", ValueType::Number);
    schema.add("core", "strength", ValueType::Number);
    schema.add("personality", "extraversion", ValueType::Number);
    schema.add("personality", "agreeableness", ValueType::Number);
    schema.add("dynamic", "emotional_state", ValueType::Text);
    schema.add("dynamic", "health", ValueType::Number);
    schema
}

#[test]
fn charm_attempt_scores_fifty_seven_point_five() {
    let mut registry = FormulaRegistry::new();
    registry
        .register(
            "charm_attempt",
            "(actor.core.charisma * 1.5) + (actor.personality.extraversion * 0.5)",
            false,
            &schema(),
        )
        .unwrap();

    let mut mira = Character::new("Mira");
    mira.set("core", "charisma", 35.0);
    mira.set("personality", "extraversion", 10.0);

    let result = registry.evaluate("charm_attempt", &mira, None).unwrap();
    assert_eq!(result, Value::Number(57.5));
}

#[test]
fn target_formula_reads_both_entities() {
    let mut registry = FormulaRegistry::new();
    registry
        .register(
            "persuade",
            "actor.core.charisma + relationship(\"trust\") * 10 - target.personality.agreeableness",
            true,
            &schema(),
        )
        .unwrap();

    let mut mira = Character::new("Mira");
    mira.set("core", "charisma", 30.0);
    mira.affinities.insert(("Joss".into(), "trust".into()), 0.5);
    let mut joss = Character::new("Joss");
    joss.set("personality", "agreeableness", 5.0);

    let result = registry.evaluate("persuade", &mira, Some(&joss)).unwrap();
    assert_eq!(result, Value::Number(30.0));
}

#[test]
fn registering_target_formula_without_flag_fails_at_parse() {
    let mut registry = FormulaRegistry::new();
    let err = registry
        .register("spite", "grievance() > 1", false, &schema())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Parse {
            source: ParseError::TargetNotPermitted { .. },
            ..
        }
    ));
    assert!(registry.is_empty());
}

#[test]
fn evaluation_errors_carry_formula_name() {
    let mut registry = FormulaRegistry::new();
    registry
        .register("risky", "actor.dynamic.health / actor.core.strength", false, &schema())
        .unwrap();

    let mut mira = Character::new("Mira");
    mira.set("dynamic", "health", 40.0);
    mira.set("core", "strength", 0.0);

    let err = registry.evaluate("risky", &mira, None).unwrap_err();
    assert_eq!(err.formula(), "risky");
    assert!(matches!(
        err,
        Error::Eval {
            source: EvalError::DivisionByZero { .. },
            ..
        }
    ));
}

#[test]
fn mood_gate_combines_text_and_number_checks() {
    let mut registry = FormulaRegistry::new();
    registry
        .register(
            "confident",
            "actor.dynamic.emotional_state == \"joyful\" && actor.dynamic.health > 25",
            false,
            &schema(),
        )
        .unwrap();

    let mut mira = Character::new("Mira");
    mira.set("dynamic", "emotional_state", "joyful");
    mira.set("dynamic", "health", 40.0);
    assert_eq!(
        registry.evaluate("confident", &mira, None).unwrap(),
        Value::Bool(true)
    );

    mira.set("dynamic", "health", 10.0);
    assert_eq!(
        registry.evaluate("confident", &mira, None).unwrap(),
        Value::Bool(false)
    );
}
