//! Formula-facing view over one eidolon.
//!
//! Number and Text attributes map straight to formula values; List and Map
//! tiers are deliberately opaque to formulas and only reachable through
//! queries.

use crate::eidolon::{AttributeValue, Eidolon};
use animaloom_formula::{EntityView, QueryError, Value};

/// Borrowed [`EntityView`] over an [`Eidolon`], valid for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EidolonView<'a> {
    eidolon: &'a Eidolon,
}

impl<'a> EidolonView<'a> {
    pub fn new(eidolon: &'a Eidolon) -> Self {
        Self { eidolon }
    }
}

impl EntityView for EidolonView<'_> {
    fn name(&self) -> &str {
        self.eidolon.name()
    }

    fn get(&self, group: &str, attribute: &str) -> Option<Value> {
        match self.eidolon.attribute(group, attribute)? {
            AttributeValue::Number(v) => Some(Value::Number(*v)),
            AttributeValue::Text(s) => Some(Value::Text(s.clone())),
            AttributeValue::List(_) | AttributeValue::Map(_) => None,
        }
    }

    fn query(&self, name: &str, args: &[Value]) -> Result<Value, QueryError> {
        match name {
            "relationship" => {
                let other = text_arg(name, args, 0)?;
                let kind = text_arg(name, args, 1)?;
                Ok(Value::Number(self.eidolon.affinity(other, kind)))
            }
            "grievance" => {
                let other = text_arg(name, args, 0)?;
                Ok(Value::Number(self.eidolon.grievance(other)))
            }
            other => Err(QueryError::new(format!("unhandled query '{other}'"))),
        }
    }
}

fn text_arg<'a>(query: &str, args: &'a [Value], index: usize) -> Result<&'a str, QueryError> {
    args.get(index)
        .and_then(Value::as_text)
        .ok_or_else(|| QueryError::new(format!("query '{query}' expects a text argument")))
}
