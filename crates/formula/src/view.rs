//! Capability surface the evaluator reads through.
//!
//! Formulas never see whole entities. The host hands the evaluator one
//! [`EntityView`] per role (actor, and target where the formula takes one),
//! and the view decides which attributes and queries it exposes. Anything
//! the view does not answer simply evaluates to an error, so a formula's
//! reach is bounded by the view, not by the entity model.

use crate::value::Value;
use thiserror::Error;

/// Failure reported by an [`EntityView::query`] implementation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct QueryError(pub String);

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Read-only handle to an entity, as seen from inside a formula.
pub trait EntityView {
    /// Display name of the entity, used as the implicit first argument to
    /// target-directed queries.
    fn name(&self) -> &str;

    /// Read one attribute. `None` means the attribute is not available on
    /// this entity even though the schema declares it.
    fn get(&self, group: &str, attribute: &str) -> Option<Value>;

    /// Answer an allow-listed query. The dispatcher has already checked the
    /// name and arity against the query table.
    fn query(&self, name: &str, args: &[Value]) -> Result<Value, QueryError>;
}
