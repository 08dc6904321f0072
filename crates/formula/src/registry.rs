//! Formula registry: parse once, evaluate many.
//!
//! Registration runs the full lex and parse pipeline and stores the AST;
//! evaluation walks the stored tree. A failed registration never disturbs
//! the registry, so re-registering a formula with bad source leaves the
//! previous good version in place.

use crate::ast::Expr;
use crate::error::{Error, Result};
use crate::eval;
use crate::lexer;
use crate::parser;
use crate::schema::AttributeSchema;
use crate::value::Value;
use crate::view::EntityView;
use indexmap::IndexMap;
use tracing::{debug, trace};

/// A registered formula: source text plus its validated AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    name: String,
    source: String,
    requires_target: bool,
    ast: Expr,
}

impl Formula {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn requires_target(&self) -> bool {
        self.requires_target
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }
}

/// Named collection of compiled formulas.
///
/// Iteration order follows registration order; re-registering a name keeps
/// its original slot.
#[derive(Debug, Clone, Default)]
pub struct FormulaRegistry {
    formulas: IndexMap<String, Formula>,
}

impl FormulaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and store a formula. On any lex or parse error the registry
    /// is left untouched and the error carries the formula's name.
    pub fn register(
        &mut self,
        name: &str,
        source: &str,
        requires_target: bool,
        schema: &AttributeSchema,
    ) -> Result<()> {
        let tokens = lexer::tokenize(source).map_err(|source| Error::Lex {
            formula: name.to_string(),
            source,
        })?;
        let ast = parser::parse(&tokens, schema, requires_target).map_err(|source| {
            Error::Parse {
                formula: name.to_string(),
                source,
            }
        })?;

        debug!(formula = name, requires_target, "formula registered");
        self.formulas.insert(
            name.to_string(),
            Formula {
                name: name.to_string(),
                source: source.to_string(),
                requires_target,
                ast,
            },
        );
        Ok(())
    }

    /// Evaluate a registered formula by name.
    ///
    /// `target` must be supplied when the formula was registered with
    /// `requires_target`; the evaluator reports [`EvalError::MissingTarget`]
    /// otherwise.
    ///
    /// [`EvalError::MissingTarget`]: crate::eval::EvalError::MissingTarget
    pub fn evaluate(
        &self,
        name: &str,
        actor: &dyn EntityView,
        target: Option<&dyn EntityView>,
    ) -> Result<Value> {
        let formula = self
            .formulas
            .get(name)
            .ok_or_else(|| Error::UnknownFormula(name.to_string()))?;
        if formula.requires_target && target.is_none() {
            return Err(Error::Eval {
                formula: name.to_string(),
                source: crate::eval::EvalError::MissingTarget,
            });
        }
        trace!(formula = name, actor = actor.name(), "evaluating formula");
        eval::evaluate(&formula.ast, actor, target).map_err(|source| Error::Eval {
            formula: name.to_string(),
            source,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Formula> {
        self.formulas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formulas.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.formulas.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        debug!(count = self.formulas.len(), "clearing formula registry");
        self.formulas.clear();
    }
}
