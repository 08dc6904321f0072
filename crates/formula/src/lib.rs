//! AnimaLoom Formula Engine
//!
//! A small, sandboxed expression language for designer-authored formulas
//! over entity attributes, e.g.:
//!
//! ```text
//! (actor.core.charisma * 1.5) + (actor.personality.extraversion * 0.5)
//! ```
//!
//! Formula source text is tokenized, parsed against an [`AttributeSchema`]
//! (so malformed or unknown attribute paths are rejected at registration,
//! never at evaluation), stored as an AST in a [`FormulaRegistry`], and
//! evaluated repeatedly against [`EntityView`] handles for the actor and an
//! optional target. Formulas cannot execute host code: the grammar has no
//! loops, no user-defined functions, and calls are limited to a fixed
//! allow-list of named queries.
//!
//! Pipeline: source text → [`lexer::tokenize`] → [`parser::parse`] → AST in
//! [`FormulaRegistry`] (once) → [`eval::evaluate`] per interaction.

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod query;
pub mod registry;
pub mod schema;
pub mod value;
pub mod view;

pub use ast::{BinaryOp, Expr, Subject, UnaryOp};
pub use error::{Error, Result};
pub use eval::{evaluate, EvalError};
pub use lexer::{tokenize, LexError, Spanned, Token};
pub use parser::{parse, ParseError, MAX_DEPTH};
pub use registry::{Formula, FormulaRegistry};
pub use schema::{AttributeSchema, ValueType};
pub use value::Value;
pub use view::{EntityView, QueryError};
