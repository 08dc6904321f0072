//! AST for parsed formulas.
//!
//! The tree is fully validated at parse time: every attribute path exists in
//! the schema the parser was given, every call names an allow-listed query
//! with the right arity, and `target` only appears in formulas declared to
//! take one. Evaluation therefore never has to re-check structure, only
//! runtime types and availability.

use std::fmt;

/// Which entity an attribute path reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Actor,
    Target,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Actor => write!(f, "actor"),
            Subject::Target => write!(f, "target"),
        }
    }
}

/// Binary operators, grouped by precedence tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// Source-level symbol, used in error messages.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A parsed formula expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),
    /// String literal.
    Text(String),
    /// Validated attribute read: `actor.group.attribute` or
    /// `target.group.attribute`.
    Attribute {
        subject: Subject,
        group: String,
        attribute: String,
    },
    /// Binary operation.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Prefix operation.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Allow-listed query call, e.g. `relationship("trust")`.
    Call { name: String, args: Vec<Expr> },
    /// Parenthesized sub-expression, kept so the tree round-trips the
    /// source shape.
    Grouping(Box<Expr>),
}
