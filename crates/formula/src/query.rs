//! The query allow-list.
//!
//! Calls in formula source are limited to this fixed table. The parser
//! rejects unknown names and wrong arities; the evaluator uses the
//! descriptor to decide whether to thread the target's name through as an
//! implicit argument.

/// Static description of one callable query.
#[derive(Debug, Clone, Copy)]
pub struct QueryDescriptor {
    /// Name as written in formula source.
    pub name: &'static str,
    /// Human-readable signature for docs and error listings.
    pub signature: &'static str,
    /// One-line description.
    pub doc: &'static str,
    /// Number of explicit arguments in formula source.
    pub arity: usize,
    /// Whether the query is directed at the target. If set, the evaluator
    /// prepends the target's name to the argument list and the query is
    /// only legal in formulas that take a target.
    pub requires_target: bool,
}

/// Every query a formula may call.
pub const QUERIES: &[QueryDescriptor] = &[
    QueryDescriptor {
        name: "relationship",
        signature: "relationship(kind: text) -> number",
        doc: "actor's affinity score of the given kind toward the target",
        arity: 1,
        requires_target: true,
    },
    QueryDescriptor {
        name: "grievance",
        signature: "grievance() -> number",
        doc: "actor's accumulated grievance toward the target",
        arity: 0,
        requires_target: true,
    },
];

/// Look up a query descriptor by name.
pub fn get(name: &str) -> Option<&'static QueryDescriptor> {
    QUERIES.iter().find(|desc| desc.name == name)
}
