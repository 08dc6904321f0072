//! Recursive-descent parser for formula expressions.
//!
//! Precedence, lowest to highest:
//!
//! ```text
//! ||
//! &&
//! == !=
//! < <= > >=
//! + -
//! * / %
//! prefix - !
//! literals, paths, calls, ( )
//! ```
//!
//! All binary tiers associate left. The parser validates semantics as it
//! goes: attribute paths are checked against the schema, calls against the
//! query allow-list, and `target` references against the formula's declared
//! `requires_target` flag. A formula that parses is therefore safe to
//! evaluate without structural re-checks.

use crate::ast::{BinaryOp, Expr, Subject, UnaryOp};
use crate::lexer::{Spanned, Token};
use crate::query;
use crate::schema::AttributeSchema;
use thiserror::Error;

/// Maximum nesting depth for parenthesized and prefix sub-expressions.
/// Deeper input is rejected to bound the parser's recursion. Binary
/// operator chains are parsed iteratively and do not count toward it.
pub const MAX_DEPTH: usize = 64;

/// Parse error, carrying the byte offset of the offending token where one
/// exists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected {expected}, found {found} at offset {offset}")]
    UnexpectedToken {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("unexpected end of formula")]
    UnexpectedEof,

    #[error("attribute path has too many segments at offset {offset}; expected subject.group.attribute")]
    PathTooDeep { offset: usize },

    #[error("unknown attribute '{subject}.{group}.{attribute}' at offset {offset}")]
    UnknownAttribute {
        subject: String,
        group: String,
        attribute: String,
        offset: usize,
    },

    #[error("'target' is not available in a formula that does not take a target (offset {offset})")]
    TargetNotPermitted { offset: usize },

    #[error("unresolved identifier '{name}' at offset {offset}; expected 'actor', 'target', or a query call")]
    UnresolvedIdentifier { name: String, offset: usize },

    #[error("unknown query '{name}' at offset {offset}")]
    UnknownFunction { name: String, offset: usize },

    #[error("query '{name}' takes {expected} argument(s), found {found} at offset {offset}")]
    WrongArgCount {
        name: String,
        expected: usize,
        found: usize,
        offset: usize,
    },

    #[error("unexpected trailing input at offset {offset}")]
    TrailingInput { offset: usize },

    #[error("formula is nested deeper than the limit of {limit}")]
    TooDeep { limit: usize },
}

impl ParseError {
    /// Byte offset of the offending input, where one exists.
    pub fn offset(&self) -> Option<usize> {
        match self {
            ParseError::UnexpectedToken { offset, .. }
            | ParseError::PathTooDeep { offset }
            | ParseError::UnknownAttribute { offset, .. }
            | ParseError::TargetNotPermitted { offset }
            | ParseError::UnresolvedIdentifier { offset, .. }
            | ParseError::UnknownFunction { offset, .. }
            | ParseError::WrongArgCount { offset, .. }
            | ParseError::TrailingInput { offset } => Some(*offset),
            ParseError::UnexpectedEof | ParseError::TooDeep { .. } => None,
        }
    }
}

/// Parse a token stream into a validated expression.
///
/// `requires_target` is the formula's declared flag; `target` paths and
/// target-directed queries are rejected when it is false.
pub fn parse(
    tokens: &[Spanned<Token>],
    schema: &AttributeSchema,
    requires_target: bool,
) -> Result<Expr, ParseError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        schema,
        requires_target,
        depth: 0,
    };
    let expr = parser.expression()?;
    if let Some(extra) = parser.peek() {
        return Err(ParseError::TrailingInput {
            offset: extra.span.start,
        });
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Spanned<Token>],
    pos: usize,
    schema: &'a AttributeSchema,
    requires_target: bool,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Spanned<Token>> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Spanned<Token>> {
        let spanned = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(spanned)
    }

    /// Offset to blame when the input ends early: one past the last token.
    fn current_offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|s| s.span.start)
            .or_else(|| self.tokens.last().map(|s| s.span.end))
            .unwrap_or(0)
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), ParseError> {
        match self.advance() {
            Some(spanned) if spanned.token == *expected => Ok(()),
            Some(spanned) => Err(ParseError::UnexpectedToken {
                expected: what.to_string(),
                found: spanned.token.to_string(),
                offset: spanned.span.start,
            }),
            None => Err(ParseError::UnexpectedEof),
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::TooDeep { limit: MAX_DEPTH });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.enter()?;
        let expr = self.or_expr();
        self.leave();
        expr
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and_expr()?;
        while matches!(self.peek(), Some(s) if s.token == Token::OrOr) {
            self.advance();
            let right = self.and_expr()?;
            left = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.equality()?;
        while matches!(self.peek(), Some(s) if s.token == Token::AndAnd) {
            self.advance();
            let right = self.equality()?;
            left = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.relational()?;
        loop {
            let op = match self.peek().map(|s| &s.token) {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.relational()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek().map(|s| &s.token) {
                Some(Token::Less) => BinaryOp::Lt,
                Some(Token::LessEq) => BinaryOp::Le,
                Some(Token::Greater) => BinaryOp::Gt,
                Some(Token::GreaterEq) => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.additive()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek().map(|s| &s.token) {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek().map(|s| &s.token) {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek().map(|s| &s.token) {
            Some(Token::Minus) => Some(UnaryOp::Neg),
            Some(Token::Bang) => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            self.enter()?;
            let operand = self.unary()?;
            self.leave();
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let spanned = match self.advance() {
            Some(s) => s.clone(),
            None => return Err(ParseError::UnexpectedEof),
        };
        match spanned.token {
            Token::Number(value) => Ok(Expr::Number(value)),
            Token::Str(text) => Ok(Expr::Text(text)),
            Token::ParenOpen => {
                let inner = self.expression()?;
                self.expect(&Token::ParenClose, "')'")?;
                Ok(Expr::Grouping(Box::new(inner)))
            }
            Token::Ident(name) => self.identifier(name, spanned.span.start),
            other => Err(ParseError::UnexpectedToken {
                expected: "a literal, attribute path, query call, or '('".to_string(),
                found: other.to_string(),
                offset: spanned.span.start,
            }),
        }
    }

    /// Resolve an identifier: subject path, query call, or error.
    fn identifier(&mut self, name: String, offset: usize) -> Result<Expr, ParseError> {
        let subject = match name.as_str() {
            "actor" => Some(Subject::Actor),
            "target" => Some(Subject::Target),
            _ => None,
        };
        if let Some(subject) = subject {
            if matches!(self.peek(), Some(s) if s.token == Token::Dot) {
                return self.attribute_path(subject, offset);
            }
            // A bare subject with no path is not a value.
            return Err(ParseError::UnexpectedToken {
                expected: "'.' after subject".to_string(),
                found: self
                    .peek()
                    .map(|s| s.token.to_string())
                    .unwrap_or_else(|| "end of formula".to_string()),
                offset: self.current_offset(),
            });
        }
        if matches!(self.peek(), Some(s) if s.token == Token::ParenOpen) {
            return self.call(name, offset);
        }
        Err(ParseError::UnresolvedIdentifier { name, offset })
    }

    /// Parse `.group.attribute` after a subject, validating against the
    /// schema. Target paths are rejected first so a formula without a
    /// target gets the capability error rather than an attribute error.
    fn attribute_path(&mut self, subject: Subject, offset: usize) -> Result<Expr, ParseError> {
        self.expect(&Token::Dot, "'.'")?;
        let group = self.path_segment()?;
        self.expect(&Token::Dot, "'.'")?;
        let attribute = self.path_segment()?;

        if matches!(self.peek(), Some(s) if s.token == Token::Dot) {
            let dot = self.peek().map(|s| s.span.start).unwrap_or(offset);
            return Err(ParseError::PathTooDeep { offset: dot });
        }

        if subject == Subject::Target && !self.requires_target {
            return Err(ParseError::TargetNotPermitted { offset });
        }

        if self.schema.lookup(&group, &attribute).is_none() {
            return Err(ParseError::UnknownAttribute {
                subject: subject.to_string(),
                group,
                attribute,
                offset,
            });
        }

        Ok(Expr::Attribute {
            subject,
            group,
            attribute,
        })
    }

    fn path_segment(&mut self) -> Result<String, ParseError> {
        match self.advance() {
            Some(spanned) => match &spanned.token {
                Token::Ident(name) => Ok(name.clone()),
                other => Err(ParseError::UnexpectedToken {
                    expected: "path segment".to_string(),
                    found: other.to_string(),
                    offset: spanned.span.start,
                }),
            },
            None => Err(ParseError::UnexpectedEof),
        }
    }

    /// Parse `name(args...)` against the query allow-list.
    fn call(&mut self, name: String, offset: usize) -> Result<Expr, ParseError> {
        let desc = match query::get(&name) {
            Some(desc) => desc,
            None => return Err(ParseError::UnknownFunction { name, offset }),
        };
        if desc.requires_target && !self.requires_target {
            return Err(ParseError::TargetNotPermitted { offset });
        }

        self.expect(&Token::ParenOpen, "'('")?;
        let mut args = Vec::new();
        if !matches!(self.peek(), Some(s) if s.token == Token::ParenClose) {
            loop {
                args.push(self.expression()?);
                match self.peek().map(|s| &s.token) {
                    Some(Token::Comma) => {
                        self.advance();
                    }
                    _ => break,
                }
            }
        }
        self.expect(&Token::ParenClose, "')'")?;

        if args.len() != desc.arity {
            return Err(ParseError::WrongArgCount {
                name,
                expected: desc.arity,
                found: args.len(),
                offset,
            });
        }

        Ok(Expr::Call { name, args })
    }
}
