//! Lexer for formula source text.
//!
//! Uses Logos for tokenization. Whitespace is insignificant outside string
//! literals; numeric literals are unsigned here (leading `-` is parsed as
//! prefix negation, which accepts the same source text).

use logos::{Logos, Span};
use thiserror::Error;

/// Token type for the formula language.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // === Literals ===
    /// Decimal numeric literal with optional fractional part.
    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    /// Single- or double-quoted string literal. Backslash escapes are
    /// limited to quotes and backslash; anything else is a lex error.
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unescape(lex.slice()))]
    Str(String),

    // === Identifiers ===
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // === Punctuation ===
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,

    // === Arithmetic operators ===
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    // === Comparison ===
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LessEq,
    #[token(">=")]
    GreaterEq,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,

    // === Logical ===
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(_) => write!(f, "number"),
            Token::Str(_) => write!(f, "string"),
            Token::Ident(name) => write!(f, "identifier '{}'", name),
            Token::ParenOpen => write!(f, "'('"),
            Token::ParenClose => write!(f, "')'"),
            Token::Comma => write!(f, "','"),
            Token::Dot => write!(f, "'.'"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::Slash => write!(f, "'/'"),
            Token::Percent => write!(f, "'%'"),
            Token::EqEq => write!(f, "'=='"),
            Token::NotEq => write!(f, "'!='"),
            Token::LessEq => write!(f, "'<='"),
            Token::GreaterEq => write!(f, "'>='"),
            Token::Less => write!(f, "'<'"),
            Token::Greater => write!(f, "'>'"),
            Token::AndAnd => write!(f, "'&&'"),
            Token::OrOr => write!(f, "'||'"),
            Token::Bang => write!(f, "'!'"),
        }
    }
}

/// Strip the surrounding quotes and process escapes.
///
/// Returns None for unknown escape sequences, which Logos reports as a
/// failed match over the whole literal.
fn unescape(quoted: &str) -> Option<String> {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('"') => out.push('"'),
                Some('\'') => out.push('\''),
                Some('\\') => out.push('\\'),
                _ => return None,
            }
        } else {
            out.push(ch);
        }
    }
    Some(out)
}

/// A token with its source byte span.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(token: T, span: Span) -> Self {
        Self { token, span }
    }
}

/// Error during lexing, carrying the byte offset of the offending input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unterminated string literal at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("invalid escape sequence in string literal at offset {offset}")]
    InvalidEscape { offset: usize },

    #[error("invalid character '{slice}' at offset {offset}")]
    InvalidCharacter { offset: usize, slice: String },
}

impl LexError {
    /// Byte offset of the offending input.
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnterminatedString { offset }
            | LexError::InvalidEscape { offset }
            | LexError::InvalidCharacter { offset, .. } => *offset,
        }
    }
}

/// Tokenize formula source into a vector of spanned tokens.
pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token>>, LexError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push(Spanned::new(token, lexer.span())),
            Err(()) => {
                let span = lexer.span();
                let slice = lexer.slice();
                let offset = span.start;
                let err = if slice.len() >= 2
                    && (slice.starts_with('"') && slice.ends_with('"')
                        || slice.starts_with('\'') && slice.ends_with('\''))
                {
                    // The literal matched but the escape callback rejected it.
                    LexError::InvalidEscape { offset }
                } else if slice.starts_with('"') || slice.starts_with('\'') {
                    LexError::UnterminatedString { offset }
                } else {
                    LexError::InvalidCharacter {
                        offset,
                        slice: slice.to_string(),
                    }
                };
                return Err(err);
            }
        }
    }

    Ok(tokens)
}
