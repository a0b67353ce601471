//! Flat JSON tokenization of request documents.
//!
//! A document is lexed once per request into a `Vec<Token>` in document order,
//! where containers precede their children and carry a child count. This is
//! the only shape the walker needs, so no tree is ever built. String tokens
//! span the raw text between the quotes; escapes are not decoded.

use pest::Parser;
use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::error::{KeyschemaError, Result};

#[derive(Parser)]
#[grammar = "token.pest"]
struct DocumentLexer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Object,
    Array,
    String,
    /// Numbers, booleans and null.
    Primitive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    /// Pairs of an object, elements of an array, 1 for an object key, 0 otherwise.
    pub size: usize,
}

impl Token {
    fn new(kind: TokenKind, start: usize, end: usize, size: usize) -> Self {
        Self { kind, start, end, size }
    }
}

#[derive(Debug)]
pub struct TokenStream<'i> {
    input: &'i str,
    tokens: Vec<Token>,
}

impl<'i> TokenStream<'i> {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }
    pub fn text(&self, token: &Token) -> &'i str {
        &self.input[token.start..token.end]
    }
    pub fn len(&self) -> usize {
        self.tokens.len()
    }
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Lex `input` into at most `limit` tokens.
pub fn tokenize(input: &str, limit: usize) -> Result<TokenStream<'_>> {
    let pairs = DocumentLexer::parse(Rule::document, input).map_err(|e| {
        let (line, col) = match e.line_col {
            LineColLocation::Pos((l, c)) | LineColLocation::Span((l, c), _) => (l, c),
        };
        KeyschemaError::Parse {
            message: e.variant.message().to_string(),
            line: Some(line),
            col: Some(col),
        }
    })?;
    let mut tokens = Vec::new();
    for pair in pairs {
        if pair.as_rule() != Rule::EOI {
            flatten(pair, &mut tokens, limit)?;
        }
    }
    Ok(TokenStream { input, tokens })
}

fn push(tokens: &mut Vec<Token>, token: Token, limit: usize) -> Result<usize> {
    if tokens.len() >= limit {
        return Err(KeyschemaError::TokenLimit { limit });
    }
    tokens.push(token);
    Ok(tokens.len() - 1)
}

fn flatten(pair: Pair<'_, Rule>, tokens: &mut Vec<Token>, limit: usize) -> Result<()> {
    let span = pair.as_span();
    match pair.as_rule() {
        Rule::object => {
            let at = push(tokens, Token::new(TokenKind::Object, span.start(), span.end(), 0), limit)?;
            let mut size = 0;
            for member in pair.into_inner() {
                let mut inner = member.into_inner();
                if let (Some(key), Some(value)) = (inner.next(), inner.next()) {
                    string_token(key, 1, tokens, limit)?;
                    flatten(value, tokens, limit)?;
                    size += 1;
                }
            }
            tokens[at].size = size;
        }
        Rule::array => {
            let at = push(tokens, Token::new(TokenKind::Array, span.start(), span.end(), 0), limit)?;
            let mut size = 0;
            for element in pair.into_inner() {
                flatten(element, tokens, limit)?;
                size += 1;
            }
            tokens[at].size = size;
        }
        Rule::string => string_token(pair, 0, tokens, limit)?,
        Rule::number | Rule::boolean | Rule::null => {
            push(tokens, Token::new(TokenKind::Primitive, span.start(), span.end(), 0), limit)?;
        }
        rule => {
            return Err(KeyschemaError::InvalidInput(format!("unexpected {rule:?}")));
        }
    }
    Ok(())
}

fn string_token(pair: Pair<'_, Rule>, size: usize, tokens: &mut Vec<Token>, limit: usize) -> Result<()> {
    // the span of `inner` excludes the quotes
    let span = match pair.into_inner().next() {
        Some(inner) => inner.as_span(),
        None => return Err(KeyschemaError::InvalidInput("string without content".into())),
    };
    push(tokens, Token::new(TokenKind::String, span.start(), span.end(), size), limit)?;
    Ok(())
}
