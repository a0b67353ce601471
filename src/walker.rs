//! Walking a tokenized request document.
//!
//! Every request document has the same shape, one object whose keys name
//! dimensions (or, for assignments, full keys) and whose values are either a
//! single scalar or a flat array of scalars:
//!
//! ```text
//! { "env": ["prod", "dev"], "region": "eu" }
//! ```
//!
//! [`Walk`] turns a [`TokenStream`] into a sequence of [`Event`]s carrying the
//! ordinals, and [`walk`] feeds those events into a [`DocumentHandler`]. The
//! walk stops at the first failing event or handler call. Side effects a
//! handler already committed for earlier events are not rolled back.

use tracing::trace;

use crate::error::{KeyschemaError, Result};
use crate::token::{Token, TokenKind, TokenStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'t> {
    Dimension {
        key: &'t Token,
        ordinal: usize,
    },
    Value {
        key: &'t Token,
        value: &'t Token,
        ordinal: usize,
        single: bool,
    },
}

/// Receives the dimensions and values of a walked document, as text.
pub trait DocumentHandler {
    fn on_dimension(&mut self, key: &str, ordinal: usize) -> Result<()>;
    fn on_value(&mut self, key: &str, value: &str, ordinal: usize, single: bool) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
enum Cursor {
    Start,
    Key { remaining: usize },
    Paired { key: usize, remaining: usize },
    Values { key: usize, left: usize, ordinal: usize, single: bool, remaining: usize },
    Done,
}

pub struct Walk<'s, 'i> {
    stream: &'s TokenStream<'i>,
    position: usize,
    dimension: usize,
    cursor: Cursor,
}

impl<'s, 'i> Walk<'s, 'i> {
    pub fn new(stream: &'s TokenStream<'i>) -> Self {
        Self {
            stream,
            position: 0,
            dimension: 0,
            cursor: Cursor::Start,
        }
    }

    fn fail(&mut self, message: impl Into<String>) -> Option<Result<Event<'s>>> {
        self.cursor = Cursor::Done;
        Some(Err(KeyschemaError::InvalidInput(message.into())))
    }

    fn token(&self, index: usize) -> Option<&'s Token> {
        self.stream.get(index)
    }
}

impl<'s, 'i> Iterator for Walk<'s, 'i> {
    type Item = Result<Event<'s>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.cursor {
                Cursor::Start => match self.token(0) {
                    Some(root) if root.kind == TokenKind::Object => {
                        self.position = 1;
                        self.cursor = Cursor::Key { remaining: root.size };
                    }
                    _ => return self.fail("expected an object"),
                },
                Cursor::Key { remaining: 0 } => {
                    self.cursor = Cursor::Done;
                }
                Cursor::Key { remaining } => {
                    let at = self.position;
                    let key = match self.token(at) {
                        Some(key) if key.kind == TokenKind::String => key,
                        _ => return self.fail("expected a string key"),
                    };
                    self.position += 1;
                    let ordinal = self.dimension;
                    self.dimension += 1;
                    self.cursor = Cursor::Paired { key: at, remaining: remaining - 1 };
                    return Some(Ok(Event::Dimension { key, ordinal }));
                }
                Cursor::Paired { key, remaining } => {
                    let (left, single) = match self.token(self.position) {
                        Some(t) if t.kind == TokenKind::Array => {
                            // skip the array opener
                            self.position += 1;
                            (t.size, false)
                        }
                        Some(t) if matches!(t.kind, TokenKind::String | TokenKind::Primitive) => (1, true),
                        _ => return self.fail("expected an array, a string or a primitive value"),
                    };
                    self.cursor = Cursor::Values { key, left, ordinal: 0, single, remaining };
                }
                Cursor::Values { remaining, left: 0, .. } => {
                    self.cursor = Cursor::Key { remaining };
                }
                Cursor::Values { key, left, ordinal, single, remaining } => {
                    let value = match self.token(self.position) {
                        Some(t) if matches!(t.kind, TokenKind::String | TokenKind::Primitive) => t,
                        _ => return self.fail("values must be strings or primitives"),
                    };
                    let key_token = match self.token(key) {
                        Some(token) => token,
                        None => return self.fail("dangling key"),
                    };
                    self.position += 1;
                    self.cursor = Cursor::Values { key, left: left - 1, ordinal: ordinal + 1, single, remaining };
                    return Some(Ok(Event::Value { key: key_token, value, ordinal, single }));
                }
                Cursor::Done => return None,
            }
        }
    }
}

/// Drive `handler` over every event of `stream`, returning the number of
/// dimensions visited.
pub fn walk<H: DocumentHandler + ?Sized>(stream: &TokenStream<'_>, handler: &mut H) -> Result<usize> {
    let mut dimensions = 0;
    for event in Walk::new(stream) {
        match event? {
            Event::Dimension { key, ordinal } => {
                trace!(key = stream.text(key), ordinal, "dimension");
                handler.on_dimension(stream.text(key), ordinal)?;
                dimensions += 1;
            }
            Event::Value { key, value, ordinal, single } => {
                trace!(key = stream.text(key), value = stream.text(value), ordinal, single, "value");
                handler.on_value(stream.text(key), stream.text(value), ordinal, single)?;
            }
        }
    }
    Ok(dimensions)
}
