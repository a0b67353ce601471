//! Request dispatch.
//!
//! An [`Engine`] owns a [`Store`] and runs one [`Request`] at a time to
//! completion. Every request tokenizes its document first, so a malformed
//! document never touches the store.

use std::time::Instant;

use tracing::{debug, info, info_span, warn};

use crate::aggregate::{Aggregation, Operation, Reply};
use crate::config::{Namespace, Settings};
use crate::error::{KeyschemaError, Result};
use crate::matcher::{KeyMatcher, MatchMode};
use crate::query::{AssignmentBuilder, FilterBuilder, Query, QueryMode};
use crate::schema::{Dimension, SchemaLoader, SchemaStore};
use crate::store::Store;
use crate::token::tokenize;
use crate::walker::walk;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Replace the schema with the dimensions of `document`.
    Load { document: String },
    /// Remove the schema.
    Clean,
    Query { operation: Operation, document: String },
    /// Write the single values of `document` to the keys it names.
    Set { document: String },
}

impl Request {
    /// Build a request from a command name such as `SchemaGet`, `schemasum`
    /// or `min`.
    pub fn from_command(command: &str, document: Option<String>) -> Result<Self> {
        let lowered = command.to_ascii_lowercase();
        let name = lowered.strip_prefix("schema").unwrap_or(&lowered);
        let operation = match name {
            "clean" => {
                return match document {
                    None => Ok(Request::Clean),
                    Some(_) => Err(wrong_arity(command)),
                };
            }
            "load" => return Ok(Request::Load { document: document.ok_or_else(|| wrong_arity(command))? }),
            "set" => return Ok(Request::Set { document: document.ok_or_else(|| wrong_arity(command))? }),
            "get" => Operation::Get,
            "sum" => Operation::Sum,
            "avg" => Operation::Avg,
            "min" => Operation::Min,
            "max" => Operation::Max,
            "clr" => Operation::Clr,
            "inc" => Operation::Inc,
            _ => return Err(KeyschemaError::UnknownCommand(command.to_owned())),
        };
        let document = document.ok_or_else(|| wrong_arity(command))?;
        Ok(Request::Query { operation, document })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Request::Load { .. } => "load",
            Request::Clean => "clean",
            Request::Query { operation, .. } => operation.name(),
            Request::Set { .. } => "set",
        }
    }
}

fn wrong_arity(command: &str) -> KeyschemaError {
    KeyschemaError::WrongArity {
        command: command.to_owned(),
    }
}

// ------------- Engine -------------
pub struct Engine<S> {
    store: S,
    namespace: Namespace,
    matcher: KeyMatcher,
    max_tokens: usize,
}

impl<S: Store> Engine<S> {
    pub fn new(store: S, settings: &Settings) -> Self {
        Self {
            store,
            matcher: KeyMatcher::new(settings.namespace.delimiter.clone(), settings.depth_policy),
            namespace: settings.namespace.clone(),
            max_tokens: settings.max_tokens,
        }
    }
    pub fn with_defaults(store: S) -> Self {
        Self::new(store, &Settings::default())
    }
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }
    pub fn store(&self) -> &S {
        &self.store
    }
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
    pub fn into_store(self) -> S {
        self.store
    }

    pub fn execute(&mut self, request: &Request) -> Result<Reply> {
        let span = info_span!("request", command = request.name());
        let _entered = span.enter();
        let started = Instant::now();
        let outcome = match request {
            Request::Load { document } => self.load(document),
            Request::Clean => self.clean(),
            Request::Query { operation, document } => self.query(*operation, document),
            Request::Set { document } => self.set(document),
        };
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        match &outcome {
            Ok(_) => info!(ms = elapsed_ms, "request complete"),
            Err(e) => warn!(error = %e, kind = ?e.kind(), ms = elapsed_ms, "request aborted"),
        }
        outcome
    }

    /// The document is tokenized before the old schema is removed, so a
    /// malformed document leaves the schema as it was.
    pub fn load(&mut self, document: &str) -> Result<Reply> {
        let stream = tokenize(document, self.max_tokens)?;
        let mut schema = SchemaStore::new(&mut self.store, &self.namespace);
        let removed = schema.clear()?;
        let mut loader = SchemaLoader::new(&mut schema);
        let events = walk(&stream, &mut loader)?;
        let (inserted, already_present) = loader.counts();
        debug!(removed, events, inserted, already_present, "schema loaded");
        Ok(Reply::Ok)
    }

    pub fn clean(&mut self) -> Result<Reply> {
        SchemaStore::new(&mut self.store, &self.namespace).clear()?;
        Ok(Reply::Ok)
    }

    pub fn query(&mut self, operation: Operation, document: &str) -> Result<Reply> {
        let stream = tokenize(document, self.max_tokens)?;
        let query = {
            let schema = SchemaStore::new(&mut self.store, &self.namespace);
            let mut query = Query::allocate(&schema, QueryMode::Filter)?;
            walk(&stream, &mut FilterBuilder::new(&schema, &mut query))?;
            query
        };
        let keys = self.store.keys()?;
        let mut aggregation = Aggregation::new(operation);
        for key in &keys {
            if self.namespace.owns(key) || !self.matcher.matches(key, &query, MatchMode::Wildcard) {
                continue;
            }
            aggregation.feed(&mut self.store, key)?;
        }
        debug!(
            scanned = keys.len(),
            matched = aggregation.match_count(),
            "scan complete"
        );
        aggregation.finish()
    }

    /// Every key of `document` has to be a full key whose segments are all
    /// permitted values, and every value has to be a single scalar.
    pub fn set(&mut self, document: &str) -> Result<Reply> {
        let stream = tokenize(document, self.max_tokens)?;
        let query = {
            let schema = SchemaStore::new(&mut self.store, &self.namespace);
            Query::allocate(&schema, QueryMode::Full)?
        };
        let mut builder = AssignmentBuilder::new(&mut self.store, &self.namespace, &query, &self.matcher);
        walk(&stream, &mut builder)?;
        debug!(assigned = builder.assigned(), "values assigned");
        Ok(Reply::ValuesSet)
    }

    /// The registered dimensions in ordinal order, with their permitted values.
    pub fn dimensions(&mut self) -> Result<Vec<Dimension>> {
        SchemaStore::new(&mut self.store, &self.namespace).dimensions()
    }
}
