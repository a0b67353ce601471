//! Keyschema – a schema-constrained secondary index over hierarchical keys.
//!
//! Keys like `prod:eu:web` are read as a path through a set of *dimensions*:
//! the first segment is a value of the first dimension, the second a value of
//! the second and so on. A schema registers the dimensions, in order, and the
//! values each of them permits. Queries name a subset of values per dimension
//! and are evaluated by scanning the keyspace, keeping the keys whose segments
//! fit, and reducing them with an operation (`get`, `sum`, `avg`, `min`,
//! `max`, `clr`, `inc`).
//!
//! ## Modules
//! * [`token`] – Tokenizer turning a JSON document into a flat token stream (grammar in `token.pest`).
//! * [`walker`] – Walks a token stream and feeds dimensions and values to a [`walker::DocumentHandler`].
//! * [`store`] – The [`store::Store`] primitives and the in-process [`store::MemoryStore`].
//! * [`persist`] – [`persist::SqliteStore`], a store kept in SQLite.
//! * [`schema`] – The persisted schema and the loader that fills it.
//! * [`query`] – Per-request queries in filter or full mode.
//! * [`matcher`] – Positional matching of keys against a query.
//! * [`aggregate`] – The aggregation state machine and [`aggregate::Reply`].
//! * [`engine`] – [`engine::Request`] dispatch over a store.
//! * [`interface`] – Thread-safe request submission with ids and timing.
//! * [`server`] – HTTP binding.
//! * [`config`] – [`config::Settings`] read from file and environment.
//!
//! ## Quick Start
//! ```
//! use keyschema::aggregate::{Operation, Reply};
//! use keyschema::engine::Engine;
//! use keyschema::store::{MemoryStore, Store};
//!
//! let mut engine = Engine::with_defaults(MemoryStore::new());
//! engine.load(r#"{"env": ["prod", "dev"], "region": ["us", "eu"]}"#).unwrap();
//! engine.store_mut().set("prod:us", "3").unwrap();
//! engine.store_mut().set("prod:eu", "4").unwrap();
//! engine.store_mut().set("dev:eu", "5").unwrap();
//!
//! let reply = engine.query(Operation::Sum, r#"{"env": ["prod"]}"#).unwrap();
//! assert_eq!(reply, Reply::Integer { value: 7 });
//! ```
//!
//! The binary (`src/main.rs`) serves the same operations over HTTP.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod interface;
pub mod matcher;
pub mod persist;
pub mod query;
pub mod schema;
pub mod server;
pub mod store;
pub mod token;
pub mod walker;

pub use aggregate::{Operation, Reply};
pub use engine::{Engine, Request};
pub use error::{KeyschemaError, Result};
