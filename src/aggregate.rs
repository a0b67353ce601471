use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{KeyschemaError, Result};
use crate::store::Store;

/// Reply text used when a filter selects nothing.
pub const NO_KEYS_MATCHED: &str = "no keys matched the given filter";

/// What a query-class request does with every matched key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Get,
    Sum,
    Avg,
    Min,
    Max,
    Clr,
    Inc,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Sum => "sum",
            Operation::Avg => "avg",
            Operation::Min => "min",
            Operation::Max => "max",
            Operation::Clr => "clr",
            Operation::Inc => "inc",
        }
    }
    fn is_numeric(&self) -> bool {
        matches!(self, Operation::Sum | Operation::Avg | Operation::Min | Operation::Max)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Mid,
    Done,
    Err,
}

// ------------- Reply -------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    Keys { keys: Vec<String> },
    NoKeysMatched,
    Integer { value: i64 },
    Ok,
    ValuesSet,
}

impl Reply {
    /// The keys of a `get`, empty for every other reply.
    pub fn keys(&self) -> &[String] {
        match self {
            Reply::Keys { keys } => keys,
            _ => &[],
        }
    }
    pub fn integer(&self) -> Option<i64> {
        match self {
            Reply::Integer { value } => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Keys { keys } => {
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, key)?;
                }
                Ok(())
            }
            Reply::NoKeysMatched => f.write_str(NO_KEYS_MATCHED),
            Reply::Integer { value } => write!(f, "(integer) {value}"),
            Reply::Ok => f.write_str("OK"),
            Reply::ValuesSet => f.write_str("schema values loaded"),
        }
    }
}

// ------------- Aggregation -------------
/// Reduces the keys of one scan to a [`Reply`].
///
/// The first matched key moves the aggregation from `Init` to `Mid`; for
/// `min` and `max` that key also seeds the running value. Any failure in the
/// store moves it to `Err`, after which nothing more is fed.
#[derive(Debug)]
pub struct Aggregation {
    operation: Operation,
    stage: Stage,
    aggregate: f64,
    keys: Vec<String>,
    match_count: usize,
}

impl Aggregation {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            stage: Stage::Init,
            aggregate: 0.0,
            keys: Vec::new(),
            match_count: 0,
        }
    }
    pub fn operation(&self) -> Operation {
        self.operation
    }
    pub fn stage(&self) -> Stage {
        self.stage
    }
    pub fn match_count(&self) -> usize {
        self.match_count
    }

    pub fn feed<S: Store + ?Sized>(&mut self, store: &mut S, key: &str) -> Result<()> {
        match self.stage {
            Stage::Init | Stage::Mid => {}
            Stage::Done | Stage::Err => {
                return Err(KeyschemaError::InvalidInput(format!(
                    "aggregation over '{key}' after it ended"
                )));
            }
        }
        let outcome = self.step(store, key);
        if outcome.is_err() {
            self.stage = Stage::Err;
        }
        outcome
    }

    fn step<S: Store + ?Sized>(&mut self, store: &mut S, key: &str) -> Result<()> {
        let value = if self.operation.is_numeric() {
            Some(numeric(store, key)?)
        } else {
            None
        };
        if self.stage == Stage::Init {
            match (self.operation, value) {
                (Operation::Min | Operation::Max, Some(seed)) => self.aggregate = seed,
                (Operation::Sum | Operation::Avg, _) => self.aggregate = 0.0,
                _ => {}
            }
            self.stage = Stage::Mid;
        }
        match (self.operation, value) {
            (Operation::Get, _) => self.keys.push(key.to_owned()),
            (Operation::Sum | Operation::Avg, Some(v)) => self.aggregate += v,
            (Operation::Min, Some(v)) if v < self.aggregate => self.aggregate = v,
            (Operation::Max, Some(v)) if v > self.aggregate => self.aggregate = v,
            (Operation::Clr, _) => {
                store.delete(key)?;
            }
            (Operation::Inc, _) => {
                store.increment(key)?;
            }
            _ => {}
        }
        self.match_count += 1;
        trace!(key, operation = %self.operation, count = self.match_count, "key aggregated");
        Ok(())
    }

    pub fn finish(&mut self) -> Result<Reply> {
        if self.stage == Stage::Err {
            return Err(KeyschemaError::Store(format!(
                "{} aggregation was aborted",
                self.operation
            )));
        }
        self.stage = Stage::Done;
        let empty = self.match_count == 0;
        Ok(match self.operation {
            Operation::Get if empty => Reply::NoKeysMatched,
            Operation::Get => Reply::Keys {
                keys: std::mem::take(&mut self.keys),
            },
            Operation::Sum => Reply::Integer {
                value: self.aggregate as i64,
            },
            Operation::Min | Operation::Max | Operation::Avg if empty => Reply::NoKeysMatched,
            Operation::Min | Operation::Max => Reply::Integer {
                value: self.aggregate as i64,
            },
            Operation::Avg => Reply::Integer {
                value: (self.aggregate / self.match_count as f64) as i64,
            },
            Operation::Clr | Operation::Inc => Reply::Ok,
        })
    }
}

fn numeric<S: Store + ?Sized>(store: &S, key: &str) -> Result<f64> {
    let value = store
        .get(key)?
        .ok_or_else(|| KeyschemaError::MissingKey { key: key.to_owned() })?;
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| KeyschemaError::NotNumeric {
            key: key.to_owned(),
            value,
        })
}
