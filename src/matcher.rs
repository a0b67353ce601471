//! Matching hierarchical keys against a [`Query`].
//!
//! A key such as `prod:eu:web` is split on the configured delimiter and its
//! segments are compared positionally with the query's dimensions: the first
//! segment with dimension 0, the second with dimension 1 and so on. Empty
//! segments are skipped, so `prod::eu` and `:prod:eu` both have two segments.

use serde::Deserialize;

use crate::query::Query;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// A dimension without selected values accepts any segment.
    Wildcard,
    /// Every visited segment must equal one of the dimension's values.
    Exact,
}

/// What to do when a key and the schema disagree on depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthPolicy {
    /// Compare only the positions both have. A key shorter than the schema
    /// matches if its segments do, and segments past the last dimension are
    /// ignored.
    #[default]
    Prefix,
    /// The key must have exactly one segment per dimension.
    Strict,
}

#[derive(Debug, Clone)]
pub struct KeyMatcher {
    delimiter: String,
    depth: DepthPolicy,
}

impl KeyMatcher {
    pub fn new(delimiter: impl Into<String>, depth: DepthPolicy) -> Self {
        Self {
            delimiter: delimiter.into(),
            depth,
        }
    }

    pub fn segments<'k>(&self, key: &'k str) -> impl Iterator<Item = &'k str> {
        key.split(self.delimiter.as_str()).filter(|s| !s.is_empty())
    }

    pub fn matches(&self, key: &str, query: &Query, mode: MatchMode) -> bool {
        let mut visited = 0;
        let mut segments = self.segments(key);
        for selection in query.selections() {
            let Some(segment) = segments.next() else {
                break;
            };
            visited += 1;
            let accepted = if selection.is_empty() {
                mode == MatchMode::Wildcard
            } else {
                selection.contains(segment)
            };
            if !accepted {
                return false;
            }
        }
        match self.depth {
            DepthPolicy::Prefix => true,
            DepthPolicy::Strict => visited == query.len() && segments.next().is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Selection;

    fn query(selections: Vec<(&str, Vec<&str>)>) -> Query {
        Query::from_selections(
            selections
                .into_iter()
                .map(|(name, values)| {
                    let mut selection = Selection::new(name, values.len().max(2));
                    for value in values {
                        selection.push(value);
                    }
                    selection
                })
                .collect(),
        )
    }

    #[test]
    fn empty_selection_is_a_wildcard() {
        let matcher = KeyMatcher::new(":", DepthPolicy::Prefix);
        let q = query(vec![("env", vec!["prod"]), ("region", vec![])]);
        assert!(matcher.matches("prod:us", &q, MatchMode::Wildcard));
        assert!(matcher.matches("prod:eu", &q, MatchMode::Wildcard));
        assert!(!matcher.matches("dev:eu", &q, MatchMode::Wildcard));
    }

    #[test]
    fn exact_mode_never_treats_empty_as_any() {
        let matcher = KeyMatcher::new(":", DepthPolicy::Prefix);
        let q = query(vec![("env", vec!["prod", "dev"]), ("region", vec![])]);
        assert!(!matcher.matches("prod:us", &q, MatchMode::Exact));
        assert!(!matcher.matches("qa", &q, MatchMode::Exact));
        assert!(matcher.matches("dev", &q, MatchMode::Exact));
    }

    #[test]
    fn prefix_policy_accepts_short_and_long_keys() {
        let matcher = KeyMatcher::new(":", DepthPolicy::Prefix);
        let q = query(vec![("env", vec!["prod"]), ("region", vec!["eu"])]);
        // unvisited trailing dimensions are not checked
        assert!(matcher.matches("prod", &q, MatchMode::Wildcard));
        assert!(matcher.matches("prod:eu:extra", &q, MatchMode::Wildcard));
        assert!(!matcher.matches("prod:us", &q, MatchMode::Wildcard));
    }

    #[test]
    fn strict_policy_requires_full_depth() {
        let matcher = KeyMatcher::new(":", DepthPolicy::Strict);
        let q = query(vec![("env", vec!["prod"]), ("region", vec![])]);
        assert!(matcher.matches("prod:eu", &q, MatchMode::Wildcard));
        assert!(!matcher.matches("prod", &q, MatchMode::Wildcard));
        assert!(!matcher.matches("prod:eu:extra", &q, MatchMode::Wildcard));
    }

    #[test]
    fn empty_segments_are_skipped() {
        let matcher = KeyMatcher::new(":", DepthPolicy::Strict);
        let q = query(vec![("env", vec!["prod"]), ("region", vec!["eu"])]);
        assert!(matcher.matches("prod::eu", &q, MatchMode::Wildcard));
        assert!(matcher.matches(":prod:eu:", &q, MatchMode::Wildcard));
    }

    #[test]
    fn other_delimiters() {
        let matcher = KeyMatcher::new("/", DepthPolicy::Prefix);
        let q = query(vec![("env", vec!["prod"])]);
        assert!(matcher.matches("prod/eu", &q, MatchMode::Wildcard));
        assert!(!matcher.matches("prod:eu", &q, MatchMode::Wildcard));
    }

    #[test]
    fn schema_without_dimensions_matches_everything_under_prefix() {
        let q = Query::from_selections(Vec::new());
        assert!(KeyMatcher::new(":", DepthPolicy::Prefix).matches("a:b", &q, MatchMode::Wildcard));
        assert!(!KeyMatcher::new(":", DepthPolicy::Strict).matches("a:b", &q, MatchMode::Wildcard));
    }
}
