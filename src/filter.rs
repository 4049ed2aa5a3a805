//! Query filters applied to outgoing results.

use std::sync::Arc;

use crate::records::Record;

/// The query a filter is judging results for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Queried domain name.
    pub name: String,
    /// Query type ("A", "AAAA", "SRV", ...).
    pub qtype: String,
}

/// Predicate/transform over outgoing query results.
///
/// Filters may drop, reorder, or rewrite answers. They are registered
/// through the plugin context during initialization only.
pub trait QueryFilter: Send + Sync + 'static {
    /// Produce the filtered answer set for `query`.
    fn apply(&self, query: &Query, answers: Vec<Record>) -> Vec<Record>;
}

/// Ordered, cheaply cloneable filter pipeline.
///
/// Filters run in registration order; each sees the previous filter's
/// output. The chain is frozen when the supervisor launches the DNS
/// responder.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Arc<[Arc<dyn QueryFilter>]>,
}

impl FilterChain {
    /// Build a chain from filters in application order.
    pub fn new(filters: Vec<Arc<dyn QueryFilter>>) -> Self {
        Self {
            filters: filters.into(),
        }
    }

    /// Run every filter over `answers`, in order.
    pub fn apply(&self, query: &Query, answers: Vec<Record>) -> Vec<Record> {
        self.filters
            .iter()
            .fold(answers, |acc, f| f.apply(query, acc))
    }

    /// Number of filters in the chain.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// True when no filters are registered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
