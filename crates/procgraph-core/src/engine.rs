//! Seam for a full-featured query engine.
//!
//! A session may hand queries to an external engine first and fall back to the
//! local evaluator when it errors. Both sides implement [`QueryEngine`], so the
//! fallback branch is an ordinary `Result` match rather than unwinding.

use crate::eval::{self, Binding};
use crate::prefix::PrefixMap;
use crate::query::parse_query;
use crate::store::Store;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    #[error("engine rejected query: {0}")]
    Rejected(String),
}

/// Everything an engine gets to see for one query.
#[derive(Debug, Clone, Copy)]
pub struct EngineRequest<'a> {
    pub query: &'a str,
    pub store: &'a Store,
    pub prefixes: &'a PrefixMap,
}

#[async_trait]
pub trait QueryEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Raw bindings for a SELECT query (no projection applied).
    async fn select(&self, request: EngineRequest<'_>) -> Result<Vec<Binding>, EngineError>;

    async fn ask(&self, request: EngineRequest<'_>) -> Result<bool, EngineError>;
}

/// The core evaluator behind the engine trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalEngine;

#[async_trait]
impl QueryEngine for LocalEngine {
    fn name(&self) -> &str {
        "local"
    }

    async fn select(&self, request: EngineRequest<'_>) -> Result<Vec<Binding>, EngineError> {
        match parse_query(request.query, request.prefixes) {
            Some(q) if !q.is_ask() => Ok(eval::evaluate(&q.patterns, request.store)),
            Some(_) => Err(EngineError::Rejected("expected a SELECT query".into())),
            None => Ok(Vec::new()),
        }
    }

    async fn ask(&self, request: EngineRequest<'_>) -> Result<bool, EngineError> {
        Ok(parse_query(request.query, request.prefixes)
            .is_some_and(|q| eval::ask(&q.patterns, request.store)))
    }
}

/// Stands in when no external engine is configured; every call fails.
#[derive(Debug, Clone, Default)]
pub struct UnavailableEngine {
    pub reason: String,
}

impl UnavailableEngine {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl QueryEngine for UnavailableEngine {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn select(&self, _request: EngineRequest<'_>) -> Result<Vec<Binding>, EngineError> {
        Err(EngineError::Unavailable(self.reason.clone()))
    }

    async fn ask(&self, _request: EngineRequest<'_>) -> Result<bool, EngineError> {
        Err(EngineError::Unavailable(self.reason.clone()))
    }
}
