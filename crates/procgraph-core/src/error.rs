use crate::engine::EngineError;
use crate::hierarchy::InvalidHierarchy;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid quad: {0}")]
    InvalidQuad(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Hierarchy(#[from] InvalidHierarchy),
    #[error("query engine `{engine}` failed: {source}")]
    Engine {
        engine: String,
        #[source]
        source: EngineError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
