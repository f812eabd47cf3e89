use thiserror::Error;

/// Store operation that failed, named in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Lookup,
    Fetch,
    Insert,
    Update,
    Schema,
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StoreOp::Lookup => "lookup by brand/model",
            StoreOp::Fetch => "lookup by id",
            StoreOp::Insert => "insert",
            StoreOp::Update => "update",
            StoreOp::Schema => "schema setup",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("device store {op} failed: {source}")]
    Sqlite {
        op: StoreOp,
        #[source]
        source: rusqlite::Error,
    },
    #[error("device {id} has an unreadable {column} column: {source}")]
    Decode {
        id: i64,
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not encode {column} for storage: {source}")]
    Encode {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("device {0} not found")]
    NotFound(i64),
    #[error("device store {op} failed: {message}")]
    Unavailable { op: StoreOp, message: String },
}

impl StoreError {
    pub fn sqlite(op: StoreOp) -> impl FnOnce(rusqlite::Error) -> StoreError {
        move |source| StoreError::Sqlite { op, source }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("inserting {brand} {model} failed")]
    Insert {
        brand: String,
        model: String,
        #[source]
        source: StoreError,
    },
    #[error("updating device {id} failed")]
    Update {
        id: i64,
        #[source]
        source: StoreError,
    },
    #[error("invalid brand pattern: {0}")]
    Heuristics(#[from] regex::Error),
}
