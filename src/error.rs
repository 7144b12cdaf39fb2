use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SelectorError {
    #[error("unknown provider: {0}")]
    #[diagnostic(help("known providers: web, pubmed, mongodb"))]
    InvalidProvider(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("unsupported config schema version: {0}")]
    UnsupportedSchema(u32),

    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("malformed catalog response: {0}")]
    CatalogDecode(String),

    #[error("catalog worker panicked")]
    WorkerPanicked,
}

impl SelectorError {
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            SelectorError::CatalogHttp(_)
                | SelectorError::CatalogStatus { .. }
                | SelectorError::CatalogDecode(_)
                | SelectorError::WorkerPanicked
        )
    }
}
