use thiserror::Error;

/// Failures of external collaborators: the vector store, the embedding
/// endpoint, and the text-generation endpoint.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("unparseable date {value:?}: {details}")]
    InvalidDate { value: String, details: String },

    #[error("unknown party label: {0:?}")]
    UnknownParty(String),

    #[error("unknown document type: {0:?}")]
    UnknownDocType(String),

    #[error("record {0:?} has no text")]
    EmptyText(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("query is empty")]
    EmptyQuery,

    #[error("date {0} is not covered by the legislative period table")]
    UncoveredDate(u32),

    #[error("model returned an unrecognized alignment label: {0:?}")]
    UnknownLabel(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

pub type Result<T, E = AlignError> = std::result::Result<T, E>;
