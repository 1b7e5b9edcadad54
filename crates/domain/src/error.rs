/// Shared error type used across all Parley crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// No registered adapter pattern matches the qualified model id.
    #[error("no adapter registered for model {0}")]
    NoMatchingAdapter(String),

    /// The adapter could not build a completion target (bad parameters,
    /// missing credentials, unreachable service).
    #[error("adapter for {model_id}: {message}")]
    AdapterConstruction { model_id: String, message: String },

    /// The completion service failed or returned an unusable response.
    #[error("model invocation via {service}: {message}")]
    ModelInvocation { service: String, message: String },

    /// Document retrieval failed. Absorbed by the retrieval adapter; never
    /// fails a turn on its own.
    #[error("retrieval: {0}")]
    Retrieval(String),

    #[error("history store: {0}")]
    Persistence(String),

    /// A metadata merge tried to overwrite an existing key with a
    /// different value.
    #[error("metadata key {key:?} already set to a different value")]
    MetadataConflict { key: String },

    /// Caller input rejected before any I/O (empty prompt, blank ids).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported chatbot mode: {0}")]
    UnsupportedMode(String),

    #[error("prompt template: {0}")]
    Template(String),

    #[error("turn cancelled")]
    Cancelled,

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
