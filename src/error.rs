use thiserror::Error;

use crate::model::Phase;
use crate::pipelines::PipelineState;

/// Errors raised while retrieving a recipe page
#[derive(Error, Debug)]
pub enum FetchError {
    /// The server answered with a non-success status
    #[error("HTTP error occurred: {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Connection, TLS or body read failure
    #[error("Failed to fetch URL: {0}")]
    Transport(#[from] reqwest::Error),

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),
}

/// No structured-data block satisfied an extraction.
///
/// This is a legitimate terminal outcome for pages without usable recipe markup.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("No recipeIngredient found in JSON-LD data")]
    Ingredients,

    #[error("No nutrition data found in JSON-LD data")]
    Nutrition,

    #[error("No recipe name and image found in JSON-LD data")]
    RecipeInfo,
}

/// Errors raised while turning a completion into normalized records
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// The completion capability returned no content
    #[error("Empty response from completion provider")]
    EmptyResponse,

    /// The completion content is not a JSON array of the expected records
    #[error("Malformed completion response ({source}): {text}")]
    MalformedResponse {
        text: String,
        #[source]
        source: serde_json::Error,
    },

    /// The completion request itself failed
    #[error("Completion provider failed: {0}")]
    Provider(String),
}

/// Errors raised by a handoff store backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Errors that can occur while ingesting a recipe submission
#[derive(Error, Debug)]
pub enum IngestError {
    /// Submission rejected before any work was done
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A record expected in the handoff store is absent or expired
    #[error("No record found in store for key: {0}")]
    MissingRecord(String),

    /// An event carried a phase the receiving stage does not handle
    #[error("Unexpected phase {0:?} for the normalize stage")]
    UnexpectedPhase(Phase),

    /// The session is not in the state the stage starts from
    #[error("Session {session_id} is in state {state:?}, expected Extracted")]
    OutOfOrder {
        session_id: String,
        state: PipelineState,
    },

    /// The relay rejected or could not receive a payload
    #[error("Relay error: {0}")]
    Relay(String),

    /// Builder configuration error
    #[error("Builder error: {0}")]
    Builder(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
