/*!
 * Error types for the textreel application.
 *
 * This module contains custom error types for the different stages of video
 * assembly, using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when talking to an external synthesis provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The provider asked us to slow down. This is the only retryable error.
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether this error is a transient rate-limit signal
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimitExceeded(_))
    }
}

/// Errors raised while splitting narration text into chunks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SegmentationError {
    /// The input contained no speakable text
    #[error("Input text is empty")]
    EmptyInput,

    /// The chunk size limit cannot hold any text
    #[error("Maximum chunk size must be greater than zero")]
    InvalidLimit,

    /// A run of characters without whitespace is longer than the chunk limit
    #[error("Word at character {position} is {length} characters long, which exceeds the {max_chars} character limit")]
    UnsplittableWord {
        /// Character offset of the word in the normalized text
        position: usize,
        /// Length of the word in characters
        length: usize,
        /// Configured chunk limit
        max_chars: usize,
    },
}

/// Errors raised while synthesizing one chunk
#[derive(Error, Debug)]
pub enum SynthesisError {
    /// Rate limits persisted past the retry budget
    #[error("Synthesis of chunk {chunk_index} still rate limited after {attempts} attempts")]
    Exhausted {
        /// Chunk being synthesized
        chunk_index: usize,
        /// Number of attempts made
        attempts: u32,
        /// Last rate-limit message from the provider
        last_error: String,
    },

    /// Non-retryable provider failure
    #[error("Synthesis of chunk {chunk_index} failed: {source}")]
    Failed {
        /// Chunk being synthesized
        chunk_index: usize,
        /// Underlying provider error
        #[source]
        source: ProviderError,
    },

    /// The synthesized audio cannot be used on the timeline
    #[error("Synthesized audio for chunk {chunk_index} is unusable: {reason}")]
    InvalidAudio {
        /// Chunk being synthesized
        chunk_index: usize,
        /// What was wrong with it
        reason: String,
    },
}

/// Errors raised while validating or selecting background footage
#[derive(Error, Debug)]
pub enum FootageError {
    /// The pool is empty or every clip failed the validity probe
    #[error("No valid footage available: {0}")]
    NoValidFootage(String),

    /// A window was requested for a duration that cannot exist
    #[error("Invalid footage duration requested: {0}")]
    InvalidDuration(f64),

    /// Probing a clip failed
    #[error("Failed to probe footage '{path}': {message}")]
    Probe {
        /// Clip that could not be probed
        path: PathBuf,
        /// Probe failure detail
        message: String,
    },
}

/// Errors raised by a caption renderer
#[derive(Error, Debug)]
pub enum RenderError {
    /// Writing a caption asset failed
    #[error("Failed to write caption asset '{path}': {source}")]
    Asset {
        /// Asset path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The caption request itself is unusable
    #[error("Invalid caption request: {0}")]
    InvalidRequest(String),
}

/// Errors raised by the encoder
#[derive(Error, Debug)]
pub enum EncodeError {
    /// The timeline cannot be encoded
    #[error("Timeline cannot be encoded: {0}")]
    InvalidTimeline(String),

    /// The encoder process could not be started
    #[error("Failed to start encoder '{program}': {source}")]
    Spawn {
        /// Encoder executable
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The encoder ran and reported failure
    #[error("Encoder exited with {status}: {stderr}")]
    Failed {
        /// Exit status description
        status: String,
        /// Tail of the encoder's stderr
        stderr: String,
    },
}

/// Errors raised by the resource ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The per-attempt workspace could not be created
    #[error("Failed to create workspace '{path}': {source}")]
    Workspace {
        /// Workspace directory
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A temporary artifact could not be written
    #[error("Failed to write temporary file '{path}': {source}")]
    Write {
        /// Temporary file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that abort one assembly attempt
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// Text could not be chunked
    #[error("Segmentation error: {0}")]
    Segmentation(#[from] SegmentationError),

    /// A chunk could not be synthesized
    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    /// Footage could not be selected for a chunk
    #[error("Footage error at chunk {chunk_index}: {source}")]
    Footage {
        /// Chunk being assembled, if any
        chunk_index: usize,
        /// Underlying footage error
        #[source]
        source: FootageError,
    },

    /// Caption could not be rendered for a chunk
    #[error("Caption error at chunk {chunk_index}: {source}")]
    Render {
        /// Chunk being assembled
        chunk_index: usize,
        /// Underlying render error
        #[source]
        source: RenderError,
    },

    /// Caption could not be rendered for the closing promo segment
    #[error("Caption error on the promo segment: {0}")]
    PromoRender(#[source] RenderError),

    /// Temporary resources could not be created
    #[error("Resource error: {0}")]
    Ledger(#[from] LedgerError),

    /// The final encode failed
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid user input
    #[error("Invalid input: {0}")]
    Input(String),

    /// Error from background footage handling
    #[error("Footage error: {0}")]
    Footage(#[from] FootageError),

    /// Error from assembly
    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
