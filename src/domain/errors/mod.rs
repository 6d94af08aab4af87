// Domain errors - Error types for the domain layer

use thiserror::Error;

/// Domain-specific error types carried across ports
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Container could not be probed for a duration
    #[error("Could not read video duration: {0}")]
    ProbeFail(String),

    /// Video is too short to lose its trailing segment
    #[error("Video is {duration:.2}s long; it must be longer than {minimum:.1}s to trim")]
    TooShort { duration: f64, minimum: f64 },

    /// Engine has not finished loading
    #[error("The video engine is not ready yet")]
    EngineNotReady,

    /// Engine failed to load; unusable for the process lifetime
    #[error("The video engine failed to load: {0}")]
    EngineFatal(String),

    /// Engine load was requested more than once
    #[error("The video engine has already been loaded")]
    AlreadyLoaded,

    /// Engine asset could not be fetched or staged
    #[error("Engine asset unavailable: {0}")]
    AssetFail(String),

    /// Engine workspace operation failed
    #[error("Engine workspace error: {0}")]
    WorkspaceFail(String),

    /// Engine invocation returned an error
    #[error("Engine invocation failed: {0}")]
    InvocationFail(String),

    /// Access handle could not be created or released
    #[error("Resource error: {0}")]
    ResourceFail(String),

    /// No trimmed video has been produced yet
    #[error("There is no trimmed video to download")]
    NoResult,

    /// File system error
    #[error("File system error: {0}")]
    FsFail(String),
}

impl DomainError {
    /// True when the error leaves the engine permanently unusable
    pub fn is_fatal(&self) -> bool {
        matches!(self, DomainError::EngineFatal(_))
    }
}
