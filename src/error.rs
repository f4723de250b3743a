use thiserror::Error;

/// Library error type for slideshow operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlideshowError {
    /// The candidate source could not be read (or did not answer in time).
    #[error("candidate source unavailable: {0}")]
    SourceUnavailable(String),

    /// The source was read but no image matched the file type filter.
    #[error("no images match the file type filter")]
    EmptyCandidateSet,

    /// An identifier could not be turned into a loadable address.
    #[error("failed to resolve {id}: {reason}")]
    ResolutionFailed { id: String, reason: String },

    /// The address was resolved but the image could not be fetched or decoded.
    #[error("failed to load {address}: {reason}")]
    LoadFailed { address: String, reason: String },
}

pub type Result<T, E = SlideshowError> = std::result::Result<T, E>;
