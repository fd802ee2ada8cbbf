use thiserror::Error;

/// The common error type used by this crate
#[derive(Error, Debug)]
pub enum DialogSubsetTreeError {
    /// The tree or one of its nodes was configured incorrectly
    #[error("Invalid tree configuration: {0}")]
    Configuration(String),

    /// A caller-supplied key or id accessor failed
    #[error(transparent)]
    Accessor(#[from] AccessorError),

    /// A slice query could not be constructed from its conditions
    #[error("Invalid slice query: {0}")]
    Query(String),
}

/// An error raised by a caller-supplied accessor function.
///
/// The original error is kept as-is and can be recovered with
/// [`AccessorError::into_inner`].
#[derive(Debug)]
pub struct AccessorError(Box<dyn std::error::Error + Send + Sync + 'static>);

impl AccessorError {
    /// Wraps any error (or message) produced by an accessor.
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self(error.into())
    }

    /// Returns the error originally raised by the accessor.
    pub fn into_inner(self) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self.0
    }
}

impl std::fmt::Display for AccessorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for AccessorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}
