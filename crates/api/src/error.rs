use thiserror::Error;

/// Construction-time failures. Request execution itself never returns an
/// error; see [`crate::CallOutcome`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
