use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("Invalid version number: {0}")]
    Invalid(String),

    #[error("Malformed dual-version encoding: {0}")]
    Malformed(String),
}
