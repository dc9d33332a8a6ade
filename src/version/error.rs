use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidVersionError {
    #[error("Version string is empty")]
    Empty,
}
