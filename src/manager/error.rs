use std::fmt;

use thiserror::Error;

use crate::mirror::MirrorError;

/// A mirror dropped from the manager and why
#[derive(Debug)]
pub struct MirrorFailure {
    pub url: String,
    pub error: MirrorError,
}

impl fmt::Display for MirrorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.url, self.error)
    }
}

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("No mirror left after '{operation}'{}", render_failures(.failures))]
    NoMirrors {
        operation: String,
        failures: Vec<MirrorFailure>,
    },
}

fn render_failures(failures: &[MirrorFailure]) -> String {
    if failures.is_empty() {
        return ": no mirrors were configured".to_string();
    }
    failures
        .iter()
        .map(|failure| format!("\n  - {}", failure))
        .collect()
}
