//! Error type shared by every stage of a sweep.
//!
//! Exhausting the infection pool is not an error: it is the padding condition handled by
//! [`SimulationRun`](crate::run::SimulationRun). Everything here halts a sweep.

use std::collections::TryReserveError;
use std::fmt::{self, Display};
use std::io;

use crate::cohort::Cohort;

#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum SimError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    InvalidParameter(String),
    AllocationFailed(TryReserveError),
    /// A firing event selected a cohort with no members left.
    CohortUnderflow(Cohort),
    /// The worker pool for per-replicate streams could not be started.
    ThreadPoolError(rayon::ThreadPoolBuildError),
}

impl From<io::Error> for SimError {
    fn from(error: io::Error) -> Self {
        SimError::IoError(error)
    }
}

impl From<serde_json::Error> for SimError {
    fn from(error: serde_json::Error) -> Self {
        SimError::JsonError(error)
    }
}

impl From<csv::Error> for SimError {
    fn from(error: csv::Error) -> Self {
        SimError::CsvError(error)
    }
}

impl From<TryReserveError> for SimError {
    fn from(error: TryReserveError) -> Self {
        SimError::AllocationFailed(error)
    }
}

impl From<rayon::ThreadPoolBuildError> for SimError {
    fn from(error: rayon::ThreadPoolBuildError) -> Self {
        SimError::ThreadPoolError(error)
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::IoError(error) => Some(error),
            SimError::JsonError(error) => Some(error),
            SimError::CsvError(error) => Some(error),
            SimError::AllocationFailed(error) => Some(error),
            SimError::ThreadPoolError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::IoError(error) => write!(f, "i/o error: {error}"),
            SimError::JsonError(error) => write!(f, "could not parse parameters: {error}"),
            SimError::CsvError(error) => write!(f, "could not write event record: {error}"),
            SimError::InvalidParameter(message) => write!(f, "invalid parameter: {message}"),
            SimError::AllocationFailed(error) => write!(f, "memory allocation failed: {error}"),
            SimError::CohortUnderflow(cohort) => {
                write!(f, "attempted to infect a member of the empty {cohort:?} cohort")
            }
            SimError::ThreadPoolError(error) => write!(f, "could not start worker threads: {error}"),
        }
    }
}

impl From<String> for SimError {
    fn from(message: String) -> Self {
        SimError::InvalidParameter(message)
    }
}

impl From<&str> for SimError {
    fn from(message: &str) -> Self {
        SimError::InvalidParameter(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_cohort() {
        let error = SimError::CohortUnderflow(Cohort::Unprotected);
        assert_eq!(
            error.to_string(),
            "attempted to infect a member of the empty Unprotected cohort"
        );
    }

    #[test]
    fn io_errors_convert_and_keep_their_source() {
        let error: SimError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(error, SimError::IoError(_)));
        assert!(std::error::Error::source(&error).is_some());
    }
}
