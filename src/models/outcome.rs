//! Canonical per-recipient delivery results.

use crate::error::{ErrorKind, PushError};
use crate::models::PushToken;
use serde::{Deserialize, Serialize};

/// Result of one send attempt for one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub token: PushToken,
    pub succeeded: bool,
    pub error_kind: Option<ErrorKind>,
    /// New registration issued by the provider in place of `token`
    pub replacement_token: Option<PushToken>,
}

impl DeliveryOutcome {
    pub fn delivered(token: PushToken) -> Self {
        Self {
            token,
            succeeded: true,
            error_kind: None,
            replacement_token: None,
        }
    }

    pub fn replaced(token: PushToken, replacement: PushToken) -> Self {
        Self {
            token,
            succeeded: true,
            error_kind: None,
            replacement_token: Some(replacement),
        }
    }

    pub fn failed(token: PushToken, kind: ErrorKind) -> Self {
        Self {
            token,
            succeeded: false,
            error_kind: Some(kind),
            replacement_token: None,
        }
    }
}

/// Success/failure tally of a send or batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub successful: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn new(successful: usize, failed: usize) -> Self {
        Self { successful, failed }
    }

    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a DeliveryOutcome>) -> Self {
        outcomes.into_iter().fold(Self::default(), |mut acc, outcome| {
            if outcome.succeeded {
                acc.successful += 1;
            } else {
                acc.failed += 1;
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.successful + self.failed
    }
}

/// Everything a `batch` call returns
///
/// `outcomes[i]` always corresponds to the i-th input recipient. Fatal provider
/// errors that cut an adapter's work short are reported alongside, never instead
/// of, the outcome sequence.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<DeliveryOutcome>,
    pub summary: BatchSummary,
    pub fatal_errors: Vec<PushError>,
}

impl BatchReport {
    pub fn new(outcomes: Vec<DeliveryOutcome>, fatal_errors: Vec<PushError>) -> Self {
        let summary = BatchSummary::from_outcomes(&outcomes);
        Self {
            outcomes,
            summary,
            fatal_errors,
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.fatal_errors.is_empty()
    }
}
