//! Conversion of raw provider answers into canonical outcomes.
//!
//! Every function here is pure: the same response and token ordering always
//! produce the same outcomes and the same feedback delta.

use crate::error::{ErrorKind, PushError, PushResult};
use crate::external::apple::{StaleDevice, UnaryFailure};
use crate::external::google::{MulticastResponse, ProviderErrorCode};
use crate::models::{BatchSummary, Backend, DeliveryOutcome, FeedbackEvent, PushToken, Target};

use super::provider::RawResponse;

/// Outcomes of one physical call plus the feedback delta it produced
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// Aligned with the targets of the call
    pub outcomes: Vec<DeliveryOutcome>,
    pub feedback: FeedbackEvent,
}

impl Normalized {
    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_outcomes(&self.outcomes)
    }
}

/// Normalizes the answer to a physical call addressed to `targets`
///
/// # Errors
/// * `FatalProvider` when a multicast result reports a sender mismatch
/// * `Invariant` when the provider returned a different number of results
pub fn normalize(backend: Backend, targets: &[Target], raw: RawResponse) -> PushResult<Normalized> {
    match raw {
        RawResponse::Multicast(response) => normalize_multicast(backend, targets, &response),
        RawResponse::Unary(result) => match targets {
            [target] => Ok(normalize_unary(backend, &target.token, result)),
            _ => Err(PushError::Invariant {
                message: format!(
                    "unary response from {backend} paired with {} targets",
                    targets.len()
                ),
            }),
        },
    }
}

pub fn normalize_multicast(
    backend: Backend,
    targets: &[Target],
    response: &MulticastResponse,
) -> PushResult<Normalized> {
    if response.results.len() != targets.len() {
        return Err(PushError::Invariant {
            message: format!(
                "{backend} returned {} results for {} tokens",
                response.results.len(),
                targets.len()
            ),
        });
    }

    // A sender mismatch anywhere means the credentials are wrong for every token
    if response
        .results
        .iter()
        .any(|r| r.error_code() == Some(ProviderErrorCode::MismatchSenderId))
    {
        return Err(PushError::FatalProvider {
            backend,
            reason: "MismatchSenderId: the server key does not match the sender of these tokens"
                .to_string(),
        });
    }

    let mut feedback = FeedbackEvent::new(backend);
    let outcomes = targets
        .iter()
        .zip(&response.results)
        .map(|(target, result)| {
            let token = target.token.clone();

            let code = result.error_code();

            // A replacement wins over removal; success still depends on the error field
            if let Some(replacement) = result.registration_id.as_deref() {
                let replacement = PushToken::new(replacement);
                feedback.push_update(token.clone(), replacement.clone());
                return match code {
                    None => DeliveryOutcome::replaced(token, replacement),
                    Some(code) => DeliveryOutcome {
                        replacement_token: Some(replacement),
                        ..DeliveryOutcome::failed(token, rejection_kind(&code))
                    },
                };
            }

            match code {
                Some(code) if code.is_invalid_token() => {
                    feedback.push_removal(token.clone());
                    DeliveryOutcome::failed(token, ErrorKind::InvalidToken)
                }
                Some(code) => DeliveryOutcome::failed(token, rejection_kind(&code)),
                None => DeliveryOutcome::delivered(token),
            }
        })
        .collect();

    Ok(Normalized { outcomes, feedback })
}

fn rejection_kind(code: &ProviderErrorCode) -> ErrorKind {
    if code.is_invalid_token() {
        ErrorKind::InvalidToken
    } else {
        ErrorKind::DeliveryRejected
    }
}

pub fn normalize_unary(
    backend: Backend,
    token: &PushToken,
    result: Result<(), UnaryFailure>,
) -> Normalized {
    let mut feedback = FeedbackEvent::new(backend);

    let outcome = match result {
        Ok(()) => DeliveryOutcome::delivered(token.clone()),
        Err(failure) if failure.is_invalid_token() => {
            feedback.push_removal(token.clone());
            DeliveryOutcome::failed(token.clone(), ErrorKind::InvalidToken)
        }
        Err(failure) => {
            tracing::debug!(%backend, %token, reason = %failure, "Device send failed");
            DeliveryOutcome::failed(token.clone(), ErrorKind::TransportFailure)
        }
    };

    Normalized {
        outcomes: vec![outcome],
        feedback,
    }
}

/// Builds the removal delta for devices reported by an out-of-band channel
pub fn normalize_stale_devices(backend: Backend, devices: &[StaleDevice]) -> FeedbackEvent {
    FeedbackEvent::removal(
        backend,
        devices
            .iter()
            .map(|device| PushToken::from_bytes(&device.token))
            .collect(),
    )
}
