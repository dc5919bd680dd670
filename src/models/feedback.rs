//! Token lifecycle deltas emitted by adapters.

use crate::models::{Backend, PushToken};
use serde::{Deserialize, Serialize};

/// A stale token and the registration that supersedes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUpdate {
    pub from: PushToken,
    pub to: PushToken,
}

/// Tokens the caller should rotate or purge in its device registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    /// Adapter that produced the delta
    pub source: Backend,
    pub tokens_to_update: Vec<TokenUpdate>,
    pub tokens_to_remove: Vec<PushToken>,
}

impl FeedbackEvent {
    pub fn new(source: Backend) -> Self {
        Self {
            source,
            tokens_to_update: Vec::new(),
            tokens_to_remove: Vec::new(),
        }
    }

    pub fn removal(source: Backend, tokens: Vec<PushToken>) -> Self {
        Self {
            source,
            tokens_to_update: Vec::new(),
            tokens_to_remove: tokens,
        }
    }

    pub fn push_update(&mut self, from: PushToken, to: PushToken) {
        self.tokens_to_update.push(TokenUpdate { from, to });
    }

    pub fn push_removal(&mut self, token: PushToken) {
        self.tokens_to_remove.push(token);
    }

    pub fn is_empty(&self) -> bool {
        self.tokens_to_update.is_empty() && self.tokens_to_remove.is_empty()
    }
}
