mod client;
mod types;

pub use client::{FCM_ENDPOINT, GCM_ENDPOINT, LegacyHttpClient};
pub use types::{AndroidAlert, MulticastMessage, MulticastResponse, MulticastResult, ProviderErrorCode};
