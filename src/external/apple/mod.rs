mod types;

pub use types::{Aps, ApnNotification, MAX_PAYLOAD_BYTES, StaleDevice, UnaryFailure, UnaryFailureKind};
