//! Push-Dispatch Library
//!
//! Push notification dispatch and result normalization for APN, FCM and GCM.

use shadow_rs::shadow;
shadow!(build);

pub mod config;
pub mod error;
pub mod external;
pub mod logger;
pub mod models;
pub mod services;

pub use error::{ErrorKind, PushError, PushResult};
pub use services::{BackendSender, BatchDispatcher, FeedbackBus, PushService, SendRequest};

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}
