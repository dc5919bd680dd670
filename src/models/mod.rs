//! Domain models for push delivery.

mod feedback;
mod notification;
mod outcome;
mod recipient;

pub use feedback::{FeedbackEvent, TokenUpdate};
pub use notification::{Notification, Priority};
pub use outcome::{BatchReport, BatchSummary, DeliveryOutcome};
pub use recipient::{
    Backend, Platform, PushToken, Recipient, RouteTag, Target, Tokens, UnreadCounters,
};
