mod app_error;

pub use app_error::{ErrorKind, PushError, PushResult};
