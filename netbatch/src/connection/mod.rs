//! Connection layer: bounded retry around a [`crate::session::SessionProvider`].

mod manager;
mod retry;

pub use manager::{ConnectionManager, ConnectionOutcome};
pub use retry::{Backoff, RetryPolicy, Sleeper, TokioSleeper};
