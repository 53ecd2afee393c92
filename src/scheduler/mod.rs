//! Acquisition scheduler.
//!
//! Decides when to issue each query, recovers from rate limiting and
//! never looks at what the queries return beyond handing records to the
//! raw sink.

pub mod retry;
pub mod runner;
pub mod session;
pub mod variation;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::clock::Clock;

pub use retry::{QueryOutcome, RetryPolicy, run_with_retry};
pub use runner::{Harvester, RunReport, StopReason};
pub use session::{ActivityProfile, Pause, Session, SessionPhase};
pub use variation::{Variant, vary_keyword};

/// Sleep on `clock` unless `cancel` fires first.
///
/// Returns `false` if cancelled. Zero-length sleeps are skipped.
pub(crate) async fn sleep_or_cancel<C: Clock>(
    clock: &C,
    cancel: &CancellationToken,
    duration: Duration,
) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if duration.is_zero() {
        return true;
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = clock.sleep(duration) => true,
    }
}
