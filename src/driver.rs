use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::app::{App, PassStats};
use crate::error::ObdError;
use crate::obd::ObdClient;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverSummary {
    pub passes: u32,
    pub api_calls: usize,
}

/// Repeats passes until one makes no API calls. A failed pass only restarts
/// the failure streak if it persisted something to the cache.
pub fn run<C: ObdClient>(
    app: &App<C>,
    interrupt: &AtomicBool,
    mut sleep: impl FnMut(Duration),
) -> Result<DriverSummary, ObdError> {
    let policy = app.settings().retry;
    let mut summary = DriverSummary::default();
    let mut failures = 0u32;

    loop {
        summary.passes += 1;
        let accounts = app.load_accounts()?;
        let mut stats = PassStats::default();
        let result = app.run_accounts(&accounts, interrupt, &mut stats);
        summary.api_calls += stats.api_calls;

        match result {
            Ok(()) if stats.is_complete() => {
                info!(passes = summary.passes, "Download completed");
                return Ok(summary);
            }
            Ok(()) => {
                failures = 0;
                info!(
                    pass = summary.passes,
                    calls = stats.api_calls,
                    "pass fetched new data; starting another pass"
                );
            }
            Err(err) if err.is_transient() => {
                if stats.written > 0 {
                    failures = 0;
                }
                failures += 1;
                if failures >= policy.max_consecutive_failures {
                    error!(failures, "giving up: {err}");
                    return Err(ObdError::RetriesExhausted {
                        attempts: failures,
                        last: Box::new(err),
                    });
                }
                let delay = policy.backoff(failures);
                warn!(
                    pass = summary.passes,
                    failures,
                    delay_ms = delay.as_millis() as u64,
                    "pass failed, retrying: {err}"
                );
                sleep(delay);
                if interrupt.load(Ordering::SeqCst) {
                    return Err(ObdError::Interrupted);
                }
            }
            Err(err) => {
                error!(pass = summary.passes, "pass aborted: {err}");
                return Err(err);
            }
        }
    }
}
