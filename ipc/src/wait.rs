use crate::errors::WaitError;
use crate::sender::Announce;
use coord_core::{ServiceName, ShutdownSignal, Sleeper};
use std::time::Duration;
use tracing::{info, warn};

/// Announces `who_am_i` to `service` until a send succeeds.
///
/// A successful send only means the rendezvous socket exists and accepted the
/// datagram, not that anyone has read it. Between failed attempts the loop
/// sleeps `interval` and then honours `shutdown`. Returns the attempt number
/// that succeeded.
pub fn wait_for<A, S>(
    announcer: &A,
    service: ServiceName,
    who_am_i: &str,
    interval: Duration,
    max_attempts: u32,
    shutdown: &ShutdownSignal,
    sleeper: &S,
) -> Result<u32, WaitError>
where
    A: Announce + ?Sized,
    S: Sleeper + ?Sized,
{
    let mut last = None;

    for attempt in 1..=max_attempts {
        match announcer.send_current_state(service, who_am_i) {
            Ok(()) => {
                info!(%service, attempt, "Dependency is up");
                return Ok(attempt);
            }
            Err(e) => {
                warn!(%service, attempt, max_attempts, error = %e, "Dependency not reachable yet");
                last = Some(e);
            }
        }

        if attempt == max_attempts {
            break;
        }
        sleeper.sleep(interval);
        if shutdown.is_requested() {
            return Err(WaitError::Cancelled { service });
        }
    }

    Err(WaitError::Unreachable {
        service,
        attempts: max_attempts,
        last,
    })
}
