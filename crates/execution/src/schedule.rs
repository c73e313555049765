//! Wall-clock-aligned scheduling.
//!
//! Schedulers fire at fixed second-of-minute offsets so triggers land on
//! predictable clock boundaries across restarts, instead of drifting with
//! "now + interval". The first trigger always waits for the next minute
//! boundary; subsequent triggers take the nearest future offset.

use std::time::Duration;

use chrono::{DateTime, Local, Timelike};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::info;

const MINUTE_MS: u64 = 60_000;

/// Second-of-minute trigger offsets.
#[derive(Debug, Clone)]
pub struct MinuteOffsets {
    offsets: Vec<u32>,
}

impl MinuteOffsets {
    /// Creates a schedule from second offsets (taken modulo 60).
    pub fn new(offsets: impl Into<Vec<u32>>) -> Self {
        let mut offsets: Vec<u32> = offsets.into().iter().map(|o| o % 60).collect();
        offsets.sort_unstable();
        offsets.dedup();
        if offsets.is_empty() {
            offsets.push(0);
        }
        Self { offsets }
    }

    /// The configured offsets, sorted and deduplicated.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Delay until the first trigger: next minute boundary plus the
    /// nearest offset.
    pub fn initial_delay(&self, now: DateTime<Local>) -> Duration {
        let into = ms_into_minute(now);
        let to_boundary = MINUTE_MS.saturating_sub(into);
        let best = self
            .offsets
            .iter()
            .map(|&o| to_boundary + u64::from(o) * 1000)
            .min()
            .unwrap_or(to_boundary);
        Duration::from_millis(best)
    }

    /// Delay until the nearest future offset, wrapping to the next
    /// minute when every offset of the current one has passed.
    pub fn next_delay(&self, now: DateTime<Local>) -> Duration {
        let into = ms_into_minute(now);
        let best = self
            .offsets
            .iter()
            .map(|&o| {
                let target = u64::from(o) * 1000;
                if target > into {
                    target - into
                } else {
                    MINUTE_MS.saturating_sub(into) + target
                }
            })
            .min()
            .unwrap_or(MINUTE_MS);
        Duration::from_millis(best)
    }
}

fn ms_into_minute(now: DateTime<Local>) -> u64 {
    // Leap-second nanos can exceed a full second; clamp inside the minute.
    let ms = u64::from(now.second()) * 1000 + u64::from(now.nanosecond() / 1_000_000);
    ms.min(MINUTE_MS - 1)
}

/// Runs `pass` on the aligned cadence until cancellation.
///
/// The pass itself is not interrupted here; passes check the token at
/// their own item boundaries.
pub async fn run_aligned<F, Fut>(
    name: &str,
    offsets: &MinuteOffsets,
    shutdown: &CancellationToken,
    mut pass: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let initial = offsets.initial_delay(Local::now());
    info!(
        task = name,
        offsets = ?offsets.offsets(),
        delay_secs = initial.as_secs(),
        "Scheduler aligned to wall clock"
    );
    tokio::select! {
        _ = shutdown.cancelled() => {
            info!(task = name, "Scheduler stopped before first pass");
            return;
        }
        _ = sleep(initial) => {}
    }

    loop {
        pass().await;
        if shutdown.is_cancelled() {
            break;
        }
        let delay = offsets.next_delay(Local::now());
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = sleep(delay) => {}
        }
    }
    info!(task = name, "Scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(h: u32, m: u32, s: u32, ms: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2025, 9, 11, h, m, s)
            .unwrap()
            .checked_add_signed(chrono::Duration::milliseconds(i64::from(ms)))
            .unwrap()
    }

    #[test]
    fn test_initial_delay_targets_next_minute() {
        let offsets = MinuteOffsets::new(vec![1]);
        // 05:02:30.500 -> next trigger 05:03:01.000
        let delay = offsets.initial_delay(local(5, 2, 30, 500));
        assert_eq!(delay, Duration::from_millis(30_500));
    }

    #[test]
    fn test_initial_delay_picks_nearest_offset() {
        let offsets = MinuteOffsets::new(vec![2, 32]);
        // 05:02:50 -> 05:03:02, not 05:03:32
        let delay = offsets.initial_delay(local(5, 2, 50, 0));
        assert_eq!(delay, Duration::from_secs(12));
    }

    #[test]
    fn test_next_delay_fires_within_current_minute() {
        let offsets = MinuteOffsets::new(vec![2, 32]);
        // A pass that finished at 05:03:04 must still hit 05:03:32.
        let delay = offsets.next_delay(local(5, 3, 4, 0));
        assert_eq!(delay, Duration::from_secs(28));
    }

    #[test]
    fn test_next_delay_wraps_to_next_minute() {
        let offsets = MinuteOffsets::new(vec![6]);
        // At exactly second 6 the trigger counts as passed.
        let delay = offsets.next_delay(local(5, 3, 6, 0));
        assert_eq!(delay, Duration::from_secs(60));

        let delay = offsets.next_delay(local(5, 3, 45, 0));
        assert_eq!(delay, Duration::from_secs(21));
    }

    #[test]
    fn test_offsets_are_normalized() {
        let offsets = MinuteOffsets::new(vec![62, 2, 2]);
        assert_eq!(offsets.offsets(), [2]);

        let empty = MinuteOffsets::new(Vec::new());
        assert_eq!(empty.offsets(), [0]);
    }

    #[tokio::test]
    async fn test_run_aligned_stops_on_cancellation() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let mut passes = 0u32;
        run_aligned("test", &MinuteOffsets::new(vec![0]), &shutdown, || {
            passes += 1;
            async {}
        })
        .await;
        assert_eq!(passes, 0);
    }
}
