//! Time sources for holds and delays.
//!
//! The run is strictly sequential, so a safety hold only has to stop the
//! current flow. [`SimulatedClock`] advances virtual time instantly;
//! [`WallClock`] really waits, in short slices, so a cancellation can cut the
//! hold short.

use super::error::{CellError, Result};
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared flag used to stop a run between units or during a hold
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Source of simulated time for the cell
pub trait Clock {
    /// Account for work that took `seconds` of cell time
    fn advance(&mut self, seconds: f64);

    /// Pause the cell for `seconds`; returns early with `Cancelled` if the token fires
    fn hold(&mut self, seconds: f64, token: &CancellationToken) -> Result<()>;

    /// Total cell time accounted so far
    fn elapsed_seconds(&self) -> f64;
}

/// Virtual clock: every advance and hold completes immediately
#[derive(Debug, Clone, Default)]
pub struct SimulatedClock {
    elapsed: f64,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SimulatedClock {
    fn advance(&mut self, seconds: f64) {
        self.elapsed += seconds.max(0.0);
    }

    fn hold(&mut self, seconds: f64, token: &CancellationToken) -> Result<()> {
        if token.is_cancelled() {
            return Err(CellError::Cancelled { completed_units: 0 });
        }
        self.advance(seconds);
        Ok(())
    }

    fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }
}

/// Clock that sleeps for holds, scaled by `time_scale` (0.05 = one twentieth of real time)
#[derive(Debug, Clone)]
pub struct WallClock {
    elapsed: f64,
    time_scale: f64,
    slice: Duration,
}

impl WallClock {
    pub fn new(time_scale: f64) -> Self {
        Self {
            elapsed: 0.0,
            time_scale: time_scale.max(0.0),
            slice: Duration::from_millis(50),
        }
    }
}

impl Clock for WallClock {
    fn advance(&mut self, seconds: f64) {
        self.elapsed += seconds.max(0.0);
    }

    fn hold(&mut self, seconds: f64, token: &CancellationToken) -> Result<()> {
        let scaled = (seconds * self.time_scale).max(0.0);
        let total = Duration::try_from_secs_f64(scaled).map_err(|e| {
            CellError::Configuration(format!("hold of {}s cannot be timed: {}", seconds, e))
        })?;
        debug!("[Clock] Holding for {:?} of wall time", total);

        let mut waited = Duration::ZERO;
        while waited < total {
            if token.is_cancelled() {
                return Err(CellError::Cancelled { completed_units: 0 });
            }
            let step = self.slice.min(total - waited);
            std::thread::sleep(step);
            waited += step;
        }
        if token.is_cancelled() {
            return Err(CellError::Cancelled { completed_units: 0 });
        }

        self.advance(seconds);
        Ok(())
    }

    fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_simulated_hold_is_instant() {
        let mut clock = SimulatedClock::new();
        let start = Instant::now();
        clock.hold(20.0, &CancellationToken::new()).unwrap();
        clock.advance(5.0);
        assert!(start.elapsed() < Duration::from_millis(100));
        assert_eq!(clock.elapsed_seconds(), 25.0);
    }

    #[test]
    fn test_negative_advance_ignored() {
        let mut clock = SimulatedClock::new();
        clock.advance(-3.0);
        assert_eq!(clock.elapsed_seconds(), 0.0);
    }

    #[test]
    fn test_cancelled_hold_does_not_advance() {
        let token = CancellationToken::new();
        token.cancel();
        let mut clock = SimulatedClock::new();
        assert!(matches!(clock.hold(20.0, &token), Err(CellError::Cancelled { .. })));
        assert_eq!(clock.elapsed_seconds(), 0.0);
    }

    #[test]
    fn test_wall_clock_hold_can_be_cancelled() {
        let token = CancellationToken::new();
        let remote = token.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(60));
            remote.cancel();
        });

        let mut clock = WallClock::new(1.0);
        let start = Instant::now();
        let result = clock.hold(30.0, &token);
        canceller.join().unwrap();

        assert!(matches!(result, Err(CellError::Cancelled { .. })));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(clock.elapsed_seconds(), 0.0);
    }

    #[test]
    fn test_wall_clock_rejects_untimeable_hold() {
        let token = CancellationToken::new();
        let mut clock = WallClock::new(1.0);
        assert!(matches!(clock.hold(1e300, &token), Err(CellError::Configuration(_))));

        let mut unbounded = WallClock::new(f64::INFINITY);
        assert!(matches!(unbounded.hold(20.0, &token), Err(CellError::Configuration(_))));
        assert_eq!(clock.elapsed_seconds(), 0.0);
        assert_eq!(unbounded.elapsed_seconds(), 0.0);
    }

    #[test]
    fn test_wall_clock_scaled_hold_completes() {
        let mut clock = WallClock::new(0.001);
        clock.hold(20.0, &CancellationToken::new()).unwrap();
        assert_eq!(clock.elapsed_seconds(), 20.0);
    }
}
