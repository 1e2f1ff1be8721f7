//! Rate governor for collaborator calls.
//!
//! Enforces a minimum interval between calls and a call quota per window.
//! The governor never sleeps: a call that arrives too early is denied and
//! the caller takes the algorithmic path instead.
//!
//! The clock is injected so tests can drive time by hand.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of monotonic time.
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GovernorConfig {
    pub min_interval_secs: f64,
    pub max_calls_per_window: u32,
    pub window_secs: f64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 10.0,
            max_calls_per_window: 50,
            window_secs: 3600.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DenyReason {
    /// The window quota is used up.
    QuotaExhausted,
    /// The previous call was too recent; retry after the given wait.
    TooSoon(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Permit {
    Granted,
    Denied(DenyReason),
}

impl Permit {
    pub fn is_granted(&self) -> bool {
        matches!(self, Permit::Granted)
    }
}

/// Snapshot for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernorStatus {
    pub api_available: bool,
    pub remaining_calls: u32,
    pub next_call_in_seconds: f64,
    pub fallback_mode: bool,
}

#[derive(Debug, Default)]
struct GovernorState {
    last_call: Option<Duration>,
    window_start: Duration,
    calls_in_window: u32,
}

/// Shared, thread-safe call-rate governor.
pub struct RateGovernor<C: Clock = SystemClock> {
    config: GovernorConfig,
    clock: C,
    state: Mutex<GovernorState>,
}

impl RateGovernor<SystemClock> {
    pub fn new(config: GovernorConfig) -> Self {
        Self::with_clock(config, SystemClock::default())
    }
}

impl<C: Clock> RateGovernor<C> {
    pub fn with_clock(config: GovernorConfig, clock: C) -> Self {
        let window_start = clock.now();
        Self {
            config,
            clock,
            state: Mutex::new(GovernorState {
                window_start,
                ..GovernorState::default()
            }),
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Decide whether a collaborator call may happen now, recording it if so.
    pub fn try_acquire(&self) -> Permit {
        let now = self.clock.now();
        let mut state = self.lock();
        self.roll_window(&mut state, now);

        if state.calls_in_window >= self.config.max_calls_per_window {
            log::info!(
                "Call quota reached ({}), using fallback",
                self.config.max_calls_per_window
            );
            return Permit::Denied(DenyReason::QuotaExhausted);
        }
        let wait = self.wait_remaining(&state, now);
        if !wait.is_zero() {
            log::info!("Rate limited, next call in {:.1}s", wait.as_secs_f64());
            return Permit::Denied(DenyReason::TooSoon(wait));
        }

        state.last_call = Some(now);
        state.calls_in_window += 1;
        Permit::Granted
    }

    pub fn status(&self) -> GovernorStatus {
        let now = self.clock.now();
        let mut state = self.lock();
        self.roll_window(&mut state, now);
        let remaining_calls = self
            .config
            .max_calls_per_window
            .saturating_sub(state.calls_in_window);
        let wait = self.wait_remaining(&state, now);
        GovernorStatus {
            api_available: remaining_calls > 0 && wait.is_zero(),
            remaining_calls,
            next_call_in_seconds: wait.as_secs_f64(),
            fallback_mode: remaining_calls == 0,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GovernorState> {
        // State is plain counters; a poisoned lock still holds usable values.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn roll_window(&self, state: &mut GovernorState, now: Duration) {
        let window = secs_to_duration(self.config.window_secs);
        if now.saturating_sub(state.window_start) >= window {
            state.window_start = now;
            state.calls_in_window = 0;
        }
    }

    fn wait_remaining(&self, state: &GovernorState, now: Duration) -> Duration {
        let interval = secs_to_duration(self.config.min_interval_secs);
        match state.last_call {
            Some(last) => interval.saturating_sub(now.saturating_sub(last)),
            None => Duration::ZERO,
        }
    }
}

/// Config seconds as a `Duration`; negative or NaN is zero, anything too
/// large for a `Duration` saturates.
fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}
