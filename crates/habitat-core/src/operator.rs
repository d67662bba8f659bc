//! Operator control state for runtime simulation management.
//!
//! This module provides shared state used by the run loop and whatever
//! console or presentation layer drives it. The operator can pause and
//! resume, change pacing, queue commands for settlements and trigger a
//! clean stop without tearing down the process.
//!
//! # Architecture
//!
//! Control fields read on every loop iteration are atomics, so the hot path
//! takes no locks. The command queue and end reason sit behind
//! [`tokio::sync::Mutex`] because they are only touched between pulses.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use habitat_types::SettlementId;
use habitat_world::Command;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

use crate::config::SimulationBoundsConfig;

/// Smallest pulse interval an operator may request at runtime.
pub const MIN_TICK_INTERVAL_MS: u64 = 10;

/// Reason why the simulation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEndReason {
    /// Reached the configured `max_pulses` limit.
    MaxPulsesReached,
    /// Reached the configured `max_real_time_seconds` limit.
    MaxRealTimeReached,
    /// An operator issued a stop command.
    OperatorStop,
    /// The dispatcher was shut down underneath the run loop.
    DispatcherShutDown,
}

/// Shared operator control state.
///
/// Wrapped in an [`Arc`](std::sync::Arc) and shared between the run loop
/// and the operator's handlers.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether the simulation is currently paused.
    paused: AtomicBool,

    /// Notification used to wake the run loop when resumed.
    resume_notify: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Current pulse interval in milliseconds (runtime-adjustable).
    tick_interval_ms: AtomicU64,

    /// Wall-clock time when the simulation started.
    started_at: DateTime<Utc>,

    /// Maximum number of pulses (0 = unlimited).
    max_pulses: u64,

    /// Maximum wall-clock seconds (0 = unlimited).
    max_real_time_seconds: u64,

    /// Commands waiting for the next pulse.
    commands: Mutex<Vec<(SettlementId, Command)>>,

    /// Reason the simulation ended, if it has.
    end_reason: Mutex<Option<SimulationEndReason>>,
}

impl OperatorState {
    /// Create a new operator state from configuration.
    pub fn new(tick_interval_ms: u64, bounds: &SimulationBoundsConfig) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(tick_interval_ms),
            started_at: Utc::now(),
            max_pulses: bounds.max_pulses,
            max_real_time_seconds: bounds.max_real_time_seconds,
            commands: Mutex::new(Vec::new()),
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether the simulation is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause the simulation. The run loop sleeps until resumed.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume the simulation and wake the run loop.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Wait until the simulation is no longer paused.
    ///
    /// Returns immediately if not paused. A stop request also ends the wait.
    pub async fn wait_if_paused(&self) {
        while self.is_paused() && !self.is_stop_requested() {
            self.resume_notify.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean simulation stop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record the reason the simulation ended.
    pub async fn set_end_reason(&self, reason: SimulationEndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
    }

    /// Get the reason the simulation ended, if it has.
    pub async fn end_reason(&self) -> Option<SimulationEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Pacing
    // -----------------------------------------------------------------------

    /// Get the current pulse interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Set the pulse interval in milliseconds.
    ///
    /// Returns the previous interval, or `None` if the value was rejected
    /// (below [`MIN_TICK_INTERVAL_MS`]).
    pub fn set_tick_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms < MIN_TICK_INTERVAL_MS {
            return None;
        }
        Some(self.tick_interval_ms.swap(ms, Ordering::AcqRel))
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Whether `max_pulses > 0` and `pulse_id >= max_pulses`.
    pub const fn pulse_limit_reached(&self, pulse_id: u64) -> bool {
        self.max_pulses > 0 && pulse_id >= self.max_pulses
    }

    /// Whether `max_real_time_seconds > 0` and that much wall-clock time
    /// has passed since start.
    pub fn time_limit_reached(&self) -> bool {
        self.max_real_time_seconds > 0 && self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since simulation start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        // `num_seconds` can be negative if the wall clock steps back; treat as 0.
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Get the configured max pulses.
    pub const fn max_pulses(&self) -> u64 {
        self.max_pulses
    }

    /// Get the configured max real-time seconds.
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Queue a command for `settlement`'s next pulse.
    pub async fn submit_command(&self, settlement: SettlementId, command: Command) {
        self.commands.lock().await.push((settlement, command));
    }

    /// Drain all queued commands, oldest first.
    pub async fn drain_commands(&self) -> Vec<(SettlementId, Command)> {
        std::mem::take(&mut *self.commands.lock().await)
    }

    /// A status snapshot for display.
    pub async fn status(&self, pulse: u64, sol: u64, settlements: usize) -> SimulationStatus {
        SimulationStatus {
            pulse,
            sol,
            paused: self.is_paused(),
            stop_requested: self.is_stop_requested(),
            tick_interval_ms: self.tick_interval_ms(),
            elapsed_seconds: self.elapsed_seconds(),
            max_pulses: self.max_pulses,
            max_real_time_seconds: self.max_real_time_seconds,
            settlements,
            end_reason: self.end_reason().await,
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

/// JSON-serializable status of the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationStatus {
    /// Id of the last dispatched pulse.
    pub pulse: u64,
    /// Current sol.
    pub sol: u64,
    /// Whether the simulation is paused.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Current pulse interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Elapsed wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// Configured maximum pulses (0 = unlimited).
    pub max_pulses: u64,
    /// Configured maximum real-time seconds (0 = unlimited).
    pub max_real_time_seconds: u64,
    /// Number of settlements.
    pub settlements: usize,
    /// The reason the simulation ended, if applicable.
    pub end_reason: Option<SimulationEndReason>,
    /// RFC 3339 timestamp of when the simulation started.
    pub started_at: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use habitat_types::UnitId;

    use super::*;

    fn unbounded() -> SimulationBoundsConfig {
        SimulationBoundsConfig {
            max_pulses: 0,
            max_real_time_seconds: 0,
        }
    }

    #[test]
    fn initial_state_is_not_paused() {
        let state = OperatorState::new(1000, &unbounded());
        assert!(!state.is_paused());
        assert!(!state.is_stop_requested());
    }

    #[test]
    fn pause_and_resume() {
        let state = OperatorState::new(1000, &unbounded());
        state.pause();
        assert!(state.is_paused());
        state.resume();
        assert!(!state.is_paused());
    }

    #[test]
    fn set_tick_interval() {
        let state = OperatorState::new(1000, &unbounded());
        assert_eq!(state.set_tick_interval_ms(2000), Some(1000));
        assert_eq!(state.tick_interval_ms(), 2000);
    }

    #[test]
    fn reject_too_short_interval() {
        let state = OperatorState::new(1000, &unbounded());
        assert!(state.set_tick_interval_ms(MIN_TICK_INTERVAL_MS - 1).is_none());
        assert_eq!(state.tick_interval_ms(), 1000);
    }

    #[test]
    fn zero_limits_mean_unlimited() {
        let state = OperatorState::new(1000, &unbounded());
        assert!(!state.pulse_limit_reached(999_999));
        assert!(!state.time_limit_reached());
    }

    #[test]
    fn pulse_limit_reached() {
        let bounds = SimulationBoundsConfig {
            max_pulses: 100,
            max_real_time_seconds: 0,
        };
        let state = OperatorState::new(1000, &bounds);
        assert!(!state.pulse_limit_reached(99));
        assert!(state.pulse_limit_reached(100));
        assert!(state.pulse_limit_reached(101));
    }

    #[tokio::test]
    async fn submit_and_drain_commands() {
        let state = OperatorState::new(1000, &unbounded());
        let settlement = SettlementId::new();
        state
            .submit_command(settlement, Command::ClearTask { worker: UnitId(5) })
            .await;
        let commands = state.drain_commands().await;
        assert_eq!(commands.len(), 1);
        assert!(state.drain_commands().await.is_empty());
    }

    #[tokio::test]
    async fn stop_wakes_a_paused_waiter() {
        let state = std::sync::Arc::new(OperatorState::new(1000, &unbounded()));
        state.pause();
        let waiter = {
            let state = std::sync::Arc::clone(&state);
            tokio::spawn(async move { state.wait_if_paused().await })
        };
        state.request_stop();
        tokio::time::timeout(std::time::Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn status_reports_end_reason() {
        let state = OperatorState::new(1000, &unbounded());
        state.set_end_reason(SimulationEndReason::OperatorStop).await;
        let status = state.status(7, 1, 2).await;
        assert_eq!(status.pulse, 7);
        assert_eq!(status.end_reason, Some(SimulationEndReason::OperatorStop));
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("OperatorStop"));
    }
}
