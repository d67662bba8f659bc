//! Fan-out/fan-in dispatch of clock pulses to settlements.
//!
//! The [`SettlementDispatcher`] owns one persistent work unit per
//! settlement and a bounded rayon pool. For every pulse it:
//!
//! 1. **Binds** settlements added since the last pulse and sizes the pool.
//! 2. **Delivers** queued presentation commands to their settlements.
//! 3. **Fans out** every work unit onto the pool and blocks until all
//!    return (the join barrier). A failing or panicking update is logged
//!    and skipped without touching the others.
//! 4. **Applies** the deferred cross-settlement effects in settlement order.
//!    Goods and units in transit land even from a failed or interrupted
//!    update; other effects from such updates are dropped.
//! 5. **Snapshots** the colony for the next pulse.
//!
//! Each work unit holds the only mutable borrow of its settlement while it
//! runs, so two settlements can never race.

use std::any::Any;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};

use habitat_agents::{AgentConfig, AgentError, MetaRegistry};
use habitat_types::{ClockPulse, PulseView, SettlementId};
use habitat_world::{
    ColonySnapshot, Command, CrossSettlementEffect, PulseScope, Settlement, ShutdownSignal,
};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, error, info, warn};

use crate::config::DispatcherConfig;
use crate::context::SimulationContext;

/// Errors returned by the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The dispatcher was shut down and accepts no more pulses.
    #[error("dispatcher is shut down")]
    ShutDown,

    /// The worker pool could not be built.
    #[error("failed to build worker pool: {source}")]
    PoolBuild {
        /// The underlying rayon error.
        #[from]
        source: rayon::ThreadPoolBuildError,
    },
}

/// The per-settlement update run inside a work unit.
///
/// Implementations must be shareable across pool threads; the dispatcher
/// calls [`time_passing`](Self::time_passing) once per settlement per pulse.
pub trait SettlementUpdater: Send + Sync {
    /// Apply one pulse to the settlement in `scope`.
    ///
    /// Returns `Ok(false)` when the update stopped early for shutdown.
    ///
    /// # Errors
    ///
    /// Any error skips the settlement for this pulse.
    fn time_passing(&self, scope: &mut PulseScope<'_>) -> Result<bool, AgentError>;
}

/// The production updater: worker physiology, tasks, decisions and missions.
#[derive(Debug)]
pub struct AgentUpdater {
    config: AgentConfig,
    registry: MetaRegistry,
}

impl AgentUpdater {
    /// An updater using every built-in meta-task.
    pub fn new(config: AgentConfig) -> Self {
        Self::with_registry(config, MetaRegistry::standard())
    }

    /// An updater consulting a custom set of meta-tasks.
    pub const fn with_registry(config: AgentConfig, registry: MetaRegistry) -> Self {
        Self { config, registry }
    }
}

impl SettlementUpdater for AgentUpdater {
    fn time_passing(&self, scope: &mut PulseScope<'_>) -> Result<bool, AgentError> {
        habitat_agents::time_passing(scope, &self.config, &self.registry)
    }
}

/// A settlement skipped for one pulse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSettlement {
    /// The settlement whose update failed.
    pub settlement: SettlementId,
    /// Error or panic message.
    pub reason: String,
}

/// Outcome of one dispatched pulse.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseReport {
    /// The pulse that was dispatched.
    pub pulse: ClockPulse,
    /// Settlements whose update ran to completion, in settlement order.
    pub updated: Vec<SettlementId>,
    /// Settlements skipped because their update failed or panicked.
    pub skipped: Vec<SkippedSettlement>,
    /// Whether shutdown interrupted the pulse; only handover effects were applied.
    pub interrupted: bool,
    /// Cross-settlement effects applied after the barrier.
    pub effects_applied: usize,
    /// Pool size used for the pulse.
    pub threads: usize,
}

impl PulseReport {
    /// The presentation view of this report.
    pub fn view(&self) -> PulseView {
        PulseView {
            id: self.pulse.id(),
            elapsed_millisols: self.pulse.elapsed(),
            sol: self.pulse.sol(),
            settlements_updated: u32::try_from(self.updated.len()).unwrap_or(u32::MAX),
            settlements_failed: u32::try_from(self.skipped.len()).unwrap_or(u32::MAX),
            interrupted: self.interrupted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum UnitOutcome {
    Idle,
    Updated,
    Interrupted,
    Failed(String),
}

/// One settlement bound to the dispatcher, reused across pulses.
#[derive(Debug)]
struct WorkUnit {
    settlement: Settlement,
    pulse: Option<ClockPulse>,
    outbox: Vec<CrossSettlementEffect>,
    outcome: UnitOutcome,
}

impl WorkUnit {
    const fn new(settlement: Settlement) -> Self {
        Self {
            settlement,
            pulse: None,
            outbox: Vec::new(),
            outcome: UnitOutcome::Idle,
        }
    }

    fn run(
        &mut self,
        snapshot: &ColonySnapshot,
        signal: &ShutdownSignal,
        updater: &dyn SettlementUpdater,
    ) {
        let Some(pulse) = self.pulse.take() else {
            return;
        };
        self.outbox.clear();
        if signal.is_raised() {
            self.outcome = UnitOutcome::Interrupted;
            return;
        }

        let id = self.settlement.id;
        let settlement = &mut self.settlement;
        let outbox = &mut self.outbox;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut scope = PulseScope::new(settlement, pulse, snapshot, signal, outbox);
            updater.time_passing(&mut scope)
        }));

        self.outcome = match result {
            Ok(Ok(true)) => UnitOutcome::Updated,
            Ok(Ok(false)) => UnitOutcome::Interrupted,
            Ok(Err(err)) => {
                error!(
                    settlement = %id,
                    pulse = pulse.id(),
                    error = %err,
                    "settlement update failed, pulse skipped"
                );
                UnitOutcome::Failed(err.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    settlement = %id,
                    pulse = pulse.id(),
                    panic = %message,
                    "settlement update panicked, pulse skipped"
                );
                UnitOutcome::Failed(message)
            }
        };
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

/// Move effects that carry goods or units out of `outbox`; drop the rest.
fn keep_handovers(
    outbox: &mut Vec<CrossSettlementEffect>,
    effects: &mut Vec<CrossSettlementEffect>,
) {
    effects.extend(outbox.drain(..).filter(CrossSettlementEffect::is_handover));
}

/// Number of hardware threads, or 1 when unknown.
pub fn available_cores() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Pool size for `settlements` settlements on `cores` cores.
///
/// Half a thread per settlement, capped by the cores left after the
/// reserved ones, never fewer than one. A configured `worker_threads`
/// wins outright.
pub fn pool_size(settlements: usize, cores: usize, config: &DispatcherConfig) -> usize {
    if let Some(threads) = config.worker_threads {
        return threads.max(1);
    }
    (settlements / 2)
        .min(cores.saturating_sub(config.reserved_cores))
        .max(1)
}

/// Parallel coordinator for per-settlement updates.
#[derive(Debug)]
pub struct SettlementDispatcher {
    config: DispatcherConfig,
    units: BTreeMap<SettlementId, WorkUnit>,
    pending: Vec<Settlement>,
    pool: Option<ThreadPool>,
    signal: ShutdownSignal,
    shut_down: bool,
}

impl SettlementDispatcher {
    /// A dispatcher with no settlements; the pool is built on first use.
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            units: BTreeMap::new(),
            pending: Vec::new(),
            pool: None,
            signal: ShutdownSignal::new(),
            shut_down: false,
        }
    }

    /// Add a settlement; it is bound to a work unit on the next pulse.
    pub fn add_settlement(&mut self, settlement: Settlement) -> SettlementId {
        let id = settlement.id;
        self.pending.push(settlement);
        id
    }

    /// Every settlement, bound or pending.
    pub fn settlements(&self) -> impl Iterator<Item = &Settlement> {
        self.units
            .values()
            .map(|unit| &unit.settlement)
            .chain(self.pending.iter())
    }

    /// Look up a settlement.
    pub fn settlement(&self, id: SettlementId) -> Option<&Settlement> {
        self.settlements().find(|settlement| settlement.id == id)
    }

    /// Look up a settlement for mutation between pulses.
    pub fn settlement_mut(&mut self, id: SettlementId) -> Option<&mut Settlement> {
        if let Some(unit) = self.units.get_mut(&id) {
            return Some(&mut unit.settlement);
        }
        self.pending.iter_mut().find(|settlement| settlement.id == id)
    }

    /// Number of settlements, bound or pending.
    pub fn len(&self) -> usize {
        self.units.len() + self.pending.len()
    }

    /// Whether no settlement is known.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current pool size, if the pool exists.
    pub fn thread_count(&self) -> Option<usize> {
        self.pool.as_ref().map(ThreadPool::current_num_threads)
    }

    /// Pool size the next pulse will use.
    pub fn target_threads(&self) -> usize {
        pool_size(self.len(), available_cores(), &self.config)
    }

    /// A handle to the cooperative cancellation flag.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    /// Whether the dispatcher refuses further pulses.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down || self.signal.is_raised()
    }

    /// Stop accepting pulses, cancel in-flight updates and drop the pool.
    pub fn shutdown(&mut self) {
        self.signal.raise();
        self.pool = None;
        if !self.shut_down {
            info!(settlements = self.len(), "dispatcher shut down");
        }
        self.shut_down = true;
    }

    /// Rebind every work unit to freshly loaded settlements.
    ///
    /// Drops the pool, reseeds each settlement's random stream from
    /// `pulse_id` and prunes stale mission references.
    pub fn reinit(&mut self, settlements: Vec<Settlement>, pulse_id: u64, now: f64) {
        self.pool = None;
        self.pending.clear();
        self.units.clear();
        for mut settlement in settlements {
            settlement.reinit(pulse_id, now);
            self.units.insert(settlement.id, WorkUnit::new(settlement));
        }
        info!(settlements = self.units.len(), pulse = pulse_id, "dispatcher reinitialized");
    }

    fn apply_effects(&mut self, effects: Vec<CrossSettlementEffect>, pulse_id: u64) -> usize {
        let mut applied = 0_usize;
        for effect in effects {
            let target = effect.target();
            let Some(unit) = self.units.get_mut(&target) else {
                warn!(
                    pulse = pulse_id,
                    settlement = %target,
                    "effect for unknown settlement dropped"
                );
                continue;
            };
            match effect.apply(&mut unit.settlement) {
                Ok(()) => applied = applied.saturating_add(1),
                Err(err) => {
                    error!(
                        pulse = pulse_id,
                        settlement = %target,
                        error = %err,
                        "deferred effect failed"
                    );
                }
            }
        }
        applied
    }

    /// Dispatch `pulse` to every settlement and wait for all of them.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ShutDown`] after [`shutdown`](Self::shutdown)
    /// and [`DispatchError::PoolBuild`] if the pool cannot be created.
    /// Failures inside a settlement's update are not errors; they appear in
    /// [`PulseReport::skipped`].
    pub fn on_pulse(
        &mut self,
        pulse: ClockPulse,
        context: &mut SimulationContext,
        updater: &dyn SettlementUpdater,
    ) -> Result<PulseReport, DispatchError> {
        if self.is_shut_down() {
            return Err(DispatchError::ShutDown);
        }
        self.bind_pending();
        let threads = self.ensure_pool()?;
        self.deliver_commands(context.take_commands(), pulse.id());
        for unit in self.units.values_mut() {
            unit.pulse = Some(pulse);
            unit.outcome = UnitOutcome::Idle;
        }

        let Some(pool) = self.pool.as_ref() else {
            return Err(DispatchError::ShutDown);
        };
        let snapshot = context.snapshot();
        let signal = &self.signal;
        let units = &mut self.units;
        pool.scope(|scope| {
            for unit in units.values_mut() {
                scope.spawn(move |_| unit.run(snapshot, signal, updater));
            }
        });

        let mut report = PulseReport {
            pulse,
            updated: Vec::new(),
            skipped: Vec::new(),
            interrupted: self.signal.is_raised(),
            effects_applied: 0,
            threads,
        };
        let mut effects = Vec::new();
        for (id, unit) in &mut self.units {
            match std::mem::replace(&mut unit.outcome, UnitOutcome::Idle) {
                UnitOutcome::Updated => {
                    report.updated.push(*id);
                    effects.append(&mut unit.outbox);
                }
                UnitOutcome::Interrupted => {
                    report.interrupted = true;
                    keep_handovers(&mut unit.outbox, &mut effects);
                }
                UnitOutcome::Failed(reason) => {
                    keep_handovers(&mut unit.outbox, &mut effects);
                    report.skipped.push(SkippedSettlement {
                        settlement: *id,
                        reason,
                    });
                }
                UnitOutcome::Idle => {}
            }
        }

        if report.interrupted {
            effects.retain(CrossSettlementEffect::is_handover);
            report.effects_applied = self.apply_effects(effects, pulse.id());
            warn!(
                pulse = pulse.id(),
                handovers = report.effects_applied,
                "pulse interrupted by shutdown, other deferred effects discarded"
            );
            return Ok(report);
        }

        report.effects_applied = self.apply_effects(effects, pulse.id());
        context.set_snapshot(ColonySnapshot::capture(
            pulse.id(),
            self.units.values().map(|unit| &unit.settlement),
        ));
        debug!(
            pulse = pulse.id(),
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            effects = report.effects_applied,
            threads,
            "pulse dispatched"
        );
        Ok(report)
    }

    fn bind_pending(&mut self) {
        for settlement in self.pending.drain(..) {
            debug!(settlement = %settlement.id, name = %settlement.name, "settlement bound");
            self.units.insert(settlement.id, WorkUnit::new(settlement));
        }
    }

    fn ensure_pool(&mut self) -> Result<usize, DispatchError> {
        let target = self.target_threads();
        if self.thread_count() == Some(target) {
            return Ok(target);
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(target)
            .thread_name(|index| format!("habitat-worker-{index}"))
            .build()?;
        info!(threads = target, settlements = self.units.len(), "worker pool built");
        self.pool = Some(pool);
        Ok(target)
    }

    fn deliver_commands(&mut self, commands: Vec<(SettlementId, Command)>, pulse_id: u64) {
        for (id, command) in commands {
            match self.units.get_mut(&id) {
                Some(unit) => unit.settlement.commands.push_back(command),
                None => warn!(
                    pulse = pulse_id,
                    settlement = %id,
                    ?command,
                    "command for unknown settlement dropped"
                ),
            }
        }
    }
}
