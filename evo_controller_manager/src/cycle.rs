//! Periodic driver of [`ControllerManager::update`].
//!
//! ## RT setup
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`
//! 2. `sched_setaffinity` to the configured core
//! 3. `sched_setscheduler(SCHED_FIFO, priority)`
//!
//! Every step is a no-op without the `rt` feature.
//!
//! ## Loop
//! `update(time, period)` once per period, `std::thread::sleep` for the
//! remainder. An ERROR status is counted and logged; the loop keeps running.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use evo_common::consts::STATS_LOG_INTERVAL_CYCLES;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::manager::ControllerManager;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: u64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: u64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: u64,
    /// Running sum for the average.
    pub sum_cycle_ns: u64,
    /// Cycles that took longer than the period.
    pub overruns: u64,
    /// Cycles where `update` returned ERROR.
    pub errors: u64,
}

impl CycleStats {
    /// Zeroed stats.
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: u64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            errors: 0,
        }
    }

    /// Record one cycle.
    #[inline]
    pub fn record(&mut self, duration_ns: u64, budget_ns: u64, failed: bool) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
        if duration_ns > budget_ns {
            self.overruns += 1;
        }
        if failed {
            self.errors += 1;
        }
    }

    /// Average cycle time [ns]; 0 before the first cycle.
    #[inline]
    pub fn avg_cycle_ns(&self) -> u64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Errors during RT setup.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),
    /// Period of zero.
    #[error("invalid cycle period: {0:?}")]
    InvalidPeriod(Duration),
}

#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 targets the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Lock memory, pin the calling thread and switch it to SCHED_FIFO.
///
/// Call from the loop thread before [`CycleRunner::run`].
pub fn rt_setup(cpu_core: Option<usize>, rt_priority: Option<i32>) -> Result<(), CycleError> {
    rt_mlockall()?;
    if let Some(cpu) = cpu_core {
        rt_set_affinity(cpu)?;
    }
    if let Some(priority) = rt_priority {
        rt_set_scheduler(priority)?;
    }
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Drives the manager's update loop at a fixed period.
pub struct CycleRunner {
    manager: Arc<ControllerManager>,
    period: Duration,
    running: Arc<AtomicBool>,
    max_cycles: Option<u64>,
    stats: CycleStats,
}

impl CycleRunner {
    /// Runner calling `manager.update` every `period`.
    ///
    /// # Errors
    /// `CycleError::InvalidPeriod` for a zero period.
    pub fn new(manager: Arc<ControllerManager>, period: Duration) -> Result<Self, CycleError> {
        if period.is_zero() {
            return Err(CycleError::InvalidPeriod(period));
        }
        Ok(Self {
            manager,
            period,
            running: Arc::new(AtomicBool::new(true)),
            max_cycles: None,
            stats: CycleStats::new(),
        })
    }

    /// Stop after `cycles` updates.
    #[must_use]
    pub fn with_max_cycles(mut self, cycles: Option<u64>) -> Self {
        self.max_cycles = cycles;
        self
    }

    /// Flag that keeps the loop alive; clear it to stop after the current cycle.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Statistics so far.
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Run until the running flag clears or the cycle limit is hit.
    ///
    /// `time` passed to `update` is the elapsed time since the loop started.
    pub fn run(&mut self) -> &CycleStats {
        let budget_ns = self.period.as_nanos() as u64;
        let start = Instant::now();
        info!(period_us = self.period.as_micros() as u64, "update loop started");

        while self.running.load(Ordering::SeqCst) {
            if self.max_cycles.is_some_and(|max| self.stats.cycle_count >= max) {
                break;
            }

            let cycle_start = Instant::now();
            let status = self.manager.update(cycle_start - start, self.period);
            let elapsed = cycle_start.elapsed();

            let failed = !status.is_ok();
            self.stats
                .record(elapsed.as_nanos() as u64, budget_ns, failed);
            if failed {
                warn!(cycle = self.stats.cycle_count, "update returned ERROR");
            }

            if self.stats.cycle_count % STATS_LOG_INTERVAL_CYCLES == 0 {
                debug!(
                    cycles = self.stats.cycle_count,
                    avg_ns = self.stats.avg_cycle_ns(),
                    max_ns = self.stats.max_cycle_ns,
                    overruns = self.stats.overruns,
                    errors = self.stats.errors,
                    "loop statistics"
                );
            }

            if let Some(remaining) = self.period.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }

        info!(
            cycles = self.stats.cycle_count,
            overruns = self.stats.overruns,
            errors = self.stats.errors,
            "update loop stopped"
        );
        &self.stats
    }
}
