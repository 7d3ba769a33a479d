//! Batched stepping.
//!
//! A batch advances [`Fields`] by many steps in one call, sampling the
//! energy, watching for energy decay and polling the process-wide interrupt
//! counter between steps. Per-step work of the caller (probes, flux
//! integration) is hooked in through a [`StepObserver`].

use super::Fields;
use instant::{Duration, Instant};
use log::{debug, warn};
use std::sync::atomic::{AtomicUsize, Ordering};

static INTERRUPT_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Ask running batches to stop after the step in progress.
///
/// Safe to call from a signal handler or another thread. A step is never
/// cut short.
pub fn request_interrupt() {
    let n = INTERRUPT_COUNT.fetch_add(1, Ordering::SeqCst) + 1;
    warn!("Interrupt requested ({n} so far)");
}

/// Number of interrupts requested since process start.
pub fn interrupt_count() -> usize {
    INTERRUPT_COUNT.load(Ordering::SeqCst)
}

/// Per-step hook of a batch.
pub trait StepObserver {
    /// Called after every completed step. Returning `Some(reason)` ends the
    /// batch.
    fn after_step(&mut self, fields: &Fields) -> Option<String>;
}

impl<F: FnMut(&Fields) -> Option<String>> StepObserver for F {
    fn after_step(&mut self, fields: &Fields) -> Option<String> {
        self(fields)
    }
}

/// Observer that never stops the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObserver;

impl StepObserver for NoObserver {
    fn after_step(&mut self, _fields: &Fields) -> Option<String> {
        None
    }
}

/// Configuration for a batch of timesteps.
#[derive(Debug, Clone, Default)]
pub struct StepBatch {
    /// Number of timesteps to execute (None = run until termination)
    pub num_steps: Option<u64>,

    /// Termination conditions
    pub termination: TerminationConfig,

    /// Energy monitoring settings
    pub energy_monitoring: EnergyMonitorConfig,
}

impl StepBatch {
    /// Batch of exactly `n` steps without monitoring.
    pub fn steps(n: u64) -> Self {
        Self {
            num_steps: Some(n),
            ..Default::default()
        }
    }
}

/// Result from executing a batch of timesteps.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Number of timesteps actually executed
    pub timesteps_executed: u64,

    /// Reason for termination
    pub termination_reason: TerminationReason,

    /// Energy samples collected during execution
    pub energy_samples: Vec<EnergySample>,

    /// Highest total energy seen at a termination check or sample
    pub peak_energy: f64,

    /// Wall clock time elapsed
    pub elapsed_time: Duration,
}

/// Reason why a batch terminated.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationReason {
    /// Completed requested number of steps
    StepsCompleted,

    /// Energy decay threshold reached
    EnergyDecay {
        /// Final decay in dB relative to peak
        final_decay_db: f64,
    },

    /// The observer requested early termination
    ObserverStop {
        /// Reason provided by the observer
        reason: String,
    },

    /// An interrupt was requested while the batch was running
    Interrupted,
}

/// Configuration for batch termination conditions.
#[derive(Debug, Clone)]
pub struct TerminationConfig {
    /// Maximum number of timesteps (enforced even if other conditions not met)
    pub max_timesteps: Option<u64>,

    /// Stop once the total energy has fallen this many dB below its peak
    pub energy_decay_db: Option<f64>,

    /// How often to check termination conditions (in timesteps)
    pub check_interval: u64,
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            max_timesteps: None,
            energy_decay_db: None,
            check_interval: 100,
        }
    }
}

/// Configuration for energy monitoring during batch execution.
#[derive(Debug, Clone, Default)]
pub struct EnergyMonitorConfig {
    /// Sample energy every N timesteps (0 = disabled)
    pub sample_interval: u64,
}

/// Energy sample at a specific timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergySample {
    /// Timestep when sample was taken
    pub timestep: u64,

    /// Electric field energy
    pub e_energy: f64,

    /// Magnetic field energy
    pub h_energy: f64,

    /// Energy absorbed by the polarizations
    pub thermo_energy: f64,

    /// Total energy (E + H + thermo)
    pub total_energy: f64,
}

impl EnergySample {
    /// Create a new energy sample.
    pub fn new(timestep: u64, e_energy: f64, h_energy: f64, thermo_energy: f64) -> Self {
        Self {
            timestep,
            e_energy,
            h_energy,
            thermo_energy,
            total_energy: e_energy + h_energy + thermo_energy,
        }
    }

    /// Measure the energy of the whole volume.
    pub fn from_fields(fields: &Fields) -> Self {
        let region = fields.volume().region();
        Self::new(
            fields.t(),
            fields.electric_energy_in_box(&region),
            fields.magnetic_energy_in_box(&region),
            fields.thermo_energy_in_box(&region),
        )
    }
}

/// Energy decay in dB relative to `peak` (≤ 0 once decaying).
fn decay_db(energy: f64, peak: f64) -> f64 {
    if peak <= 0.0 {
        return 0.0;
    }
    if energy <= 0.0 {
        return f64::NEG_INFINITY;
    }
    10.0 * (energy / peak).log10()
}

impl Fields {
    /// Run a batch of steps.
    ///
    /// Between steps the batch calls the observer, samples the energy every
    /// `sample_interval` steps, checks the decay every `check_interval`
    /// steps and polls [`interrupt_count`]. Without a step limit it runs
    /// until one of the other conditions fires.
    pub fn run_batch<O: StepObserver>(&mut self, batch: StepBatch, observer: &mut O) -> BatchResult {
        let start = Instant::now();
        let interrupts_at_start = interrupt_count();
        let limit = match (batch.num_steps, batch.termination.max_timesteps) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let sample_interval = batch.energy_monitoring.sample_interval;
        let check_interval = batch.termination.check_interval.max(1);

        let mut samples = Vec::new();
        let mut peak = 0.0f64;
        let mut executed = 0u64;
        let reason = loop {
            if limit.is_some_and(|n| executed >= n) {
                break TerminationReason::StepsCompleted;
            }
            if interrupt_count() != interrupts_at_start {
                break TerminationReason::Interrupted;
            }

            self.step();
            executed += 1;

            if let Some(reason) = observer.after_step(self) {
                break TerminationReason::ObserverStop { reason };
            }

            let sample_now = sample_interval > 0 && executed % sample_interval == 0;
            let check_now =
                batch.termination.energy_decay_db.is_some() && executed % check_interval == 0;
            if !sample_now && !check_now {
                continue;
            }
            let sample = EnergySample::from_fields(self);
            peak = peak.max(sample.total_energy);
            if sample_now {
                samples.push(sample);
            }
            if let (true, Some(threshold)) = (check_now, batch.termination.energy_decay_db) {
                let decay = decay_db(sample.total_energy, peak);
                debug!("t = {}: energy {:.4e}, {:.1} dB", self.t, sample.total_energy, decay);
                if decay <= -threshold.abs() {
                    break TerminationReason::EnergyDecay {
                        final_decay_db: decay,
                    };
                }
            }
        };

        BatchResult {
            timesteps_executed: executed,
            termination_reason: reason,
            energy_samples: samples,
            peak_energy: peak,
            elapsed_time: start.elapsed(),
        }
    }
}
