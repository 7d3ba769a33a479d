//! High-level simulation control.
//!
//! [`Simulation`] wraps [`Fields`] with probes, flux monitors, an end
//! condition and progress reporting, and runs everything as one batch.

use super::{
    BatchResult, EnergyMonitorConfig, EnergySample, Fields, StepBatch, StepObserver,
    TerminationConfig, TerminationReason,
};
use crate::diagnostics::{FluxPlane, MonitorPoint};
use crate::geometry::Position;
use crate::{Error, Result};

use indicatif::{ProgressBar, ProgressStyle};
use instant::Instant;
use log::{info, warn};

/// Step cap for runs that end on energy decay.
const MAX_DECAY_STEPS: u64 = 1_000_000;

/// Simulation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    /// Initial state, not yet set up
    Created,
    /// Set up and ready to run
    Ready,
    /// Currently running
    Running,
    /// Completed
    Finished,
    /// Stopped early (by interrupt or observer)
    Stopped,
}

/// End condition for simulation
#[derive(Debug, Clone, PartialEq)]
pub enum EndCondition {
    /// Run for fixed number of timesteps
    Timesteps(u64),
    /// Run for a fixed span of simulated time
    SimulationTime(f64),
    /// Run until every pulsed source has ended, plus some extra time
    AfterSources {
        /// Simulated time to keep running after the last source
        extra_time: f64,
    },
    /// Run until energy decays below threshold (in dB relative to peak)
    EnergyDecay(f64),
}

impl Default for EndCondition {
    fn default() -> Self {
        Self::Timesteps(10000)
    }
}

/// Statistics from a simulation run
#[derive(Debug, Clone)]
pub struct SimulationStats {
    /// Total timesteps executed
    pub timesteps: u64,
    /// Simulated time covered by the run
    pub sim_time: f64,
    /// Wall clock time (seconds)
    pub wall_time: f64,
    /// Peak energy during simulation
    pub peak_energy: f64,
    /// Final energy
    pub final_energy: f64,
    /// Average speed (million grid points per second)
    pub speed_mcells_per_sec: f64,
    /// Why the run ended
    pub termination_reason: TerminationReason,
}

/// Field samples at a fixed position.
#[derive(Debug, Clone)]
pub struct Probe {
    /// Sampling position
    pub position: Position,
    /// Sample every this many steps
    pub every: u64,
    /// Recorded samples, oldest first
    pub points: Vec<MonitorPoint>,
}

/// Flux through a plane, integrated over time.
#[derive(Debug, Clone)]
pub struct FluxMonitor {
    /// Plane the flux is measured through
    pub plane: FluxPlane,
    /// `∫ Re(flux) dt` so far
    pub energy: f64,
    /// `(time, Re(flux))` after every step
    pub history: Vec<(f64, f64)>,
}

/// Per-step recording of probes and flux monitors.
struct Recorder<'a> {
    probes: &'a mut [Probe],
    fluxes: &'a mut [FluxMonitor],
    progress: Option<&'a ProgressBar>,
    start: u64,
}

impl StepObserver for Recorder<'_> {
    fn after_step(&mut self, fields: &Fields) -> Option<String> {
        let t = fields.t();
        for probe in self.probes.iter_mut() {
            if t % probe.every == 0 {
                fields.get_new_point(probe.position, &mut probe.points);
            }
        }
        if !self.fluxes.is_empty() {
            let dt = fields.volume().dt();
            // Flux is centred at the H time level, half a step back.
            let time = fields.time() - 0.5 * dt;
            for monitor in self.fluxes.iter_mut() {
                let flux = fields.get_flux(&monitor.plane).re;
                monitor.energy += flux * dt;
                monitor.history.push((time, flux));
            }
        }
        if let Some(pb) = self.progress {
            let done = t - self.start;
            if done % 100 == 0 {
                pb.set_position(done);
            }
        }
        None
    }
}

/// Main simulation controller.
pub struct Simulation {
    /// Field state being advanced
    fields: Fields,
    /// Point probes
    probes: Vec<Probe>,
    /// Flux monitors
    flux_monitors: Vec<FluxMonitor>,
    /// End condition
    end_condition: EndCondition,
    /// Current state
    state: SimulationState,
    /// Verbosity level
    verbose: u8,
    /// Show progress bar
    show_progress: bool,
    /// Energy sampling interval (0 = off)
    energy_sample_interval: u64,
    /// Energy samples of the last run
    energy_samples: Vec<EnergySample>,
}

impl Simulation {
    /// Create a new simulation around prepared fields.
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            probes: Vec::new(),
            flux_monitors: Vec::new(),
            end_condition: EndCondition::default(),
            state: SimulationState::Created,
            verbose: 1,
            show_progress: true,
            energy_sample_interval: 0,
            energy_samples: Vec::new(),
        }
    }

    /// Set end condition.
    pub fn set_end_condition(&mut self, condition: EndCondition) -> &mut Self {
        self.end_condition = condition;
        self
    }

    /// Set verbosity level (0=quiet, 1=normal, 2=verbose).
    pub fn set_verbose(&mut self, level: u8) -> &mut Self {
        self.verbose = level;
        self
    }

    /// Enable/disable progress bar.
    pub fn set_show_progress(&mut self, show: bool) -> &mut Self {
        self.show_progress = show;
        self
    }

    /// Sample the total energy every `interval` steps (0 disables).
    pub fn set_energy_sample_interval(&mut self, interval: u64) -> &mut Self {
        self.energy_sample_interval = interval;
        self
    }

    /// Record every component at `position` every `every` steps.
    ///
    /// Returns the probe index.
    pub fn add_probe(&mut self, position: Position, every: u64) -> Result<usize> {
        if every == 0 {
            return Err(Error::Config("probe interval must be at least one step".into()));
        }
        self.probes.push(Probe {
            position,
            every,
            points: Vec::new(),
        });
        Ok(self.probes.len() - 1)
    }

    /// Monitor the flux through the line from `c1` to `c2`.
    ///
    /// Returns the monitor index.
    pub fn add_flux_plane(&mut self, c1: Position, c2: Position) -> Result<usize> {
        let plane = self.fields.create_flux_plane(c1, c2)?;
        self.flux_monitors.push(FluxMonitor {
            plane,
            energy: 0.0,
            history: Vec::new(),
        });
        Ok(self.flux_monitors.len() - 1)
    }

    /// A probe by index.
    pub fn probe(&self, index: usize) -> Option<&Probe> {
        self.probes.get(index)
    }

    /// A flux monitor by index.
    pub fn flux_monitor(&self, index: usize) -> Option<&FluxMonitor> {
        self.flux_monitors.get(index)
    }

    /// Energy samples recorded by the last run.
    pub fn energy_samples(&self) -> &[EnergySample] {
        &self.energy_samples
    }

    /// Check the setup and log a summary.
    pub fn setup(&mut self) -> Result<()> {
        if self.state != SimulationState::Created {
            return Err(Error::Config("Simulation already set up".into()));
        }
        if let EndCondition::EnergyDecay(db) = self.end_condition {
            if !(db.is_finite() && db > 0.0) {
                return Err(Error::Config(format!("energy decay must be a positive dB value, got {db}")));
            }
        }

        if self.verbose >= 1 {
            let v = self.fields.volume();
            info!(
                "FDTD simulation size: {}x{} (r x z) -> {} points, m = {}",
                v.nr(),
                v.nz(),
                v.len(),
                self.fields.m()
            );
            info!(
                "FDTD timestep: {:.6e}, Nyquist: {:.3e}",
                v.dt(),
                0.5 / v.dt()
            );
            // E, H and their split parts, two time levels, three components.
            let arrays = 24 + 6 * self.fields.pol.len();
            let bytes = arrays * v.len() * std::mem::size_of::<num_complex::Complex64>();
            info!("Estimated memory: {:.1} MiB", bytes as f64 / (1024.0 * 1024.0));
        }

        self.state = SimulationState::Ready;
        Ok(())
    }

    /// Number of steps the end condition asks for (an upper bound for
    /// energy decay).
    fn planned_steps(&self) -> Result<u64> {
        let dt = self.fields.volume().dt();
        let steps = match &self.end_condition {
            EndCondition::Timesteps(n) => *n,
            EndCondition::SimulationTime(t) => (t / dt).ceil().max(0.0) as u64,
            EndCondition::AfterSources { extra_time } => {
                let last = self.fields.find_last_source();
                if last.is_infinite() {
                    return Err(Error::Config(
                        "a continuous source never ends; use another end condition".into(),
                    ));
                }
                let end = ((last + extra_time) / dt).ceil().max(0.0) as u64;
                end.saturating_sub(self.fields.t())
            }
            EndCondition::EnergyDecay(_) => MAX_DECAY_STEPS,
        };
        Ok(steps)
    }

    /// Run the simulation until the end condition is met.
    pub fn run(&mut self) -> Result<SimulationStats> {
        // Set up if not already done
        if self.state == SimulationState::Created {
            self.setup()?;
        }

        if self.state != SimulationState::Ready {
            return Err(Error::Config("Simulation not ready to run".into()));
        }

        let max_timesteps = self.planned_steps()?;
        let energy_threshold = match &self.end_condition {
            EndCondition::EnergyDecay(db) => Some(*db),
            _ => None,
        };
        self.state = SimulationState::Running;

        // Progress bar
        let progress = if self.show_progress {
            let pb = ProgressBar::new(max_timesteps);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({per_sec})")
            {
                pb.set_style(style.progress_chars("##-"));
            }
            Some(pb)
        } else {
            None
        };

        let batch = StepBatch {
            num_steps: Some(max_timesteps),
            termination: TerminationConfig {
                max_timesteps: Some(max_timesteps),
                energy_decay_db: energy_threshold,
                check_interval: 100,
            },
            energy_monitoring: EnergyMonitorConfig {
                sample_interval: self.energy_sample_interval,
            },
        };

        let start_time = Instant::now();
        let mut recorder = Recorder {
            probes: &mut self.probes,
            fluxes: &mut self.flux_monitors,
            progress: progress.as_ref(),
            start: self.fields.t(),
        };
        let result: BatchResult = self.fields.run_batch(batch, &mut recorder);
        let wall_time = start_time.elapsed().as_secs_f64();

        if let Some(pb) = progress {
            pb.set_position(result.timesteps_executed);
            pb.finish_with_message("Simulation complete");
        }

        match &result.termination_reason {
            TerminationReason::StepsCompleted => {
                self.state = SimulationState::Finished;
                if energy_threshold.is_some() {
                    warn!("Energy decay not reached within {MAX_DECAY_STEPS} steps");
                }
            }
            TerminationReason::EnergyDecay { final_decay_db } => {
                self.state = SimulationState::Finished;
                if self.verbose >= 1 {
                    info!(
                        "Energy decay reached: {:.1} dB at timestep {}",
                        final_decay_db,
                        self.fields.t()
                    );
                }
            }
            TerminationReason::ObserverStop { reason } => {
                self.state = SimulationState::Stopped;
                if self.verbose >= 1 {
                    info!("Run stopped: {} at timestep {}", reason, self.fields.t());
                }
            }
            TerminationReason::Interrupted => {
                self.state = SimulationState::Stopped;
                warn!("Run interrupted at timestep {}", self.fields.t());
            }
        }

        let final_energy = self.fields.total_energy();
        let steps = result.timesteps_executed;
        let speed = if wall_time > 0.0 {
            (steps as f64 * self.fields.volume().len() as f64) / wall_time / 1e6
        } else {
            0.0
        };
        let stats = SimulationStats {
            timesteps: steps,
            sim_time: steps as f64 * self.fields.volume().dt(),
            wall_time,
            peak_energy: result.peak_energy.max(final_energy),
            final_energy,
            speed_mcells_per_sec: speed,
            termination_reason: result.termination_reason,
        };
        self.energy_samples = result.energy_samples;

        if self.verbose >= 1 {
            info!(
                "Completed {} timesteps in {:.2}s ({:.2} MC/s)",
                stats.timesteps, stats.wall_time, stats.speed_mcells_per_sec
            );
        }

        Ok(stats)
    }

    /// The field state.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Mutable access to the field state, e.g. to add sources.
    pub fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    /// Give the field state back.
    pub fn into_fields(self) -> Fields {
        self.fields
    }

    /// Get the current state.
    pub fn state(&self) -> SimulationState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::Component;
    use crate::fdtd::Pulse;
    use crate::geometry::Volume;
    use crate::material::Material;
    use num_complex::Complex64;

    fn simulation() -> Simulation {
        let v = Volume::new(1.0, 2.0, 10.0).unwrap();
        let fields = Fields::from_material(&Material::new(v, |_| 1.0), 0);
        let mut sim = Simulation::new(fields);
        sim.set_verbose(0).set_show_progress(false);
        sim
    }

    #[test]
    fn test_simulation_basic() {
        let mut sim = simulation();
        sim.set_end_condition(EndCondition::Timesteps(100));
        sim.fields_mut().add_point_source(
            Component::Ez,
            Pulse::new(0.5, 0.2, 2.0),
            Position::new(0.0, 1.0),
            Complex64::new(1.0, 0.0),
        );
        let probe = sim.add_probe(Position::new(0.3, 1.2), 2).unwrap();

        let stats = sim.run().unwrap();
        assert_eq!(stats.timesteps, 100);
        assert_eq!(stats.termination_reason, TerminationReason::StepsCompleted);
        assert_eq!(sim.state(), SimulationState::Finished);
        assert_eq!(sim.probe(probe).unwrap().points.len(), 50);
        assert!(stats.final_energy > 0.0);
    }

    #[test]
    fn test_after_sources() {
        let mut sim = simulation();
        let pulse = Pulse::new(0.5, 0.5, 1.0);
        sim.fields_mut().add_point_source(
            Component::Ez,
            pulse,
            Position::new(0.0, 1.0),
            Complex64::new(1.0, 0.0),
        );
        sim.set_end_condition(EndCondition::AfterSources { extra_time: 1.0 });
        let stats = sim.run().unwrap();
        let expected = ((pulse.last_time() + 1.0) / sim.fields().volume().dt()).ceil() as u64;
        assert_eq!(stats.timesteps, expected);
    }

    #[test]
    fn test_continuous_source_has_no_end() {
        let mut sim = simulation();
        sim.fields_mut().add_point_source(
            Component::Ez,
            Pulse::new(0.5, 0.5, 1.0).continuous(),
            Position::new(0.0, 1.0),
            Complex64::new(1.0, 0.0),
        );
        sim.set_end_condition(EndCondition::AfterSources { extra_time: 1.0 });
        assert!(sim.run().is_err());
    }

    #[test]
    fn test_run_twice_fails() {
        let mut sim = simulation();
        sim.set_end_condition(EndCondition::Timesteps(1));
        sim.run().unwrap();
        assert!(sim.run().is_err());
    }

    #[test]
    fn test_probe_interval_validated() {
        let mut sim = simulation();
        assert!(sim.add_probe(Position::new(0.1, 0.1), 0).is_err());
    }

    #[test]
    fn test_flux_monitor_integrates() {
        let mut sim = simulation();
        sim.fields_mut().initialize_with_nth_tm(1);
        let idx = sim
            .add_flux_plane(Position::new(0.0, 1.0), Position::new(1.0, 1.0))
            .unwrap();
        sim.set_end_condition(EndCondition::Timesteps(20));
        sim.run().unwrap();
        let monitor = sim.flux_monitor(idx).unwrap();
        assert_eq!(monitor.history.len(), 20);
        // A z-uniform standing mode carries no flux along z.
        assert!(monitor.energy.abs() < 1e-12);
    }
}
