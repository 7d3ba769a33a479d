//! Time-domain solver for cylindrical (r, z) fields with `e^{imφ}`
//! dependence.
//!
//! [`Fields`] holds the state and the leapfrog update, [`Simulation`] drives
//! it with probes, flux monitors and end conditions.

mod batch;
mod boundaries;
mod fields;
mod modes;
mod simulation;
mod sources;
mod step;

pub use batch::{
    interrupt_count, request_interrupt, BatchResult, EnergyMonitorConfig, EnergySample,
    NoObserver, StepBatch, StepObserver, TerminationConfig, TerminationReason,
};
pub use boundaries::{Bloch, Connection, ConnectionTables};
pub use fields::{EngineType, FieldSlice, Fields};
pub use modes::{bessel_j, bessel_j_prime, bessel_zero, bessel_prime_zero};
pub use simulation::{EndCondition, FluxMonitor, Probe, Simulation, SimulationState, SimulationStats};
pub use sources::{Pulse, Source};

pub use crate::harminv::bands::BandsConfig;
