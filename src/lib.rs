//! # dactyl
//!
//! A finite-difference time-domain solver for Maxwell's equations on a
//! cylindrical (r, z) Yee grid with an `e^{i m φ}` azimuthal dependence.
//!
//! ## Features
//!
//! - Split-field perfectly matched layers at the ends and the outer radius
//! - Bloch-periodic boundaries along z
//! - Lorentzian dispersive media with gain/absorption saturation
//! - Pulsed and continuous point, profile and plane sources
//! - Energy, Poynting flux and monitor-point diagnostics
//! - Fourier transforms and harmonic inversion of recorded signals
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dactyl::prelude::*;
//!
//! let volume = Volume::new(1.0, 1.0, 10.0).unwrap();
//! let material = Material::new(volume, |_| 1.0);
//! let mut fields = Fields::new(Arc::new(material), 0);
//! fields.use_real_fields();
//! fields.initialize_with_nth_tm(1);
//! for _ in 0..100 {
//!     fields.step();
//! }
//! println!("energy: {}", fields.total_energy());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arrays;
pub mod constants;
pub mod diagnostics;
pub mod extensions;
pub mod fdtd;
pub mod geometry;
pub mod harminv;
pub mod material;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common result type for dactyl operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for dactyl operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration or geometry.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenient re-exports of the most used types.
pub mod prelude {
    pub use crate::arrays::{Component, ComponentMap, Direction, FieldType};
    pub use crate::constants::C;
    pub use crate::diagnostics::{FluxPlane, FourierConfig, MonitorPoint, SpectralLine};
    pub use crate::fdtd::{
        BandsConfig, EndCondition, EngineType, Fields, Pulse, Simulation, SimulationStats,
        StepBatch,
    };
    pub use crate::geometry::{Position, Region, Volume};
    pub use crate::harminv::{harminv, Band, HarminvConfig, Mode};
    pub use crate::material::Material;
    pub use crate::{Error, Result};
}
