//! Measurements on running fields: energy integrals, flux through lines,
//! point monitors and their Fourier transforms.

mod energy;
pub mod flux;
pub mod fourier;
pub mod monitor;

pub use flux::FluxPlane;
pub use fourier::{fourier_transform, FourierConfig, SpectralLine};
pub use monitor::MonitorPoint;
