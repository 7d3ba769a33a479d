//! Physics layered on top of the bare Yee update.
//!
//! - [`pml`]: split-field absorbing layers
//! - [`dispersive`]: Lorentz oscillator polarizations with saturation

pub mod dispersive;
pub mod pml;

pub use dispersive::{LorentzCoefficients, Polarizability, Polarization};
pub use pml::{PmlConfig, PmlLayers};
