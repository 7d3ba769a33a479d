//! Boundary model of the cylindrical grid.
//!
//! The outer radius is a perfect conductor. Along z the domain is either
//! closed by perfect conductors or Bloch-periodic; in the periodic case the
//! row `iz = nz` of Hr/Hp and the row `iz = 0` of Er/Ep are images of rows
//! inside the cell, filled through connection tables after each half-step.
//! On the axis only the components that are regular for the given angular
//! order are updated.

use crate::arrays::{Component, Direction, VectorField};
use crate::geometry::Volume;
use num_complex::Complex64;
use std::ops::Range;

/// Bloch periodicity along z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bloch {
    /// Wave number in cycles per unit length
    pub k: f64,
    /// `e^{2πi k L}`
    pub phase: Complex64,
}

impl Bloch {
    /// Bloch condition with wave number `k` on a cell of length `zmax`.
    pub fn new(k: f64, zmax: f64) -> Self {
        Self {
            k,
            phase: Complex64::from_polar(1.0, crate::constants::TWO_PI * k * zmax),
        }
    }
}

/// One image point: `sink = phase · source`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    /// Component direction
    pub direction: Direction,
    /// Flat index copied from
    pub source: usize,
    /// Flat index written to
    pub sink: usize,
    /// Multiplier
    pub phase: Complex64,
}

/// Connections applied after the H and the E half-steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionTables {
    /// H images: row nz of Hr and Hp
    pub h: Vec<Connection>,
    /// E images: row 0 of Er and Ep
    pub e: Vec<Connection>,
}

impl ConnectionTables {
    /// Build the tables for a Bloch condition.
    pub fn bloch(volume: &Volume, bloch: &Bloch) -> Self {
        let nz = volume.nz();
        let mut tables = Self::default();
        for ir in 0..=volume.nr() {
            for direction in [Direction::R, Direction::P] {
                tables.h.push(Connection {
                    direction,
                    source: volume.index(ir, 0),
                    sink: volume.index(ir, nz),
                    phase: bloch.phase,
                });
                tables.e.push(Connection {
                    direction,
                    source: volume.index(ir, nz),
                    sink: volume.index(ir, 0),
                    phase: bloch.phase.conj(),
                });
            }
        }
        tables
    }

    /// Apply a table to a vector field.
    pub fn apply(connections: &[Connection], f: &mut VectorField) {
        for c in connections {
            let field = f.component_mut(c.direction).as_mut_slice();
            field[c.sink] = field[c.source] * c.phase;
        }
    }
}

/// Rows along z that are advanced by the bulk update of `c`.
pub fn update_z_range(c: Component, nz: usize, periodic: bool) -> Range<usize> {
    match c {
        Component::Er | Component::Ep => {
            if periodic {
                1..nz + 1
            } else {
                1..nz
            }
        }
        Component::Ez | Component::Hr | Component::Hp => 0..nz,
        Component::Hz => {
            if periodic {
                0..nz + 1
            } else {
                1..nz
            }
        }
    }
}

/// Rows along z that hold meaningful values of `c`, images included.
pub fn stored_z_range(c: Component, nz: usize, periodic: bool) -> Range<usize> {
    match c {
        Component::Er | Component::Ep | Component::Hr | Component::Hp if periodic => 0..nz + 1,
        _ => update_z_range(c, nz, periodic),
    }
}

/// Whether `c` is updated on row `ir` for angular order `m`.
///
/// Off the axis every component is regular. On it, Ez survives only for
/// m = 0, Ep and Hr only for |m| = 1.
pub fn axis_active(c: Component, ir: usize, m: i32) -> bool {
    if ir > 0 {
        return true;
    }
    match c {
        Component::Ez => m == 0,
        Component::Ep | Component::Hr => m.abs() == 1,
        Component::Er | Component::Hp | Component::Hz => true,
    }
}
