//! Field storage on the staggered cylindrical grid.
//!
//! Every component lives on its own `(nr+1) x (nz+1)` lattice, flattened
//! row-major in `ir` so that one row holds all `iz` values of one radius.
//! The staggering offsets of each component are given by
//! [`Component::offset`].

use crate::geometry::Volume;
use num_complex::Complex64;
use std::ops::{Index, IndexMut};

/// Electric or magnetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Electric field
    E,
    /// Magnetic field
    H,
}

/// Cylindrical direction of a vector component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Radial
    R,
    /// Azimuthal (φ)
    P,
    /// Axial
    Z,
}

impl Direction {
    /// All directions in storage order.
    pub const ALL: [Direction; 3] = [Direction::R, Direction::P, Direction::Z];

    /// Storage index (r = 0, φ = 1, z = 2).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Direction::R => 0,
            Direction::P => 1,
            Direction::Z => 2,
        }
    }
}

/// One of the six field components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// Radial electric field
    Er,
    /// Azimuthal electric field
    Ep,
    /// Axial electric field
    Ez,
    /// Radial magnetic field
    Hr,
    /// Azimuthal magnetic field
    Hp,
    /// Axial magnetic field
    Hz,
}

impl Component {
    /// All components, E first.
    pub const ALL: [Component; 6] = [
        Component::Er,
        Component::Ep,
        Component::Ez,
        Component::Hr,
        Component::Hp,
        Component::Hz,
    ];

    /// Build a component from its field type and direction.
    pub fn from_parts(field_type: FieldType, direction: Direction) -> Self {
        match (field_type, direction) {
            (FieldType::E, Direction::R) => Component::Er,
            (FieldType::E, Direction::P) => Component::Ep,
            (FieldType::E, Direction::Z) => Component::Ez,
            (FieldType::H, Direction::R) => Component::Hr,
            (FieldType::H, Direction::P) => Component::Hp,
            (FieldType::H, Direction::Z) => Component::Hz,
        }
    }

    /// Electric or magnetic.
    #[inline]
    pub fn field_type(self) -> FieldType {
        match self {
            Component::Er | Component::Ep | Component::Ez => FieldType::E,
            Component::Hr | Component::Hp | Component::Hz => FieldType::H,
        }
    }

    /// Direction of the component.
    #[inline]
    pub fn direction(self) -> Direction {
        match self {
            Component::Er | Component::Hr => Direction::R,
            Component::Ep | Component::Hp => Direction::P,
            Component::Ez | Component::Hz => Direction::Z,
        }
    }

    /// Position in [`Component::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        match self.field_type() {
            FieldType::E => self.direction().index(),
            FieldType::H => 3 + self.direction().index(),
        }
    }

    /// Staggering `(dr, dz)` of the component in cells.
    pub fn offset(self) -> (f64, f64) {
        match self {
            Component::Er => (0.5, 0.0),
            Component::Ep => (0.0, 0.0),
            Component::Ez => (0.0, 0.5),
            Component::Hr => (0.0, 0.5),
            Component::Hp => (0.5, 0.5),
            Component::Hz => (0.5, 0.0),
        }
    }

    /// Directions of the two curl terms that update this component,
    /// as `(main, other)`.
    ///
    /// The PML conductivity of each term is the one of its direction, so the
    /// split-field update can damp them separately.
    pub fn split_directions(self) -> (Direction, Direction) {
        match self {
            Component::Er | Component::Hr => (Direction::P, Direction::Z),
            Component::Ep | Component::Hp => (Direction::Z, Direction::R),
            Component::Ez | Component::Hz => (Direction::R, Direction::P),
        }
    }

    /// Short name, e.g. `"ez"`.
    pub fn name(self) -> &'static str {
        match self {
            Component::Er => "er",
            Component::Ep => "ep",
            Component::Ez => "ez",
            Component::Hr => "hr",
            Component::Hp => "hp",
            Component::Hz => "hz",
        }
    }
}

/// A value for every component, indexed by [`Component`].
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentMap<T>([T; 6]);

impl<T> ComponentMap<T> {
    /// Build a map by evaluating `f` for every component.
    pub fn from_fn(mut f: impl FnMut(Component) -> T) -> Self {
        Self(Component::ALL.map(&mut f))
    }

    /// Iterate over `(component, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Component, &T)> {
        Component::ALL.into_iter().zip(self.0.iter())
    }

    /// Iterate mutably over `(component, value)` pairs.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Component, &mut T)> {
        Component::ALL.into_iter().zip(self.0.iter_mut())
    }
}

impl<T: Default> Default for ComponentMap<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T> Index<Component> for ComponentMap<T> {
    type Output = T;

    #[inline]
    fn index(&self, c: Component) -> &T {
        &self.0[c.index()]
    }
}

impl<T> IndexMut<Component> for ComponentMap<T> {
    #[inline]
    fn index_mut(&mut self, c: Component) -> &mut T {
        &mut self.0[c.index()]
    }
}

/// Complex scalar field over all grid points of one component.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    data: Vec<Complex64>,
    stride: usize,
}

impl Field {
    /// Create a zeroed field for the given volume.
    pub fn new(volume: &Volume) -> Self {
        Self {
            data: vec![Complex64::new(0.0, 0.0); volume.len()],
            stride: volume.stride(),
        }
    }

    /// Get value at (ir, iz).
    #[inline]
    pub fn get(&self, ir: usize, iz: usize) -> Complex64 {
        self.data[ir * self.stride + iz]
    }

    /// Set value at (ir, iz).
    #[inline]
    pub fn set(&mut self, ir: usize, iz: usize, value: Complex64) {
        self.data[ir * self.stride + iz] = value;
    }

    /// Add to value at (ir, iz).
    #[inline]
    pub fn add(&mut self, ir: usize, iz: usize, value: Complex64) {
        self.data[ir * self.stride + iz] += value;
    }

    /// Number of points in one radial row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Flat view of the data.
    #[inline]
    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    /// Mutable flat view of the data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Complex64] {
        &mut self.data
    }

    /// Zero every point.
    pub fn clear(&mut self) {
        self.data.fill(Complex64::new(0.0, 0.0));
    }

    /// Drop the imaginary part of every point.
    pub fn make_real(&mut self) {
        for v in &mut self.data {
            v.im = 0.0;
        }
    }

    /// Sum of |f|² over all points.
    pub fn norm_sqr(&self) -> f64 {
        self.data.iter().map(|v| v.norm_sqr()).sum()
    }
}

/// The three components of E or H.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField {
    /// Radial component
    pub r: Field,
    /// Azimuthal component
    pub p: Field,
    /// Axial component
    pub z: Field,
}

impl VectorField {
    /// Create a zeroed vector field.
    pub fn new(volume: &Volume) -> Self {
        Self {
            r: Field::new(volume),
            p: Field::new(volume),
            z: Field::new(volume),
        }
    }

    /// Component by direction.
    #[inline]
    pub fn component(&self, d: Direction) -> &Field {
        match d {
            Direction::R => &self.r,
            Direction::P => &self.p,
            Direction::Z => &self.z,
        }
    }

    /// Mutable component by direction.
    #[inline]
    pub fn component_mut(&mut self, d: Direction) -> &mut Field {
        match d {
            Direction::R => &mut self.r,
            Direction::P => &mut self.p,
            Direction::Z => &mut self.z,
        }
    }

    /// Zero all components.
    pub fn clear(&mut self) {
        self.r.clear();
        self.p.clear();
        self.z.clear();
    }

    /// Drop the imaginary part of every component.
    pub fn make_real(&mut self) {
        self.r.make_real();
        self.p.make_real();
        self.z.make_real();
    }
}

/// Real per-direction arrays (conductivities, energy densities).
pub type DirectionArrays = [Vec<f64>; 3];

/// Zeroed per-direction arrays for a volume.
pub fn direction_arrays(volume: &Volume) -> DirectionArrays {
    [
        vec![0.0; volume.len()],
        vec![0.0; volume.len()],
        vec![0.0; volume.len()],
    ]
}

/// Current and previous time level of a quantity.
///
/// Swapping exchanges the two levels without copying, after which
/// `previous` holds the last level and `current` is overwritten by the
/// next update.
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleBuffer<T> {
    /// Latest time level
    pub current: T,
    /// Time level before `current`
    pub previous: T,
}

impl<T: Clone> DoubleBuffer<T> {
    /// Both levels start as copies of `value`.
    pub fn new(value: T) -> Self {
        Self {
            current: value.clone(),
            previous: value,
        }
    }
}

impl<T> DoubleBuffer<T> {
    /// Exchange current and previous.
    #[inline]
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
    }

    /// Split into `(&mut current, &previous)`.
    #[inline]
    pub fn split_mut(&mut self) -> (&mut T, &T) {
        (&mut self.current, &self.previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_roundtrip() {
        for c in Component::ALL {
            assert_eq!(Component::from_parts(c.field_type(), c.direction()), c);
            assert_eq!(Component::ALL[c.index()], c);
        }
    }

    #[test]
    fn test_split_directions_exclude_own() {
        for c in Component::ALL {
            let (main, other) = c.split_directions();
            assert_ne!(main, c.direction());
            assert_ne!(other, c.direction());
            assert_ne!(main, other);
        }
    }

    #[test]
    fn test_field_access() {
        let volume = Volume::new(1.0, 2.0, 4.0).unwrap();
        let mut f = Field::new(&volume);
        f.set(2, 3, Complex64::new(1.0, 2.0));
        f.add(2, 3, Complex64::new(0.5, 0.0));
        assert_eq!(f.get(2, 3), Complex64::new(1.5, 2.0));
        assert_eq!(f.as_slice()[volume.index(2, 3)], Complex64::new(1.5, 2.0));

        f.make_real();
        assert_eq!(f.get(2, 3), Complex64::new(1.5, 0.0));

        f.clear();
        assert_eq!(f.norm_sqr(), 0.0);
    }

    #[test]
    fn test_double_buffer_swap() {
        let mut buf = DoubleBuffer::new(1);
        buf.current = 2;
        buf.swap();
        assert_eq!(buf.previous, 2);
        assert_eq!(buf.current, 1);
    }

    #[test]
    fn test_component_map() {
        let mut map = ComponentMap::from_fn(|c| c.index());
        assert_eq!(map[Component::Hp], 4);
        map[Component::Ez] = 10;
        assert_eq!(map.iter().find(|(c, _)| *c == Component::Ez).map(|x| *x.1), Some(10));
    }
}
