//! Point samples of all field components.

use crate::arrays::{Component, ComponentMap, FieldType};
use crate::fdtd::Fields;
use crate::geometry::{Position, Volume};
use num_complex::Complex64;

/// Every component at one position and time.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorPoint {
    /// Sampling position
    pub loc: Position,
    /// Simulated time of the sample
    pub t: f64,
    /// Interpolated component values
    pub f: ComponentMap<Complex64>,
    volume: Volume,
}

impl MonitorPoint {
    /// Sample `fields` at `loc`.
    pub fn new(loc: Position, fields: &Fields) -> Self {
        fields.get_point(loc)
    }

    /// A sample from externally recorded values.
    pub fn from_values(loc: Position, t: f64, f: ComponentMap<Complex64>, volume: Volume) -> Self {
        Self { loc, t, f, volume }
    }

    /// Value of one component.
    pub fn get_component(&self, c: Component) -> Complex64 {
        self.f[c]
    }

    /// The volume the sample was taken on.
    pub fn volume(&self) -> &Volume {
        &self.volume
    }
}

impl Fields {
    /// Interpolate every component at `loc`.
    ///
    /// Each component is interpolated bilinearly on its own staggered
    /// lattice, so a sample mixes E at time level n+1 with H at n+½.
    pub fn get_point(&self, loc: Position) -> MonitorPoint {
        let f = ComponentMap::from_fn(|c| {
            let field = match c.field_type() {
                FieldType::E => self.e.current.component(c.direction()),
                FieldType::H => self.h.current.component(c.direction()),
            };
            self.volume
                .stencil(c, loc)
                .into_iter()
                .filter(|&(_, _, w)| w != 0.0)
                .map(|(ir, iz, w)| field.get(ir, iz) * w)
                .sum()
        });
        MonitorPoint {
            loc,
            t: self.time(),
            f,
            volume: self.volume,
        }
    }

    /// Sample at `loc` and append to a time series.
    ///
    /// # Panics
    /// If the series holds samples taken on a different volume.
    pub fn get_new_point<'a>(&self, loc: Position, series: &'a mut Vec<MonitorPoint>) -> &'a MonitorPoint {
        if let Some(last) = series.last() {
            assert!(
                last.volume == self.volume,
                "monitor series was recorded on a different volume"
            );
        }
        series.push(self.get_point(loc));
        &series[series.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use approx::assert_relative_eq;

    fn fields() -> Fields {
        let v = Volume::new(1.0, 1.0, 10.0).unwrap();
        Fields::from_material(&Material::new(v, |_| 1.0), 0)
    }

    #[test]
    fn test_interpolates_linear_field() {
        let mut f = fields();
        f.initialize_field(Component::Hz, |p| Complex64::new(p.r + 2.0 * p.z, 0.0));
        let p = f.get_point(Position::new(0.33, 0.47));
        assert_relative_eq!(p.get_component(Component::Hz).re, 0.33 + 0.94, epsilon = 1e-12);
        assert_eq!(p.get_component(Component::Ez), Complex64::new(0.0, 0.0));
    }

    #[test]
    fn test_series_and_time() {
        let mut f = fields();
        f.initialize_with_nth_tm(1);
        let mut series = Vec::new();
        for _ in 0..3 {
            f.step();
            f.get_new_point(Position::new(0.2, 0.5), &mut series);
        }
        assert_eq!(series.len(), 3);
        assert_relative_eq!(series[2].t - series[1].t, f.volume().dt(), epsilon = 1e-12);
        assert_eq!(series[2], MonitorPoint::new(Position::new(0.2, 0.5), &f));
    }

    #[test]
    #[should_panic(expected = "different volume")]
    fn test_mixed_volumes_panic() {
        let a = fields();
        let v = Volume::new(2.0, 1.0, 10.0).unwrap();
        let b = Fields::from_material(&Material::new(v, |_| 1.0), 0);
        let mut series = Vec::new();
        a.get_new_point(Position::new(0.1, 0.1), &mut series);
        b.get_new_point(Position::new(0.1, 0.1), &mut series);
    }
}
