//! Poynting flux through a closed box balances the energy it loses.

use approx::assert_relative_eq;
use dactyl::prelude::*;
use num_complex::Complex64;

const W: f64 = 0.5;

fn radiating_blob() -> Fields {
    let volume = Volume::new(3.0, 8.0, 10.0).unwrap();
    let mut material = Material::new(volume, |_| 1.0);
    material.use_pml_left(1.0).unwrap();
    material.use_pml_right(1.0).unwrap();
    material.use_pml_radial(1.0).unwrap();
    let mut f = Fields::from_material(&material, 0);
    f.use_real_fields();
    f.initialize_field(Component::Hp, |p| {
        let d2 = (p.r * p.r + (p.z - 4.0) * (p.z - 4.0)) / (W * W);
        Complex64::new(p.r * (-d2).exp(), 0.0)
    });
    f
}

#[test]
fn test_energy_balance() {
    let region = Region::new(0.0, 1.5, 2.5, 5.5);
    let f = radiating_blob();
    let u0 = f.energy_in_box(&region);
    assert!(u0 > 0.0);

    let mut sim = Simulation::new(f);
    let bottom = sim
        .add_flux_plane(Position::new(0.0, 2.5), Position::new(1.5, 2.5))
        .unwrap();
    let top = sim
        .add_flux_plane(Position::new(0.0, 5.5), Position::new(1.5, 5.5))
        .unwrap();
    let side = sim
        .add_flux_plane(Position::new(1.5, 2.5), Position::new(1.5, 5.5))
        .unwrap();
    sim.set_end_condition(EndCondition::SimulationTime(8.0))
        .set_show_progress(false);
    sim.run().unwrap();

    let energy = |i: usize| sim.flux_monitor(i).unwrap().energy;
    let outflow = energy(top) - energy(bottom) + energy(side);
    let u_n = sim.fields().energy_in_box(&region);
    assert!(u_n < 0.05 * u0, "{u_n} of {u0} still inside");
    assert_relative_eq!(outflow, u0 - u_n, max_relative = 0.1);
}

#[test]
fn test_symmetric_blob_flows_out_both_ends() {
    let f = radiating_blob();
    let mut sim = Simulation::new(f);
    let bottom = sim
        .add_flux_plane(Position::new(0.0, 2.5), Position::new(1.5, 2.5))
        .unwrap();
    let top = sim
        .add_flux_plane(Position::new(0.0, 5.5), Position::new(1.5, 5.5))
        .unwrap();
    sim.set_end_condition(EndCondition::SimulationTime(8.0))
        .set_show_progress(false);
    sim.run().unwrap();

    let up = sim.flux_monitor(top).unwrap().energy;
    let down = sim.flux_monitor(bottom).unwrap().energy;
    assert!(up > 0.0);
    // Downward flow is negative through an upward-oriented plane.
    assert_relative_eq!(down, -up, max_relative = 0.05);
    assert_eq!(sim.flux_monitor(top).unwrap().history.len(), 160);
}

#[test]
fn test_misaligned_plane_is_rejected() {
    let f = radiating_blob();
    assert!(f
        .create_flux_plane(Position::new(0.0, 2.0), Position::new(1.0, 3.0))
        .is_err());
    let mut sim = Simulation::new(f);
    assert!(sim
        .add_flux_plane(Position::new(0.0, 2.0), Position::new(1.0, 3.0))
        .is_err());
}
