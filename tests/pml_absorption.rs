//! Radiation from a pulsed dipole leaves through the absorbing layers.

use dactyl::prelude::*;
use num_complex::Complex64;

fn open_volume() -> Fields {
    let volume = Volume::new(3.0, 6.0, 10.0).unwrap();
    let mut material = Material::new(volume, |_| 1.0);
    material.use_pml_left(1.0).unwrap();
    material.use_pml_right(1.0).unwrap();
    material.use_pml_radial(1.0).unwrap();
    let mut f = Fields::from_material(&material, 0);
    f.use_real_fields();
    f
}

#[test]
fn test_dipole_energy_is_absorbed() {
    let mut f = open_volume();
    // Narrow band around 0.8: no static charge is left behind.
    let pulse = Pulse::new(0.8, 0.1, 8.0);
    f.add_point_source(Component::Ez, pulse, Position::new(0.0, 3.0), Complex64::new(1.0, 0.0));
    let source_end = f.find_last_source();
    assert!(source_end < 17.0);

    let mut peak = 0.0f64;
    let mut previous = f64::INFINITY;
    while f.time() < 80.0 {
        f.step();
        let energy = f.total_energy();
        peak = peak.max(energy);
        if f.time() > source_end + 2.0 && f.t() % 100 == 0 {
            assert!(
                energy <= 1.05 * previous,
                "energy grew from {previous} to {energy} at t = {}",
                f.time()
            );
            previous = energy;
        }
    }
    assert!(peak > 0.0);
    let remaining = f.total_energy() / peak;
    assert!(remaining < 1e-2, "{remaining} of the peak energy left");
}

#[test]
fn test_closed_cavity_keeps_the_pulse() {
    let volume = Volume::new(3.0, 6.0, 10.0).unwrap();
    let mut f = Fields::from_material(&Material::new(volume, |_| 1.0), 0);
    f.use_real_fields();
    let pulse = Pulse::new(0.8, 0.1, 8.0);
    f.add_point_source(Component::Ez, pulse, Position::new(0.0, 3.0), Complex64::new(1.0, 0.0));
    while f.time() < 20.0 {
        f.step();
    }
    let after_source = f.total_energy();
    while f.time() < 40.0 {
        f.step();
    }
    assert!(f.total_energy() > 0.99 * after_source);
}

#[test]
fn test_simulation_stops_on_energy_decay() {
    let mut f = open_volume();
    f.add_point_source(
        Component::Ez,
        Pulse::new(0.8, 0.1, 8.0),
        Position::new(0.0, 3.0),
        Complex64::new(1.0, 0.0),
    );
    let mut sim = Simulation::new(f);
    sim.set_end_condition(EndCondition::EnergyDecay(20.0))
        .set_show_progress(false);
    let stats = sim.run().unwrap();
    assert!(matches!(
        stats.termination_reason,
        dactyl::fdtd::TerminationReason::EnergyDecay { .. }
    ));
    assert!(stats.final_energy < 1e-2 * stats.peak_energy);
    assert!(stats.sim_time < 200.0);
}
