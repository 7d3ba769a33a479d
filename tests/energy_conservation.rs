//! Closed cavities without loss keep their discrete field energy.

use approx::assert_relative_eq;
use dactyl::prelude::*;

fn cavity(m: i32) -> Fields {
    let volume = Volume::new(1.0, 1.0, 10.0).unwrap();
    Fields::from_material(&Material::new(volume, |_| 1.0), m)
}

#[test]
fn test_tm_mode_energy_is_conserved() {
    let mut f = cavity(0);
    f.use_real_fields();
    f.initialize_with_nth_tm(1);
    f.step();
    let reference = f.total_energy();
    assert!(reference > 0.0);
    for _ in 0..500 {
        f.step();
        assert_relative_eq!(f.total_energy(), reference, max_relative = 1e-6);
    }
}

#[test]
fn test_energy_moves_between_e_and_h() {
    let mut f = cavity(0);
    f.use_real_fields();
    f.initialize_with_nth_tm(1);
    f.step();
    let mut min_h = f64::INFINITY;
    let mut max_h = 0.0f64;
    // One period of TM01 is about 52 steps.
    for _ in 0..60 {
        f.step();
        let h = f.magnetic_energy_in_box(&f.volume().region());
        min_h = min_h.min(h);
        max_h = max_h.max(h);
    }
    let total = f.total_energy();
    assert!(max_h > 0.9 * total);
    assert!(min_h < 0.1 * total);
}

#[test]
fn test_te_mode_energy_is_bounded() {
    let mut f = cavity(1);
    f.initialize_with_nth_te(1);
    f.step();
    let reference = f.total_energy();
    assert!(reference > 0.0);
    for _ in 0..500 {
        f.step();
        assert_relative_eq!(f.total_energy(), reference, max_relative = 1e-2);
    }
}

#[test]
fn test_parallel_engine_conserves_the_same_energy() {
    let mut basic = cavity(0);
    let mut parallel = cavity(0);
    parallel.set_engine(EngineType::Parallel);
    for f in [&mut basic, &mut parallel] {
        f.initialize_with_n_tm(2);
        for _ in 0..200 {
            f.step();
        }
    }
    assert_relative_eq!(basic.total_energy(), parallel.total_energy(), max_relative = 1e-12);
}
