//! Benchmarks for stepping and harmonic inversion.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use num_complex::Complex64;

use dactyl::fdtd::{EngineType, Fields};
use dactyl::geometry::Volume;
use dactyl::harminv::{harminv, HarminvConfig};
use dactyl::material::Material;

fn bench_fdtd_step(c: &mut Criterion) {
    // (rmax, zmax) at a = 20
    let sizes = [(5.0, 5.0), (10.0, 10.0), (20.0, 20.0)];

    for (rmax, zmax) in sizes {
        let volume = Volume::new(rmax, zmax, 20.0).unwrap();
        let mut material = Material::new(volume, |_| 1.0);
        material.use_pml_left(1.0).unwrap();
        material.use_pml_right(1.0).unwrap();
        material.use_pml_radial(1.0).unwrap();

        let mut group = c.benchmark_group(format!("fdtd_{}x{}", volume.nr(), volume.nz()));
        group.throughput(Throughput::Elements(volume.len() as u64));
        group.sample_size(20);

        for (name, engine) in [("basic", EngineType::Basic), ("parallel", EngineType::Parallel)] {
            group.bench_function(name, |b| {
                let mut fields = Fields::from_material(&material, 1);
                fields.set_engine(engine);
                fields.initialize_with_nth_te(1);
                b.iter(|| {
                    fields.step();
                    black_box(&fields);
                });
            });
        }

        group.finish();
    }
}

fn bench_harminv(c: &mut Criterion) {
    let mut group = c.benchmark_group("harminv");
    group.sample_size(10);

    for n in [300usize, 1000] {
        let data: Vec<Complex64> = (0..n)
            .map(|k| {
                let t = k as f64;
                Complex64::from_polar((-1e-3 * t).exp(), -std::f64::consts::TAU * 0.21 * t)
                    + Complex64::from_polar(0.5 * (-2e-3 * t).exp(), -std::f64::consts::TAU * 0.34 * t)
            })
            .collect();
        let config = HarminvConfig::window(0.0, 0.5, 10);
        group.bench_function(format!("two_modes_{n}"), |b| {
            b.iter(|| black_box(harminv(black_box(&data), 1.0, &config)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fdtd_step, bench_harminv);
criterion_main!(benches);
