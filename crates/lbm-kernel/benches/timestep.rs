//! Criterion benchmarks for one lattice Boltzmann timestep.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lbm_kernel::{
    Boundary, BoundaryConfig, CollisionConfig, CollisionMode, Face, LatticeBoltzmann,
    LatticeGeometry, PhaseParameters, SimulationConfig,
};
use lbm_lattice::Dimension;

// ---------------------------------------------------------------------------
// Session builders
// ---------------------------------------------------------------------------

fn cavity_2d(n: usize, mode: CollisionMode) -> LatticeBoltzmann {
    let config = SimulationConfig::new(Dimension::D2, LatticeGeometry::new_2d(n, n))
        .collision(CollisionConfig::new(mode, 0.05))
        .boundary(Boundary::wall(0, vec![Face::West, Face::East, Face::South]))
        .boundary(Boundary::moving_wall(1, vec![Face::North], [0.05, 0.0, 0.0]));
    let mut lb = LatticeBoltzmann::new(config).unwrap();
    lb.initialize_uniform(1.0, [0.0; 3]);
    lb
}

fn box_3d(n: usize, mode: CollisionMode) -> LatticeBoltzmann {
    let config = SimulationConfig::new(Dimension::D3, LatticeGeometry::new_3d(n, n, n))
        .collision(CollisionConfig::new(mode, 0.05))
        .boundaries(BoundaryConfig::enclosed(Dimension::D3));
    let mut lb = LatticeBoltzmann::new(config).unwrap();
    lb.initialize_uniform(1.0, [0.0; 3]);
    lb
}

fn droplet(dimension: Dimension, n: usize, higher_order_gradient: bool) -> LatticeBoltzmann {
    let geometry = match dimension {
        Dimension::D2 => LatticeGeometry::new_2d(n, n),
        Dimension::D3 => LatticeGeometry::new_3d(n, n, n),
    };
    let params = PhaseParameters {
        radius: n as f64 / 4.0,
        higher_order_gradient,
        ..PhaseParameters::default()
    };
    let config = SimulationConfig::new(dimension, geometry)
        .boundaries(BoundaryConfig::enclosed(dimension))
        .two_phase(params);
    let mut lb = LatticeBoltzmann::new(config).unwrap();
    lb.initialize_droplet().unwrap();
    lb
}

// ---------------------------------------------------------------------------
// Benchmark 1: Single-phase
// ---------------------------------------------------------------------------

fn bench_single_phase(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_phase");

    for n in [64, 256] {
        for mode in [CollisionMode::Bgk, CollisionMode::Mrt] {
            let mut lb = cavity_2d(n, mode);
            let id = BenchmarkId::new(format!("d2q9_{mode:?}").to_lowercase(), n);
            group.bench_with_input(id, &n, |b, _| {
                b.iter(|| lb.step().unwrap());
            });
        }
    }

    for n in [16, 48] {
        for mode in [CollisionMode::Bgk, CollisionMode::Mrt] {
            let mut lb = box_3d(n, mode);
            let id = BenchmarkId::new(format!("d3q19_{mode:?}").to_lowercase(), n);
            group.bench_with_input(id, &n, |b, _| {
                b.iter(|| lb.step().unwrap());
            });
        }
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark 2: Two-phase
// ---------------------------------------------------------------------------

fn bench_two_phase(c: &mut Criterion) {
    let mut group = c.benchmark_group("two_phase");
    group.sample_size(20);

    for higher_order in [false, true] {
        let suffix = if higher_order { "_iso" } else { "" };

        let mut lb = droplet(Dimension::D2, 128, higher_order);
        group.bench_function(format!("d2q9_droplet{suffix}"), |b| {
            b.iter(|| lb.step().unwrap());
        });

        let mut lb = droplet(Dimension::D3, 32, higher_order);
        group.bench_function(format!("d3q19_droplet{suffix}"), |b| {
            b.iter(|| lb.step().unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_phase, bench_two_phase);
criterion_main!(benches);
