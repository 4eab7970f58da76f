//! Stationary bubble: surface tension holds a red disk in blue fluid at rest.

use lbm_kernel::{
    BoundaryConfig, CollisionConfig, CollisionMode, LatticeBoltzmann, LatticeGeometry,
    PhaseParameters, SimulationConfig,
};
use lbm_lattice::Dimension;

const N: usize = 32;
const RADIUS: f64 = 8.0;

fn bubble(higher_order_gradient: bool) -> LatticeBoltzmann {
    dense_bubble(1.0, false, higher_order_gradient)
}

/// Red droplet `ratio` times denser than the surrounding blue fluid.
fn dense_bubble(
    ratio: f64,
    ratio_correction: bool,
    higher_order_gradient: bool,
) -> LatticeBoltzmann {
    let params = PhaseParameters {
        red_density: ratio,
        blue_density: 1.0,
        red_viscosity: 1.0 / 6.0,
        blue_viscosity: 1.0 / 6.0,
        surface_tension: 0.01,
        segregation: 0.7,
        radius: RADIUS,
        higher_order_gradient,
        ratio_correction,
        ..PhaseParameters::default()
    };
    let config = SimulationConfig::new(Dimension::D2, LatticeGeometry::new_2d(N, N))
        .boundaries(BoundaryConfig::enclosed(Dimension::D2))
        .two_phase(params);
    let mut lb = LatticeBoltzmann::new(config).unwrap();
    lb.initialize_droplet().unwrap();
    lb
}

/// Radius of the disk with the same red area: sqrt(Σφ / π).
fn effective_radius(lb: &LatticeBoltzmann) -> f64 {
    let area: f64 = lb.phase_fraction().unwrap().iter().sum();
    (area / std::f64::consts::PI).sqrt()
}

fn assert_fractions_bounded(lb: &LatticeBoltzmann) {
    for (cell, &phi) in lb.phase_fraction().unwrap().iter().enumerate() {
        assert!((0.0..=1.0).contains(&phi), "cell {cell}: phase fraction {phi}");
    }
    // The unclamped colour stays in range as long as neither phase goes negative
    let color = &lb.state().phase().unwrap().color;
    for (cell, &c) in color.iter().enumerate() {
        assert!(c.abs() <= 1.0 + 1e-12, "cell {cell}: colour {c}");
    }
}

fn relative_drift(before: f64, after: f64) -> f64 {
    (after - before).abs() / before
}

#[test]
fn test_stationary_bubble_keeps_radius() {
    let mut lb = bubble(false);
    let initial_radius = effective_radius(&lb);
    let red_mass = lb.red_mass().unwrap();
    let mass = lb.total_mass();
    assert!((initial_radius - RADIUS).abs() / RADIUS < 0.05);

    for _ in 0..10 {
        lb.run(1000).unwrap();
        assert_fractions_bounded(&lb);
    }
    assert_eq!(lb.steps(), 10_000);

    let radius = effective_radius(&lb);
    assert!(
        (radius - initial_radius).abs() / initial_radius < 0.01,
        "radius drifted from {initial_radius} to {radius}"
    );
    assert!((radius - RADIUS).abs() / RADIUS < 0.05);

    // Colour and total mass are conserved by recolouring and bounce-back
    assert!((lb.red_mass().unwrap() - red_mass).abs() / red_mass < 1e-10);
    assert!((lb.total_mass() - mass).abs() / mass < 1e-10);

    // Spurious currents stay small
    assert!(lb.max_velocity() < 1e-2, "max |u| = {}", lb.max_velocity());
}

#[test]
fn test_bubble_centre_and_bulk() {
    let mut lb = bubble(true);
    lb.run(2000).unwrap();
    assert_fractions_bounded(&lb);

    let grid = lb.grid();
    let fraction = lb.phase_fraction().unwrap();
    let centre = fraction[grid.index(N / 2, N / 2, 0)];
    let corner = fraction[grid.index(1, 1, 0)];
    assert!(centre > 0.99, "centre fraction {centre}");
    assert!(corner < 0.01, "corner fraction {corner}");
}

#[test]
fn test_dense_bubbles_stay_bounded() {
    for ratio in [2.0, 5.0, 10.0] {
        let mut lb = dense_bubble(ratio, false, false);
        let red_mass = lb.red_mass().unwrap();
        let mass = lb.total_mass();
        let initial_radius = effective_radius(&lb);

        lb.run(3000).unwrap();
        assert_fractions_bounded(&lb);

        let red_drift = relative_drift(red_mass, lb.red_mass().unwrap());
        assert!(red_drift < 1e-10, "ratio {ratio}: red mass drift {red_drift}");
        assert!(relative_drift(mass, lb.total_mass()) < 1e-10);
        let radius = effective_radius(&lb);
        assert!(
            relative_drift(initial_radius, radius) < 0.02,
            "ratio {ratio}: radius {initial_radius} -> {radius}"
        );
        assert!(lb.max_velocity() < 1e-2, "ratio {ratio}: max |u| = {}", lb.max_velocity());
    }
}

#[test]
fn test_hundredfold_density_ratio_survives() {
    // Recolouring clamps some undershooting populations at this ratio, so red mass
    // is only conserved approximately
    let mut lb = dense_bubble(100.0, false, false);
    let red_mass = lb.red_mass().unwrap();
    lb.run(3000).unwrap();

    for (cell, &phi) in lb.phase_fraction().unwrap().iter().enumerate() {
        assert!((0.0..=1.0).contains(&phi), "cell {cell}: phase fraction {phi}");
    }
    assert!(lb.density().iter().all(|rho| rho.is_finite() && *rho > 0.0));
    assert!(relative_drift(red_mass, lb.red_mass().unwrap()) < 1e-3);
    assert!(lb.max_velocity() < 1e-2);
}

#[test]
fn test_ratio_correction_on_moderate_ratios() {
    for ratio in [2.0, 5.0] {
        let mut lb = dense_bubble(ratio, true, false);
        assert!(lb.phase_model().unwrap().has_ratio_correction());
        let red_mass = lb.red_mass().unwrap();
        let initial_radius = effective_radius(&lb);

        lb.run(3000).unwrap();
        assert_fractions_bounded(&lb);
        assert!(relative_drift(red_mass, lb.red_mass().unwrap()) < 1e-10);
        assert!(relative_drift(initial_radius, effective_radius(&lb)) < 0.02);
        assert!(lb.max_velocity() < 1e-2);
    }
}

#[test]
fn test_three_dimensional_mrt_bubble() {
    let n = 16;
    let radius = 5.0;
    let params = PhaseParameters {
        radius,
        ..PhaseParameters::default()
    };
    let config = SimulationConfig::new(Dimension::D3, LatticeGeometry::new_3d(n, n, n))
        .collision(CollisionConfig::new(CollisionMode::Mrt, 1.0 / 6.0))
        .boundaries(BoundaryConfig::enclosed(Dimension::D3))
        .two_phase(params);
    let mut lb = LatticeBoltzmann::new(config).unwrap();
    lb.initialize_droplet().unwrap();

    let sphere_radius = |lb: &LatticeBoltzmann| -> f64 {
        let volume: f64 = lb.phase_fraction().unwrap().iter().sum();
        (3.0 * volume / (4.0 * std::f64::consts::PI)).cbrt()
    };
    let initial_radius = sphere_radius(&lb);
    let red_mass = lb.red_mass().unwrap();
    let mass = lb.total_mass();
    assert!(relative_drift(radius, initial_radius) < 0.05);

    lb.run(400).unwrap();
    assert_fractions_bounded(&lb);

    let red_drift = relative_drift(red_mass, lb.red_mass().unwrap());
    assert!(red_drift < 1e-10, "red mass drift {red_drift}");
    assert!(relative_drift(mass, lb.total_mass()) < 1e-10);
    assert!(relative_drift(initial_radius, sphere_radius(&lb)) < 0.02);
    assert!(lb.max_velocity() < 1e-2);

    let grid = lb.grid();
    let centre = lb.phase_fraction().unwrap()[grid.index(n / 2, n / 2, n / 2)];
    assert!(centre > 0.99, "centre fraction {centre}");
}
