//! Laplace test for the colour-gradient two-phase model.
//!
//! A stationary bubble of radius R carries a pressure jump Δp = σ/R in 2D. Running
//! several radii and printing Δp·R shows whether the model yields a single surface
//! tension σ.

use lbm_kernel::{
    BoundaryConfig, ConservationMonitor, ConservationState, LatticeBoltzmann, LatticeGeometry,
    PhaseParameters, SimulationConfig,
};
use lbm_lattice::{C_S_SQ, Dimension};

fn main() -> lbm_kernel::Result<()> {
    env_logger::init();

    println!("Laplace test (2D colour-gradient LBM)");
    println!("=====================================");

    let n = 64;
    let steps = 5000;
    println!("Grid: {}x{}, {} steps per radius", n, n, steps);
    println!();
    println!("  R       R_eff    Δp          Δp·R        max|u|      red drift");
    println!("  ----    -----    --------    --------    --------    ---------");

    for radius in [8.0, 10.0, 12.0, 16.0] {
        let params = PhaseParameters {
            radius,
            surface_tension: 0.01,
            segregation: 0.7,
            ..PhaseParameters::default()
        };
        let config = SimulationConfig::new(Dimension::D2, LatticeGeometry::new_2d(n, n))
            .boundaries(BoundaryConfig::enclosed(Dimension::D2))
            .two_phase(params);
        let mut lbm = LatticeBoltzmann::new(config)?;
        lbm.initialize_droplet()?;
        let baseline = ConservationState::new(&lbm);

        lbm.run(steps)?;

        let area: f64 = lbm.phase_fraction()?.iter().sum();
        let r_eff = (area / std::f64::consts::PI).sqrt();
        let inside = lbm.density_at(n / 2, n / 2, 0).unwrap_or_default();
        let outside = lbm.density_at(2, 2, 0).unwrap_or_default();
        let dp = (inside - outside) * C_S_SQ;
        let monitor = ConservationMonitor::check(&baseline, &lbm);

        println!(
            "  {:4.1}    {:5.2}    {:.2e}    {:.2e}    {:.2e}    {:.1e}",
            radius,
            r_eff,
            dp,
            dp * r_eff,
            lbm.max_velocity(),
            monitor.red_mass_error
        );
    }

    Ok(())
}
