//! Lid-driven cavity flow demonstration.
//!
//! Classical CFD benchmark: square cavity with the top wall moving at constant
//! velocity. At steady state the flow settles into a primary vortex with secondary
//! corner vortices.
//!
//! Run with `RUST_LOG=info cargo run --release --example lid_cavity`.

use lbm_kernel::{
    Boundary, CollisionConfig, CollisionMode, Face, LatticeBoltzmann, LatticeGeometry,
    SimulationConfig,
};
use lbm_lattice::Dimension;

fn main() -> lbm_kernel::Result<()> {
    env_logger::init();

    println!("Lid-driven cavity flow (2D LBM, MRT)");
    println!("====================================");

    let nx = 128;
    let ny = 128;
    let nu = 0.01; // kinematic viscosity
    let u_lid = 0.1; // lid velocity

    let config = SimulationConfig::new(Dimension::D2, LatticeGeometry::new_2d(nx, ny))
        .collision(CollisionConfig::new(CollisionMode::Mrt, nu))
        .boundary(Boundary::wall(0, vec![Face::West, Face::East, Face::South]))
        .boundary(Boundary::moving_wall(1, vec![Face::North], [u_lid, 0.0, 0.0]));
    let mut lbm = LatticeBoltzmann::new(config)?;

    // Uniform density, zero velocity
    lbm.initialize_uniform(1.0, [0.0; 3]);

    println!("Grid: {}x{}", nx, ny);
    println!("Viscosity: ν = {}", nu);
    println!("Lid velocity: u_lid = {}", u_lid);
    println!("Reynolds number: Re ≈ {:.1}", u_lid * nx as f64 / nu);
    println!();

    let n_steps = 10000;
    let print_every = 1000;

    for step in (0..n_steps).step_by(print_every) {
        println!(
            "Step {:5}: u_max = {:.6}, KE = {:.6}, mass = {:.6}",
            step,
            lbm.max_velocity(),
            lbm.kinetic_energy(),
            lbm.total_mass()
        );
        lbm.run(print_every)?;
    }

    println!();
    println!("After {} steps:", lbm.steps());

    // Velocity profile on the vertical centreline
    println!("\nVertical centerline velocity profile (x = {}):", nx / 2);
    println!("  y/H      u_x");
    println!("  ----    ------");
    for i in 0..10 {
        let y = i * ny / 10;
        let u = lbm.velocity_at(nx / 2, y, 0).unwrap_or_default();
        println!("  {:.2}    {:.6}", y as f64 / ny as f64, u[0]);
    }

    // Primary vortex: strongest vorticity away from the lid
    let u = |x: usize, y: usize| lbm.velocity_at(x, y, 0).unwrap_or_default();
    let mut max_vorticity = 0.0;
    let mut vortex = (0, 0);
    for y in 1..ny - 8 {
        for x in 1..nx - 1 {
            // ω = ∂v/∂x - ∂u/∂y
            let dvdx = (u(x + 1, y)[1] - u(x - 1, y)[1]) / 2.0;
            let dudy = (u(x, y + 1)[0] - u(x, y - 1)[0]) / 2.0;
            let vorticity = (dvdx - dudy).abs();
            if vorticity > max_vorticity {
                max_vorticity = vorticity;
                vortex = (x, y);
            }
        }
    }

    println!("\nPrimary vortex center:");
    println!(
        "  x/L = {:.3}, y/H = {:.3}",
        vortex.0 as f64 / nx as f64,
        vortex.1 as f64 / ny as f64
    );
    println!("  Max vorticity: {:.6}", max_vorticity);

    Ok(())
}
