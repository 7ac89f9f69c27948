use std::f64::consts::PI;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kinetic_plasma::config::{read_config, read_default_config, Config};
use kinetic_plasma::simulation::Simulation;
use kinetic_plasma::Float;

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

/// Drift momentum of each beam.
const BEAM_MOMENTUM: Float = 2.0;
/// Relative amplitude of the seeded density noise.
const NOISE_AMPLITUDE: Float = 1e-3;
/// Number of Fourier modes in the noise.
const NOISE_MODES: usize = 8;

fn main() -> kinetic_plasma::Result<()> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => read_config(path)?,
        None => read_default_config()?,
    };
    info!(seed = config.run.seed, n_q1 = config.domain.n_q1, "two-stream run");

    let noise = density_noise(&config);
    let mut simulation = Simulation::new(&config, |species, q1, _, p| {
        let density = 1.0 + noise(q1);
        let beams = (-(p[0] - BEAM_MOMENTUM * species.mass).powi(2) / 2.0).exp()
            + (-(p[0] + BEAM_MOMENTUM * species.mass).powi(2) / 2.0).exp();
        density * beams / (2.0 * (2.0 * PI).sqrt())
    })?;

    let start = Instant::now();
    let diagnostics = simulation.run()?;
    let runtime = start.elapsed();
    info!(
        ?runtime,
        steps = diagnostics.steps,
        time = diagnostics.time,
        field_energy = ?diagnostics.field_energy,
        mass = ?diagnostics.mass,
        "finished"
    );
    Ok(())
}

/// Sum of low Fourier modes along q1 with seeded random amplitudes and phases.
fn density_noise(config: &Config) -> impl Fn(Float) -> Float {
    let mut rng = StdRng::seed_from_u64(config.run.seed);
    let modes: Vec<(Float, Float)> = (0..NOISE_MODES)
        .map(|_| (rng.gen_range(-1.0..1.0), rng.gen_range(0.0..2.0 * PI)))
        .collect();
    let (start, length) = (
        config.domain.q1_start,
        config.domain.q1_end - config.domain.q1_start,
    );
    move |q1| {
        modes
            .iter()
            .enumerate()
            .map(|(m, (amplitude, phase))| {
                let k = 2.0 * PI * (m + 1) as Float / length;
                amplitude * (k * (q1 - start) + phase).cos()
            })
            .sum::<Float>()
            * NOISE_AMPLITUDE
    }
}
