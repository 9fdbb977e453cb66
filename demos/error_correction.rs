//! Logical fidelity of the three- and five-qubit codes under noise, with
//! and without the correction stage.

use std::f64::consts::PI;

use anyhow::Result;
use simple_qcircuit::qec::{CodeCircuits, FiveQubitCode, ThreeQubitCode};
use simple_qcircuit::{NoiseModel, QState, Simulator};
use tracing_subscriber::EnvFilter;

fn average_fidelity(
    code: &CodeCircuits,
    noise: NoiseModel,
    trials: usize,
    rng: &mut impl rand::Rng,
) -> Result<(f64, f64)> {
    let theta = PI / 3.0;
    let phi = PI / 4.0;

    let mut prep = code.blank("prep")?;
    prep.ry(theta, code.logical_wire())?
        .rz(phi, code.logical_wire())?;
    let input = Simulator::new().statevector(&prep, &QState::zero_state(code.num_wires()))?;

    let sim = Simulator::new().with_noise(noise);
    let corrected = code.circuit();
    let uncorrected = code.uncorrected(code.noise_layer())?;

    let mut with = 0.0;
    let mut without = 0.0;
    for _ in 0..trials {
        with += code.logical_fidelity(&input, &sim.run(corrected, &input, rng)?)?;
        without += code.logical_fidelity(&input, &sim.run(&uncorrected, &input, rng)?)?;
    }
    Ok((with / trials as f64, without / trials as f64))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut rng = rand::rng();
    let trials = 500;

    let three = ThreeQubitCode::new()?;
    println!("Three qubit code:\n{}", three.circuits().circuit());
    let noise = NoiseModel::bit_flip(0.1)?;
    let (with, without) = average_fidelity(three.circuits(), noise, trials, &mut rng)?;
    println!("{}: corrected {:.4}, uncorrected {:.4}", noise, with, without);

    let five = FiveQubitCode::new()?;
    println!("Five qubit code:\n{}", five.circuits().circuit());
    for p in [0.01, 0.05, 0.1] {
        let noise = NoiseModel::depolarizing(p)?;
        let (with, without) = average_fidelity(five.circuits(), noise, trials, &mut rng)?;
        println!("{}: corrected {:.4}, uncorrected {:.4}", noise, with, without);
    }

    Ok(())
}
