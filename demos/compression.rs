use std::f64::consts::PI;

use anyhow::Result;
use simple_qcircuit::compression::Compressor;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let ensemble = vec![((0.0, 0.0), 0.5), ((PI / 2.0, 0.0), 0.5)];
    let compressor = Compressor::new(ensemble, 3)?;
    println!(
        "Entropy {:.4} bits, {} of {} qubits sent",
        compressor.entropy(),
        compressor.compressed_size(),
        compressor.block_size()
    );
    println!("Circuit:\n{}", compressor.circuit()?);

    let mut rng = rand::rng();
    let mean = |f: &[f64]| f.iter().sum::<f64>() / f.len() as f64;
    let noiseless = compressor.simulate(100, 0.0, &mut rng)?;
    let noisy = compressor.simulate(100, 0.1, &mut rng)?;
    println!("Noiseless system fidelity: {:.4}", mean(&noiseless));
    println!("Noisy (p = 0.1) system fidelity: {:.4}", mean(&noisy));

    Ok(())
}
