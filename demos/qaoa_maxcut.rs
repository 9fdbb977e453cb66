//! MaxCut on a four-vertex ring with a two-layer QAOA.

use anyhow::Result;
use simple_qcircuit::qaoa::{maxcut_clauses, Qaoa};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let edges = [(0, 1), (1, 2), (2, 3), (3, 0)];
    let clauses = maxcut_clauses(4, &edges);
    for clause in &clauses {
        println!("{}", clause);
    }

    let qaoa = Qaoa::new(clauses, 2)?.with_shots(1024).with_max_iters(500);
    println!("Template:\n{}", qaoa.template());

    let mut rng = rand::rng();
    let solution = qaoa.optimize(&mut rng)?;
    println!(
        "Optimised after {} iterations: <C> = {:.4}",
        solution.iterations, solution.expectation
    );
    println!("gamma = {:?}", solution.params.gamma);
    println!("beta = {:?}", solution.params.beta);

    let estimate = qaoa.sampled_expectation(&solution.params, &mut rng)?;
    println!("Sampled <C> = {:.4}", estimate);

    let z = qaoa.sample(&solution.params, &mut rng)?;
    println!("Most frequent cut: {} (cost {})", qaoa.bitstring(z), qaoa.cost(z));

    Ok(())
}
