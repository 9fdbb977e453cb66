//! Solves a 4x4 linear system with the compact eigenvalue-inversion circuit
//! and plots the post-selected solution register.

use std::f64::consts::PI;

use anyhow::Result;
use nalgebra::DMatrix;
use plotters::prelude::*;
use simple_qcircuit::hhl::{compact_hhl_circuit, hhl_circuit, solution_amplitudes, HhlSize};
use simple_qcircuit::{Counts, QState, Simulator};
use tracing_subscriber::EnvFilter;

fn plot_histogram(counts: &Counts, file_name: &str) -> Result<()> {
    let root = BitMapBackend::new(file_name, (640, 480)).into_drawing_area();
    root.fill(&WHITE)?;

    let dim = 1u32 << counts.num_wires();
    let max = counts.iter().map(|(_, c)| c).max().unwrap_or(1) as u32;

    let mut chart = ChartBuilder::on(&root)
        .caption("HHL post-selected counts", ("sans-serif", 24))
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d((0u32..dim).into_segmented(), 0u32..max + max / 10 + 1)?;

    chart
        .configure_mesh()
        .x_desc("b register")
        .y_desc("counts")
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BLUE.mix(0.6).filled())
            .margin(10)
            .data(counts.iter().map(|(index, count)| (index as u32, count as u32))),
    )?;

    root.present()?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let a = DMatrix::from_row_slice(
        4,
        4,
        &[
            3.75, 2.25, 1.25, -0.75, //
            2.25, 3.75, 0.75, -1.25, //
            1.25, 0.75, 3.75, -2.25, //
            -0.75, -1.25, -2.25, 3.75,
        ],
    );
    let t0 = 2.0 * PI;

    let circuit = compact_hhl_circuit(&a, t0, 6, 2, 4)?;
    println!("Circuit:\n{}", circuit);

    let input = QState::from_amplitudes(&[0.5, 0.5, 0.5, 0.5])?.embed(circuit.num_wires())?;
    let sim = Simulator::new();

    let output = sim.statevector(&circuit, &input)?;
    let amplitudes = solution_amplitudes(&circuit, &output)?;
    let success: f64 = amplitudes.iter().map(|a| a.norm_sqr()).sum();
    println!("Ancilla success probability: {:.4}", success);
    for (i, a) in amplitudes.iter().enumerate() {
        println!("|x{}|^2 = {:.4}", i, a.norm_sqr() / success);
    }

    let shots = 1024;
    let counts = sim.sample(&circuit, &input, shots, &mut rand::rng())?;
    let anc = circuit.num_wires() - 1;
    let solution = counts.post_select(anc, true).marginal(&[0, 1]);
    println!("Post-selected counts ({} of {} shots):\n{}", solution.total(), shots, solution);
    plot_histogram(&solution, "hhl.png")?;

    // Full circuit with the workspace rotation synthesis on a 2x2 system
    let small = DMatrix::from_row_slice(2, 2, &[1.5, 0.5, 0.5, 1.5]);
    let size = HhlSize::new(1, 2, 2, 2);
    let full = hhl_circuit(&small, t0, PI / 16.0, size)?;
    let input = QState::from_amplitudes(&[1.0, 0.0])?.embed(full.num_wires())?;
    let output = sim.statevector(&full, &input)?;
    let amplitudes = solution_amplitudes(&full, &output)?;
    println!(
        "Full circuit ({} wires) ancilla probability: {:.4}",
        full.num_wires(),
        amplitudes.iter().map(|a| a.norm_sqr()).sum::<f64>()
    );

    Ok(())
}
