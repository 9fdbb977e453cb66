use anyhow::Result;
use simple_qcircuit::qft::{inverse_qft, qft};
use simple_qcircuit::{Circuit, QState, Simulator};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let num_of_qubits = 3;

    let mut circuit = Circuit::new("main");
    let q = circuit.add_register("q", num_of_qubits)?;
    circuit.append(qft(num_of_qubits)?, q.wires())?;
    println!("Circuit:\n{}", circuit);

    let qs = QState::from_str("101")?;
    let sim = Simulator::new();
    let result = sim.statevector(&circuit, &qs)?;
    println!("QFT |101>:\n{}", result);

    circuit.append(inverse_qft(num_of_qubits)?, q.wires())?;
    let round_trip = sim.statevector(&circuit, &qs)?;
    println!("QFT then inverse QFT:\n{}", round_trip);
    println!("Fidelity with input: {:.6}", qs.fidelity(&round_trip)?);

    Ok(())
}
