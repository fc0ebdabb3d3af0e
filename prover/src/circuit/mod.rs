pub mod poseidon;
pub mod withdraw;

pub use withdraw::{CircuitShape, WithdrawCircuit};
