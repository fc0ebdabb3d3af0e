//! Circuit execution.
//!
//! Runs the withdraw circuit over a [`WitnessInput`] and checks every
//! constraint. Output produced while synthesizing goes to the executor's own
//! `tracing` sink, which discards everything unless one is supplied; the
//! process-wide subscriber is never touched.
//!
//! The arkworks gadgets open a span under the `r1cs` target for every
//! operation, carrying the constraint system as a field. Those spans never
//! reach a sink.

use ark_bn254::Fr;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use tracing::{Dispatch, Subscriber};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;

use crate::circuit::WithdrawCircuit;
use crate::errors::{ProverError, Result};
use crate::witness::{Witness, WitnessInput};

/// Turns named circuit inputs into a checked witness
pub trait CircuitExecutor {
    /// Tree depth the circuit is built for
    fn depth(&self) -> usize;

    /// Execute the circuit. Fails closed with `WitnessExecution` when any
    /// constraint is unsatisfied.
    fn execute(&self, input: &WitnessInput) -> Result<Witness>;
}

/// Executes the R1CS withdraw circuit
#[derive(Debug, Clone)]
pub struct R1csExecutor {
    depth: usize,
    sink: Dispatch,
}

impl R1csExecutor {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            sink: Dispatch::none(),
        }
    }

    /// Route synthesis output to `sink` instead of discarding it.
    /// Gadget spans (target `r1cs`) are filtered out before the sink sees them.
    pub fn with_sink<S>(mut self, sink: S) -> Self
    where
        S: Subscriber + Send + Sync + 'static,
    {
        self.sink = Dispatch::new(sink.with(without_gadget_spans()));
        self
    }

    fn synthesize(&self, input: &WitnessInput) -> Result<Witness> {
        let cs = ConstraintSystem::<Fr>::new_ref();
        WithdrawCircuit::from_input(input)
            .generate_constraints(cs.clone())
            .map_err(|e| ProverError::WitnessExecution(e.to_string()))?;

        let satisfied = cs
            .is_satisfied()
            .map_err(|e| ProverError::WitnessExecution(e.to_string()))?;
        if !satisfied {
            tracing::debug!(
                unsatisfied = ?cs.which_is_unsatisfied().ok().flatten(),
                "withdraw circuit rejected witness"
            );
            return Err(ProverError::WitnessExecution(
                "circuit constraints are not satisfied".into(),
            ));
        }

        let num_constraints = cs.num_constraints();
        tracing::debug!(num_constraints, "withdraw circuit satisfied");
        Ok(Witness::new(input.clone(), num_constraints))
    }
}

/// Target the arkworks gadgets instrument under
pub const GADGET_TARGET: &str = "r1cs";

fn without_gadget_spans() -> Targets {
    Targets::new()
        .with_target(GADGET_TARGET, LevelFilter::OFF)
        .with_default(LevelFilter::TRACE)
}

/// Run `f` with every `tracing` event and span discarded.
pub(crate) fn untraced<T>(f: impl FnOnce() -> T) -> T {
    tracing::dispatcher::with_default(&Dispatch::none(), f)
}

impl CircuitExecutor for R1csExecutor {
    fn depth(&self) -> usize {
        self.depth
    }

    fn execute(&self, input: &WitnessInput) -> Result<Witness> {
        if input.merkle_proof.len() != self.depth || input.is_valid.len() != self.depth {
            return Err(ProverError::WitnessExecution(format!(
                "expected {} path levels, got {} siblings and {} direction bits",
                self.depth,
                input.merkle_proof.len(),
                input.is_valid.len()
            )));
        }

        tracing::dispatcher::with_default(&self.sink, || self.synthesize(input))
    }
}
