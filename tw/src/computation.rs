//! The computation a worker performs on each tick

/// Maps an input vector to an output vector once per tick
pub trait Computation: Send {
    /// Short human-readable name for `summary`
    fn name(&self) -> &str;

    /// Produce exactly `outputs` values from `inputs`
    fn compute(&mut self, inputs: &[f64], outputs: usize) -> Vec<f64>;
}

/// Output `i` is the negation of input `i`; outputs without an input are 0
#[derive(Debug, Clone, Copy, Default)]
pub struct Negate;

impl Computation for Negate {
    fn name(&self) -> &str {
        "negate"
    }

    fn compute(&mut self, inputs: &[f64], outputs: usize) -> Vec<f64> {
        (0..outputs).map(|i| -inputs.get(i).copied().unwrap_or(0.0)).collect()
    }
}
