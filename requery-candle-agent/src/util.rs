//! Utilities.
use anyhow::{anyhow, Result};
use candle_core::Tensor;
use candle_nn::VarMap;
use log::trace;
use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Interface for handling output dimensions.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> usize;

    /// Sets the  output dimension.
    fn set_out_dim(&mut self, v: usize);
}

/// Re-initializes all variables of `varmap` from a seeded generator.
///
/// Variables are visited in the order of their names. Matrices of shape
/// `(out_dim, in_dim)` are drawn from `U(-1/sqrt(in_dim), 1/sqrt(in_dim))` and all other
/// variables, i.e. biases, are set to zero. Two varmaps with the same variables end up
/// identical for the same seed.
pub fn init_uniform(varmap: &VarMap, seed: u64) -> Result<()> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let data = varmap
        .data()
        .lock()
        .map_err(|e| anyhow!("Failed to lock varmap: {}", e))?;
    let mut names: Vec<&String> = data.keys().collect();
    names.sort();

    for name in names {
        let var = &data[name];
        let dims = var.dims().to_vec();
        let values: Vec<f32> = match dims.as_slice() {
            [_, in_dim] => {
                let bound = 1.0 / (*in_dim as f32).sqrt();
                (0..var.elem_count())
                    .map(|_| rng.gen_range(-bound..bound))
                    .collect()
            }
            _ => vec![0.0; var.elem_count()],
        };
        trace!("init {} {:?}", name, dims);
        var.set(&Tensor::from_vec(values, dims, var.device())?)?;
    }

    Ok(())
}
