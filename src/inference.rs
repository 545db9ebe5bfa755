//! Policies answering `decision_requested`.
//!
//! Uses the `ort` crate (ONNX Runtime bindings for Rust) for trained networks;
//! zero and random policies cover dry runs without a model.

use anyhow::{ensure, Context, Result};
use ndarray::Array2;
use ort::session::Session;
use ort::value::Tensor;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::Path;

use crate::action::ACTION_LEN;
use crate::observation::OBS_LEN;

/// Maps one observation vector to one action vector.
pub trait Policy {
    fn act(&mut self, observation: &[f64]) -> Result<Vec<f64>>;
}

/// ONNX policy wrapper for running a trained walker policy.
pub struct PolicyInference {
    session: Session,
    input_name: String,
}

impl PolicyInference {
    /// Load an ONNX model from disk.
    pub fn load(model_path: &Path) -> Result<Self> {
        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(model_path)
            .context("Failed to load ONNX model")?;

        let input_name = session.inputs()[0].name().to_string();

        tracing::info!(
            "Loaded ONNX policy from {} (input: {})",
            model_path.display(),
            input_name
        );

        Ok(Self {
            session,
            input_name,
        })
    }

    /// Run a forward pass: walker observation in, walker action out.
    ///
    /// The observation is fed as a `[1, OBS_LEN]` float32 tensor; the first
    /// output tensor is flattened and must hold exactly `ACTION_LEN` values.
    pub fn infer(&mut self, observation: &[f64]) -> Result<Vec<f64>> {
        check_len("observation", observation.len(), OBS_LEN)?;
        let obs_f32: Vec<f32> = observation.iter().map(|&x| x as f32).collect();
        let input = Array2::from_shape_vec((1, OBS_LEN), obs_f32)
            .context("Failed to create observation array")?;

        let input_tensor =
            Tensor::from_array(input).context("Failed to create input tensor")?;

        let outputs = self
            .session
            .run(ort::inputs![&self.input_name => input_tensor])
            .context("ONNX inference failed")?;

        let (_, output_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract output tensor")?;

        check_len("policy output", output_data.len(), ACTION_LEN)?;
        Ok(output_data.iter().map(|&x| x as f64).collect())
    }

    /// Average inference latency over `iterations` resting observations.
    pub fn benchmark(&mut self, iterations: usize) -> Result<std::time::Duration> {
        let dummy_obs = vec![0.0; OBS_LEN];
        let start = std::time::Instant::now();

        for _ in 0..iterations {
            self.infer(&dummy_obs)?;
        }

        let avg = start.elapsed() / iterations.max(1) as u32;
        tracing::info!(
            "Inference benchmark: {} iterations, avg {:.2}ms",
            iterations,
            avg.as_secs_f64() * 1000.0
        );

        Ok(avg)
    }
}

/// Reject vectors sized for another schema version.
fn check_len(what: &str, actual: usize, expected: usize) -> Result<()> {
    ensure!(
        actual == expected,
        "{} has {} values, walker schema v{}/v{} expects {}",
        what,
        actual,
        crate::observation::OBS_VERSION,
        crate::action::ACTION_VERSION,
        expected
    );
    Ok(())
}

impl Policy for PolicyInference {
    fn act(&mut self, observation: &[f64]) -> Result<Vec<f64>> {
        self.infer(observation)
    }
}

/// Always outputs zeros: joints held at neutral, no stand assist.
pub struct ZeroPolicy {
    action_len: usize,
}

impl ZeroPolicy {
    pub fn new(action_len: usize) -> Self {
        Self { action_len }
    }
}

impl Policy for ZeroPolicy {
    fn act(&mut self, _observation: &[f64]) -> Result<Vec<f64>> {
        Ok(vec![0.0; self.action_len])
    }
}

/// Uniform actions in [-1, 1] from a seeded generator.
pub struct RandomPolicy {
    action_len: usize,
    rng: ChaCha8Rng,
}

impl RandomPolicy {
    pub fn new(action_len: usize, seed: u64) -> Self {
        Self {
            action_len,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn act(&mut self, _observation: &[f64]) -> Result<Vec<f64>> {
        Ok((0..self.action_len)
            .map(|_| self.rng.gen_range(-1.0..=1.0))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_length_check() {
        assert!(check_len("observation", OBS_LEN, OBS_LEN).is_ok());
        let err = check_len("policy output", 12, ACTION_LEN).unwrap_err();
        assert!(err.to_string().contains("12 values"));
        assert!(err.to_string().contains(&ACTION_LEN.to_string()));
    }

    #[test]
    fn test_zero_policy_shape() {
        let mut policy = ZeroPolicy::new(27);
        let action = policy.act(&[1.0, 2.0]).unwrap();
        assert_eq!(action, vec![0.0; 27]);
    }

    #[test]
    fn test_random_policy_bounded_and_seeded() {
        let mut a = RandomPolicy::new(27, 4);
        let mut b = RandomPolicy::new(27, 4);
        let first = a.act(&[]).unwrap();
        assert_eq!(first, b.act(&[]).unwrap());
        assert!(first.iter().all(|v| (-1.0..=1.0).contains(v)));
    }
}
