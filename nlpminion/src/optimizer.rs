//! Adadelta (Zeiler, 2012) over sparse feature vectors.
use std::fs;
use std::path::Path;

use crate::common::{ACCUM_GRAD_FILE, ACCUM_UPDATE_FILE, DEFAULT_EPSILON, DEFAULT_RHO};
use crate::errors::{MinionError, Result};
use crate::feature_vector::FeatureVector;
use crate::store::KeyValueStore;

/// Running averages kept by [`Adadelta`] between updates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OptimizerState {
    accum_grad: FeatureVector,
    accum_update: FeatureVector,
}

impl OptimizerState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decayed average of squared gradients.
    pub fn accumulated_gradient(&self) -> &FeatureVector {
        &self.accum_grad
    }

    /// Decayed average of squared updates.
    pub fn accumulated_update(&self) -> &FeatureVector {
        &self.accum_update
    }

    /// Reads a state written by [`OptimizerState::write_dir`].
    ///
    /// A directory without state files yields an empty state, so the first run of a training
    /// loop can point at a fresh directory.
    pub fn read_dir<P>(dir: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let dir = dir.as_ref();
        let grad_path = dir.join(ACCUM_GRAD_FILE);
        let update_path = dir.join(ACCUM_UPDATE_FILE);

        let mut state = Self::new();
        match (grad_path.exists(), update_path.exists()) {
            (true, true) => {
                state.accum_grad.read_path(&grad_path)?;
                state.accum_update.read_path(&update_path)?;
            }
            (false, false) => {
                log::info!("no optimizer state in {}, starting fresh", dir.display());
            }
            _ => {
                return Err(MinionError::invalid_argument(
                    "dir",
                    format!("incomplete optimizer state in {}", dir.display()),
                ));
            }
        }
        Ok(state)
    }

    /// Writes both accumulators into `dir`, creating it if needed.
    pub fn write_dir<P>(&self, dir: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        self.accum_grad.write_path(dir.join(ACCUM_GRAD_FILE))?;
        self.accum_update.write_path(dir.join(ACCUM_UPDATE_FILE))?;
        Ok(())
    }
}

/// Adadelta optimizer.
///
/// Each key keeps its own accumulators, so updates of different keys never interact.
///
/// ```
/// use nlpminion::{Adadelta, FeatureVector};
///
/// let mut weights: FeatureVector = "LanguageModel=0.5 Glue=0.1".parse()?;
/// let gradient: FeatureVector = "LanguageModel=-3.9722 Glue=2.5".parse()?;
///
/// let mut adadelta = Adadelta::new();
/// let delta = adadelta.update(&gradient);
/// weights.add(&delta);
/// assert!(weights.value("LanguageModel") > 0.5);
/// assert!(weights.value("Glue") < 0.1);
/// # Ok::<(), nlpminion::errors::MinionError>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Adadelta {
    rho: f64,
    epsilon: f64,
    state: OptimizerState,
}

impl Default for Adadelta {
    fn default() -> Self {
        Self {
            rho: DEFAULT_RHO,
            epsilon: DEFAULT_EPSILON,
            state: OptimizerState::default(),
        }
    }
}

impl Adadelta {
    /// Creates an optimizer with `rho = 0.95` and `epsilon = 1e-6`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the decay constant of the running averages.
    ///
    /// # Errors
    ///
    /// [`MinionError`] is returned unless `0 <= rho < 1`.
    pub fn rho(mut self, rho: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&rho) {
            return Err(MinionError::invalid_argument(
                "rho",
                format!("must be in [0, 1), got {rho}"),
            ));
        }
        self.rho = rho;
        Ok(self)
    }

    /// Sets the constant that keeps the denominator away from zero.
    ///
    /// # Errors
    ///
    /// [`MinionError`] is returned unless `epsilon > 0`.
    pub fn epsilon(mut self, epsilon: f64) -> Result<Self> {
        if !(epsilon > 0.0) {
            return Err(MinionError::invalid_argument(
                "epsilon",
                format!("must be positive, got {epsilon}"),
            ));
        }
        self.epsilon = epsilon;
        Ok(self)
    }

    /// Resumes from a previously saved state.
    pub fn with_state(mut self, state: OptimizerState) -> Self {
        self.state = state;
        self
    }

    /// Current accumulators.
    pub fn state(&self) -> &OptimizerState {
        &self.state
    }

    /// Consumes the optimizer, returning its accumulators.
    pub fn into_state(self) -> OptimizerState {
        self.state
    }

    /// Accumulates `gradient` and returns the step to add to the weights.
    pub fn update(&mut self, gradient: &FeatureVector) -> FeatureVector {
        let mut delta = FeatureVector::new();
        for (key, g) in gradient.iter() {
            let accum_grad = self.state.accum_grad.value_mut(key);
            *accum_grad = self.rho * *accum_grad + (1.0 - self.rho) * (g * g);
            let accum_grad = *accum_grad;

            let accum_update = self.state.accum_update.value_mut(key);
            let d = -(*accum_update + self.epsilon).sqrt() / (accum_grad + self.epsilon).sqrt() * g;
            *accum_update = self.rho * *accum_update + (1.0 - self.rho) * (d * d);

            log::trace!("{key}: gradient={g} delta={d}");
            delta.insert(key, d);
        }
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-12 * expected.abs(),
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_update() {
        let gradient: FeatureVector = "test1=-3.9722 test2=2.5".parse().unwrap();
        let mut adadelta = Adadelta::new();
        let delta = adadelta.update(&gradient);
        assert_eq!(delta.len(), 2);
        assert_close(delta.value("test1"), 0.004472133120656804);
        assert_close(delta.value("test2"), -0.0044721287995992225);
    }

    #[test]
    fn test_key_independence() {
        let mut joint = Adadelta::new();
        let joint_delta = joint.update(&"a=-3.9722 b=2.5".parse().unwrap());

        let mut only_a = Adadelta::new();
        let a_delta = only_a.update(&"a=-3.9722".parse().unwrap());
        let mut only_b = Adadelta::new();
        let b_delta = only_b.update(&"b=2.5".parse().unwrap());

        assert_eq!(joint_delta.get("a"), a_delta.get("a"));
        assert_eq!(joint_delta.get("b"), b_delta.get("b"));
    }

    #[test]
    fn test_deterministic() {
        let gradients = ["a=1 b=-2", "a=0.5 c=3", "b=1"];
        let run = || {
            let mut adadelta = Adadelta::new();
            gradients
                .iter()
                .map(|g| adadelta.update(&g.parse().unwrap()))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_accumulators() {
        let mut adadelta = Adadelta::new().rho(0.5).unwrap().epsilon(1e-4).unwrap();
        let delta = adadelta.update(&"a=2".parse().unwrap());

        // accum_grad = 0.5 * 4 = 2
        assert_close(adadelta.state().accumulated_gradient().value("a"), 2.0);
        let d = -(1e-4f64).sqrt() / (2.0f64 + 1e-4).sqrt() * 2.0;
        assert_close(delta.value("a"), d);
        assert_close(adadelta.state().accumulated_update().value("a"), 0.5 * d * d);
    }

    #[test]
    fn test_second_step_uses_history() {
        let gradient: FeatureVector = "a=1".parse().unwrap();
        let mut adadelta = Adadelta::new();
        let first = adadelta.update(&gradient);
        let second = adadelta.update(&gradient);
        assert!(second.value("a").abs() > first.value("a").abs());
    }

    #[test]
    fn test_invalid_hyperparameters() {
        assert!(Adadelta::new().rho(1.0).is_err());
        assert!(Adadelta::new().rho(-0.1).is_err());
        assert!(Adadelta::new().epsilon(0.0).is_err());
        assert!(Adadelta::new().epsilon(f64::NAN).is_err());
        assert!(Adadelta::new().rho(0.0).is_ok());
    }

    #[test]
    fn test_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join("state");

        assert_eq!(OptimizerState::read_dir(&state_dir).unwrap(), OptimizerState::new());

        let mut adadelta = Adadelta::new();
        adadelta.update(&"a=-3.9722 b=2.5".parse().unwrap());
        adadelta.state().write_dir(&state_dir).unwrap();

        // Values are stored with 16 decimals.
        let restored = OptimizerState::read_dir(&state_dir).unwrap();
        for (key, val) in adadelta.state().accumulated_gradient().iter() {
            assert!((restored.accumulated_gradient().value(key) - val).abs() < 1e-15);
        }
        for (key, val) in adadelta.state().accumulated_update().iter() {
            assert!((restored.accumulated_update().value(key) - val).abs() < 1e-15);
        }
    }

    #[test]
    fn test_incomplete_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ACCUM_GRAD_FILE), "a 1.0\n").unwrap();
        assert!(matches!(
            OptimizerState::read_dir(dir.path()),
            Err(MinionError::InvalidArgument(_))
        ));
    }
}
