pub mod heuristic;
pub mod model;
pub mod preprocess;
pub mod sampling;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::{error, info, warn};
use ndarray::Array4;
use retina_shared::{CLASS_COUNT, ClassLabel, ModelType};

use crate::error::{ModelLoadError, PredictionError};

/// One probability per [`ClassLabel`], in severity order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbabilityVector([f64; CLASS_COUNT]);

impl ProbabilityVector {
    pub fn new(values: [f64; CLASS_COUNT]) -> Self {
        Self(values)
    }

    /// Scales `values` so they sum to one.
    pub fn normalized(values: [f64; CLASS_COUNT]) -> Self {
        let total: f64 = values.iter().sum();
        Self(values.map(|v| v / total))
    }

    /// Takes a raw model output as-is; trained models already emit a distribution.
    pub fn from_model_output(output: &[f32]) -> Result<Self, PredictionError> {
        let values: [f32; CLASS_COUNT] =
            output
                .try_into()
                .map_err(|_| PredictionError::ShapeMismatch {
                    expected: CLASS_COUNT,
                    actual: output.len(),
                })?;
        Ok(Self(values.map(f64::from)))
    }

    pub fn get(&self, label: ClassLabel) -> f64 {
        self.0[label.index()]
    }

    /// Index of the largest value; ties go to the lowest index.
    pub fn argmax(&self) -> ClassLabel {
        let mut best = 0;
        for (i, &value) in self.0.iter().enumerate().skip(1) {
            if value > self.0[best] {
                best = i;
            }
        }
        ClassLabel::from_index(best).unwrap_or(ClassLabel::NoDr)
    }

    #[cfg(test)]
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub class: ClassLabel,
    pub probabilities: ProbabilityVector,
}

/// A trained classifier: takes a `(1, 224, 224, 3)` batch and returns the raw
/// flattened output.
pub trait ProbabilityModel: Send + Sync {
    fn forward(&self, batch: &Array4<f32>) -> Result<Vec<f32>, PredictionError>;
}

/// Which inference path serves requests. Resolved once at startup.
#[derive(Clone)]
pub enum InferenceMode {
    RealModel(Arc<dyn ProbabilityModel>),
    Simulation,
}

impl InferenceMode {
    pub fn model_type(&self) -> ModelType {
        match self {
            InferenceMode::RealModel(_) => ModelType::TrainedModel,
            InferenceMode::Simulation => ModelType::Simulation,
        }
    }

    pub fn is_real_model(&self) -> bool {
        matches!(self, InferenceMode::RealModel(_))
    }
}

impl fmt::Debug for InferenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceMode::RealModel(_) => f.write_str("RealModel"),
            InferenceMode::Simulation => f.write_str("Simulation"),
        }
    }
}

/// Tries to bring up the trained model at `path`, falling back to simulation
/// on any failure.
pub fn load_inference_mode(path: &Path) -> InferenceMode {
    match model::load(path) {
        Ok(model) => {
            info!("Successfully loaded model from {}", path.display());
            InferenceMode::RealModel(model)
        }
        Err(e @ ModelLoadError::FrameworkUnavailable) | Err(e @ ModelLoadError::NotFound(_)) => {
            warn!("{}; using simulation mode instead", e);
            InferenceMode::Simulation
        }
        Err(e) => {
            error!("{}; using simulation mode instead", e);
            InferenceMode::Simulation
        }
    }
}
