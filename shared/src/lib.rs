use derive_more::From;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumCount, EnumIter, EnumString};

/// Diabetic-retinopathy severity stages, ordered from healthy to most severe.
///
/// The discriminant is the class index used by both inference paths, so the
/// variant order must not change.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumCount,
    EnumIter,
    EnumString,
)]
pub enum ClassLabel {
    #[serde(rename = "No DR")]
    #[strum(serialize = "No DR")]
    NoDr,
    #[serde(rename = "Mild DR")]
    #[strum(serialize = "Mild DR")]
    Mild,
    #[serde(rename = "Moderate DR")]
    #[strum(serialize = "Moderate DR")]
    Moderate,
    #[serde(rename = "Severe DR")]
    #[strum(serialize = "Severe DR")]
    Severe,
    #[serde(rename = "Proliferative DR")]
    #[strum(serialize = "Proliferative DR")]
    Proliferative,
}

/// Number of severity stages.
pub const CLASS_COUNT: usize = <ClassLabel as strum::EnumCount>::COUNT;

impl ClassLabel {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::iter().nth(index)
    }

    pub fn is_healthy(self) -> bool {
        self == ClassLabel::NoDr
    }

    pub fn status(self) -> HealthStatus {
        if self.is_healthy() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Diseased
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum HealthStatus {
    Healthy,
    Diseased,
}

/// Tags which inference path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ModelType {
    #[serde(rename = "Trained Model")]
    #[strum(serialize = "Trained Model")]
    TrainedModel,
    #[serde(rename = "Simulation (model unavailable)")]
    #[strum(serialize = "Simulation (model unavailable)")]
    Simulation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub status: HealthStatus,
    #[serde(rename = "class")]
    pub class: ClassLabel,
    pub confidence: f64,
    pub all_probabilities: BTreeMap<ClassLabel, f64>,
    pub model_type: ModelType,
}

impl ClassificationResult {
    /// Builds a result for `class`, taking the confidence from the same
    /// probability slot that is reported in `all_probabilities`.
    pub fn new(class: ClassLabel, probabilities: &[f64], model_type: ModelType) -> Self {
        let all_probabilities: BTreeMap<ClassLabel, f64> = ClassLabel::iter()
            .zip(probabilities.iter().copied())
            .collect();
        let confidence = all_probabilities.get(&class).copied().unwrap_or_default();

        Self {
            status: class.status(),
            class,
            confidence,
            all_probabilities,
            model_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureStatus {
    #[serde(rename = "Error during prediction")]
    ErrorDuringPrediction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFailure {
    pub error: String,
    pub status: FailureStatus,
}

impl PredictionFailure {
    pub fn new(error: impl Into<String>) -> Self {
        let error = error.into();
        let error = if error.is_empty() {
            "unknown prediction error".to_string()
        } else {
            error
        };
        Self {
            error,
            status: FailureStatus::ErrorDuringPrediction,
        }
    }
}

/// Body returned for every classification request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From)]
#[serde(untagged)]
pub enum ClassificationResponse {
    Success(ClassificationResult),
    Failure(PredictionFailure),
}

impl ClassificationResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, ClassificationResponse::Success(_))
    }
}
