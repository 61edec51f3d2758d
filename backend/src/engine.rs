use image::DynamicImage;
use log::{debug, error};
use retina_shared::{ClassificationResponse, ClassificationResult, PredictionFailure};

use crate::error::PredictionError;
use crate::inference::heuristic::HeuristicEstimator;
use crate::inference::preprocess::PreprocessedImage;
use crate::inference::{InferenceMode, Prediction, model};

pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Turns images into classification results using the inference path chosen
/// at startup. Every call yields a response body; failures become the error
/// variant.
#[derive(Debug, Clone)]
pub struct ClassificationEngine {
    mode: InferenceMode,
    estimator: HeuristicEstimator,
}

impl ClassificationEngine {
    pub fn new(mode: InferenceMode) -> Self {
        Self {
            mode,
            estimator: HeuristicEstimator::new(),
        }
    }

    pub fn mode(&self) -> &InferenceMode {
        &self.mode
    }

    /// Decodes an uploaded file and classifies it.
    pub fn classify_bytes(&self, bytes: &[u8]) -> ClassificationResponse {
        Self::respond(self.try_classify_bytes(bytes))
    }

    pub fn classify(&self, image: &DynamicImage) -> ClassificationResponse {
        Self::respond(self.try_classify(image))
    }

    fn respond(result: Result<ClassificationResult, PredictionError>) -> ClassificationResponse {
        match result {
            Ok(result) => result.into(),
            Err(e) => {
                error!("Prediction failed: {}", e);
                PredictionFailure::new(e.to_string()).into()
            }
        }
    }

    fn try_classify_bytes(&self, bytes: &[u8]) -> Result<ClassificationResult, PredictionError> {
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(PredictionError::UploadTooLarge {
                size: bytes.len(),
                limit: MAX_UPLOAD_BYTES,
            });
        }
        let image = image::load_from_memory(bytes)?;
        self.try_classify(&image)
    }

    fn try_classify(&self, image: &DynamicImage) -> Result<ClassificationResult, PredictionError> {
        let preprocessed = PreprocessedImage::from_image(image)?;

        let prediction: Prediction = match &self.mode {
            InferenceMode::RealModel(trained) => {
                debug!("Using trained model for prediction");
                model::predict(trained.as_ref(), &preprocessed)?
            }
            InferenceMode::Simulation => {
                debug!("Using simulation for prediction (model unavailable)");
                self.estimator.estimate(&preprocessed)?
            }
        };

        Ok(ClassificationResult::new(
            prediction.class,
            prediction.probabilities.as_slice(),
            self.mode.model_type(),
        ))
    }
}
