use std::path::Path;
use std::sync::Arc;

use super::preprocess::PreprocessedImage;
use super::{Prediction, ProbabilityModel, ProbabilityVector};
use crate::error::{ModelLoadError, PredictionError};

#[cfg(feature = "torch")]
pub use torch::TorchModel;

/// Loads the trained classifier at `path`.
#[cfg(feature = "torch")]
pub fn load(path: &Path) -> Result<Arc<dyn ProbabilityModel>, ModelLoadError> {
    if !path.is_file() {
        return Err(ModelLoadError::NotFound(path.to_path_buf()));
    }
    Ok(Arc::new(TorchModel::load(path)?))
}

/// Without the `torch` feature there is no framework to load a model with.
#[cfg(not(feature = "torch"))]
pub fn load(_path: &Path) -> Result<Arc<dyn ProbabilityModel>, ModelLoadError> {
    Err(ModelLoadError::FrameworkUnavailable)
}

/// Runs a trained model on one image. The predicted class is the argmax of the
/// raw output, which is reported unchanged.
pub fn predict(
    model: &dyn ProbabilityModel,
    image: &PreprocessedImage,
) -> Result<Prediction, PredictionError> {
    let batch = image.to_batch();
    let output = model.forward(&batch)?;
    let probabilities = ProbabilityVector::from_model_output(&output)?;

    Ok(Prediction {
        class: probabilities.argmax(),
        probabilities,
    })
}

#[cfg(feature = "torch")]
mod torch {
    use std::path::Path;
    use std::sync::Mutex;

    use ndarray::Array4;
    use tch::{CModule, Device, Kind, Tensor};

    use crate::error::{ModelLoadError, PredictionError};
    use crate::inference::ProbabilityModel;

    /// A TorchScript classifier, on CUDA when available.
    pub struct TorchModel {
        module: Mutex<CModule>,
        device: Device,
    }

    impl TorchModel {
        pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
            let device = Device::cuda_if_available();
            let module = CModule::load_on_device(path, device)
                .map_err(|e| ModelLoadError::Load(e.to_string()))?;
            log::info!("Loaded TorchScript module on {:?}", device);
            Ok(Self {
                module: Mutex::new(module),
                device,
            })
        }
    }

    impl ProbabilityModel for TorchModel {
        fn forward(&self, batch: &Array4<f32>) -> Result<Vec<f32>, PredictionError> {
            let (n, h, w, c) = batch.dim();
            let dims = [n as i64, h as i64, w as i64, c as i64];
            let contiguous = batch.as_standard_layout();
            let data = contiguous.as_slice().ok_or_else(|| {
                PredictionError::Inference("input batch is not contiguous".to_string())
            })?;

            let input = Tensor::from_slice(data).reshape(&dims).to_device(self.device);
            let output = {
                let module = self.module.lock().map_err(|_| {
                    PredictionError::Inference("model lock poisoned".to_string())
                })?;
                module.forward_ts(&[input])?
            };

            let flat = output
                .to_kind(Kind::Float)
                .to_device(Device::Cpu)
                .view([-1]);
            let values = Vec::<f32>::try_from(&flat)?;
            Ok(values)
        }
    }
}
