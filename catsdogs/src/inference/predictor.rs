//! Inference Predictor
//!
//! Loads one trained checkpoint and answers prediction requests. Inputs go
//! through the same resize/normalize transform as training (never
//! augmentation), so the same image always produces the same output.

use std::path::{Path, PathBuf};

use burn::prelude::*;
use image::{imageops::FilterType, DynamicImage};
use serde::{Deserialize, Serialize};

use crate::dataset::batcher::{IMAGENET_MEAN, IMAGENET_STD};
use crate::model::cnn::CatDogClassifier;
use crate::training::checkpoint::{self, CheckpointMeta};
use crate::utils::error::{CatsDogsError, Result};

/// Result of a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted class name ("cat" or "dog")
    pub label: String,

    /// Predicted class index
    pub class_index: usize,

    /// Probability per class, in label order; sums to 1
    pub probabilities: Vec<f32>,

    /// Confidence: the maximum class probability
    pub confidence: f32,
}

impl PredictionResult {
    /// Build a result from a softmax distribution
    pub fn from_probabilities(probabilities: Vec<f32>, class_names: &[String]) -> Self {
        let (class_index, &confidence) = probabilities
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .unwrap_or((0, &0.0));

        let label = class_names
            .get(class_index)
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            label,
            class_index,
            probabilities,
            confidence,
        }
    }

    /// (class name, probability) pairs in label order
    pub fn class_probabilities<'a>(
        &'a self,
        class_names: &'a [String],
    ) -> impl Iterator<Item = (&'a str, f32)> + 'a {
        class_names
            .iter()
            .zip(self.probabilities.iter())
            .map(|(name, &p)| (name.as_str(), p))
    }
}

/// Predictor holding the loaded model and its preprocessing parameters
pub struct Predictor<B: Backend> {
    model: CatDogClassifier<B>,
    meta: CheckpointMeta,
    device: B::Device,
}

impl<B: Backend> Predictor<B> {
    /// Load a predictor from a checkpoint directory.
    ///
    /// This happens exactly once at process start; a missing or corrupt
    /// checkpoint is an error the caller turns into a not-ready state.
    pub fn from_checkpoint(checkpoint_dir: &Path, device: &B::Device) -> Result<Self> {
        let (model, meta) = checkpoint::load::<B>(checkpoint_dir, device)?;
        Ok(Self {
            model,
            meta,
            device: device.clone(),
        })
    }

    /// Build a predictor from an in-memory model (benchmarks, tests)
    pub fn from_model(model: CatDogClassifier<B>, meta: CheckpointMeta, device: B::Device) -> Self {
        Self { model, meta, device }
    }

    /// Checkpoint metadata of the loaded model
    pub fn meta(&self) -> &CheckpointMeta {
        &self.meta
    }

    /// Class names in label order
    pub fn class_names(&self) -> &[String] {
        &self.meta.class_names
    }

    /// Canonical input size of the loaded model
    pub fn image_size(&self) -> usize {
        self.meta.model.input_size
    }

    /// Predict the class of a decoded image.
    ///
    /// Pure with respect to the model parameters: concurrent calls are safe
    /// and repeated calls on the same image are bit-identical.
    pub fn predict_image(&self, image: &DynamicImage) -> PredictionResult {
        let input = self.preprocess(image);
        let probs = self.model.forward_softmax(input);
        let probabilities: Vec<f32> = probs.into_data().to_vec().unwrap();

        PredictionResult::from_probabilities(probabilities, &self.meta.class_names)
    }

    /// Decode raw bytes and predict. An undecodable payload is a client
    /// error, reported as such.
    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<PredictionResult> {
        let image =
            image::load_from_memory(bytes).map_err(|e| CatsDogsError::Decode(e.to_string()))?;
        Ok(self.predict_image(&image))
    }

    /// Predict the class of an image file
    pub fn predict_path(&self, path: &Path) -> Result<PredictionResult> {
        let bytes = std::fs::read(path)?;
        self.predict_bytes(&bytes)
    }

    /// Predict a set of files independently: one failure never aborts the
    /// others, each path reports its own result or error.
    pub fn predict_paths(&self, paths: &[PathBuf]) -> Vec<(PathBuf, Result<PredictionResult>)> {
        paths
            .iter()
            .map(|path| (path.clone(), self.predict_path(path)))
            .collect()
    }

    /// Apply the evaluation transform and build a [1, 3, S, S] tensor
    fn preprocess(&self, image: &DynamicImage) -> Tensor<B, 4> {
        let size = self.meta.model.input_size;
        let rgb = image
            .resize_exact(size as u32, size as u32, FilterType::Triangle)
            .to_rgb8();

        // Normalized CHW floats, same arithmetic as the training batcher
        let num_pixels = size * size;
        let mut data = vec![0.0f32; 3 * num_pixels];
        for y in 0..size {
            for x in 0..size {
                let pixel = rgb.get_pixel(x as u32, y as u32);
                for c in 0..3 {
                    let v = pixel[c] as f32 / 255.0;
                    data[c * num_pixels + y * size + x] = (v - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
                }
            }
        }

        Tensor::<B, 4>::from_floats(TensorData::new(data, [1, 3, size, size]), &self.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;
    use crate::model::config::ModelConfig;
    use image::{Rgb, RgbImage};

    fn test_predictor() -> Predictor<DefaultBackend> {
        let device = Default::default();
        let config = ModelConfig::tiny();
        let model = CatDogClassifier::<DefaultBackend>::new(&config, &device);
        let meta = CheckpointMeta::new(0, 0.0, config);
        Predictor::from_model(model, meta, device)
    }

    fn test_image() -> DynamicImage {
        let mut img = RgbImage::new(48, 48);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 5) as u8, (y * 5) as u8, 100]);
        }
        DynamicImage::ImageRgb8(img)
    }

    fn encode_jpeg(img: &DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Jpeg,
        )
        .unwrap();
        bytes
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let predictor = test_predictor();
        let result = predictor.predict_image(&test_image());

        assert_eq!(result.probabilities.len(), 2);
        let sum: f32 = result.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
        assert!(result
            .probabilities
            .iter()
            .all(|&p| (0.0..=1.0).contains(&p)));
        assert!(["cat", "dog"].contains(&result.label.as_str()));
    }

    #[test]
    fn test_same_image_twice_is_bit_identical() {
        let predictor = test_predictor();
        let bytes = encode_jpeg(&test_image());

        let a = predictor.predict_bytes(&bytes).unwrap();
        let b = predictor.predict_bytes(&bytes).unwrap();

        assert_eq!(a.probabilities, b.probabilities);
        assert_eq!(a.label, b.label);
    }

    #[test]
    fn test_undecodable_bytes_is_decode_error() {
        let predictor = test_predictor();
        let err = predictor.predict_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, CatsDogsError::Decode(_)));
    }

    #[test]
    fn test_batch_isolates_failures() {
        let predictor = test_predictor();
        let dir = tempfile::tempdir().unwrap();

        let good = dir.path().join("good.jpg");
        std::fs::write(&good, encode_jpeg(&test_image())).unwrap();
        let bad = dir.path().join("bad.jpg");
        std::fs::write(&bad, b"garbage").unwrap();

        let results = predictor.predict_paths(&[good, bad]);
        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
    }

    #[test]
    fn test_from_probabilities_picks_argmax() {
        let names = vec!["cat".to_string(), "dog".to_string()];
        let result = PredictionResult::from_probabilities(vec![0.3, 0.7], &names);

        assert_eq!(result.label, "dog");
        assert_eq!(result.class_index, 1);
        assert!((result.confidence - 0.7).abs() < 1e-6);
    }
}
