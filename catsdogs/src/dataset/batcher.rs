//! Tensor Batch Construction
//!
//! Converts preprocessed image items into normalized Burn tensor batches.
//! Items carry CHW float data in [0, 1]; the batcher stacks them and applies
//! ImageNet normalization, so the exact same arithmetic runs in training and
//! in the inference service.

use std::path::Path;

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;
use image::imageops::FilterType;
use image::ImageReader;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::augmentation::Augmenter;
use crate::utils::error::{CatsDogsError, Result};

/// ImageNet normalization mean values (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A single preprocessed image ready for batching
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatsDogsItem {
    /// Image data as flattened CHW float array [3 * H * W] in [0, 1]
    pub image: Vec<f32>,
    /// Class label (0 = cat, 1 = dog)
    pub label: usize,
    /// Source path (for logging)
    pub path: String,
}

impl CatsDogsItem {
    /// Load an image with the deterministic evaluation transform:
    /// resize to `image_size` and convert to CHW floats.
    pub fn from_path(path: &Path, label: usize, image_size: usize) -> Result<Self> {
        let img = ImageReader::open(path)
            .map_err(|e| CatsDogsError::Data(path.to_path_buf(), e.to_string()))?
            .decode()
            .map_err(|e| CatsDogsError::Data(path.to_path_buf(), e.to_string()))?;

        let rgb = img
            .resize_exact(image_size as u32, image_size as u32, FilterType::Triangle)
            .to_rgb8();

        Ok(Self {
            image: chw_floats(&rgb),
            label,
            path: path.to_string_lossy().to_string(),
        })
    }

    /// Load an image with the stochastic training transform. The augmenter
    /// output already has the target size.
    pub fn from_path_augmented<R: Rng + ?Sized>(
        path: &Path,
        label: usize,
        augmenter: &Augmenter,
        rng: &mut R,
    ) -> Result<Self> {
        let img = ImageReader::open(path)
            .map_err(|e| CatsDogsError::Data(path.to_path_buf(), e.to_string()))?
            .decode()
            .map_err(|e| CatsDogsError::Data(path.to_path_buf(), e.to_string()))?;

        let rgb = augmenter.apply(&img, rng);

        Ok(Self {
            image: chw_floats(&rgb),
            label,
            path: path.to_string_lossy().to_string(),
        })
    }

    /// Create an item from pre-computed tensor data
    pub fn from_data(image: Vec<f32>, label: usize, path: String) -> Self {
        Self { image, label, path }
    }
}

/// Convert an RGB8 image to CHW floats in [0, 1]
pub fn chw_floats(rgb: &image::RgbImage) -> Vec<f32> {
    let (width, height) = rgb.dimensions();
    let (width, height) = (width as usize, height as usize);
    let mut data = vec![0.0f32; 3 * height * width];

    for y in 0..height {
        for x in 0..width {
            let pixel = rgb.get_pixel(x as u32, y as u32);
            for c in 0..3 {
                data[c * height * width + y * width + x] = pixel[c] as f32 / 255.0;
            }
        }
    }

    data
}

/// A batch of images and labels
#[derive(Clone, Debug)]
pub struct CatsDogsBatch<B: Backend> {
    /// Images with shape [batch_size, 3, height, width], normalized
    pub images: Tensor<B, 4>,
    /// Labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher for creating normalized training/evaluation batches
#[derive(Clone, Debug)]
pub struct CatsDogsBatcher<B: Backend> {
    device: B::Device,
    image_size: usize,
}

impl<B: Backend> CatsDogsBatcher<B> {
    /// Create a batcher for the given device and image size
    pub fn new(device: B::Device, image_size: usize) -> Self {
        Self { device, image_size }
    }

    /// The batcher's device
    pub fn device(&self) -> &B::Device {
        &self.device
    }
}

impl<B: Backend> Batcher<B, CatsDogsItem, CatsDogsBatch<B>> for CatsDogsBatcher<B> {
    fn batch(&self, items: Vec<CatsDogsItem>, device: &B::Device) -> CatsDogsBatch<B> {
        let batch_size = items.len();
        let channels = 3;
        let height = self.image_size;
        let width = self.image_size;

        let images_data: Vec<f32> = items.iter().flat_map(|item| item.image.clone()).collect();

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, channels, height, width]),
            device,
        );

        // ImageNet normalization: (x - mean) / std, broadcast over H and W
        let mean = Tensor::<B, 4>::from_floats(
            TensorData::new(IMAGENET_MEAN.to_vec(), [1, 3, 1, 1]),
            device,
        );
        let std = Tensor::<B, 4>::from_floats(
            TensorData::new(IMAGENET_STD.to_vec(), [1, 3, 1, 1]),
            device,
        );
        let images = (images - mean) / std;

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        CatsDogsBatch { images, targets }
    }
}
