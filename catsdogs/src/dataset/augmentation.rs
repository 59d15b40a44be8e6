//! Data Augmentation Module
//!
//! Train-only stochastic, label-preserving transforms. Every random draw
//! comes from an RNG passed in by the caller, so the training loop can
//! derive one per sample per epoch and tests can fix a seed: two passes
//! over the same sample differ by design, but a fixed RNG reproduces the
//! exact same output.
//!
//! Pipeline (matching the training transform of the deployed model):
//! 1. Upscale to `resize_size`
//! 2. Random crop back to `crop_size`
//! 3. Horizontal flip with probability `flip_prob`
//! 4. Rotation by a uniform angle in ±`rotation_degrees` (bilinear, black fill)
//! 5. Brightness and contrast jitter, factors in `1 ± delta`
//!
//! Validation, test and serving never touch this module.

use image::{imageops, DynamicImage, ImageBuffer, Rgb, RgbImage};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for train-time augmentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentConfig {
    /// Size images are upscaled to before the random crop
    pub resize_size: u32,
    /// Final output size (must be <= resize_size)
    pub crop_size: u32,
    /// Probability of a horizontal flip
    pub flip_prob: f64,
    /// Maximum rotation angle in degrees (applies ±rotation_degrees)
    pub rotation_degrees: f32,
    /// Brightness jitter delta (factor drawn from 1 ± delta)
    pub brightness_delta: f32,
    /// Contrast jitter delta (factor drawn from 1 ± delta)
    pub contrast_delta: f32,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            resize_size: 256,
            crop_size: 224,
            flip_prob: 0.5,
            rotation_degrees: 15.0,
            brightness_delta: 0.2,
            contrast_delta: 0.2,
        }
    }
}

impl AugmentConfig {
    /// Configuration for an arbitrary output size, keeping the 256:224
    /// upscale-to-crop proportion of the default pipeline.
    pub fn for_output_size(crop_size: u32) -> Self {
        Self {
            resize_size: crop_size + crop_size / 7,
            crop_size,
            ..Default::default()
        }
    }
}

/// Image augmenter driven by an injected random source
#[derive(Debug, Clone)]
pub struct Augmenter {
    config: AugmentConfig,
}

impl Augmenter {
    /// Create a new augmenter with the given configuration
    pub fn new(config: AugmentConfig) -> Self {
        Self { config }
    }

    /// The configured output size
    pub fn output_size(&self) -> u32 {
        self.config.crop_size
    }

    /// Apply the full augmentation pipeline to one image.
    ///
    /// Each transform draws independently from `rng`; the output always has
    /// dimensions `crop_size` x `crop_size`.
    pub fn apply<R: Rng + ?Sized>(&self, image: &DynamicImage, rng: &mut R) -> RgbImage {
        let resize = self.config.resize_size.max(self.config.crop_size);
        let crop = self.config.crop_size;

        let upscaled = image
            .resize_exact(resize, resize, imageops::FilterType::Triangle)
            .to_rgb8();

        // Random crop
        let max_offset = resize - crop;
        let x0 = rng.gen_range(0..=max_offset);
        let y0 = rng.gen_range(0..=max_offset);
        let mut result = imageops::crop_imm(&upscaled, x0, y0, crop, crop).to_image();

        // Horizontal flip
        if rng.gen_bool(self.config.flip_prob) {
            result = imageops::flip_horizontal(&result);
        }

        // Rotation
        if self.config.rotation_degrees > 0.0 {
            let angle =
                rng.gen_range(-self.config.rotation_degrees..=self.config.rotation_degrees);
            result = rotate(&result, angle);
        }

        // Color jitter
        let brightness = jitter_factor(rng, self.config.brightness_delta);
        let contrast = jitter_factor(rng, self.config.contrast_delta);
        color_jitter(&mut result, brightness, contrast);

        result
    }
}

fn jitter_factor<R: Rng + ?Sized>(rng: &mut R, delta: f32) -> f32 {
    if delta > 0.0 {
        rng.gen_range(1.0 - delta..=1.0 + delta)
    } else {
        1.0
    }
}

/// Rotate an image around its center by `angle_degrees`, sampling the
/// source with bilinear interpolation. Out-of-bounds pixels are black.
fn rotate(img: &RgbImage, angle_degrees: f32) -> RgbImage {
    if angle_degrees.abs() < 0.1 {
        return img.clone();
    }

    let (width, height) = img.dimensions();
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;

    let angle_rad = angle_degrees.to_radians();
    let cos_a = angle_rad.cos();
    let sin_a = angle_rad.sin();

    let mut output = ImageBuffer::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;

            // Inverse rotation maps each output pixel back to the source
            let src_x = cx + dx * cos_a + dy * sin_a;
            let src_y = cy - dx * sin_a + dy * cos_a;

            output.put_pixel(x, y, bilinear_sample(img, src_x, src_y));
        }
    }

    output
}

/// Sample a pixel using bilinear interpolation, black outside the image
fn bilinear_sample(img: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (width, height) = img.dimensions();

    if x < 0.0 || y < 0.0 || x >= width as f32 - 1.0 || y >= height as f32 - 1.0 {
        return Rgb([0, 0, 0]);
    }

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = img.get_pixel(x0, y0);
    let p10 = img.get_pixel(x1, y0);
    let p01 = img.get_pixel(x0, y1);
    let p11 = img.get_pixel(x1, y1);

    let mut result = [0u8; 3];
    for c in 0..3 {
        let v = p00[c] as f32 * (1.0 - fx) * (1.0 - fy)
            + p10[c] as f32 * fx * (1.0 - fy)
            + p01[c] as f32 * (1.0 - fx) * fy
            + p11[c] as f32 * fx * fy;
        result[c] = v.round().clamp(0.0, 255.0) as u8;
    }

    Rgb(result)
}

/// Apply brightness (multiplicative) then contrast (scaling around the mean
/// luminance) in place.
fn color_jitter(img: &mut RgbImage, brightness: f32, contrast: f32) {
    if (brightness - 1.0).abs() < f32::EPSILON && (contrast - 1.0).abs() < f32::EPSILON {
        return;
    }

    // Mean luminance of the brightness-adjusted image, for contrast scaling
    let (width, height) = img.dimensions();
    let count = (width * height) as f64;
    let mut sum = 0.0f64;
    for pixel in img.pixels() {
        let lum = 0.299 * pixel[0] as f64 + 0.587 * pixel[1] as f64 + 0.114 * pixel[2] as f64;
        sum += lum * brightness as f64;
    }
    let mean = (sum / count) as f32;

    for pixel in img.pixels_mut() {
        for c in 0..3 {
            let v = pixel[c] as f32 * brightness;
            let v = mean + contrast * (v - mean);
            pixel[c] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn create_test_image() -> DynamicImage {
        let mut img = ImageBuffer::new(64, 64);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 4) as u8, (y * 4) as u8, 128]);
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_output_has_crop_size() {
        let aug = Augmenter::new(AugmentConfig::for_output_size(32));
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let result = aug.apply(&create_test_image(), &mut rng);
        assert_eq!(result.dimensions(), (32, 32));
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let aug = Augmenter::new(AugmentConfig::for_output_size(32));
        let img = create_test_image();

        let a = aug.apply(&img, &mut ChaCha8Rng::seed_from_u64(42));
        let b = aug.apply(&img, &mut ChaCha8Rng::seed_from_u64(42));

        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_different_draws_differ() {
        let aug = Augmenter::new(AugmentConfig::for_output_size(32));
        let img = create_test_image();

        // Two consecutive draws from the same stream simulate two epochs
        // over the same sample.
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let a = aug.apply(&img, &mut rng);
        let b = aug.apply(&img, &mut rng);

        assert_ne!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_flip_always_when_probability_one() {
        let config = AugmentConfig {
            resize_size: 32,
            crop_size: 32,
            flip_prob: 1.0,
            rotation_degrees: 0.0,
            brightness_delta: 0.0,
            contrast_delta: 0.0,
        };
        let aug = Augmenter::new(config);

        // Left half dark, right half bright
        let mut img = ImageBuffer::new(32, 32);
        for (x, _, pixel) in img.enumerate_pixels_mut() {
            *pixel = if x < 16 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) };
        }
        let img = DynamicImage::ImageRgb8(img);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let result = aug.apply(&img, &mut rng);

        assert_eq!(result.get_pixel(0, 16)[0], 255);
        assert_eq!(result.get_pixel(31, 16)[0], 0);
    }

    #[test]
    fn test_rotation_preserves_dimensions() {
        let img = create_test_image().to_rgb8();
        let rotated = rotate(&img, 15.0);
        assert_eq!(rotated.dimensions(), img.dimensions());
    }

    #[test]
    fn test_color_jitter_brightens() {
        let mut img = RgbImage::from_pixel(8, 8, Rgb([100, 100, 100]));
        color_jitter(&mut img, 1.2, 1.0);
        assert_eq!(img.get_pixel(0, 0)[0], 120);
    }
}
