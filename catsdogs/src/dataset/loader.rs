//! Cats vs Dogs Dataset Loader
//!
//! Enumerates labeled image files from the two class directories and
//! produces the (path, label) samples consumed by the split engine.
//!
//! Expected directory structure:
//! ```text
//! root_dir/
//! ├── cats/
//! │   ├── cat_1.jpg
//! │   └── cat_2.jpg
//! └── dogs/
//!     ├── dog_1.jpg
//!     └── dog_2.jpg
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::dataset::{CLASS_DIRS, CLASS_NAMES, NUM_CLASSES};
use crate::utils::error::{CatsDogsError, Result};

/// Image file extensions accepted by the loader
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// A single image sample with its label and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label (0 = cat, 1 = dog)
    pub label: usize,
    /// Class name ("cat" or "dog")
    pub class_name: String,
    /// Unique sample ID, stable across runs for the same input set
    pub id: u64,
}

/// Cats vs Dogs dataset enumerated from disk
#[derive(Debug, Clone)]
pub struct CatsDogsDataset {
    /// Root directory of the dataset
    pub root_dir: PathBuf,
    /// All samples in the dataset
    pub samples: Vec<ImageSample>,
}

impl CatsDogsDataset {
    /// Enumerate the dataset from a root directory containing `cats/` and
    /// `dogs/` subdirectories.
    ///
    /// Fails with a configuration error if a class directory is missing or
    /// contains no readable image files: an empty class would otherwise
    /// produce a silently degenerate split.
    pub fn new<P: AsRef<Path>>(root_dir: P) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        info!("Loading cats-vs-dogs dataset from {:?}", root_dir);

        if !root_dir.exists() {
            return Err(CatsDogsError::Config(format!(
                "dataset directory does not exist: {}",
                root_dir.display()
            )));
        }

        let mut samples = Vec::new();
        let mut sample_id: u64 = 0;

        for (label, dir_name) in CLASS_DIRS.iter().enumerate() {
            let class_dir = root_dir.join(dir_name);
            if !class_dir.is_dir() {
                return Err(CatsDogsError::Config(format!(
                    "missing class directory: {}",
                    class_dir.display()
                )));
            }

            let files = scan_image_files(&class_dir);
            if files.is_empty() {
                return Err(CatsDogsError::Config(format!(
                    "class directory contains no readable images: {}",
                    class_dir.display()
                )));
            }

            debug!("Class '{}' (label {}): {} files", dir_name, label, files.len());

            for path in files {
                samples.push(ImageSample {
                    path,
                    label,
                    class_name: CLASS_NAMES[label].to_string(),
                    id: sample_id,
                });
                sample_id += 1;
            }
        }

        info!("Loaded {} total samples", samples.len());

        Ok(Self { root_dir, samples })
    }

    /// Number of samples in the dataset
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Per-class sample counts
    pub fn class_counts(&self) -> [usize; NUM_CLASSES] {
        let mut counts = [0usize; NUM_CLASSES];
        for sample in &self.samples {
            counts[sample.label] += 1;
        }
        counts
    }

    /// Statistics about the dataset
    pub fn stats(&self) -> DatasetStats {
        DatasetStats {
            total_samples: self.samples.len(),
            class_counts: self.class_counts(),
        }
    }
}

/// Collect image files directly under a class directory.
///
/// Results are sorted by filename so sample ids are deterministic for a
/// given input set, which the split reproducibility guarantee relies on.
fn scan_image_files(class_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(class_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.path().to_path_buf())
        .filter(|path| {
            path.extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy().to_lowercase();
                    IMAGE_EXTENSIONS.contains(&ext.as_str())
                })
                .unwrap_or(false)
        })
        .collect();

    files.sort();
    files
}

/// Statistics about the dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub class_counts: [usize; NUM_CLASSES],
}

impl std::fmt::Display for DatasetStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Dataset statistics:")?;
        writeln!(f, "  Total samples: {}", self.total_samples)?;
        for (label, name) in CLASS_NAMES.iter().enumerate() {
            writeln!(f, "  {:>4}: {}", name, self.class_counts[label])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_image(path: &Path, color: [u8; 3]) {
        let mut img = RgbImage::new(32, 32);
        for pixel in img.pixels_mut() {
            *pixel = Rgb(color);
        }
        img.save(path).unwrap();
    }

    fn create_dataset_dir(cats: usize, dogs: usize) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("cats")).unwrap();
        std::fs::create_dir(dir.path().join("dogs")).unwrap();
        for i in 0..cats {
            write_image(&dir.path().join(format!("cats/cat_{i}.jpg")), [200, 60, 60]);
        }
        for i in 0..dogs {
            write_image(&dir.path().join(format!("dogs/dog_{i}.jpg")), [60, 60, 200]);
        }
        dir
    }

    #[test]
    fn test_enumerates_both_classes() {
        let dir = create_dataset_dir(3, 5);
        let dataset = CatsDogsDataset::new(dir.path()).unwrap();

        assert_eq!(dataset.len(), 8);
        assert_eq!(dataset.class_counts(), [3, 5]);

        let cats: Vec<_> = dataset.samples.iter().filter(|s| s.label == 0).collect();
        assert!(cats.iter().all(|s| s.class_name == "cat"));
    }

    #[test]
    fn test_sample_ids_are_stable() {
        let dir = create_dataset_dir(4, 4);
        let first = CatsDogsDataset::new(dir.path()).unwrap();
        let second = CatsDogsDataset::new(dir.path()).unwrap();

        for (a, b) in first.samples.iter().zip(second.samples.iter()) {
            assert_eq!(a.path, b.path);
            assert_eq!(a.id, b.id);
        }
    }

    #[test]
    fn test_missing_class_directory_fails_fast() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("cats")).unwrap();
        write_image(&dir.path().join("cats/cat_0.jpg"), [200, 60, 60]);

        let err = CatsDogsDataset::new(dir.path()).unwrap_err();
        assert!(matches!(err, CatsDogsError::Config(_)));
    }

    #[test]
    fn test_empty_class_directory_fails_fast() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("cats")).unwrap();
        std::fs::create_dir(dir.path().join("dogs")).unwrap();
        write_image(&dir.path().join("cats/cat_0.jpg"), [200, 60, 60]);
        // dogs/ exists but holds no images

        let err = CatsDogsDataset::new(dir.path()).unwrap_err();
        assert!(matches!(err, CatsDogsError::Config(_)));
    }

    #[test]
    fn test_non_image_files_ignored() {
        let dir = create_dataset_dir(2, 2);
        std::fs::write(dir.path().join("cats/notes.txt"), "not an image").unwrap();

        let dataset = CatsDogsDataset::new(dir.path()).unwrap();
        assert_eq!(dataset.len(), 4);
    }
}
