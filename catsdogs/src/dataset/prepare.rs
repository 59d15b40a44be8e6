//! Processed-Data Materialization
//!
//! Writes resized copies of every split sample into the processed-data
//! directory so a training invocation leaves an inspectable
//! `<processed>/{train,val,test}/{cats,dogs}/` tree behind, and returns
//! splits re-pointed at the processed files.

use std::path::Path;

use image::imageops::FilterType;
use tracing::{info, warn};

use crate::dataset::loader::ImageSample;
use crate::dataset::split::{DatasetSplits, Split};
use crate::dataset::CLASS_DIRS;
use crate::utils::error::Result;

/// Materialize all splits under `processed_dir`, resizing each image to
/// `image_size` x `image_size`.
///
/// Unreadable source images are skipped with a warning; they are data
/// errors local to one sample, not configuration errors. The returned
/// splits reference the processed files only.
pub fn materialize_splits(
    splits: &DatasetSplits,
    processed_dir: &Path,
    image_size: u32,
) -> Result<DatasetSplits> {
    let mut skipped = 0usize;

    let train = materialize_one(&splits.train, Split::Train, processed_dir, image_size, &mut skipped)?;
    let validation = materialize_one(
        &splits.validation,
        Split::Validation,
        processed_dir,
        image_size,
        &mut skipped,
    )?;
    let test = materialize_one(&splits.test, Split::Test, processed_dir, image_size, &mut skipped)?;

    let written = train.len() + validation.len() + test.len();
    info!(
        "Materialized {} processed images under {:?} ({} skipped)",
        written, processed_dir, skipped
    );

    Ok(DatasetSplits {
        train,
        validation,
        test,
        config: splits.config.clone(),
        total_samples: written,
    })
}

fn materialize_one(
    samples: &[ImageSample],
    split: Split,
    processed_dir: &Path,
    image_size: u32,
    skipped: &mut usize,
) -> Result<Vec<ImageSample>> {
    // Create both class directories up front even if a split has no
    // samples of one class.
    for class_dir in CLASS_DIRS {
        std::fs::create_dir_all(processed_dir.join(split.dir_name()).join(class_dir))?;
    }

    let mut out = Vec::with_capacity(samples.len());

    for sample in samples {
        let img = match image::open(&sample.path) {
            Ok(img) => img,
            Err(e) => {
                warn!("Skipping unreadable image {:?}: {}", sample.path, e);
                *skipped += 1;
                continue;
            }
        };

        let resized = img.resize_exact(image_size, image_size, FilterType::Lanczos3);

        let file_name = sample
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("sample_{}.png", sample.id));

        let out_path = processed_dir
            .join(split.dir_name())
            .join(CLASS_DIRS[sample.label])
            .join(file_name);

        if let Err(e) = resized.save(&out_path) {
            warn!("Skipping unwritable image {:?}: {}", out_path, e);
            *skipped += 1;
            continue;
        }

        out.push(ImageSample {
            path: out_path,
            label: sample.label,
            class_name: sample.class_name.clone(),
            id: sample.id,
        });
    }

    Ok(out)
}
