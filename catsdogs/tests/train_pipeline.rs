//! End-to-end pipeline test: raw images -> splits -> training -> checkpoint
//! -> prediction, on a tiny generated dataset.

use std::path::Path;

use image::{DynamicImage, Rgb, RgbImage};
use tempfile::TempDir;

use catsdogs::backend::{default_device, DefaultBackend, TrainingBackend};
use catsdogs::dataset::split::SplitConfig;
use catsdogs::inference::predictor::Predictor;
use catsdogs::model::config::{ModelConfig, TrainingConfig};
use catsdogs::training::run::{run_training, RunConfig};
use catsdogs::utils::error::CatsDogsError;

/// Generate a deterministic image: red-dominant for cats, blue-dominant for
/// dogs, with per-sample variation so the dataset is not degenerate.
fn sample_image(label: usize, index: u32) -> RgbImage {
    let mut img = RgbImage::new(48, 48);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let noise = ((x * 7 + y * 13 + index * 29) % 64) as u8;
        *pixel = if label == 0 {
            Rgb([180 + noise / 4, 40 + noise / 2, 40])
        } else {
            Rgb([40, 40 + noise / 2, 180 + noise / 4])
        };
    }
    img
}

fn write_dataset(root: &Path, per_class: u32) {
    for (label, class_dir) in ["cats", "dogs"].iter().enumerate() {
        let dir = root.join(class_dir);
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..per_class {
            sample_image(label, i)
                .save(dir.join(format!("img_{i:02}.jpg")))
                .unwrap();
        }
    }
}

fn tiny_run_config(raw: &Path, processed: &Path, output: &Path) -> RunConfig {
    RunConfig {
        raw_data_dir: raw.to_path_buf(),
        processed_data_dir: processed.to_path_buf(),
        output_dir: output.to_path_buf(),
        model: ModelConfig::tiny(),
        training: TrainingConfig {
            epochs: 2,
            batch_size: 4,
            learning_rate: 0.01,
            weight_decay: 1e-4,
            seed: 42,
        },
        split: SplitConfig::default(),
        augment: true,
    }
}

#[test]
fn training_run_produces_record_and_artifacts() {
    let raw = TempDir::new().unwrap();
    let processed = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_dataset(raw.path(), 10);

    let config = tiny_run_config(raw.path(), processed.path(), output.path());
    let summary = run_training::<TrainingBackend>(&config, default_device()).unwrap();

    // 10 per class at 80/10/10: 8 train, 1 val, 1 test per class
    let record = &summary.record;
    assert_eq!(record.params.train_samples, 16);
    assert_eq!(record.params.val_samples, 2);
    assert_eq!(record.params.test_samples, 2);

    // One epoch record per configured epoch, finalized with test metrics
    assert_eq!(record.epochs.len(), 2);
    let test = record.test.as_ref().expect("test metrics reported");
    assert!((0.0..=1.0).contains(&test.accuracy));
    assert!(record.finished_at.is_some());

    // The run record and the confusion matrix artifact are on disk
    assert!(summary.record_path.exists());
    assert_eq!(record.artifacts.len(), 1);
    assert!(record.artifacts[0].exists());
    let cm_json = std::fs::read_to_string(&record.artifacts[0]).unwrap();
    assert!(cm_json.contains("\"cat\""));
    assert!(cm_json.contains("\"dog\""));

    // The best validation accuracy equals the maximum over the recorded
    // epochs: saved checkpoints can only ever improve within a run.
    let max_val = record
        .epochs
        .iter()
        .map(|e| e.val_accuracy)
        .fold(0.0f64, f64::max);
    assert!((record.best_val_accuracy - max_val).abs() < 1e-9);

    // If a checkpoint was saved, it loads and its metadata matches the run
    if let Some(ckpt) = &record.checkpoint {
        assert!(ckpt.exists());

        let predictor =
            Predictor::<DefaultBackend>::from_checkpoint(&summary.checkpoint_dir, &default_device())
                .unwrap();
        assert!(
            (predictor.meta().val_accuracy - record.best_val_accuracy).abs() < 1e-9
        );

        // Serving transform is deterministic: same image, same bits out
        let img = DynamicImage::ImageRgb8(sample_image(0, 99));
        let a = predictor.predict_image(&img);
        let b = predictor.predict_image(&img);
        assert_eq!(a.probabilities, b.probabilities);

        let sum: f32 = a.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
    }
}

#[test]
fn rerunning_with_same_seed_reproduces_splits() {
    let raw = TempDir::new().unwrap();
    write_dataset(raw.path(), 10);

    let dataset = catsdogs::CatsDogsDataset::new(raw.path()).unwrap();
    let a = catsdogs::DatasetSplits::from_samples(dataset.samples.clone(), SplitConfig::default())
        .unwrap();
    let b =
        catsdogs::DatasetSplits::from_samples(dataset.samples, SplitConfig::default()).unwrap();

    let paths = |s: &[catsdogs::ImageSample]| {
        s.iter().map(|x| x.path.clone()).collect::<Vec<_>>()
    };
    assert_eq!(paths(&a.train), paths(&b.train));
    assert_eq!(paths(&a.validation), paths(&b.validation));
    assert_eq!(paths(&a.test), paths(&b.test));
}

#[test]
fn missing_checkpoint_is_reported_not_a_panic() {
    let empty = TempDir::new().unwrap();

    let result = Predictor::<DefaultBackend>::from_checkpoint(empty.path(), &default_device());
    match result {
        Err(CatsDogsError::Checkpoint(msg)) => assert!(msg.contains("no checkpoint")),
        other => panic!("expected checkpoint error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn empty_class_directory_is_a_configuration_error() {
    let raw = TempDir::new().unwrap();
    std::fs::create_dir_all(raw.path().join("cats")).unwrap();
    std::fs::create_dir_all(raw.path().join("dogs")).unwrap();
    sample_image(0, 0)
        .save(raw.path().join("cats/img_00.jpg"))
        .unwrap();

    let processed = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let config = tiny_run_config(raw.path(), processed.path(), output.path());

    let err = run_training::<TrainingBackend>(&config, default_device()).unwrap_err();
    assert!(matches!(err, CatsDogsError::Config(_)));
}
