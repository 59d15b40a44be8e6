//! Cats vs Dogs CLI
//!
//! Entry point for training the classifier and running ad-hoc inference
//! against a saved checkpoint.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use catsdogs::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use catsdogs::dataset::split::SplitConfig;
use catsdogs::inference::predictor::Predictor;
use catsdogs::model::config::{ModelConfig, TrainingConfig};
use catsdogs::training::run::{run_training, RunConfig};
use catsdogs::utils::logging::init_logging;

/// Cats vs Dogs binary image classification
#[derive(Parser, Debug)]
#[command(name = "catsdogs")]
#[command(version)]
#[command(about = "Train and query a cats-vs-dogs image classifier", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train the classifier and persist the best checkpoint
    Train {
        /// Directory containing raw `cats/` and `dogs/` subdirectories
        #[arg(long, default_value = "data/raw")]
        raw_data_dir: PathBuf,

        /// Directory for processed (resized) split copies
        #[arg(long, default_value = "data/processed")]
        processed_data_dir: PathBuf,

        /// Output directory (checkpoints, run records, artifacts)
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Number of training epochs
        #[arg(short, long, default_value = "10")]
        epochs: usize,

        /// Batch size
        #[arg(short, long, default_value = "32")]
        batch_size: usize,

        /// Learning rate
        #[arg(short, long, default_value = "0.001")]
        learning_rate: f64,

        /// Random seed (splits, shuffles, augmentation)
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Canonical image size (must be a multiple of 16)
        #[arg(long, default_value = "224")]
        image_size: usize,

        /// Disable train-time augmentation
        #[arg(long, default_value = "false")]
        no_augment: bool,
    },

    /// Run inference on an image file with a saved checkpoint
    Infer {
        /// Path to the input image
        #[arg(short, long)]
        input: PathBuf,

        /// Directory containing the trained checkpoint
        #[arg(short, long, default_value = "output/models")]
        model_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Train {
            raw_data_dir,
            processed_data_dir,
            output_dir,
            epochs,
            batch_size,
            learning_rate,
            seed,
            image_size,
            no_augment,
        } => {
            println!("{}", "Initializing training...".green().bold());
            println!("  Backend: {}", backend_name());

            let config = RunConfig {
                raw_data_dir,
                processed_data_dir,
                output_dir,
                model: ModelConfig::with_input_size(image_size),
                training: TrainingConfig {
                    epochs,
                    batch_size,
                    learning_rate,
                    seed,
                    ..Default::default()
                },
                split: SplitConfig {
                    seed,
                    ..Default::default()
                },
                augment: !no_augment,
            };

            let summary = run_training::<TrainingBackend>(&config, default_device())?;

            println!();
            println!("{}", "Training complete".green().bold());
            println!(
                "  Best validation accuracy: {:.2}%",
                summary.record.best_val_accuracy * 100.0
            );
            if let Some(test) = &summary.record.test {
                println!("  Test accuracy:            {:.2}%", test.accuracy * 100.0);
            }
            println!("  Checkpoint: {}", summary.checkpoint_dir.display());
            println!("  Run record: {}", summary.record_path.display());
        }

        Commands::Infer { input, model_dir } => {
            let predictor = Predictor::<DefaultBackend>::from_checkpoint(&model_dir, &default_device())?;
            let result = predictor.predict_path(&input)?;

            println!("{}", "Prediction".cyan().bold());
            println!("  Image:      {}", input.display());
            println!("  Class:      {}", result.label.bold());
            println!("  Confidence: {:.2}%", result.confidence * 100.0);
            for (name, prob) in result.class_probabilities(predictor.class_names()) {
                println!("    {:>4}: {:.4}", name, prob);
            }
        }
    }

    Ok(())
}
