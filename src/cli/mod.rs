// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2. This is
// the only layer that prints results; backend choice for
// predict/evaluate is resolved here into a concrete device.

pub mod commands;

use anyhow::Result;
use burn::prelude::Backend;
use clap::Parser;
use commands::{Commands, EvaluateArgs, ExportArgs, LabelsArgs, PredictArgs, TrainArgs};

use crate::application::{
    evaluate_use_case::EvaluateUseCase,
    export_use_case::ExportUseCase,
    predict_use_case::PredictUseCase,
    train_use_case::{TrainConfig, TrainUseCase},
};
use crate::data::loader::ShapeNetLoader;
use crate::domain::traits::ShapeSource;
use crate::infra::label_store::load_label_names;
use crate::ml::backend::{BackendKind, NdArrayBackend, WgpuBackend};

#[derive(Parser, Debug)]
#[command(
    name = "shape-classifier",
    version,
    about = "Sample point clouds from 3D meshes, train a category classifier, classify new meshes."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch the subcommand to its use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Predict(args)  => match args.backend {
                BackendKind::Wgpu    => run_predict::<WgpuBackend>(args, Default::default()),
                BackendKind::NdArray => run_predict::<NdArrayBackend>(args, Default::default()),
            },
            Commands::Export(args)   => run_export(args),
            Commands::Evaluate(args) => match args.backend {
                BackendKind::Wgpu    => run_evaluate::<WgpuBackend>(args, Default::default()),
                BackendKind::NdArray => run_evaluate::<NdArrayBackend>(args, Default::default()),
            },
            Commands::Labels(args)   => run_labels(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    let cfg = match &args.config {
        Some(path) => {
            let mut cfg = TrainConfig::from_file(path)?;
            cfg.resume |= args.resume;
            cfg
        }
        None => TrainConfig::from(args),
    };
    tracing::info!("Starting training on meshes in: {}", cfg.data_dir.display());

    let summary = TrainUseCase::new(cfg.clone()).execute()?;
    if summary.stopped_early {
        println!("Stopped early after epoch {}.", summary.last_epoch);
    }
    match summary.best_epoch {
        Some(epoch) => println!(
            "Training complete. Best model from epoch {} saved in '{}'.",
            epoch,
            cfg.checkpoint_dir.display()
        ),
        None => println!("Training complete. Checkpoint saved in '{}'.", cfg.checkpoint_dir.display()),
    }
    Ok(())
}

fn run_predict<B: Backend>(args: PredictArgs, device: B::Device) -> Result<()> {
    let use_case = PredictUseCase::<B>::new(&args.model, device, args.top_k)?;
    let results  = use_case.predict_many(&args.meshes);

    if args.json {
        let out: Vec<_> = results
            .iter()
            .map(|(path, preds)| serde_json::json!({ "mesh": path, "predictions": preds }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for (path, preds) in &results {
        println!("\n{}", path.display());
        if preds.is_empty() {
            println!("  (no prediction)");
        }
        for (rank, p) in preds.iter().enumerate() {
            println!("  {}. {:<20} {:>6.2}%  [{}]", rank + 1, p.name, p.probability * 100.0, p.category);
        }
    }
    Ok(())
}

fn run_export(args: ExportArgs) -> Result<()> {
    let manifest = ExportUseCase::new(&args.checkpoint_dir, &args.out).execute()?;
    println!(
        "Exported {}-class model to '{}'.",
        manifest.labels.len(),
        args.out.display()
    );
    Ok(())
}

fn run_evaluate<B: Backend>(args: EvaluateArgs, device: B::Device) -> Result<()> {
    let metrics = EvaluateUseCase::new(&args.checkpoint_dir, &args.data_dir, args.batch_size)
        .execute::<B>(device)?;
    println!(
        "Samples: {}  loss: {:.4}  accuracy: {:.2}%",
        metrics.samples,
        metrics.loss,
        metrics.accuracy * 100.0
    );
    Ok(())
}

fn run_labels(args: LabelsArgs) -> Result<()> {
    let mut loader = ShapeNetLoader::new(&args.data_dir);
    if let Some(path) = &args.label_names {
        loader = loader.with_label_names(load_label_names(path)?);
    }
    let catalog = loader.load_all()?;

    for ((index, category), count) in catalog.label_map.iter().zip(catalog.class_counts()) {
        let name = catalog.label_map.display_name(index).unwrap_or(category);
        println!("{:>4}  {:<12} {:<24} {:>6} meshes", index, category, name, count);
    }
    Ok(())
}
