// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Subcommands and their flags:
//   train    - sample meshes and train a classifier
//   predict  - classify mesh files with a trained model
//   export   - checkpoint dir -> standalone bundle
//   evaluate - loss / accuracy on a data root
//   labels   - print the label map a data root produces

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::ml::backend::BackendKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the classifier on a ShapeNet-style directory tree
    Train(TrainArgs),

    /// Classify one or more .obj meshes
    Predict(PredictArgs),

    /// Export a checkpoint as a self-contained inference bundle
    Export(ExportArgs),

    /// Evaluate a trained model on a data root
    Evaluate(EvaluateArgs),

    /// Show the categories found under a data root
    Labels(LabelsArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Read every setting from this JSON file instead of the flags below
    /// (--resume still applies)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Root with <category>/<model>/models/model_normalized.obj
    #[arg(long, default_value = "data/ShapeNetCore")]
    pub data_dir: PathBuf,

    /// Where checkpoints, config, label map and metrics go
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// JSON file mapping category ids to readable names
    #[arg(long)]
    pub label_names: Option<PathBuf>,

    /// Points sampled from each mesh surface
    #[arg(long, default_value_t = 1024)]
    pub num_points: usize,

    /// Hidden layer widths, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [512, 256])]
    pub hidden_sizes: Vec<usize>,

    /// No hidden layers: a single linear classifier
    #[arg(long, conflicts_with = "hidden_sizes")]
    pub linear: bool,

    #[arg(long, default_value_t = 0.3)]
    pub dropout: f64,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 20)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// L2 penalty applied by Adam (0 disables it)
    #[arg(long, default_value_t = 1e-4)]
    pub weight_decay: f64,

    /// Share of samples used for training; the rest validates
    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    /// Seed for sampling, splitting and shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Skip centring and unit-sphere scaling of each cloud
    #[arg(long)]
    pub no_normalize: bool,

    #[arg(long)]
    pub max_per_category: Option<usize>,

    /// Only use these category ids, comma separated
    #[arg(long, value_delimiter = ',')]
    pub categories: Option<Vec<String>>,

    /// Stop after this many epochs without improvement
    #[arg(long)]
    pub patience: Option<usize>,

    /// DataLoader worker threads
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    /// wgpu or ndarray
    #[arg(long, default_value_t = BackendKind::Wgpu)]
    pub backend: BackendKind,

    /// Continue from the last checkpoint in --checkpoint-dir
    #[arg(long)]
    pub resume: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:         a.data_dir,
            checkpoint_dir:   a.checkpoint_dir,
            label_names:      a.label_names,
            num_points:       a.num_points,
            hidden_sizes:     if a.linear { Vec::new() } else { a.hidden_sizes },
            dropout:          a.dropout,
            batch_size:       a.batch_size,
            epochs:           a.epochs,
            lr:               a.lr,
            weight_decay:     a.weight_decay,
            train_fraction:   a.train_fraction,
            seed:             a.seed,
            normalize:        !a.no_normalize,
            max_per_category: a.max_per_category,
            categories:       a.categories,
            patience:         a.patience,
            num_workers:      a.num_workers,
            backend:          a.backend,
            resume:           a.resume,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Checkpoint directory or exported bundle
    #[arg(long, default_value = "checkpoints")]
    pub model: PathBuf,

    /// How many categories to list per mesh
    #[arg(long, default_value_t = 5)]
    pub top_k: usize,

    #[arg(long, default_value_t = BackendKind::Wgpu)]
    pub backend: BackendKind,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Mesh files to classify
    #[arg(required = true)]
    pub meshes: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Output directory for the bundle
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Checkpoint directory or exported bundle
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    #[arg(long)]
    pub data_dir: PathBuf,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = BackendKind::Wgpu)]
    pub backend: BackendKind,
}

#[derive(Args, Debug)]
pub struct LabelsArgs {
    #[arg(long, default_value = "data/ShapeNetCore")]
    pub data_dir: PathBuf,

    #[arg(long)]
    pub label_names: Option<PathBuf>,
}
