// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `eval`
// and all their configurable flags.
//
// clap's derive macros generate the help text, the error
// messages for missing args and the string → number conversion.

use clap::{ArgAction, Args, Subcommand};
use std::path::PathBuf;

use crate::application::{eval_use_case::EvalConfig, train_use_case::TrainConfig};
use crate::domain::weights::{LossWeights, StageWeights};

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the three-stage style network on two image folders
    Train(TrainArgs),

    /// Stylize one pair, or every pair of two folders, with a checkpoint
    Eval(EvalArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Folder of content images
    #[arg(long)]
    pub content_folder: PathBuf,

    /// Folder of style images
    #[arg(long)]
    pub style_folder: PathBuf,

    /// Directory for weight snapshots and run configuration
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Directory for metrics.csv, samples/ and results_table.csv
    #[arg(long, default_value = "runs")]
    pub log_dir: PathBuf,

    /// Total number of optimisation iterations
    #[arg(long, default_value_t = 160_000)]
    pub iterations: usize,

    /// Images per content batch and per style batch
    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    /// Image decoding threads per stream
    #[arg(long, default_value_t = 8)]
    pub num_workers: usize,

    /// Base learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Inverse-time decay factor applied at every snapshot
    #[arg(long, default_value_t = 5e-5)]
    pub lr_decay: f64,

    /// Snapshot (checkpoint, samples, lr update) every this many iterations
    #[arg(long, default_value_t = 10_000)]
    pub log_interval: usize,

    /// Console progress line every this many iterations
    #[arg(long, default_value_t = 100)]
    pub progress_interval: usize,

    /// Start from the latest checkpoint in --checkpoint-dir
    #[arg(long)]
    pub pretrained: bool,

    /// Shorter side after resizing, before the random crop
    #[arg(long, default_value_t = 512)]
    pub load_size: u32,

    /// Side of the square training crop (multiple of 16)
    #[arg(long, default_value_t = 256)]
    pub crop_size: u32,

    /// Channel width of the first encoder level
    #[arg(long, default_value_t = 16)]
    pub base_channels: usize,

    /// The stage1 content loss weight
    #[arg(long, default_value_t = 12.0)]
    pub w_content1: f64,
    /// The stage2 content loss weight
    #[arg(long, default_value_t = 9.0)]
    pub w_content2: f64,
    /// The stage3 content loss weight
    #[arg(long, default_value_t = 7.0)]
    pub w_content3: f64,

    /// The stage1 remd loss weight
    #[arg(long, default_value_t = 2.0)]
    pub w_remd1: f64,
    /// The stage2 remd loss weight
    #[arg(long, default_value_t = 2.0)]
    pub w_remd2: f64,
    /// The stage3 remd loss weight
    #[arg(long, default_value_t = 2.0)]
    pub w_remd3: f64,

    /// The stage1 moment loss weight
    #[arg(long, default_value_t = 2.0)]
    pub w_moment1: f64,
    /// The stage2 moment loss weight
    #[arg(long, default_value_t = 2.0)]
    pub w_moment2: f64,
    /// The stage3 moment loss weight
    #[arg(long, default_value_t = 2.0)]
    pub w_moment3: f64,

    /// Turn the color loss on or off
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub color_on: bool,

    /// The stage1 color loss weight
    #[arg(long, default_value_t = 0.25)]
    pub w_color1: f64,
    /// The stage2 color loss weight
    #[arg(long, default_value_t = 0.5)]
    pub w_color2: f64,
    /// The stage3 color loss weight
    #[arg(long, default_value_t = 1.0)]
    pub w_color3: f64,
}

impl TrainArgs {
    fn weights(&self) -> LossWeights {
        LossWeights {
            stages: [
                StageWeights::new(self.w_content1, self.w_remd1, self.w_moment1, self.w_color1),
                StageWeights::new(self.w_content2, self.w_remd2, self.w_moment2, self.w_color2),
                StageWeights::new(self.w_content3, self.w_remd3, self.w_moment3, self.w_color3),
            ],
            color_enabled: self.color_on,
        }
    }
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        let weights = a.weights();
        TrainConfig {
            content_folder:    a.content_folder,
            style_folder:      a.style_folder,
            checkpoint_dir:    a.checkpoint_dir,
            log_dir:           a.log_dir,
            iterations:        a.iterations,
            batch_size:        a.batch_size,
            num_workers:       a.num_workers,
            lr:                a.lr,
            lr_decay:          a.lr_decay,
            log_interval:      a.log_interval,
            progress_interval: a.progress_interval,
            pretrained:        a.pretrained,
            load_size:         a.load_size,
            crop_size:         a.crop_size,
            base_channels:     a.base_channels,
            weights,
        }
    }
}

/// All arguments for the `eval` command
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Treat --content and --style as folders and stylize every pair
    #[arg(long)]
    pub run_folder: bool,

    /// Content image (or folder with --run-folder)
    #[arg(long, default_value = "./content/")]
    pub content: PathBuf,

    /// Style image (or folder with --run-folder)
    #[arg(long, default_value = "./style/")]
    pub style: PathBuf,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Where ics.jpg or the ics/ folder is written
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Side length every input is resized to (multiple of 16)
    #[arg(long, default_value_t = 256)]
    pub image_size: u32,
}

impl From<EvalArgs> for EvalConfig {
    fn from(a: EvalArgs) -> Self {
        EvalConfig {
            content:        a.content,
            style:          a.style,
            run_folder:     a.run_folder,
            checkpoint_dir: a.checkpoint_dir,
            output_dir:     a.output_dir,
            image_size:     a.image_size,
        }
    }
}
