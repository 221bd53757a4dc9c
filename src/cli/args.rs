//! Command-line arguments for the spec runner.
//!
//! Uses `clap` derive; every flag overrides the matching `Config` field loaded
//! from `--config`.

use clap::Parser;
use std::path::PathBuf;

use crate::runner::config::{Config, Mode};

#[derive(Debug, Default, Parser)]
#[command(
    name = "mspec-run",
    version,
    about = "Run spec files and report the outcome of every example."
)]
pub struct RunArgs {
    /// Spec files, or directories of spec files, to run.
    pub files: Vec<PathBuf>,

    /// Load run configuration from a YAML file.
    #[arg(short = 'B', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Keep tag files under DIR instead of next to the specs.
    #[arg(short = 'X', long = "tags-dir", value_name = "DIR")]
    pub tags_dir: Option<PathBuf>,

    /// Run spec files in random order.
    #[arg(short = 'H', long = "random")]
    pub random: bool,

    /// Seed for --random. Reusing a seed replays the order.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Dispatch every action but run no spec code.
    #[arg(short = 'Z', long = "dry-run")]
    pub dry_run: bool,

    /// Verify that guarded specs pass and fail as expected.
    #[arg(short = 'Y', long)]
    pub verify: bool,

    /// Report guarded specs instead of running them.
    #[arg(short = 'O', long)]
    pub report: bool,

    /// Run only examples whose description contains STR.
    #[arg(short = 'e', long = "example", value_name = "STR")]
    pub example: Vec<String>,

    /// Skip examples whose description contains STR.
    #[arg(short = 'E', long = "exclude", value_name = "STR")]
    pub exclude: Vec<String>,

    /// Run only examples tagged with TAG.
    #[arg(short = 'g', long = "tag", value_name = "TAG")]
    pub tag: Vec<String>,

    /// Skip examples tagged with TAG.
    #[arg(short = 'G', long = "excl-tag", value_name = "TAG")]
    pub excl_tag: Vec<String>,

    /// Tag every failing example with TAG.
    #[arg(long = "add-tag", value_name = "TAG")]
    pub add_tag: Option<String>,

    /// Remove TAG from every passing example.
    #[arg(long = "del-tag", value_name = "TAG")]
    pub del_tag: Option<String>,

    /// Write the report to FILE instead of stdout.
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Announce each spec file as it is loaded.
    #[arg(long)]
    pub verbose: bool,
}

impl RunArgs {
    /// Applies the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut Config) {
        if self.dry_run {
            config.mode = Mode::Pretend;
        } else if self.verify {
            config.mode = Mode::Verify;
        } else if self.report {
            config.mode = Mode::Report;
        }
        if self.random {
            config.randomize = true;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if !self.files.is_empty() {
            config.files = self.files.clone();
        }
    }
}
