//! The `mspec-run` command-line front end.
//!
//! A harness binary builds a [`Suite`] of spec files and hands it to [`run`],
//! which parses the command line, configures the kernel, processes the
//! selected files, and returns the exit code.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Once;

use clap::Parser;
use tracing::{debug, info};

use crate::actions::{FilterKind, MatchFilter, TagAction, TagFilter, TagOp, TagOutcome};
use crate::errors::MSpecError;
use crate::formatters::DottedFormatter;
use crate::runner::config::Config;
use crate::runner::loader::Suite;
use crate::runner::mspec::MSpec;
use crate::runner::tags::TagStore;

pub mod args;
pub mod output;

pub use args::RunArgs;

static TRACING_INIT: Once = Once::new();

/// Installs a `RUST_LOG`-driven subscriber. Does nothing when `RUST_LOG` is
/// unset, and only ever runs once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

/// Runs `suite` with the process command line.
pub fn run(suite: &Suite) -> miette::Result<i32> {
    run_with_args(suite, std::env::args_os())
}

pub fn run_with_args<I, T>(suite: &Suite, args: I) -> miette::Result<i32>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = RunArgs::parse_from(args);
    Ok(execute(suite, &args)?)
}

/// Configures a kernel from `args` and processes the selected files.
pub fn execute(suite: &Suite, args: &RunArgs) -> Result<i32, MSpecError> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    args.apply(&mut config);
    config.files = resolve_files(suite, &config.files);
    if config.files.is_empty() {
        println!("No files specified.");
        return Ok(1);
    }
    debug!(files = config.files.len(), mode = ?config.mode, "starting run");

    let mut mspec = MSpec::with_config(config)?;
    if let Some(dir) = &args.tags_dir {
        mspec.register_tag_store(TagStore::for_tags_dir(dir)?);
    }
    let store = mspec.tag_store().clone();

    if !args.example.is_empty() {
        MatchFilter::new(FilterKind::Include, args.example.iter().cloned()).register(&mut mspec);
    }
    if !args.exclude.is_empty() {
        MatchFilter::new(FilterKind::Exclude, args.exclude.iter().cloned()).register(&mut mspec);
    }
    if !args.tag.is_empty() {
        TagFilter::new(FilterKind::Include, args.tag.iter().cloned(), store.clone())
            .register(&mut mspec);
    }
    if !args.excl_tag.is_empty() {
        TagFilter::new(FilterKind::Exclude, args.excl_tag.iter().cloned(), store.clone())
            .register(&mut mspec);
    }

    let mut taggers = Vec::new();
    if let Some(tag) = &args.add_tag {
        taggers.push(
            TagAction::new(TagOp::Add, TagOutcome::Fail, tag.as_str(), store.clone())
                .register(&mut mspec),
        );
    }
    if let Some(tag) = &args.del_tag {
        taggers.push(
            TagAction::new(TagOp::Delete, TagOutcome::Pass, tag.as_str(), store)
                .register(&mut mspec),
        );
    }

    if args.verbose {
        output::FileAnnouncer::new(std::io::stderr()).register(&mut mspec);
    }
    DottedFormatter::new(output::report_sink(args.output.as_deref())?).register(&mut mspec);

    mspec.process(suite);

    if let Some(seed) = mspec.shuffle_seed() {
        info!(seed, "randomized run");
        eprintln!("Randomized with seed {seed}");
    }
    for tagger in &taggers {
        print!("{}", tagger.borrow().report());
    }
    Ok(mspec.exit_code())
}

/// Expands directories to the suite files below them. Paths the suite does
/// not know are kept so loading them reports the missing file.
fn resolve_files(suite: &Suite, patterns: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for pattern in patterns {
        let matched = suite.select(std::slice::from_ref(pattern));
        if matched.is_empty() {
            files.push(pattern.clone());
        }
        for file in matched {
            if !files.contains(&file) {
                files.push(file);
            }
        }
    }
    files
}
