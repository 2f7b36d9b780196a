//! CLI module for docatlas

mod args;

pub use args::{Args, Command, CommonArgs};

use crate::config::{Config, LoaderConfig, LoaderOverrides, DEFAULT_CONFIG_FILE};
use crate::error::{Error, Result};
use crate::loader::{self, LoadRequest};
use crate::logging;
use crate::model::RootResult;
use crate::runtime::{Runtime, SourceRuntime};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Read};
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, info, warn};

/// A batch request document read from stdin
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchInput {
    pub objects: Vec<BatchObject>,
}

/// One requested root; unset options fall back to the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchObject {
    pub path: String,
    #[serde(flatten)]
    pub options: LoaderOverrides,
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let args = Args::parse_args();

    match execute(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every requested root resolved
fn execute(args: Args) -> Result<bool> {
    let overrides = args.command.overrides();

    match args.command {
        Command::Load { paths, common, .. } => {
            logging::init(common.verbose);
            let mut cfg = load_config(&common)?;
            cfg.merge_cli(overrides);
            cfg.validate()?;

            let runtime = SourceRuntime::new(cfg.runtime.search_paths.clone())?;
            let options = cfg.loader.to_options()?;
            let requests: Vec<BatchEntry> = paths
                .into_iter()
                .map(|path| {
                    Ok(LoadRequest {
                        path,
                        options: options.clone(),
                    })
                })
                .collect();

            let results = load_all(&runtime, &requests, common.verbose);
            print_results(&results, common.pretty)?;
            Ok(results.iter().all(RootResult::resolved))
        }

        Command::Batch { line_by_line, common } => {
            logging::init(common.verbose);
            let mut cfg = load_config(&common)?;
            cfg.merge_cli(overrides);
            cfg.validate()?;

            let runtime = SourceRuntime::new(cfg.runtime.search_paths.clone())?;

            if line_by_line {
                let mut all_resolved = true;
                for line in std::io::stdin().lock().lines() {
                    let line = line?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    let results = match serde_json::from_str::<BatchInput>(&line) {
                        Ok(input) => {
                            let requests = batch_requests(&input, &cfg.loader);
                            load_all(&runtime, &requests, common.verbose)
                        }
                        Err(e) => {
                            warn!(error = %e, "skipping malformed request line");
                            vec![RootResult {
                                root_path: String::new(),
                                tree: None,
                                errors: vec![Error::from(e).to_string()],
                            }]
                        }
                    };
                    all_resolved &= results.iter().all(RootResult::resolved);
                    print_results(&results, false)?;
                }
                Ok(all_resolved)
            } else {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                let input: BatchInput = serde_json::from_str(&text)?;
                let requests = batch_requests(&input, &cfg.loader);
                let results = load_all(&runtime, &requests, common.verbose);
                print_results(&results, common.pretty)?;
                Ok(results.iter().all(RootResult::resolved))
            }
        }

        Command::Version => {
            println!("docatlas {}", env!("CARGO_PKG_VERSION"));
            Ok(true)
        }
    }
}

/// Explicit config file, else `docatlas.toml` in the working directory if present
fn load_config(common: &CommonArgs) -> Result<Config> {
    match common.config {
        Some(ref path) => Config::load(path),
        None => Config::load_or_default(Path::new(DEFAULT_CONFIG_FILE)),
    }
}

/// A request ready to load, or the result of a request whose options were rejected
pub type BatchEntry = std::result::Result<LoadRequest, RootResult>;

/// Resolve every batch object against the configured defaults
///
/// Each object is resolved on its own, so bad options only fail that root.
pub fn batch_requests(input: &BatchInput, defaults: &LoaderConfig) -> Vec<BatchEntry> {
    input
        .objects
        .iter()
        .map(|object| match defaults.with_overrides(&object.options).to_options() {
            Ok(options) => Ok(LoadRequest {
                path: object.path.clone(),
                options,
            }),
            Err(e) => {
                warn!(path = %object.path, error = %e, "rejected request options");
                Err(RootResult {
                    root_path: object.path.clone(),
                    tree: None,
                    errors: vec![e.to_string()],
                })
            }
        })
        .collect()
}

fn load_one(runtime: &dyn Runtime, entry: &BatchEntry) -> RootResult {
    match entry {
        Ok(request) => loader::load_root(runtime, request),
        Err(rejected) => rejected.clone(),
    }
}

fn load_all(runtime: &dyn Runtime, entries: &[BatchEntry], verbose: bool) -> Vec<RootResult> {
    if !verbose || entries.len() < 2 {
        return entries.iter().map(|e| load_one(runtime, e)).collect();
    }

    let pb = ProgressBar::new(entries.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut results = Vec::with_capacity(entries.len());
    for entry in entries {
        let path = match entry {
            Ok(request) => &request.path,
            Err(rejected) => &rejected.root_path,
        };
        pb.set_message(path.clone());
        results.push(load_one(runtime, entry));
        pb.inc(1);
    }
    pb.finish_with_message("Loading complete");

    let failed = results.iter().filter(|r| !r.resolved()).count();
    info!(roots = results.len(), failed, "batch finished");
    results
}

fn print_results(results: &[RootResult], pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(results)?
    } else {
        serde_json::to_string(results)?
    };
    debug!(bytes = json.len(), "writing results");
    println!("{}", json);
    Ok(())
}
