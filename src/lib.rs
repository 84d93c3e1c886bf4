// src/lib.rs

pub mod build;
pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod spec;
pub mod types;

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::build::BuildSystem;
use crate::cli::CliArgs;
use crate::config::{default_build_files, load_all, BuildFile};
use crate::dag::{narrow, GraphCompiler};
use crate::errors::BuildError;
use crate::exec::ActionRegistry;
use crate::types::{CheckMode, Strictness};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - build file loading
/// - graph compilation (optionally narrowed to the requested targets)
/// - dry-run output or execution
///
/// Returns whether the build succeeded. A build with nothing to do counts as
/// success.
pub async fn run(args: CliArgs) -> Result<bool> {
    let paths: Vec<PathBuf> = if args.file.is_empty() {
        default_build_files(&std::env::current_dir()?)
    } else {
        args.file.iter().map(PathBuf::from).collect()
    };
    debug!(?paths, "build files");

    let file = load_all(&paths)?;

    let check = match &args.check {
        Some(mode) => mode.parse::<CheckMode>()?,
        None => file.check_mode(),
    };
    let strictness = if args.permissive {
        Strictness::Permissive
    } else {
        file.strictness()
    };

    // The CLI has no host process to register actions, so only shell jobs
    // and sequences of them are buildable from here.
    let compiler = match compile(file, ActionRegistry::new(), check, strictness, &args.targets) {
        Ok(compiler) => compiler,
        Err(BuildError::EmptySystem) => {
            info!("nothing to do: every target is up to date");
            return Ok(true);
        }
        Err(err) => return Err(err.into()),
    };

    let Some(mut system) = compiler.into_system() else {
        warn!("compiler produced no build system");
        return Ok(true);
    };

    if let Some(n) = args.jobs {
        system.set_workers(n);
    }

    if args.dry_run {
        print_dry_run(&system);
        return Ok(true);
    }

    let success = system.run(None).await?;
    if success {
        info!("build succeeded");
    } else {
        warn!("build failed");
    }
    Ok(success)
}

/// Ingest `file` and finalize, narrowing to `targets` when given.
pub fn compile(
    file: BuildFile,
    registry: ActionRegistry,
    check: CheckMode,
    strictness: Strictness,
    targets: &[String],
) -> errors::Result<GraphCompiler> {
    let mut compiler = GraphCompiler::new(registry)
        .with_check_mode(check)
        .with_strictness(strictness);

    compiler.ingest(file.jobs)?;

    if targets.is_empty() {
        compiler.finalize()?;
        Ok(compiler)
    } else {
        info!(?targets, "building requested targets only");
        narrow(&compiler, targets)
    }
}

/// Print the compiled stage plan.
fn print_dry_run(system: &BuildSystem) {
    println!("buildc dry-run");
    println!("stages ({}):", system.count());
    for line in system.describe() {
        println!("  {line}");
    }

    debug!("dry-run complete (no execution)");
}
