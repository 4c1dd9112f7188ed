// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod orchestrator;
pub mod scheduler;
pub mod task;
pub mod types;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_graph, package_root};
use crate::errors::WatchgraphError;
use crate::exec::{LogNotifier, Notifier, ShellExecutor, SilentNotifier};
use crate::fs::{FileSystem, RealFileSystem};
use crate::orchestrator::TaskGraph;
use crate::task::{TaskContext, TaskName};
use crate::types::TaskOutcome;
use crate::watch::NotifyWatchBackend;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (with included packages)
/// - the shell executor, notify watcher and notifier
/// - one-shot members of the selected command, run concurrently
/// - watch members, kept running until Ctrl-C
pub async fn run(args: CliArgs) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let config_path = Path::new(&args.config);
    let (cfg, graph) = load_graph(config_path, Arc::clone(&fs))?;

    if args.dry_run {
        print_dry_run(&graph);
        return Ok(());
    }

    let selected = graph.select(args.command.as_deref())?;
    let (watches, one_shots): (Vec<TaskName>, Vec<TaskName>) = selected
        .into_iter()
        .partition(|name| name.kind().is_watch());

    let root = package_root(config_path, &cfg, fs.as_ref())?;
    let notifier: Arc<dyn Notifier> = if cfg.config().notify {
        Arc::new(LogNotifier)
    } else {
        Arc::new(SilentNotifier)
    };
    let ctx = TaskContext::new(
        Arc::new(ShellExecutor::new(&root, cfg.commands().clone())),
        Arc::new(NotifyWatchBackend),
        notifier,
        fs,
    )
    .with_debounce(cfg.config().debounce());
    let runner = graph.runner(ctx);

    let failed = if one_shots.is_empty() {
        0
    } else {
        let outcomes = runner.run_all(one_shots).await;
        for (name, outcome) in &outcomes {
            debug!(task = %name, ?outcome, "outcome");
        }
        outcomes.values().filter(|o| **o != TaskOutcome::Success).count()
    };

    if watches.is_empty() {
        if failed > 0 {
            bail!("{failed} task(s) did not succeed");
        }
        return Ok(());
    }

    // A failure here drops the handles already started, which stops them.
    let mut handles = watches
        .iter()
        .map(|name| runner.start_watch(name.as_str()))
        .collect::<Result<Vec<_>, WatchgraphError>>()?;

    info!(count = handles.len(), "watching; press Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C; stopping watches");
    }

    for handle in &mut handles {
        handle.stop();
    }
    for handle in handles {
        handle.stopped().await?;
    }
    Ok(())
}

/// Print composite commands and their members without running anything.
fn print_dry_run(graph: &TaskGraph) {
    println!("watchgraph dry-run");
    println!();

    let names: Vec<&str> = graph.composite_names().collect();
    println!("commands ({}):", names.len());
    for name in names {
        let members = graph.members(name).map(|m| m.len()).unwrap_or(0);
        let is_concrete = graph.task(name).is_some();
        if is_concrete {
            println!("  - {name}");
        } else {
            println!("  - {name} ({members} tasks)");
            for member in graph.members(name).into_iter().flatten() {
                println!("      {member}");
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
