// src/config/loader.rs

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WatchgraphError};
use crate::fs::FileSystem;
use crate::orchestrator::TaskGraph;

/// File name looked up in the working directory and in included packages.
pub const CONFIG_FILE_NAME: &str = "Watchgraph.toml";

/// Load a configuration file and return the raw model.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for
/// the semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_NAME)
}

/// Absolute package root for a config loaded from `config_path`.
///
/// `[package].root` is relative to the directory holding the config file;
/// a bare file name like `Watchgraph.toml` means the working directory.
pub fn package_root(config_path: &Path, cfg: &ConfigFile, fs: &dyn FileSystem) -> Result<PathBuf> {
    let dir = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let root = match &cfg.package().root {
        Some(root) => dir.join(root),
        None => dir,
    };

    match fs.canonicalize(&root) {
        Ok(root) => Ok(root),
        Err(_) => Ok(std::path::absolute(&root)?),
    }
}

/// Load a config, declare it and merge every included package's graph.
pub fn load_graph(config_path: impl AsRef<Path>, fs: Arc<dyn FileSystem>) -> Result<(ConfigFile, TaskGraph)> {
    let mut seen = BTreeSet::new();
    load_graph_inner(config_path.as_ref(), fs, &mut seen)
}

fn load_graph_inner(
    config_path: &Path,
    fs: Arc<dyn FileSystem>,
    seen: &mut BTreeSet<PathBuf>,
) -> Result<(ConfigFile, TaskGraph)> {
    let key = std::path::absolute(config_path)?;
    if !seen.insert(key.clone()) {
        return Err(WatchgraphError::ConfigError(format!(
            "config {} is included more than once",
            key.display()
        )));
    }

    let cfg = load_and_validate(config_path)?;
    let root = package_root(config_path, &cfg, fs.as_ref())?;
    info!(package = %cfg.package().name, root = %root.display(), "loaded config");

    let mut graph = cfg.declare(&root, Arc::clone(&fs))?.create_graph()?;

    let config_dir = config_path.parent().unwrap_or(Path::new(""));
    for include in cfg.include() {
        let child_path = resolve_include(&config_dir.join(include), fs.as_ref())?;
        debug!(include = %child_path.display(), "including package");
        let (_, child) = load_graph_inner(&child_path, Arc::clone(&fs), seen)?;
        graph.include(&child)?;
    }

    Ok((cfg, graph))
}

/// An include names either a config file or a directory holding one.
fn resolve_include(path: &Path, fs: &dyn FileSystem) -> Result<PathBuf> {
    let candidate = if fs.is_dir(path) {
        path.join(CONFIG_FILE_NAME)
    } else {
        path.to_path_buf()
    };
    if !fs.is_file(&candidate) {
        return Err(WatchgraphError::ConfigError(format!(
            "included config {} does not exist",
            candidate.display()
        )));
    }
    Ok(candidate)
}
