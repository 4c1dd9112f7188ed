// src/config/declare.rs

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::model::ConfigFile;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::orchestrator::{
    BuildOptions, CleanOptions, MochaOptions, Orchestrator, WatchFilesOptions, WatchOptions,
};

impl ConfigFile {
    /// Replay every section through the declaration API, in the order
    /// clean, babel, less, mocha, watch_files.
    pub fn declare(&self, root: &Path, fs: Arc<dyn FileSystem>) -> Result<Orchestrator> {
        let mut o = Orchestrator::new(&self.package().name, root, fs)?;
        o.set_skip_unchanged(self.config().skip_unchanged);

        for c in self.clean() {
            o.clean(CleanOptions::new(&c.id, &c.dest))?;
        }
        for b in self.babel() {
            o.babel(
                BuildOptions::new(&b.id, &b.src, &b.dest)
                    .clean(b.clean)
                    .watch(b.watch),
            )?;
        }
        for l in self.less() {
            o.less(
                BuildOptions::new(&l.id, &l.src, &l.dest)
                    .clean(l.clean)
                    .watch(l.watch),
            )?;
        }
        for m in self.mocha() {
            let name = o.mocha(MochaOptions::new(&m.id, &m.tests))?;
            if m.watch {
                o.watch(
                    &name,
                    WatchOptions {
                        patterns: m.watch_patterns.clone(),
                    },
                )?;
            }
        }
        for w in self.watch_files() {
            o.watch_files(WatchFilesOptions::new(&w.id, &w.patterns, &w.run))?;
        }

        debug!(package = o.package_name(), tasks = o.tasks().len(), "config declared");
        Ok(o)
    }
}
