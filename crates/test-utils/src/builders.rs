use std::sync::Arc;
use std::time::Duration;

use watchgraph::config::{
    BuildConfig, CleanConfig, ConfigFile, MochaConfig, PackageSection, RawConfigFile,
    WatchFilesConfig,
};
use watchgraph::fs::mock::MockFileSystem;
use watchgraph::task::TaskContext;

use crate::fakes::{ChannelWatchBackend, RecordingExecutor, RecordingNotifier};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(package: &str) -> Self {
        Self {
            config: RawConfigFile {
                package: PackageSection {
                    name: package.to_string(),
                    root: None,
                },
                ..RawConfigFile::default()
            },
        }
    }

    pub fn clean(mut self, id: &str, dest: &str) -> Self {
        self.config.clean.push(CleanConfig {
            id: id.to_string(),
            dest: dest.into(),
        });
        self
    }

    pub fn babel(mut self, id: &str, src: &str, dest: &str, clean: bool, watch: bool) -> Self {
        self.config.babel.push(build(id, src, dest, clean, watch));
        self
    }

    pub fn less(mut self, id: &str, src: &str, dest: &str, clean: bool, watch: bool) -> Self {
        self.config.less.push(build(id, src, dest, clean, watch));
        self
    }

    pub fn mocha(mut self, id: &str, tests: &str, watch: bool) -> Self {
        self.config.mocha.push(MochaConfig {
            id: id.to_string(),
            tests: tests.to_string(),
            watch,
            watch_patterns: None,
        });
        self
    }

    pub fn watch_files(mut self, id: &str, patterns: &[&str], run: &str) -> Self {
        self.config.watch_files.push(WatchFilesConfig {
            id: id.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            run: run.to_string(),
        });
        self
    }

    pub fn skip_unchanged(mut self, val: bool) -> Self {
        self.config.config.skip_unchanged = val;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

fn build(id: &str, src: &str, dest: &str, clean: bool, watch: bool) -> BuildConfig {
    BuildConfig {
        id: id.to_string(),
        src: src.to_string(),
        dest: dest.into(),
        clean,
        watch,
    }
}

/// The fakes a task test needs, plus the context wired to them.
#[derive(Debug, Clone, Default)]
pub struct Harness {
    pub executor: RecordingExecutor,
    pub watcher: ChannelWatchBackend,
    pub notifier: RecordingNotifier,
    pub fs: MockFileSystem,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            fs: MockFileSystem::new(),
            ..Self::default()
        }
    }

    /// Context with the default debounce.
    pub fn context(&self) -> TaskContext {
        TaskContext::new(
            Arc::new(self.executor.clone()),
            Arc::new(self.watcher.clone()),
            Arc::new(self.notifier.clone()),
            Arc::new(self.fs.clone()),
        )
    }

    pub fn context_with_debounce(&self, debounce: Duration) -> TaskContext {
        self.context().with_debounce(debounce)
    }
}
