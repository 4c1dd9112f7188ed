// src/exec/command.rs

//! Shell-command implementation of [`ExecutorBackend`].

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{Result, WatchgraphError};
use crate::exec::backend::{BoxFuture, ExecutorBackend};
use crate::task::BuildTool;
use crate::watch::Pattern;

/// Lines of output kept for failure messages.
const TAIL_LINES: usize = 20;

static PASSING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s+passing").expect("valid regex"));
static FAILING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s+failing").expect("valid regex"));

/// Shell command templates for the external tools.
///
/// Placeholders:
/// - `{src}`: a single source file when the source pattern names one file,
///   otherwise the pattern's base directory;
/// - `{glob}`: the full source glob;
/// - `{dest}`: the directory the output of `{src}` belongs in (for a single
///   less file, the `.css` file itself);
/// - `{tests}`: the test glob (mocha only).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CommandTemplates {
    #[serde(default = "default_babel")]
    pub babel: String,
    #[serde(default = "default_less")]
    pub less: String,
    #[serde(default = "default_mocha")]
    pub mocha: String,
}

fn default_babel() -> String {
    "babel {src} --out-dir {dest}".to_string()
}

fn default_less() -> String {
    "lessc {src} {dest}".to_string()
}

fn default_mocha() -> String {
    "mocha '{tests}'".to_string()
}

impl Default for CommandTemplates {
    fn default() -> Self {
        Self {
            babel: default_babel(),
            less: default_less(),
            mocha: default_mocha(),
        }
    }
}

impl CommandTemplates {
    pub fn for_tool(&self, tool: BuildTool) -> &str {
        match tool {
            BuildTool::Babel => &self.babel,
            BuildTool::Less => &self.less,
        }
    }

    /// Expand a compile template for `source` -> `dest`.
    pub fn compile_command(&self, tool: BuildTool, source: &Pattern, dest: &Path) -> String {
        let (src, dest) = if source.is_literal() {
            // One file: babel takes dest + the file's relative parent, lessc
            // takes the output file itself.
            let out = match tool {
                BuildTool::Babel => Path::new(source.suffix())
                    .parent()
                    .filter(|parent| !parent.as_os_str().is_empty())
                    .map(|parent| dest.join(parent))
                    .unwrap_or_else(|| dest.to_path_buf()),
                BuildTool::Less => dest.join(tool.output_rel(source.suffix())),
            };
            (source.to_absolute_glob(), out)
        } else {
            (source.base_dir().display().to_string(), dest.to_path_buf())
        };

        self.for_tool(tool)
            .replace("{src}", &src)
            .replace("{glob}", &source.to_absolute_glob())
            .replace("{dest}", &dest.display().to_string())
    }

    pub fn test_command(&self, tests: &Pattern) -> String {
        self.mocha.replace("{tests}", &tests.to_absolute_glob())
    }
}

/// Runs compile/test commands through `sh -c` in the package root and
/// removes outputs with `tokio::fs`.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    cwd: PathBuf,
    templates: CommandTemplates,
}

impl ShellExecutor {
    pub fn new(cwd: impl Into<PathBuf>, templates: CommandTemplates) -> Self {
        Self {
            cwd: cwd.into(),
            templates,
        }
    }
}

impl ExecutorBackend for ShellExecutor {
    fn compile(&self, tool: BuildTool, source: Pattern, dest: PathBuf) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let cmd = self.templates.compile_command(tool, &source, &dest);
            let output = run_shell(&self.cwd, tool.as_str(), &cmd).await?;
            if output.success {
                Ok(())
            } else {
                Err(WatchgraphError::CommandFailed {
                    task: tool.as_str().to_string(),
                    message: output.tail.join("\n"),
                })
            }
        })
    }

    fn run_tests(&self, tests: Pattern) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let cmd = self.templates.test_command(&tests);
            let output = run_shell(&self.cwd, "mocha", &cmd).await?;
            if output.success {
                if let Some(summary) = test_summary(&output.tail) {
                    info!(%summary, "tests passed");
                }
                Ok(())
            } else {
                let message = test_summary(&output.tail).unwrap_or_else(|| output.tail.join("\n"));
                Err(WatchgraphError::CommandFailed {
                    task: "mocha".to_string(),
                    message,
                })
            }
        })
    }

    fn remove(&self, path: PathBuf) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let meta = match tokio::fs::symlink_metadata(&path).await {
                Ok(m) => m,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(?path, "nothing to remove");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            if meta.is_dir() {
                tokio::fs::remove_dir_all(&path).await?;
            } else {
                tokio::fs::remove_file(&path).await?;
            }
            info!(?path, "removed");
            Ok(())
        })
    }
}

struct ShellOutput {
    success: bool,
    /// Last lines of combined stdout/stderr.
    tail: Vec<String>,
}

/// Run `cmd` with the platform shell, streaming its output into the log.
async fn run_shell(cwd: &Path, label: &str, cmd: &str) -> Result<ShellOutput> {
    info!(tool = label, %cmd, "starting process");

    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning process for '{label}'"))?;

    let stderr_task = child.stderr.take().map(|stderr| {
        let label = label.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut kept = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(tool = %label, "stderr: {}", line);
                keep_tail(&mut kept, line);
            }
            kept
        })
    });

    let mut tail = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!(tool = label, "{}", line);
            keep_tail(&mut tail, line);
        }
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of '{label}'"))?;

    if let Some(task) = stderr_task {
        if let Ok(lines) = task.await {
            for line in lines {
                keep_tail(&mut tail, line);
            }
        }
    }

    info!(
        tool = label,
        exit_code = status.code().unwrap_or(-1),
        success = status.success(),
        "process exited"
    );

    Ok(ShellOutput {
        success: status.success(),
        tail,
    })
}

fn keep_tail(tail: &mut Vec<String>, line: String) {
    tail.push(line);
    if tail.len() > TAIL_LINES {
        tail.remove(0);
    }
}

/// Pull mocha's `N passing` / `N failing` counts out of its output.
pub fn test_summary(lines: &[String]) -> Option<String> {
    let text = lines.join("\n");
    let passing = PASSING.captures(&text).map(|c| c[1].to_string());
    let failing = FAILING.captures(&text).map(|c| c[1].to_string());

    match (passing, failing) {
        (None, None) => None,
        (p, f) => Some(format!(
            "{} passing, {} failing",
            p.as_deref().unwrap_or("0"),
            f.as_deref().unwrap_or("0")
        )),
    }
}
