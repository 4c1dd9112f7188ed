// tests/watch_tasks.rs

mod common;
use crate::common::builders::Harness;
use crate::common::fakes::ExecCall;
use crate::common::{init_tracing, orchestrator, wait_until, with_timeout};

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use watchgraph::errors::WatchgraphError;
use watchgraph::orchestrator::{BuildOptions, MochaOptions, Orchestrator, WatchFilesOptions};
use watchgraph::task::{BuildTool, TaskRunner};
use watchgraph::types::FileEvent;

type TestResult = Result<(), Box<dyn Error>>;

fn runner(h: &Harness, declare: impl FnOnce(&mut Orchestrator)) -> TaskRunner {
    let mut o = orchestrator(Arc::new(h.fs.clone()));
    declare(&mut o);
    o.create_graph().expect("valid graph").runner(h.context())
}

#[tokio::test]
async fn changed_source_recompiles_only_that_file() -> TestResult {
    init_tracing();
    let h = Harness::new();
    let runner = runner(&h, |o| {
        o.babel(BuildOptions::new("src", "src", "lib").watch(true)).unwrap();
    });

    let _handle = runner.start_watch("watch:babel:nrser:src")?;
    assert_eq!(h.watcher.watched(), vec![vec!["/pkg/src/**/*.js".to_string()]]);

    h.watcher.emit(FileEvent::changed("/pkg/src/a/b.js"));
    let calls = with_timeout(h.executor.wait_for_calls(1)).await;
    assert_eq!(
        calls,
        vec![ExecCall::Compile {
            tool: BuildTool::Babel,
            source: "/pkg/src/a/b.js".to_string(),
            dest: PathBuf::from("/pkg/lib"),
        }]
    );
    Ok(())
}

#[tokio::test]
async fn deleted_less_source_removes_compiled_css() -> TestResult {
    init_tracing();
    let h = Harness::new();
    let runner = runner(&h, |o| {
        o.less(BuildOptions::new("styles", "styles", "css").watch(true)).unwrap();
    });

    let _handle = runner.start_watch("watch:less:nrser:styles")?;
    h.watcher.emit(FileEvent::deleted("/pkg/styles/theme/site.less"));
    // Not matched by the pattern; ignored.
    h.watcher.emit(FileEvent::deleted("/pkg/styles/theme/site.css"));

    let calls = with_timeout(h.executor.wait_for_calls(1)).await;
    assert_eq!(calls[0], ExecCall::Remove(PathBuf::from("/pkg/css/theme/site.css")));
    sleep(Duration::from_millis(50)).await;
    assert_eq!(h.executor.calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn stop_twice_is_safe_and_completes_once() -> TestResult {
    init_tracing();
    let h = Harness::new();
    let runner = runner(&h, |o| {
        o.babel(BuildOptions::new("src", "src", "lib").watch(true)).unwrap();
    });

    let mut handle = runner.start_watch("watch:babel:nrser:src")?;
    handle.stop();
    handle.stop();
    with_timeout(handle.stopped()).await?;
    assert_eq!(h.watcher.closed(), 1);

    // Nothing is delivered to a stopped task.
    h.watcher.emit(FileEvent::changed("/pkg/src/a.js"));
    sleep(Duration::from_millis(50)).await;
    assert!(h.executor.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn dropping_the_handle_stops_the_watch() -> TestResult {
    init_tracing();
    let h = Harness::new();
    let runner = runner(&h, |o| {
        o.babel(BuildOptions::new("src", "src", "lib").watch(true)).unwrap();
    });

    drop(runner.start_watch("watch:babel:nrser:src")?);
    wait_until(|| h.watcher.closed() == 1).await;
    Ok(())
}

#[tokio::test]
async fn watch_init_failure_is_returned() {
    init_tracing();
    let h = Harness::new();
    h.watcher.fail_with("too many open files");
    let runner = runner(&h, |o| {
        o.babel(BuildOptions::new("src", "src", "lib").watch(true)).unwrap();
    });

    match runner.start_watch("watch:babel:nrser:src") {
        Err(WatchgraphError::WatchInit(msg)) => {
            assert!(msg.contains("watch:babel:nrser:src"));
            assert!(msg.contains("too many open files"));
        }
        other => panic!("expected WatchInit, got {other:?}"),
    }
}

#[tokio::test]
async fn compile_failure_is_reported_and_watch_keeps_going() -> TestResult {
    init_tracing();
    let h = Harness::new();
    h.executor.fail("compile");
    let runner = runner(&h, |o| {
        o.babel(BuildOptions::new("src", "src", "lib").watch(true)).unwrap();
    });

    let _handle = runner.start_watch("watch:babel:nrser:src")?;
    h.watcher.emit(FileEvent::changed("/pkg/src/broken.js"));
    wait_until(|| h.notifier.messages().len() == 1).await;
    assert_eq!(h.notifier.messages()[0].0, "watch:babel:nrser:src failed");

    h.watcher.emit(FileEvent::added("/pkg/src/next.js"));
    with_timeout(h.executor.wait_for_calls(2)).await;
    Ok(())
}

#[tokio::test]
async fn unchanged_content_is_skipped_when_enabled() -> TestResult {
    init_tracing();
    let h = Harness::new();
    h.fs.add_file("/pkg/src/a.js", "let a = 1;");
    let runner = runner(&h, |o| {
        o.set_skip_unchanged(true);
        o.babel(BuildOptions::new("src", "src", "lib").watch(true)).unwrap();
    });

    let _handle = runner.start_watch("watch:babel:nrser:src")?;
    h.watcher.emit(FileEvent::added("/pkg/src/a.js"));
    with_timeout(h.executor.wait_for_calls(1)).await;

    // Touched without a content change.
    h.watcher.emit(FileEvent::changed("/pkg/src/a.js"));
    h.fs.add_file("/pkg/src/a.js", "let a = 2;");
    h.watcher.emit(FileEvent::changed("/pkg/src/a.js"));

    with_timeout(h.executor.wait_for_calls(2)).await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(h.executor.calls().len(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn output_changes_rerun_tests_once_per_burst() -> TestResult {
    init_tracing();
    let h = Harness::new();
    let runner = runner(&h, |o| {
        o.babel(BuildOptions::new("src", "src", "lib")).unwrap();
        o.mocha(MochaOptions::new("unit", "test").watch(true)).unwrap();
    });

    let _handle = runner.start_watch("watch:mocha:nrser:unit")?;
    assert_eq!(h.watcher.watched(), vec![vec!["/pkg/lib/**/*".to_string()]]);

    for file in ["a.js", "b.js", "c/d.js"] {
        h.watcher.emit(FileEvent::changed(format!("/pkg/lib/{file}")));
    }

    let calls = with_timeout(h.executor.wait_for_calls(1)).await;
    assert_eq!(calls, vec![ExecCall::RunTests("/pkg/test/**/*.js".to_string())]);
    sleep(Duration::from_secs(1)).await;
    assert_eq!(h.executor.calls().len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn watch_files_reruns_its_target_with_dependencies() -> TestResult {
    init_tracing();
    let h = Harness::new();
    let runner = runner(&h, |o| {
        o.babel(BuildOptions::new("src", "src", "lib").clean(true)).unwrap();
        o.watch_files(WatchFilesOptions::new("config", ["config/*.json"], "babel:nrser:src"))
            .unwrap();
    });

    let _handle = runner.start_watch("watch:files:nrser:config")?;
    h.watcher.emit(FileEvent::changed("/pkg/config/babel.json"));

    let calls = with_timeout(h.executor.wait_for_calls(2)).await;
    assert_eq!(calls[0], ExecCall::Remove(PathBuf::from("/pkg/lib")));
    assert!(matches!(&calls[1], ExecCall::Compile { source, .. } if source == "/pkg/src/**/*.js"));
    Ok(())
}
