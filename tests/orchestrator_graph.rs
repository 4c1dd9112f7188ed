// tests/orchestrator_graph.rs

mod common;
use crate::common::orchestrator;

use std::collections::BTreeSet;
use std::error::Error;
use std::sync::Arc;

use watchgraph::errors::WatchgraphError;
use watchgraph::fs::mock::MockFileSystem;
use watchgraph::orchestrator::{BuildOptions, MochaOptions, Orchestrator, WatchFilesOptions};
use watchgraph::task::{Task, TaskKind};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn babel_with_clean_depends_on_its_clean_task() -> TestResult {
    let mut o = orchestrator(Arc::new(MockFileSystem::new()));
    let babel = o.babel(BuildOptions::new("src", "src", "lib").clean(true))?;

    let clean = o.task("clean:nrser:src").expect("clean task registered");
    assert_eq!(clean.kind(), TaskKind::Clean);

    let deps: Vec<&str> = o.task(babel.as_str()).unwrap().dependencies().into_iter().map(|n| n.as_str()).collect();
    assert_eq!(deps, vec!["clean:nrser:src"]);
    Ok(())
}

#[test]
fn two_babel_tasks_yield_three_grouping_levels() -> TestResult {
    let mut o = orchestrator(Arc::new(MockFileSystem::new()));
    o.babel(BuildOptions::new("src", "src", "lib"))?;
    o.babel(BuildOptions::new("test", "test", "test-lib"))?;

    let graph = o.create_graph()?;
    let names: BTreeSet<&str> = graph.composite_names().collect();
    let expected: BTreeSet<&str> = [
        "babel",
        "babel:src",
        "babel:test",
        "babel:nrser",
        "babel:nrser:src",
        "babel:nrser:test",
    ]
    .into_iter()
    .collect();
    assert_eq!(names, expected);

    let members: Vec<&str> = graph.members("babel").unwrap().iter().map(|n| n.as_str()).collect();
    assert_eq!(members, vec!["babel:nrser:src", "babel:nrser:test"]);
    Ok(())
}

#[test]
fn watch_companions_get_their_own_composites() -> TestResult {
    let mut o = orchestrator(Arc::new(MockFileSystem::new()));
    o.less(BuildOptions::new("styles", "styles", "css").watch(true))?;
    o.mocha(MochaOptions::new("unit", "test").watch(true))?;

    let graph = o.create_graph()?;
    let watch_less = graph.members("watch:less").unwrap();
    assert_eq!(watch_less.len(), 1);

    let task = graph.task("watch:less:nrser:styles").and_then(Task::as_watch).unwrap();
    assert_eq!(task.paired.as_ref().map(|p| p.as_str()), Some("less:nrser:styles"));
    assert_eq!(task.patterns[0].to_absolute_glob(), "/pkg/styles/**/*.less");

    // The test watcher follows every build output.
    let mocha = graph.task("watch:mocha:nrser:unit").and_then(Task::as_watch).unwrap();
    assert_eq!(mocha.patterns[0].to_absolute_glob(), "/pkg/css/**/*");
    Ok(())
}

#[test]
fn watch_files_target_must_exist() -> TestResult {
    let mut o = orchestrator(Arc::new(MockFileSystem::new()));
    o.watch_files(WatchFilesOptions::new("docs", ["docs"], "mocha:nrser:unit"))?;

    match o.create_graph() {
        Err(WatchgraphError::TaskNotFound(msg)) => assert!(msg.contains("mocha:nrser:unit")),
        other => panic!("expected TaskNotFound, got {other:?}"),
    }
    Ok(())
}

#[test]
fn included_package_merges_into_superset() -> TestResult {
    let fs = Arc::new(MockFileSystem::new());
    let mut parent = orchestrator(fs.clone());
    parent.babel(BuildOptions::new("src", "src", "lib"))?;

    let mut child = Orchestrator::new("child", "/pkg/packages/child", fs)?;
    child.babel(BuildOptions::new("src", "src", "lib"))?;

    let mut graph = parent.create_graph()?;
    graph.include(&child.create_graph()?)?;

    let members: Vec<&str> = graph.members("babel:src").unwrap().iter().map(|n| n.as_str()).collect();
    assert_eq!(members, vec!["babel:child:src", "babel:nrser:src"]);
    assert!(graph.members("babel:child").is_some());
    assert!(graph.task("babel:child:src").is_some());
    Ok(())
}

#[test]
fn relative_package_root_is_rejected() {
    let err = Orchestrator::new("nrser", "pkg", Arc::new(MockFileSystem::new())).unwrap_err();
    assert!(matches!(err, WatchgraphError::ConfigError(_)));
}

#[test]
fn select_resolves_composites_and_rejects_unknown_commands() -> TestResult {
    let mut o = orchestrator(Arc::new(MockFileSystem::new()));
    o.babel(BuildOptions::new("src", "src", "lib").watch(true))?;
    o.less(BuildOptions::new("styles", "styles", "css"))?;
    let graph = o.create_graph()?;

    let watch: Vec<String> = graph.select(Some("watch:babel"))?.iter().map(|n| n.to_string()).collect();
    assert_eq!(watch, vec!["watch:babel:nrser:src"]);

    let all: Vec<String> = graph.select(None)?.iter().map(|n| n.to_string()).collect();
    assert_eq!(all, vec!["babel:nrser:src", "less:nrser:styles"]);

    match graph.select(Some("babel:nope")) {
        Err(WatchgraphError::TaskNotFound(name)) => assert_eq!(name, "babel:nope"),
        other => panic!("expected TaskNotFound, got {other:?}"),
    }
    Ok(())
}

#[test]
fn glob_characters_in_package_root_are_literal() -> TestResult {
    let fs = Arc::new(MockFileSystem::new());
    let mut o = Orchestrator::new("nrser", "/work/proj[1]", fs.clone())?;
    let babel = o.babel(BuildOptions::new("src", "src", "lib").watch(true))?;
    let graph = o.create_graph()?;

    let watch = graph
        .task(babel.with_kind(TaskKind::WatchBabel).as_str())
        .and_then(Task::as_watch)
        .expect("watch companion");
    let pattern = &watch.patterns[0];
    assert_eq!(pattern.base_dir(), std::path::PathBuf::from("/work/proj[1]/src"));
    assert_eq!(pattern.suffix(), "**/*.js");

    let (_, rel) = watch
        .route(std::path::Path::new("/work/proj[1]/src/a/b.js"))
        .expect("event under the bracketed root is routed");
    assert_eq!(rel, "a/b.js");
    assert!(watch.route(std::path::Path::new("/work/proj1/src/a.js")).is_none());
    Ok(())
}
