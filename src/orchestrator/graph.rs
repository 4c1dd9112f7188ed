// src/orchestrator/graph.rs

//! Composite command graph.
//!
//! Every concrete task is reachable under four names: its canonical name and
//! its three grouping keys (`kind`, `kind:package`, `kind:id`). A composite
//! runs its members independently; the only ordering is each member's own
//! dependency edges, which are checked here to resolve and to be acyclic.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::{Result, WatchgraphError};
use crate::task::{Task, TaskContext, TaskName, TaskRunner, WatchAction};

#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: Arc<BTreeMap<TaskName, Task>>,
    composites: BTreeMap<String, BTreeSet<TaskName>>,
}

impl TaskGraph {
    pub fn new(tasks: BTreeMap<TaskName, Task>) -> Result<Self> {
        validate(&tasks)?;
        let composites = synthesize(&tasks);
        debug!(tasks = tasks.len(), composites = composites.len(), "task graph created");
        Ok(Self {
            tasks: Arc::new(tasks),
            composites,
        })
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.values()
    }

    /// Every composite command name, sorted.
    pub fn composite_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.composites.keys().map(String::as_str)
    }

    pub fn members(&self, composite: &str) -> Option<&BTreeSet<TaskName>> {
        self.composites.get(composite)
    }

    /// Concrete members of `command`, or every non-watch task without one.
    pub fn select(&self, command: Option<&str>) -> Result<Vec<TaskName>> {
        match command {
            Some(command) => self
                .members(command)
                .map(|members| members.iter().cloned().collect())
                .ok_or_else(|| WatchgraphError::TaskNotFound(command.to_string())),
            None => Ok(self
                .tasks()
                .filter(|t| !t.is_watch())
                .map(|t| t.name().clone())
                .collect()),
        }
    }

    /// Merge another package's graph into this one.
    ///
    /// Composites present in both end up with the union of their members;
    /// a concrete task name present in both is an error.
    pub fn include(&mut self, other: &TaskGraph) -> Result<()> {
        if let Some(dup) = other.tasks.keys().find(|name| self.tasks.contains_key(*name)) {
            return Err(WatchgraphError::DuplicateTask(dup.to_string()));
        }

        let mut merged = (*self.tasks).clone();
        merged.extend(other.tasks.iter().map(|(k, v)| (k.clone(), v.clone())));
        validate(&merged)?;

        for (composite, members) in &other.composites {
            self.composites
                .entry(composite.clone())
                .or_default()
                .extend(members.iter().cloned());
        }
        self.tasks = Arc::new(merged);
        Ok(())
    }

    /// A runner over this graph's tasks.
    pub fn runner(&self, ctx: TaskContext) -> TaskRunner {
        TaskRunner::new(ctx, Arc::clone(&self.tasks))
    }
}

fn synthesize(tasks: &BTreeMap<TaskName, Task>) -> BTreeMap<String, BTreeSet<TaskName>> {
    let mut composites: BTreeMap<String, BTreeSet<TaskName>> = BTreeMap::new();
    for name in tasks.keys() {
        let [kind, package, id] = name.group_keys();
        for key in [kind, package, id, name.to_string()] {
            composites.entry(key).or_default().insert(name.clone());
        }
    }
    composites
}

fn validate(tasks: &BTreeMap<TaskName, Task>) -> Result<()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in tasks.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in tasks {
        for dep in task.dependencies() {
            let Some((dep_name, _)) = tasks.get_key_value(dep.as_str()) else {
                return Err(WatchgraphError::TaskNotFound(format!(
                    "{dep} (dependency of {name})"
                )));
            };
            // Edge direction: dependency -> dependent.
            graph.add_edge(dep_name.as_str(), name.as_str(), ());
        }

        if let Task::Watch(watch) = task {
            let targets = watch.paired.iter().chain(match &watch.action {
                WatchAction::Rerun { target } => Some(target),
                WatchAction::Build { .. } => None,
            });
            for target in targets {
                if !tasks.contains_key(target.as_str()) {
                    return Err(WatchgraphError::TaskNotFound(format!(
                        "{target} (watched by {name})"
                    )));
                }
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_) => Ok(()),
        Err(cycle) => Err(WatchgraphError::DagCycle(format!(
            "cycle in task dependencies involving '{}'",
            cycle.node_id()
        ))),
    }
}
