// src/task/name.rs

//! Task identity and the grouping algebra over (kind, package, id).
//!
//! Every concrete task is named `kind:package:id` (or `kind:id` when there
//! is no package). Dropping components gives the three grouping keys the
//! orchestrator turns into composite commands:
//!
//! - `kind`: every task of this kind,
//! - `kind:package`: every task of this kind in one package,
//! - `kind:id`: every task of this kind with this id, across packages.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::errors::{Result, WatchgraphError};

/// Reserved separator between name components.
pub const SEPARATOR: char = ':';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    Clean,
    Babel,
    Less,
    Mocha,
    WatchBabel,
    WatchLess,
    WatchMocha,
    WatchFiles,
}

impl TaskKind {
    pub const ALL: [TaskKind; 8] = [
        TaskKind::Clean,
        TaskKind::Babel,
        TaskKind::Less,
        TaskKind::Mocha,
        TaskKind::WatchBabel,
        TaskKind::WatchLess,
        TaskKind::WatchMocha,
        TaskKind::WatchFiles,
    ];

    /// The kind as name segments, e.g. `["watch", "babel"]`.
    pub fn segments(self) -> &'static [&'static str] {
        match self {
            TaskKind::Clean => &["clean"],
            TaskKind::Babel => &["babel"],
            TaskKind::Less => &["less"],
            TaskKind::Mocha => &["mocha"],
            TaskKind::WatchBabel => &["watch", "babel"],
            TaskKind::WatchLess => &["watch", "less"],
            TaskKind::WatchMocha => &["watch", "mocha"],
            TaskKind::WatchFiles => &["watch", "files"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Clean => "clean",
            TaskKind::Babel => "babel",
            TaskKind::Less => "less",
            TaskKind::Mocha => "mocha",
            TaskKind::WatchBabel => "watch:babel",
            TaskKind::WatchLess => "watch:less",
            TaskKind::WatchMocha => "watch:mocha",
            TaskKind::WatchFiles => "watch:files",
        }
    }

    pub fn is_watch(self) -> bool {
        matches!(
            self,
            TaskKind::WatchBabel | TaskKind::WatchLess | TaskKind::WatchMocha | TaskKind::WatchFiles
        )
    }

    pub fn is_build(self) -> bool {
        matches!(self, TaskKind::Babel | TaskKind::Less)
    }

    /// For a watch kind, the kind of task it re-triggers.
    pub fn watched(self) -> Option<TaskKind> {
        match self {
            TaskKind::WatchBabel => Some(TaskKind::Babel),
            TaskKind::WatchLess => Some(TaskKind::Less),
            TaskKind::WatchMocha => Some(TaskKind::Mocha),
            _ => None,
        }
    }

    /// The watch kind that pairs with this kind, if any.
    pub fn watch_companion(self) -> Option<TaskKind> {
        match self {
            TaskKind::Babel => Some(TaskKind::WatchBabel),
            TaskKind::Less => Some(TaskKind::WatchLess),
            TaskKind::Mocha => Some(TaskKind::WatchMocha),
            _ => None,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = WatchgraphError;

    fn from_str(s: &str) -> Result<Self> {
        TaskKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| WatchgraphError::InvalidName(format!("unknown task kind: {s:?}")))
    }
}

/// Join the non-empty components in the order kind, package, id.
pub fn format(kind: TaskKind, package: Option<&str>, id: Option<&str>) -> String {
    let mut parts: Vec<&str> = kind.segments().to_vec();
    parts.extend(package.filter(|p| !p.is_empty()));
    parts.extend(id.filter(|i| !i.is_empty()));
    parts.join(&SEPARATOR.to_string())
}

/// Canonical identifier of a concrete task.
///
/// Equality, hashing and ordering all go through the canonical string, so a
/// `TaskName` can be looked up in maps by `&str`.
#[derive(Debug, Clone)]
pub struct TaskName {
    kind: TaskKind,
    package: Option<String>,
    id: String,
    canonical: String,
}

impl TaskName {
    pub fn new(kind: TaskKind, package: Option<&str>, id: &str) -> Result<Self> {
        validate_component("id", id)?;
        let package = match package {
            Some(p) if !p.is_empty() => {
                validate_component("package name", p)?;
                Some(p.to_string())
            }
            _ => None,
        };

        let canonical = format(kind, package.as_deref(), Some(id));
        Ok(Self {
            kind,
            package,
            id: id.to_string(),
            canonical,
        })
    }

    /// Same package and id, different kind (e.g. the `clean` or `watch`
    /// companion of a build task).
    pub fn with_kind(&self, kind: TaskKind) -> Self {
        Self {
            kind,
            package: self.package.clone(),
            id: self.id.clone(),
            canonical: format(kind, self.package.as_deref(), Some(&self.id)),
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// `kind` grouping key.
    pub fn kind_key(&self) -> String {
        format(self.kind, None, None)
    }

    /// `kind:package` grouping key (equal to the kind key without a package).
    pub fn package_key(&self) -> String {
        format(self.kind, self.package.as_deref(), None)
    }

    /// `kind:id` grouping key.
    pub fn id_key(&self) -> String {
        format(self.kind, None, Some(&self.id))
    }

    /// All grouping keys this task belongs to, coarsest first.
    pub fn group_keys(&self) -> [String; 3] {
        [self.kind_key(), self.package_key(), self.id_key()]
    }
}

fn validate_component(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(WatchgraphError::MissingField(format!("task {what} is empty")));
    }
    if value.contains(SEPARATOR) || value.chars().any(char::is_whitespace) {
        return Err(WatchgraphError::InvalidName(format!(
            "task {what} {value:?} must not contain '{SEPARATOR}' or whitespace"
        )));
    }
    Ok(())
}

impl PartialEq for TaskName {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for TaskName {}

impl Hash for TaskName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl PartialOrd for TaskName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TaskName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl Borrow<str> for TaskName {
    fn borrow(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl FromStr for TaskName {
    type Err = WatchgraphError;

    /// Parse a canonical concrete name (`babel:pkg:src`, `clean:src`).
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split(SEPARATOR).collect();
        for kind in TaskKind::ALL {
            let segs = kind.segments();
            if parts.len() <= segs.len() || parts[..segs.len()] != segs[..] {
                continue;
            }
            return match &parts[segs.len()..] {
                [id] => TaskName::new(kind, None, id),
                [package, id] => TaskName::new(kind, Some(*package), id),
                _ => Err(WatchgraphError::InvalidName(format!(
                    "{s:?} has too many components for a task name"
                ))),
            };
        }
        Err(WatchgraphError::InvalidName(format!("{s:?} is not a task name")))
    }
}
