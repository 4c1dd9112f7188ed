// src/watch/pattern.rs

//! Base directory + glob suffix pairs.
//!
//! A [`Pattern`] is used twice: the absolute glob is handed to the watch
//! backend, and incoming event paths are matched against the same compiled
//! glob so that routing always agrees with what was subscribed. Splitting the
//! glob at its first wildcard segment lets a watch task recover the part of
//! an event path that the wildcard matched (e.g. `a/b.js` for
//! `/pkg/src/a/b.js` under `/pkg/src/**/*.js`).

use std::fmt;
use std::path::{Path, PathBuf};

use globset::{escape, GlobBuilder, GlobMatcher};

use crate::errors::{Result, WatchgraphError};
use crate::fs::FileSystem;
use crate::watch::path_utils::{relative_str, to_slash};

/// Characters that make a path segment a glob rather than a literal.
const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Separator used inside glob strings, regardless of platform.
pub const GLOB_SEPARATOR: char = '/';

/// Returns true if `s` contains any glob metacharacter.
pub fn has_glob_meta(s: &str) -> bool {
    s.contains(GLOB_META)
}

#[derive(Clone)]
pub struct Pattern {
    /// Absolute base directory in forward-slash form, without a trailing
    /// separator. Empty for the filesystem root.
    base: String,
    /// Glob fragment relative to `base`, without a leading separator.
    suffix: String,
    matcher: GlobMatcher,
}

impl Pattern {
    /// Build a pattern from an explicit base directory and glob suffix.
    ///
    /// The base must be absolute. A trailing separator on the base is
    /// dropped; a leading separator on the suffix is rejected.
    pub fn new(base: impl AsRef<Path>, suffix: impl Into<String>) -> Result<Self> {
        let base_path = base.as_ref();
        let suffix = suffix.into();

        if !base_path.has_root() {
            return Err(WatchgraphError::InvalidPattern(format!(
                "pattern base must be absolute: {:?}",
                base_path
            )));
        }
        if suffix.is_empty() {
            return Err(WatchgraphError::InvalidPattern(format!(
                "pattern suffix for base {:?} is empty",
                base_path
            )));
        }
        if suffix.starts_with(GLOB_SEPARATOR) {
            return Err(WatchgraphError::InvalidPattern(format!(
                "pattern suffix must not start with a separator: {suffix}"
            )));
        }

        let base = to_slash(base_path).trim_end_matches(GLOB_SEPARATOR).to_string();
        // The base is a literal directory even if its name holds `[`, `{` etc.
        let matcher = compile(&format!("{}{GLOB_SEPARATOR}{suffix}", escape(&base)))?;

        Ok(Self {
            base,
            suffix,
            matcher,
        })
    }

    /// Split an absolute glob at its first wildcard-bearing segment.
    ///
    /// Fails if `glob` has no wildcard at all: a literal path carries no
    /// information about where the base ends, so callers must use
    /// [`Pattern::new`] instead. On success the base directory is created if
    /// it does not exist yet, so the watch backend has something to watch.
    pub fn from_literal_glob(glob: &str, fs: &dyn FileSystem) -> Result<Self> {
        if !has_glob_meta(glob) {
            return Err(WatchgraphError::InvalidPattern(format!(
                "{glob:?} has no glob characters; supply base and suffix explicitly"
            )));
        }
        if !glob.starts_with(GLOB_SEPARATOR) && !Path::new(glob).has_root() {
            return Err(WatchgraphError::InvalidPattern(format!(
                "glob must be absolute: {glob:?}"
            )));
        }

        let (base, suffix) = split_at_wildcard(glob);
        let base_dir = if base.is_empty() {
            PathBuf::from("/")
        } else {
            PathBuf::from(base)
        };
        Self::with_base(base_dir, suffix, fs)
    }

    /// Resolve a user-supplied source path or glob against `root`.
    ///
    /// - a glob is split at its first wildcard segment and only the literal
    ///   prefix is joined onto `root`, so wildcard characters in `root`
    ///   itself stay literal;
    /// - anything else is treated as a directory and gets `default_suffix`.
    ///
    /// Either way the base directory is created if missing.
    pub fn resolve(
        root: &Path,
        source: &str,
        default_suffix: &str,
        fs: &dyn FileSystem,
    ) -> Result<Self> {
        let source = to_slash(Path::new(source));
        let (prefix, suffix) = if has_glob_meta(&source) {
            split_at_wildcard(&source)
        } else {
            (source.trim_end_matches(GLOB_SEPARATOR), default_suffix.to_string())
        };
        let base_dir = if prefix.is_empty() {
            root.to_path_buf()
        } else {
            root.join(prefix)
        };
        Self::with_base(base_dir, suffix, fs)
    }

    fn with_base(base_dir: PathBuf, suffix: String, fs: &dyn FileSystem) -> Result<Self> {
        fs.create_dir_all(&base_dir).map_err(|e| {
            WatchgraphError::Other(e.context(format!("ensuring base of {}/{suffix}", base_dir.display())))
        })?;
        Self::new(base_dir, suffix)
    }

    /// A pattern matching exactly one file below this pattern's base.
    pub fn scoped(&self, rel: &str) -> Result<Self> {
        Self::new(self.base_dir(), rel.trim_start_matches(GLOB_SEPARATOR))
    }

    pub fn base_dir(&self) -> PathBuf {
        if self.base.is_empty() {
            PathBuf::from("/")
        } else {
            PathBuf::from(&self.base)
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// True when the suffix names a single file rather than a wildcard set.
    pub fn is_literal(&self) -> bool {
        !has_glob_meta(&self.suffix)
    }

    /// The full glob, `base + "/" + suffix`.
    pub fn to_absolute_glob(&self) -> String {
        format!("{}{GLOB_SEPARATOR}{}", self.base, self.suffix)
    }

    /// Whether an absolute path is selected by this pattern.
    ///
    /// `*` and `?` never cross a separator, `**` spans any number of
    /// segments, `{a,b}` alternates and `[..]` is a character class.
    pub fn matches(&self, path: &Path) -> bool {
        self.matcher.is_match(to_slash(path))
    }

    /// The part of `path` below the base directory, if `path` matches.
    pub fn relative(&self, path: &Path) -> Option<String> {
        if !self.matches(path) {
            return None;
        }
        relative_str(&self.base_dir(), path)
    }
}

/// Split `glob` before its first segment carrying a wildcard. The prefix
/// keeps a leading separator for absolute globs and is empty when the very
/// first segment is a wildcard.
fn split_at_wildcard(glob: &str) -> (&str, String) {
    let segments: Vec<&str> = glob.split(GLOB_SEPARATOR).collect();
    let split_at = segments
        .iter()
        .position(|seg| has_glob_meta(seg))
        .unwrap_or(segments.len());

    let prefix_len = segments[..split_at].iter().map(|seg| seg.len() + 1).sum::<usize>();
    let prefix = glob[..prefix_len.min(glob.len())].trim_end_matches(GLOB_SEPARATOR);
    (prefix, segments[split_at..].join("/"))
}

fn compile(glob: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(glob)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| WatchgraphError::InvalidPattern(format!("{glob}: {e}")))
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.suffix == other.suffix
    }
}

impl Eq for Pattern {}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("base", &self.base)
            .field("suffix", &self.suffix)
            .finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_absolute_glob())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn splits_at_first_wildcard_segment() {
        let fs = MockFileSystem::new();
        let p = Pattern::from_literal_glob("/pkg/src/**/*.js", &fs).unwrap();
        assert_eq!(p.base_dir(), PathBuf::from("/pkg/src"));
        assert_eq!(p.suffix(), "**/*.js");
        assert!(fs.is_dir(Path::new("/pkg/src")));
    }

    #[test]
    fn brace_in_middle_segment_ends_base() {
        let fs = MockFileSystem::new();
        let p = Pattern::from_literal_glob("/pkg/{src,test}/x/*.js", &fs).unwrap();
        assert_eq!(p.base_dir(), PathBuf::from("/pkg"));
        assert_eq!(p.suffix(), "{src,test}/x/*.js");
    }

    #[test]
    fn wildcards_in_root_stay_literal() {
        let fs = MockFileSystem::new();
        let p = Pattern::resolve(Path::new("/work/proj[1]"), "src/**/*.js", "**/*.js", &fs).unwrap();
        assert_eq!(p.base_dir(), PathBuf::from("/work/proj[1]/src"));
        assert_eq!(p.suffix(), "**/*.js");
        assert!(fs.is_dir(Path::new("/work/proj[1]/src")));
        assert!(p.matches(Path::new("/work/proj[1]/src/a/b.js")));
        assert!(!p.matches(Path::new("/work/proj1/src/a/b.js")));

        let dir = Pattern::resolve(Path::new("/work/{x,y}"), "lib", "**/*", &fs).unwrap();
        assert_eq!(dir.base_dir(), PathBuf::from("/work/{x,y}/lib"));
        assert!(dir.matches(Path::new("/work/{x,y}/lib/a.css")));
        assert!(!dir.matches(Path::new("/work/x/lib/a.css")));
    }

    #[test]
    fn absolute_source_ignores_root() {
        let fs = MockFileSystem::new();
        let p = Pattern::resolve(Path::new("/pkg"), "/shared/*.less", "**/*.less", &fs).unwrap();
        assert_eq!(p.to_absolute_glob(), "/shared/*.less");
    }

    #[test]
    fn literal_glob_is_rejected() {
        let fs = MockFileSystem::new();
        let err = Pattern::from_literal_glob("/pkg/src/a.js", &fs).unwrap_err();
        assert!(matches!(err, WatchgraphError::InvalidPattern(_)));
    }

    #[test]
    fn trailing_separator_on_base_is_dropped() {
        let p = Pattern::new("/pkg/lib/", "**/*").unwrap();
        assert_eq!(p.to_absolute_glob(), "/pkg/lib/**/*");
    }

    #[test]
    fn leading_separator_on_suffix_is_rejected() {
        assert!(Pattern::new("/pkg", "/src/*.js").is_err());
        assert!(Pattern::new("relative", "*.js").is_err());
    }

    #[test]
    fn single_star_does_not_cross_segments() {
        let p = Pattern::new("/pkg/src", "*.js").unwrap();
        assert!(p.matches(Path::new("/pkg/src/a.js")));
        assert!(!p.matches(Path::new("/pkg/src/a/b.js")));
    }

    #[test]
    fn relative_fragment_of_match() {
        let p = Pattern::new("/pkg/src", "**/*.js").unwrap();
        assert_eq!(p.relative(Path::new("/pkg/src/a/b.js")).as_deref(), Some("a/b.js"));
        assert_eq!(p.relative(Path::new("/pkg/src/a/b.css")), None);
    }

    #[test]
    fn scoped_pattern_matches_one_file() {
        let p = Pattern::new("/pkg/src", "**/*.js").unwrap();
        let one = p.scoped("a/b.js").unwrap();
        assert!(one.is_literal());
        assert!(one.matches(Path::new("/pkg/src/a/b.js")));
        assert!(!one.matches(Path::new("/pkg/src/a/c.js")));
    }
}
