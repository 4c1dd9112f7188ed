// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WatchgraphError};
use crate::task::{TaskKind, TaskName};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = WatchgraphError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

/// Checks that need no filesystem access. Duplicate names, unresolvable
/// targets and cycles are caught later, when the config is declared and the
/// graph is built.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_package(cfg)?;
    validate_global_config(cfg)?;
    validate_templates(cfg)?;
    validate_ids(cfg)?;
    Ok(())
}

fn validate_package(cfg: &RawConfigFile) -> Result<()> {
    if cfg.package.name.trim().is_empty() {
        return Err(WatchgraphError::MissingField("[package].name".to_string()));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.debounce_ms == 0 {
        return Err(WatchgraphError::ConfigError(
            "[config].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_templates(cfg: &RawConfigFile) -> Result<()> {
    let checks: [(&str, &str, &[&str]); 3] = [
        ("babel", cfg.commands.babel.as_str(), &["{dest}"][..]),
        ("less", cfg.commands.less.as_str(), &["{dest}"][..]),
        ("mocha", cfg.commands.mocha.as_str(), &["{tests}"][..]),
    ];

    for (tool, template, required) in checks {
        for placeholder in required {
            if !template.contains(*placeholder) {
                return Err(WatchgraphError::ConfigError(format!(
                    "[commands].{tool} must contain {placeholder}: {template:?}"
                )));
            }
        }
        if tool != "mocha" && !template.contains("{src}") && !template.contains("{glob}") {
            return Err(WatchgraphError::ConfigError(format!(
                "[commands].{tool} must contain {{src}} or {{glob}}: {template:?}"
            )));
        }
    }
    Ok(())
}

/// Every id must make a valid task name component.
fn validate_ids(cfg: &RawConfigFile) -> Result<()> {
    let package = Some(cfg.package.name.as_str());
    let ids = cfg
        .clean
        .iter()
        .map(|c| (TaskKind::Clean, &c.id))
        .chain(cfg.babel.iter().map(|b| (TaskKind::Babel, &b.id)))
        .chain(cfg.less.iter().map(|l| (TaskKind::Less, &l.id)))
        .chain(cfg.mocha.iter().map(|m| (TaskKind::Mocha, &m.id)))
        .chain(cfg.watch_files.iter().map(|w| (TaskKind::WatchFiles, &w.id)));

    for (kind, id) in ids {
        TaskName::new(kind, package, id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{BuildConfig, PackageSection};

    fn raw() -> RawConfigFile {
        RawConfigFile {
            package: PackageSection {
                name: "pkg".to_string(),
                root: None,
            },
            ..RawConfigFile::default()
        }
    }

    #[test]
    fn package_name_is_required() {
        let mut cfg = raw();
        cfg.package.name.clear();
        assert!(matches!(validate_config(&cfg), Err(WatchgraphError::MissingField(_))));
    }

    #[test]
    fn zero_debounce_is_rejected() {
        let mut cfg = raw();
        cfg.config.debounce_ms = 0;
        assert!(matches!(validate_config(&cfg), Err(WatchgraphError::ConfigError(_))));
    }

    #[test]
    fn templates_need_their_placeholders() {
        let mut cfg = raw();
        cfg.commands.mocha = "mocha".to_string();
        assert!(validate_config(&cfg).is_err());

        let mut cfg = raw();
        cfg.commands.babel = "babel --out-dir {dest}".to_string();
        assert!(validate_config(&cfg).is_err());

        let mut cfg = raw();
        cfg.commands.babel = "babel {glob} --out-dir {dest}".to_string();
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn ids_with_separator_are_rejected() {
        let mut cfg = raw();
        cfg.babel.push(BuildConfig {
            id: "a:b".to_string(),
            src: "src".to_string(),
            dest: "lib".into(),
            clean: false,
            watch: false,
        });
        assert!(matches!(validate_config(&cfg), Err(WatchgraphError::InvalidName(_))));
    }
}
