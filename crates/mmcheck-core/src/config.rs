#![forbid(unsafe_op_in_unsafe_fn)]

//! Diagnostics startup configuration.
//!
//! Layering: defaults -> JSON file -> environment. A missing file is not an
//! error. Every value that moved away from the previous layer is recorded in
//! the [`ConfigLoadReport`].

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::{CheckDepth, DiagnosticsInit, Restore};
use crate::handler::{self, FailureHandler};

pub const ENV_CHECK_DEPTH: &str = "MMCHECK_CHECK_DEPTH";
pub const ENV_HANDLER: &str = "MMCHECK_HANDLER";

/// Which built-in failure handler to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    #[default]
    Abort,
    Panic,
}

impl HandlerKind {
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            HandlerKind::Abort => "abort",
            HandlerKind::Panic => "panic",
        }
    }

    #[inline]
    pub fn handler(self) -> FailureHandler {
        match self {
            HandlerKind::Abort => handler::abort_handler,
            HandlerKind::Panic => handler::panic_handler,
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HandlerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(HandlerKind::Abort),
            "panic" => Ok(HandlerKind::Panic),
            other => Err(format!("unknown handler: '{other}'")),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("diagnostics config read failed: path={path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("diagnostics config parse failed (json): path={path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideSource {
    File,
    Env,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOverride {
    pub key: &'static str,
    pub source: OverrideSource,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigLoadReport {
    /// File the config was read from, if one existed.
    pub file: Option<PathBuf>,
    pub overrides: Vec<ConfigOverride>,
}

impl ConfigLoadReport {
    #[inline]
    pub fn has_overrides(&self) -> bool {
        !self.overrides.is_empty()
    }

    #[inline]
    pub fn is_defaults(&self) -> bool {
        self.file.is_none() && self.overrides.is_empty()
    }

    #[inline]
    pub fn used_file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

/// Normalized diagnostics configuration. All fields have concrete defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DiagnosticsConfig {
    pub check_depth: CheckDepth,
    pub handler: HandlerKind,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FileJson {
    check_depth: Option<CheckDepth>,
    handler: Option<HandlerKind>,
}

impl DiagnosticsConfig {
    /// Loads `path` (if it exists) and the process environment over the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, ConfigLoadReport), ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Like [`load`](Self::load) with an explicit environment lookup.
    pub fn load_with_env(
        path: impl AsRef<Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(Self, ConfigLoadReport), ConfigError> {
        let path = path.as_ref();
        let mut cfg = Self::default();
        let mut report = ConfigLoadReport::default();

        match fs::read_to_string(path) {
            Ok(data) => {
                let parsed: FileJson =
                    serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
                        path: path.to_path_buf(),
                        source,
                    })?;
                report.file = Some(path.to_path_buf());
                cfg.apply_file(&mut report, parsed);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!(target: "mmcheck::config", "no config at {:?}, using defaults", path);
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }

        cfg.apply_env(&mut report, env)?;

        for o in &report.overrides {
            log::debug!(
                target: "mmcheck::config",
                "override {} ({:?}): {} -> {}",
                o.key,
                o.source,
                o.from,
                o.to
            );
        }

        Ok((cfg, report))
    }

    /// Environment layer only, over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        let mut report = ConfigLoadReport::default();
        cfg.apply_env(&mut report, |key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    /// Installs the configured depth and handler.
    pub fn apply(&self) -> Restore {
        log::info!(
            target: "mmcheck::config",
            "diagnostics: check_depth={} handler={}",
            self.check_depth,
            self.handler
        );
        DiagnosticsInit::new()
            .check_depth(self.check_depth)
            .handler(self.handler.handler())
            .apply()
    }

    fn apply_file(&mut self, report: &mut ConfigLoadReport, file: FileJson) {
        if let Some(depth) = file.check_depth {
            set(report, OverrideSource::File, "check_depth", &mut self.check_depth, depth);
        }
        if let Some(kind) = file.handler {
            set(report, OverrideSource::File, "handler", &mut self.handler, kind);
        }
    }

    fn apply_env(
        &mut self,
        report: &mut ConfigLoadReport,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = non_empty(env(ENV_CHECK_DEPTH)) {
            let depth = raw
                .parse::<CheckDepth>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_CHECK_DEPTH,
                    value: raw.clone(),
                })?;
            set(report, OverrideSource::Env, "check_depth", &mut self.check_depth, depth);
        }
        if let Some(raw) = non_empty(env(ENV_HANDLER)) {
            let kind = raw
                .parse::<HandlerKind>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_HANDLER,
                    value: raw.clone(),
                })?;
            set(report, OverrideSource::Env, "handler", &mut self.handler, kind);
        }
        Ok(())
    }
}

#[inline]
fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

fn set<T: Copy + PartialEq + fmt::Display>(
    report: &mut ConfigLoadReport,
    source: OverrideSource,
    key: &'static str,
    slot: &mut T,
    to: T,
) {
    if *slot == to {
        return;
    }
    report.overrides.push(ConfigOverride {
        key,
        source,
        from: slot.to_string(),
        to: to.to_string(),
    });
    *slot = to;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, report) =
            DiagnosticsConfig::load_with_env(dir.path().join("mmcheck.json"), env_of(&[])).unwrap();
        assert_eq!(cfg, DiagnosticsConfig::default());
        assert_eq!(cfg.check_depth, CheckDepth::Shallow);
        assert_eq!(cfg.handler, HandlerKind::Abort);
        assert!(report.is_defaults());
    }

    #[test]
    fn file_values_are_recorded() {
        let f = write_config(r#"{ "check_depth": "deep", "handler": "panic" }"#);
        let (cfg, report) = DiagnosticsConfig::load_with_env(f.path(), env_of(&[])).unwrap();
        assert_eq!(cfg.check_depth, CheckDepth::Deep);
        assert_eq!(cfg.handler, HandlerKind::Panic);
        assert_eq!(report.used_file(), Some(f.path()));
        assert_eq!(report.overrides.len(), 2);
        assert!(report.overrides.iter().all(|o| o.source == OverrideSource::File));
    }

    #[test]
    fn env_wins_over_file() {
        let f = write_config(r#"{ "check_depth": "deep" }"#);
        let (cfg, report) =
            DiagnosticsConfig::load_with_env(f.path(), env_of(&[(ENV_CHECK_DEPTH, "none")])).unwrap();
        assert_eq!(cfg.check_depth, CheckDepth::None);
        let last = report.overrides.last().unwrap();
        assert_eq!(last.source, OverrideSource::Env);
        assert_eq!(last.from, "deep");
        assert_eq!(last.to, "none");
    }

    #[test]
    fn unchanged_values_are_not_overrides() {
        let f = write_config(r#"{ "check_depth": "shallow" }"#);
        let (_, report) = DiagnosticsConfig::load_with_env(f.path(), env_of(&[])).unwrap();
        assert!(!report.has_overrides());
        assert!(!report.is_defaults());
    }

    #[test]
    fn bad_env_value_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = DiagnosticsConfig::load_with_env(
            dir.path().join("none.json"),
            env_of(&[(ENV_HANDLER, "retry")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ENV_HANDLER, .. }));
    }

    #[test]
    fn handler_names_parse_like_the_other_settings() {
        assert_eq!(" Panic ".parse::<HandlerKind>(), Ok(HandlerKind::Panic));
        assert_eq!(
            "retry".parse::<HandlerKind>(),
            Err("unknown handler: 'retry'".to_owned())
        );
        assert_eq!(
            "bottomless".parse::<CheckDepth>(),
            Err("unknown check depth: 'bottomless'".to_owned())
        );
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let f = write_config(r#"{ "check_depth": 7 "#);
        let err = DiagnosticsConfig::load_with_env(f.path(), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn unknown_keys_are_a_parse_error() {
        let f = write_config(r#"{ "depth": "deep" }"#);
        let err = DiagnosticsConfig::load_with_env(f.path(), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
