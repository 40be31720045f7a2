//! Layered configuration.
//!
//! Settings merge from three layers: embedded defaults, the global file at
//! `~/.config/ralphex/config`, and a per-project override at
//! `.ralphex/config`. Later layers win key by key. CLI flags override the
//! merged record at the call sites that consume it.
//!
//! The file format is flat `key = value` lines with a `[colors]` section,
//! `#`/`;` comments, and blank lines.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default global config content, written by `reset`.
const DEFAULT_CONFIG: &str = "\
# ralphex configuration
# command used for the coding assistant
claude_command = claude
# command used for the external reviewer
codex_command = codex
# run the codex phase in full mode
codex_enabled = true
# pause between iterations, milliseconds
iteration_delay_ms = 0
# relaunches allowed after TASK_FAILED
task_retry_count = 3
# iteration cap per phase
max_iterations = 50
# where plan files live
plans_dir = docs/plans
# directories the dashboard watches, comma separated
watch_dirs =

[colors]
task = 0,175,255
review = 255,215,0
codex = 175,135,255
claude_eval = 0,215,135
warn = 255,175,0
error = 255,95,95
signal = 255,0,255
timestamp = 128,128,128
info = 200,200,200
";

/// RGB triples for the terminal palette, stored as `R,G,B` strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorConfig {
    pub task: String,
    pub review: String,
    pub codex: String,
    pub claude_eval: String,
    pub warn: String,
    pub error: String,
    pub signal: String,
    pub timestamp: String,
    pub info: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            task: "0,175,255".to_string(),
            review: "255,215,0".to_string(),
            codex: "175,135,255".to_string(),
            claude_eval: "0,215,135".to_string(),
            warn: "255,175,0".to_string(),
            error: "255,95,95".to_string(),
            signal: "255,0,255".to_string(),
            timestamp: "128,128,128".to_string(),
            info: "200,200,200".to_string(),
        }
    }
}

impl ColorConfig {
    /// Parses an `R,G,B` triple; `None` when malformed or out of range.
    pub fn parse_rgb(value: &str) -> Option<(u8, u8, u8)> {
        let mut parts = value.split(',');
        let r = parts.next()?.trim().parse().ok()?;
        let g = parts.next()?.trim().parse().ok()?;
        let b = parts.next()?.trim().parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some((r, g, b))
    }

    fn entries(&self) -> [(&'static str, &str); 9] {
        [
            ("task", &self.task),
            ("review", &self.review),
            ("codex", &self.codex),
            ("claude_eval", &self.claude_eval),
            ("warn", &self.warn),
            ("error", &self.error),
            ("signal", &self.signal),
            ("timestamp", &self.timestamp),
            ("info", &self.info),
        ]
    }
}

/// Merged configuration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub claude_command: String,
    pub codex_command: String,
    pub codex_enabled: bool,
    pub iteration_delay_ms: u64,
    pub task_retry_count: u32,
    pub max_iterations: u32,
    pub plans_dir: PathBuf,
    pub watch_dirs: Vec<PathBuf>,
    pub colors: ColorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            claude_command: "claude".to_string(),
            codex_command: "codex".to_string(),
            codex_enabled: true,
            iteration_delay_ms: 0,
            task_retry_count: 3,
            max_iterations: 50,
            plans_dir: PathBuf::from("docs/plans"),
            watch_dirs: Vec::new(),
            colors: ColorConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} line {line}: malformed entry {content:?}")]
    Parse {
        path: PathBuf,
        line: usize,
        content: String,
    },
    #[error("invalid color_{name} value: {value:?}")]
    InvalidColor { name: String, value: String },
    #[error("write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Config {
    /// Loads the merged configuration: defaults, then the global file, then
    /// the local override. Color values are validated after merging.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&default_config_dir(), Path::new(".ralphex"))
    }

    /// Loads with explicit layer directories (tests and `--reset`).
    pub fn load_from(global_dir: &Path, local_dir: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for dir in [global_dir, local_dir] {
            let path = dir.join("config");
            if path.is_file() {
                debug!(path = %path.display(), "applying config layer");
                config.apply_file(&path)?;
            }
        }
        config.validate_colors()?;
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut in_colors = false;
        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(section) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                in_colors = section.trim() == "colors";
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    content: raw.to_string(),
                });
            };
            self.apply(key.trim(), value.trim(), in_colors);
        }
        Ok(())
    }

    /// Applies one entry; unknown keys are ignored so newer files keep
    /// working with older binaries.
    fn apply(&mut self, key: &str, value: &str, in_colors: bool) {
        if in_colors {
            match key {
                "task" => self.colors.task = value.to_string(),
                "review" => self.colors.review = value.to_string(),
                "codex" => self.colors.codex = value.to_string(),
                "claude_eval" => self.colors.claude_eval = value.to_string(),
                "warn" => self.colors.warn = value.to_string(),
                "error" => self.colors.error = value.to_string(),
                "signal" => self.colors.signal = value.to_string(),
                "timestamp" => self.colors.timestamp = value.to_string(),
                "info" => self.colors.info = value.to_string(),
                _ => debug!(key, "ignoring unknown color key"),
            }
            return;
        }

        match key {
            "claude_command" => self.claude_command = value.to_string(),
            "codex_command" => self.codex_command = value.to_string(),
            "codex_enabled" => {
                if let Some(flag) = parse_bool(value) {
                    self.codex_enabled = flag;
                }
            }
            "iteration_delay_ms" => {
                if let Ok(ms) = value.parse() {
                    self.iteration_delay_ms = ms;
                }
            }
            "task_retry_count" => {
                if let Ok(n) = value.parse() {
                    self.task_retry_count = n;
                }
            }
            "max_iterations" => {
                if let Ok(n) = value.parse() {
                    self.max_iterations = n;
                }
            }
            "plans_dir" => self.plans_dir = PathBuf::from(value),
            "watch_dirs" => {
                self.watch_dirs = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .collect();
            }
            _ => debug!(key, "ignoring unknown config key"),
        }
    }

    /// Validates every color triple; fatal before any subprocess launches.
    pub fn validate_colors(&self) -> Result<(), ConfigError> {
        for (name, value) in self.colors.entries() {
            if ColorConfig::parse_rgb(value).is_none() {
                return Err(ConfigError::InvalidColor {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Returns the global configuration directory (`~/.config/ralphex`).
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ralphex")
}

/// Rewrites the global config file to embedded defaults. Returns the path
/// written.
pub fn reset(config_dir: &Path) -> Result<PathBuf, ConfigError> {
    let path = config_dir.join("config");
    fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, DEFAULT_CONFIG).map_err(|source| ConfigError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_files() {
        let empty = TempDir::new().unwrap();
        let config = Config::load_from(empty.path(), &empty.path().join("nope")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_global_layer_applies() {
        let global = TempDir::new().unwrap();
        fs::write(
            global.path().join("config"),
            "max_iterations = 10\nplans_dir = plans\n\n[colors]\ntask = 1,2,3\n",
        )
        .unwrap();
        let local = TempDir::new().unwrap();

        let config = Config::load_from(global.path(), local.path()).unwrap();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.plans_dir, PathBuf::from("plans"));
        assert_eq!(config.colors.task, "1,2,3");
        // untouched keys keep defaults
        assert_eq!(config.task_retry_count, 3);
    }

    #[test]
    fn test_local_overrides_global() {
        let global = TempDir::new().unwrap();
        fs::write(global.path().join("config"), "max_iterations = 10\n").unwrap();
        let local = TempDir::new().unwrap();
        fs::write(local.path().join("config"), "max_iterations = 20\n").unwrap();

        let config = Config::load_from(global.path(), local.path()).unwrap();
        assert_eq!(config.max_iterations, 20);
    }

    #[test]
    fn test_watch_dirs_comma_separated() {
        let global = TempDir::new().unwrap();
        fs::write(global.path().join("config"), "watch_dirs = /tmp/a, /tmp/b\n").unwrap();
        let local = TempDir::new().unwrap();

        let config = Config::load_from(global.path(), local.path()).unwrap();
        assert_eq!(
            config.watch_dirs,
            vec![PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b")]
        );
    }

    #[test]
    fn test_invalid_color_is_fatal() {
        let global = TempDir::new().unwrap();
        fs::write(global.path().join("config"), "[colors]\nwarn = 300,0,0\n").unwrap();
        let local = TempDir::new().unwrap();

        let err = Config::load_from(global.path(), local.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidColor { ref name, .. } if name == "warn"));
    }

    #[test]
    fn test_malformed_line_is_fatal() {
        let global = TempDir::new().unwrap();
        fs::write(global.path().join("config"), "this is not an entry\n").unwrap();
        let local = TempDir::new().unwrap();

        let err = Config::load_from(global.path(), local.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_parse_rgb() {
        assert_eq!(ColorConfig::parse_rgb("0,175,255"), Some((0, 175, 255)));
        assert_eq!(ColorConfig::parse_rgb(" 1 , 2 , 3 "), Some((1, 2, 3)));
        assert_eq!(ColorConfig::parse_rgb("256,0,0"), None);
        assert_eq!(ColorConfig::parse_rgb("1,2"), None);
        assert_eq!(ColorConfig::parse_rgb("1,2,3,4"), None);
        assert_eq!(ColorConfig::parse_rgb(""), None);
    }

    #[test]
    fn test_reset_writes_defaults_that_load_clean() {
        let dir = TempDir::new().unwrap();
        let path = reset(dir.path()).unwrap();
        assert!(path.is_file());

        let local = TempDir::new().unwrap();
        let config = Config::load_from(dir.path(), local.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let global = TempDir::new().unwrap();
        fs::write(global.path().join("config"), "future_knob = 7\n").unwrap();
        let local = TempDir::new().unwrap();

        let config = Config::load_from(global.path(), local.path()).unwrap();
        assert_eq!(config, Config::default());
    }
}
