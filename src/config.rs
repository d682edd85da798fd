//! Interpreter configuration.
//!
//! Settings come from four layers, highest priority first: command-line flags, `BF_*`
//! environment variables, the `[interpreter]` section of `bf.toml` in the XDG config home,
//! and built-in defaults. Every layer is a partial [`Settings`]; [`Settings::or`] stacks them.
//!
//! ```toml
//! [interpreter]
//! loop_mode = "bookmark"   # or "stack"
//! left_edge = "clamp"      # or "grow"
//! eof = "zero"             # or "unchanged", "max"
//! max_cells = 65536
//! max_steps = 1000000
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use cross_xdg::BaseDirs;

use crate::engine::{EofPolicy, LoopMode, Options};
use crate::tape::LeftEdge;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key} (from {origin}); expected {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        origin: String,
        expected: &'static str,
    },

    #[error("cannot read config file '{}': {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FromStr for LoopMode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bookmark" => Ok(LoopMode::Bookmark),
            "stack" => Ok(LoopMode::Stack),
            _ => Err("'bookmark' or 'stack'"),
        }
    }
}

impl FromStr for LeftEdge {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(LeftEdge::Clamp),
            "grow" => Ok(LeftEdge::Grow),
            _ => Err("'clamp' or 'grow'"),
        }
    }
}

impl FromStr for EofPolicy {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" | "0" => Ok(EofPolicy::Zero),
            "unchanged" | "keep" => Ok(EofPolicy::Unchanged),
            "max" | "255" | "-1" => Ok(EofPolicy::MaxValue),
            _ => Err("'zero', 'unchanged' or 'max'"),
        }
    }
}

/// One layer of configuration. `None` means "not set here".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub loop_mode: Option<LoopMode>,
    pub left_edge: Option<LeftEdge>,
    pub eof: Option<EofPolicy>,
    pub max_cells: Option<usize>,
    pub max_steps: Option<usize>,
}

impl Settings {
    /// Fill the gaps in `self` from `lower`.
    pub fn or(self, lower: Settings) -> Settings {
        Settings {
            loop_mode: self.loop_mode.or(lower.loop_mode),
            left_edge: self.left_edge.or(lower.left_edge),
            eof: self.eof.or(lower.eof),
            max_cells: self.max_cells.or(lower.max_cells),
            max_steps: self.max_steps.or(lower.max_steps),
        }
    }

    /// Build a layer from raw `key -> value` strings. Unknown keys are ignored.
    pub fn from_pairs<'a, I>(pairs: I, origin: &str) -> Result<Settings, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut settings = Settings::default();
        for (key, value) in pairs {
            match key {
                "loop_mode" => settings.loop_mode = Some(parse_value("loop_mode", value, origin)?),
                "left_edge" => settings.left_edge = Some(parse_value("left_edge", value, origin)?),
                "eof" => settings.eof = Some(parse_value("eof", value, origin)?),
                "max_cells" => settings.max_cells = Some(parse_count("max_cells", value, origin)?),
                "max_steps" => settings.max_steps = Some(parse_count("max_steps", value, origin)?),
                _ => tracing::debug!(key, origin, "ignoring unknown config key"),
            }
        }
        Ok(settings)
    }

    /// The `BF_*` environment layer.
    pub fn from_env() -> Result<Settings, ConfigError> {
        const VARS: [(&str, &str); 5] = [
            ("BF_LOOP_MODE", "loop_mode"),
            ("BF_LEFT_EDGE", "left_edge"),
            ("BF_EOF", "eof"),
            ("BF_MAX_CELLS", "max_cells"),
            ("BF_MAX_STEPS", "max_steps"),
        ];
        let found: Vec<(&str, String)> = VARS
            .iter()
            .filter_map(|(var, key)| env::var(var).ok().map(|value| (*key, value)))
            .collect();
        Settings::from_pairs(found.iter().map(|(k, v)| (*k, v.as_str())), "environment")
    }

    /// Parse the `[interpreter]` section of a config file's contents.
    pub fn from_toml(content: &str, origin: &str) -> Result<Settings, ConfigError> {
        // Very small hand-rolled parser: look for the [interpreter] section and key = value pairs.
        let mut in_section = false;
        let mut map: HashMap<&str, &str> = HashMap::new();
        for line in content.lines() {
            let line = line.split_once('#').map_or(line, |(before, _)| before).trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                in_section = line[1..line.len() - 1].trim() == "interpreter";
                continue;
            }
            if !in_section {
                continue;
            }
            if let Some((key, raw)) = line.split_once('=') {
                // Accept quoted or unquoted
                let raw = raw.trim();
                let value = raw
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(raw);
                map.insert(key.trim(), value);
            }
        }
        Settings::from_pairs(map, origin)
    }

    /// Read a config file. A missing file is an empty layer.
    pub fn from_file(path: &Path) -> Result<Settings, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => {
                tracing::debug!(path = %path.display(), "loaded config file");
                Settings::from_toml(&content, &path.display().to_string())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(source) => Err(ConfigError::Unreadable { path: path.to_path_buf(), source }),
        }
    }

    /// The file layer: `BF_CONFIG` if set, otherwise `bf.toml` in the XDG config home.
    /// `BF_NO_CONFIG=1` skips it entirely.
    pub fn from_default_file() -> Result<Settings, ConfigError> {
        if env::var("BF_NO_CONFIG").ok().as_deref() == Some("1") {
            return Ok(Settings::default());
        }
        match config_path() {
            Some(path) => Settings::from_file(&path),
            None => Ok(Settings::default()),
        }
    }

    /// Stack `self` (flags) over the environment and config file layers.
    pub fn layered(self) -> Result<Settings, ConfigError> {
        Ok(self.or(Settings::from_env()?).or(Settings::from_default_file()?))
    }

    /// Interpreter options, with defaults for anything left unset.
    pub fn options(&self) -> Options {
        Options {
            loop_mode: self.loop_mode.unwrap_or_default(),
            left_edge: self.left_edge.unwrap_or_default(),
            eof: self.eof.unwrap_or_default(),
            max_cells: self.max_cells,
        }
    }
}

fn config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("BF_CONFIG") {
        return Some(PathBuf::from(path));
    }
    // On Linux: resolves to /home/<user>/.config
    // On Windows: resolves to C:\Users\<user>\.config
    // On macOS: resolves to /Users/<user>/.config
    let base_dirs = BaseDirs::new().ok()?;
    Some(base_dirs.config_home().join("bf.toml"))
}

fn parse_value<T>(key: &'static str, value: &str, origin: &str) -> Result<T, ConfigError>
where
    T: FromStr<Err = &'static str>,
{
    value.parse().map_err(|expected| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        origin: origin.to_string(),
        expected,
    })
}

fn parse_count(key: &'static str, value: &str, origin: &str) -> Result<usize, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        origin: origin.to_string(),
        expected: "a non-negative integer",
    })
}
