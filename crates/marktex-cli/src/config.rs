use std::path::{Path, PathBuf};
use std::{env, fs};

use marktex_renderer::RenderConfig;
use marktex_worker::DispatchConfig;
use miette::miette;
use serde::{Deserialize, Serialize};

/// Contents of `config.toml`. Both sections are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub render: RenderConfig,
    pub dispatch: DispatchConfig,
}

impl Config {
    pub fn load(config_file: &Path) -> miette::Result<Config> {
        let config_string = fs::read_to_string(config_file)
            .map_err(|e| miette!("error reading config file {}: {}", config_file.display(), e))?;
        Self::parse(&config_string, env::vars())
    }

    /// Parse TOML after replacing every `$NAME` for which `vars` has a value.
    pub fn parse(
        config_string: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> miette::Result<Config> {
        let config_string = substitute_vars(config_string, vars);
        toml::from_str(&config_string).map_err(|e| miette!("error parsing config file {}", e))
    }

    /// `explicit` if given, else the default location if a file exists there,
    /// else built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> miette::Result<Config> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(&path)
            }
            _ => Ok(Config::default()),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("marktex").join("config.toml"))
}

fn substitute_vars(text: &str, vars: impl IntoIterator<Item = (String, String)>) -> String {
    let mut vars: Vec<_> = vars.into_iter().collect();
    // Longest names first so `$HOME` can't clobber the front of `$HOMEPATH`.
    vars.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut out = text.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("${key}"), &value);
    }
    out
}
