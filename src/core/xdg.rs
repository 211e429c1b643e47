//! Where metaportal looks for its config file and keeps its indexes.
//!
//! Each directory is taken from the first source that is set and
//! non-empty: a `METAPORTAL_*` override, the matching XDG base
//! directory variable, then the XDG default under `$HOME`. The storage
//! root itself is created by `Services` once the final config is known.

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "metaportal";

/// One XDG base directory and its metaportal override
struct BaseDir {
    override_var: &'static str,
    xdg_var: &'static str,
    home_default: &'static [&'static str],
}

const CONFIG_BASE: BaseDir = BaseDir {
    override_var: "METAPORTAL_CONFIG_DIR",
    xdg_var: "XDG_CONFIG_HOME",
    home_default: &[".config"],
};

const DATA_BASE: BaseDir = BaseDir {
    override_var: "METAPORTAL_DATA_DIR",
    xdg_var: "XDG_DATA_HOME",
    home_default: &[".local", "share"],
};

fn non_empty_var(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

impl BaseDir {
    fn resolve(&self) -> PathBuf {
        if let Some(dir) = non_empty_var(self.override_var) {
            return dir;
        }
        let base = non_empty_var(self.xdg_var).unwrap_or_else(|| {
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            self.home_default.iter().fold(home, |path, part| path.join(part))
        });
        base.join(APP_DIR)
    }
}

/// Resolved config and data directories
#[derive(Debug, Clone)]
pub struct XdgDirs {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl XdgDirs {
    pub fn new() -> Self {
        Self {
            config_dir: CONFIG_BASE.resolve(),
            data_dir: DATA_BASE.resolve(),
        }
    }

    /// `config.toml` inside the config directory
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Default storage root for physical indexes and the alias table
    pub fn storage_dir(&self) -> PathBuf {
        self.data_dir.join("storage")
    }
}

impl Default for XdgDirs {
    fn default() -> Self {
        Self::new()
    }
}
