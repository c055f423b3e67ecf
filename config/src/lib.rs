//! File-backed environment loading for Weft: the XDG `config.toml` `[env]`
//! table and a project `.env`, folded into the process environment.
//!
//! Sources are layered, lowest precedence first: XDG config, then `.env`.
//! The process environment itself always wins — [`Loader::apply`] only sets
//! keys that are not already present, so `BOT_TOKEN=... cargo run` beats
//! both files.

mod dotenv;
mod xdg_toml;

use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

/// A config source could not be read or understood. The path always names
/// the offending file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Gathers the file-backed config layers for one application and applies
/// them to the process environment.
pub struct Loader {
    app_name: String,
    project_dir: Option<PathBuf>,
}

impl Loader {
    /// `app_name` selects the XDG path `~/.config/<app_name>/config.toml`.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            project_dir: None,
        }
    }

    /// Looks for `.env` in `dir` instead of the current directory.
    pub fn project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(dir.into());
        self
    }

    /// The merged file-backed configuration, later layers overriding
    /// earlier ones (`.env` over XDG). Does not touch the environment;
    /// missing files are simply empty layers.
    pub fn gather(&self) -> Result<HashMap<String, String>, LoadError> {
        let layers = [
            xdg_toml::load_env_map(&self.app_name)?,
            dotenv::load_env_map(self.project_dir.as_deref())?,
        ];
        let mut merged = HashMap::new();
        for layer in layers {
            merged.extend(layer);
        }
        Ok(merged)
    }

    /// Sets every gathered key that is absent from the process environment
    /// (existing env always wins) and returns the keys it set, sorted.
    pub fn apply(&self) -> Result<Vec<String>, LoadError> {
        let mut applied = Vec::new();
        for (key, value) in self.gather()? {
            if std::env::var_os(&key).is_none() {
                std::env::set_var(&key, value);
                applied.push(key);
            }
        }
        applied.sort();
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::path::Path;

    fn with_xdg_home<R>(dir: &Path, run: impl FnOnce() -> R) -> R {
        let prev = env::var("XDG_CONFIG_HOME").ok();
        env::set_var("XDG_CONFIG_HOME", dir);
        let result = run();
        match prev {
            Some(p) => env::set_var("XDG_CONFIG_HOME", p),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }
        result
    }

    #[test]
    fn missing_sources_yield_empty_config() {
        let loader = Loader::new("weft-loader-test-no-such-app");
        let empty_dir = tempfile::tempdir().unwrap();
        let applied = loader.project_dir(empty_dir.path()).apply().unwrap();
        assert!(applied.is_empty());
    }

    #[test]
    fn existing_env_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "WEFT_CFG_KEEP=from_file\n").unwrap();
        env::set_var("WEFT_CFG_KEEP", "from_env");

        let applied = Loader::new("weft-loader-test-no-such-app")
            .project_dir(dir.path())
            .apply()
            .unwrap();

        assert_eq!(env::var("WEFT_CFG_KEEP").as_deref(), Ok("from_env"));
        assert!(!applied.contains(&"WEFT_CFG_KEEP".to_string()));
        env::remove_var("WEFT_CFG_KEEP");
    }

    #[test]
    fn dotenv_layer_overrides_xdg_layer() {
        let xdg_dir = tempfile::tempdir().unwrap();
        let app_dir = xdg_dir.path().join("weft-loader-test");
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(
            app_dir.join("config.toml"),
            "[env]\nWEFT_CFG_LAYER = \"from_xdg\"\nWEFT_CFG_XDG_ONLY = \"xdg\"\n",
        )
        .unwrap();

        let project_dir = tempfile::tempdir().unwrap();
        std::fs::write(project_dir.path().join(".env"), "WEFT_CFG_LAYER=from_dotenv\n").unwrap();

        let merged = with_xdg_home(xdg_dir.path(), || {
            Loader::new("weft-loader-test")
                .project_dir(project_dir.path())
                .gather()
        })
        .unwrap();

        assert_eq!(merged.get("WEFT_CFG_LAYER"), Some(&"from_dotenv".to_string()));
        assert_eq!(merged.get("WEFT_CFG_XDG_ONLY"), Some(&"xdg".to_string()));
    }

    #[test]
    fn apply_reports_the_keys_it_set() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "WEFT_CFG_B=2\nWEFT_CFG_A=1\n",
        )
        .unwrap();
        env::remove_var("WEFT_CFG_A");
        env::remove_var("WEFT_CFG_B");

        let applied = Loader::new("weft-loader-test-no-such-app")
            .project_dir(dir.path())
            .apply()
            .unwrap();

        assert_eq!(applied, vec!["WEFT_CFG_A".to_string(), "WEFT_CFG_B".to_string()]);
        assert_eq!(env::var("WEFT_CFG_A").as_deref(), Ok("1"));
        env::remove_var("WEFT_CFG_A");
        env::remove_var("WEFT_CFG_B");
    }

    #[test]
    fn broken_xdg_config_surfaces_the_path() {
        let xdg_dir = tempfile::tempdir().unwrap();
        let app_dir = xdg_dir.path().join("weft-loader-bad");
        std::fs::create_dir_all(&app_dir).unwrap();
        std::fs::write(app_dir.join("config.toml"), "not toml [[[\n").unwrap();

        let result = with_xdg_home(xdg_dir.path(), || Loader::new("weft-loader-bad").gather());
        match result {
            Err(LoadError::Parse { path, .. }) => {
                assert!(path.ends_with("config.toml"), "{}", path.display());
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }
}
