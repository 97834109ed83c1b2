//! Engine configuration.
//!
//! Read from a `.phpantom-reflect.toml` file at the project root:
//!
//! ```toml
//! include_paths = ["lib", "vendor/legacy"]
//! composer_root = "."
//! scan_paths = ["src", "tests"]
//! core_constants = true
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ReflectionError, Result};

/// File name looked up by [`EngineConfig::discover`].
pub const CONFIG_FILE_NAME: &str = ".phpantom-reflect.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Directories searched for relative file paths, before the current
    /// directory.
    pub include_paths: Vec<PathBuf>,
    /// Project root holding `composer.json`; enables the Composer locator.
    pub composer_root: Option<PathBuf>,
    /// Directories walked up front by the scanning locator.
    pub scan_paths: Vec<PathBuf>,
    /// Resolve core PHP constants (`PHP_EOL`, `E_ALL`, …) without a runtime.
    pub core_constants: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            include_paths: Vec::new(),
            composer_root: None,
            scan_paths: Vec::new(),
            core_constants: true,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ReflectionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: EngineConfig = toml::from_str(&text).map_err(|e| ReflectionError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if let Some(base) = path.parent() {
            config.make_absolute(base);
        }
        tracing::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `.phpantom-reflect.toml` from `dir` if present.  Without a file
    /// the defaults apply, with `dir` as the Composer root when it holds a
    /// `composer.json`.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Self::load(&candidate);
        }
        let composer_root = dir.join("composer.json").is_file().then(|| dir.to_path_buf());
        Ok(Self {
            composer_root,
            ..Self::default()
        })
    }

    fn make_absolute(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.include_paths.iter_mut().for_each(fix);
        self.scan_paths.iter_mut().for_each(fix);
        if let Some(root) = self.composer_root.as_mut() {
            fix(root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_are_anchored_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "include_paths = [\"lib\"]\nscan_paths = [\"/abs/src\"]\ncomposer_root = \".\"\ncore_constants = false\n",
        )
        .unwrap();

        let config = EngineConfig::discover(dir.path()).unwrap();
        assert_eq!(config.include_paths, vec![dir.path().join("lib")]);
        assert_eq!(config.scan_paths, vec![PathBuf::from("/abs/src")]);
        assert_eq!(config.composer_root, Some(dir.path().join(".")));
        assert!(!config.core_constants);
    }

    #[test]
    fn defaults_without_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::discover(dir.path()).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.core_constants);

        std::fs::write(dir.path().join("composer.json"), "{}").unwrap();
        let config = EngineConfig::discover(dir.path()).unwrap();
        assert_eq!(config.composer_root, Some(dir.path().to_path_buf()));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "scan_pathz = []\n").unwrap();
        let err = EngineConfig::load(&path).unwrap_err();
        assert!(matches!(err, ReflectionError::Config { .. }));
    }
}
