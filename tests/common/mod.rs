#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use phpantom_reflection::{EngineConfig, LiveRuntime, ReflectionEngine};

/// A temp project directory holding PHP fixtures.
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Workspace {
            dir: tempfile::tempdir().expect("failed to create temp dir"),
        }
    }

    /// Create a workspace and write every `(relative path, content)` pair.
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let ws = Self::new();
        for (rel_path, content) in files {
            ws.write(rel_path, content);
        }
        ws
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel_path: &str) -> PathBuf {
        self.dir.path().join(rel_path)
    }

    pub fn write(&self, rel_path: &str, content: &str) -> PathBuf {
        let full = self.path(rel_path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("failed to create dirs");
        }
        fs::write(&full, content).expect("failed to write PHP file");
        full
    }

    /// An engine that scans the whole workspace up front.
    pub fn scanning_engine(&self) -> ReflectionEngine {
        self.engine_with_runtime(None)
    }

    pub fn engine_with_runtime(&self, runtime: Option<Arc<dyn LiveRuntime>>) -> ReflectionEngine {
        let config = EngineConfig {
            scan_paths: vec![self.root().to_path_buf()],
            ..EngineConfig::default()
        };
        ReflectionEngine::from_config_with_runtime(&config, runtime)
            .expect("failed to build engine")
    }

    /// An engine that finds classes through `composer.json` only.
    pub fn composer_engine(&self, composer_json: &str) -> ReflectionEngine {
        self.write("composer.json", composer_json);
        let config = EngineConfig::discover(self.root()).expect("failed to discover config");
        ReflectionEngine::from_config(&config).expect("failed to build engine")
    }
}
