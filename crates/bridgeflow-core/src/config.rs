use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::constants::*;

/// Project configuration, read from `bridgeflow.toml` when present.
///
/// Every table is optional; an absent file behaves like an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BridgeflowConfig {
    pub project: ProjectConfig,
    pub app: AppConfig,
    pub native: NativeConfig,
    pub codegen: CodegenConfig,
    /// Environment overrides applied to every spawned tool.
    pub env: BTreeMap<String, String>,
    /// Directory the relative paths above are resolved against.
    #[serde(skip)]
    pub root: PathBuf,
}

impl BridgeflowConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let mut cfg = toml::from_str::<Self>(&text)
            .with_context(|| format!("failed to parse TOML config: {}", path.display()))?;
        cfg.root = config_root_dir(path);
        Ok(cfg)
    }

    /// Loads `path`, falling back to defaults when the file does not exist and
    /// the caller did not name it explicitly.
    pub fn load(path: &Path, explicit: bool) -> Result<Self> {
        if !explicit && !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self {
                root: config_root_dir(path),
                ..Self::default()
            });
        }
        Self::load_from_file(path)
    }

    pub fn project_name(&self) -> String {
        if let Some(name) = &self.project.name {
            return name.clone();
        }
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| FALLBACK_PROJECT_NAME.to_string())
    }

    pub fn native_dir(&self) -> PathBuf {
        self.root.join(&self.native.dir)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub program: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_APP_PROGRAM.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NativeConfig {
    pub program: String,
    pub dir: PathBuf,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_NATIVE_PROGRAM.to_string(),
            dir: PathBuf::from(DEFAULT_NATIVE_DIR),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_CODEGEN_PROGRAM.to_string(),
            args: DEFAULT_CODEGEN_ARGS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// The project root for a config path.
///
/// A bare filename like `bridgeflow.toml` has an empty parent, in which case
/// the current working directory is used.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg: BridgeflowConfig = toml::from_str("").expect("empty config should parse");
        assert_eq!(cfg.app.program, "flutter");
        assert_eq!(cfg.native.program, "cargo");
        assert_eq!(cfg.native.dir, PathBuf::from("rust"));
        assert_eq!(cfg.codegen.program, "flutter_rust_bridge_codegen");
        assert_eq!(cfg.codegen.args, vec!["generate"]);
        assert!(cfg.env.is_empty());
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let cfg: BridgeflowConfig = toml::from_str(
            r#"
            [project]
            name = "Motek UI"

            [native]
            dir = "native"

            [env]
            RUST_BACKTRACE = "1"
            "#,
        )
        .expect("fixture config should parse");

        assert_eq!(cfg.project_name(), "Motek UI");
        assert_eq!(cfg.native.program, "cargo");
        assert_eq!(cfg.native.dir, PathBuf::from("native"));
        assert_eq!(cfg.env.get("RUST_BACKTRACE").map(String::as_str), Some("1"));
    }

    #[test]
    fn load_resolves_paths_against_config_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[native]\ndir = \"core\"\n").unwrap();

        let cfg = BridgeflowConfig::load(&path, true).expect("config should load");
        assert_eq!(cfg.root, dir.path());
        assert_eq!(cfg.native_dir(), dir.path().join("core"));
    }

    #[test]
    fn missing_default_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let cfg = BridgeflowConfig::load(&path, false).expect("defaults expected");
        assert_eq!(cfg.app.program, "flutter");
        assert_eq!(cfg.native_dir(), dir.path().join("rust"));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");

        let err = BridgeflowConfig::load(&path, true).expect_err("must fail");
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[app\nprogram = ").unwrap();

        let err = BridgeflowConfig::load(&path, false).expect_err("must fail");
        assert!(err.to_string().contains("failed to parse TOML config"));
    }

    #[test]
    fn project_name_defaults_to_root_directory_name() {
        let cfg = BridgeflowConfig {
            root: PathBuf::from("/work/motek_ui"),
            ..BridgeflowConfig::default()
        };
        assert_eq!(cfg.project_name(), "motek_ui");

        let rootless = BridgeflowConfig {
            root: PathBuf::from("/"),
            ..BridgeflowConfig::default()
        };
        assert_eq!(rootless.project_name(), FALLBACK_PROJECT_NAME);
    }

    #[test]
    fn bare_filename_resolves_to_current_directory() {
        let root = config_root_dir(Path::new(CONFIG_FILE));
        assert_eq!(root, std::env::current_dir().unwrap());
    }
}
