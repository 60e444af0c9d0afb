//! Server configuration.
//!
//! Values come from, in increasing precedence: built-in defaults, a YAML
//! config file, command line flags. The graph optimization toggle in the
//! environment is applied last.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".speakerid";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable that disables ONNX Runtime graph optimizations.
pub const DISABLE_GRAPH_OPT_ENV: &str = "SPEAKERID_DISABLE_GRAPH_OPT";

/// Server and model configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen address; a leading `:` binds all interfaces.
    pub addr: String,
    /// ONNX export of the trained classifier.
    pub model_path: PathBuf,
    /// JSON label mapping produced alongside the classifier.
    pub labels_path: PathBuf,
    /// Directory uploads are written to. Created at startup.
    pub upload_dir: PathBuf,
    /// Keep uploaded files after prediction.
    pub keep_uploads: bool,
    /// Maximum accepted request body in bytes.
    pub max_upload_bytes: usize,
    /// Model input name (default: first input).
    pub input_name: Option<String>,
    /// Model output name (default: first output).
    pub output_name: Option<String>,
    /// Enable ONNX Runtime graph optimizations.
    pub graph_optimization: bool,
    /// Intra-op threads for inference, 0 = runtime default.
    pub intra_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: ":5000".to_string(),
            model_path: PathBuf::from("speaker_cnn_model.onnx"),
            labels_path: PathBuf::from("label_encoder.json"),
            upload_dir: PathBuf::from("uploads"),
            keep_uploads: true,
            max_upload_bytes: 32 * 1024 * 1024,
            input_name: None,
            output_name: None,
            graph_optimization: true,
            intra_threads: 0,
        }
    }
}

impl Config {
    /// Gets the default config file path (~/.speakerid/config.yaml).
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(DEFAULT_CONFIG_FILE))
    }

    /// Loads configuration.
    ///
    /// An explicit `path` must exist. Without one, the default config file
    /// is used if present, otherwise built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => match Self::default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parses a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_yaml(&data).with_context(|| format!("parse config {}", path.display()))
    }

    /// Parses YAML config text. Missing fields take their defaults.
    pub fn from_yaml(data: &str) -> Result<Self> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    /// Applies the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup(DISABLE_GRAPH_OPT_ENV) {
            if is_truthy(&v) {
                self.graph_optimization = false;
            }
        }
    }
}

fn is_truthy(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parses an address string to SocketAddr.
///
/// `:5000` is shorthand for `0.0.0.0:5000`.
pub fn parse_addr(addr: &str) -> Result<SocketAddr> {
    let addr = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };
    addr.parse::<SocketAddr>()
        .with_context(|| format!("invalid listen address {addr:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.addr, ":5000");
        assert_eq!(cfg.model_path, PathBuf::from("speaker_cnn_model.onnx"));
        assert_eq!(cfg.labels_path, PathBuf::from("label_encoder.json"));
        assert_eq!(cfg.upload_dir, PathBuf::from("uploads"));
        assert!(cfg.graph_optimization);
        assert!(cfg.keep_uploads);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = Config::from_yaml(
            "addr: \"127.0.0.1:8080\"\nmodel_path: /models/cnn.onnx\noutput_name: dense_1\n",
        )
        .unwrap();
        assert_eq!(cfg.addr, "127.0.0.1:8080");
        assert_eq!(cfg.model_path, PathBuf::from("/models/cnn.onnx"));
        assert_eq!(cfg.output_name.as_deref(), Some("dense_1"));
        assert_eq!(cfg.labels_path, PathBuf::from("label_encoder.json"));
        assert_eq!(cfg.max_upload_bytes, 32 * 1024 * 1024);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn invalid_yaml_is_error() {
        assert!(Config::from_yaml("addr: [unterminated").is_err());
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "upload_dir: /tmp/spk\nkeep_uploads: false\n").unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.upload_dir, PathBuf::from("/tmp/spk"));
        assert!(!cfg.keep_uploads);

        assert!(Config::load(Some(&dir.path().join("missing.yaml"))).is_err());
    }

    #[test]
    fn env_disables_graph_optimization() {
        for v in ["1", "true", "YES", " on "] {
            let mut cfg = Config::default();
            cfg.apply_env_from(|k| (k == DISABLE_GRAPH_OPT_ENV).then(|| v.to_string()));
            assert!(!cfg.graph_optimization, "{v:?} should disable");
        }

        let mut cfg = Config::default();
        cfg.apply_env_from(|_| Some("0".to_string()));
        assert!(cfg.graph_optimization);

        let mut cfg = Config::default();
        cfg.apply_env_from(|_| None);
        assert!(cfg.graph_optimization);
    }

    #[test]
    fn parse_addr_shorthand() {
        assert_eq!(
            parse_addr(":5000").unwrap(),
            "0.0.0.0:5000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_addr("127.0.0.1:8080").unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_addr("not an addr").is_err());
    }
}
