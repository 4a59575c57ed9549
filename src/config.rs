//! Layered configuration: defaults, `.bombe/config.toml`, then environment
//! variables prefixed `BOMBE_` (double underscore separates nesting levels,
//! e.g. `BOMBE_INDEXING__PARALLEL_THREADS=8` sets `indexing.parallel_threads`).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub languages: HashMap<String, LanguageConfig>,

    #[serde(default)]
    pub mcp: McpConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub default: String,

    #[serde(default)]
    pub modules: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    #[serde(default = "default_true")]
    pub include_tests: bool,

    #[serde(default = "default_false")]
    pub include_docs: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LanguageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub extensions: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct McpConfig {
    #[serde(default = "default_mcp_port")]
    pub port: u16,

    #[serde(default = "default_max_context_size")]
    pub max_context_tokens: usize,

    #[serde(default = "default_false")]
    pub debug: bool,
}

/// Hmac is the default signing algorithm for sync artifacts; Ed25519 is
/// opt-in and requires `trusted_verification_keys` to be populated.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SigningAlgo {
    Hmac,
    Ed25519,
}

impl Default for SigningAlgo {
    fn default() -> Self {
        Self::Hmac
    }
}

/// Every env-var-shaped tunable the original indexing/query/sync code read
/// ad hoc at call sites, gathered into one struct passed by reference.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct RuntimeConfig {
    #[serde(default = "default_true")]
    pub hybrid_search_enabled: bool,

    #[serde(default = "default_false")]
    pub semantic_vectors_enabled: bool,

    #[serde(default = "default_false")]
    pub lsp_hints_enabled: bool,

    #[serde(default = "default_true")]
    pub exclude_sensitive_files: bool,

    #[serde(default = "default_false")]
    pub require_tree_sitter: bool,

    #[serde(default = "default_tokenizer_model")]
    pub tokenizer_model: String,

    #[serde(default)]
    pub sync_signing_key: Option<String>,

    #[serde(default)]
    pub sync_signing_algo: SigningAlgo,

    #[serde(default)]
    pub sync_signing_key_id: Option<String>,

    #[serde(default)]
    pub trusted_verification_keys: HashMap<String, String>,

    #[serde(default)]
    pub semantic_hints_global_file: Option<PathBuf>,

    #[serde(default)]
    pub control_plane_token: Option<String>,

    #[serde(default)]
    pub real_repo_paths: Vec<PathBuf>,

    #[serde(default)]
    pub perf_history_path: Option<PathBuf>,
}

fn default_version() -> u32 {
    1
}
fn default_db_path() -> PathBuf {
    PathBuf::from(".bombe/graph.db")
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_mcp_port() -> u16 {
    7777
}
fn default_max_context_size() -> usize {
    32_000
}
fn default_tokenizer_model() -> String {
    "cl100k_base".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            db_path: default_db_path(),
            indexing: IndexingConfig::default(),
            languages: default_languages(),
            mcp: McpConfig::default(),
            runtime: RuntimeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
            ignore_patterns: vec![
                "node_modules/**".to_string(),
                ".git/**".to_string(),
                "dist/**".to_string(),
                "build/**".to_string(),
                "*.generated.*".to_string(),
            ],
            include_tests: true,
            include_docs: true,
        }
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            port: default_mcp_port(),
            max_context_tokens: default_max_context_size(),
            debug: false,
        }
    }
}

fn default_languages() -> HashMap<String, LanguageConfig> {
    let mut langs = HashMap::new();
    langs.insert(
        "python".to_string(),
        LanguageConfig {
            enabled: true,
            extensions: vec!["py".to_string(), "pyi".to_string()],
        },
    );
    langs.insert(
        "java".to_string(),
        LanguageConfig {
            enabled: true,
            extensions: vec!["java".to_string()],
        },
    );
    langs.insert(
        "typescript".to_string(),
        LanguageConfig {
            enabled: true,
            extensions: vec!["ts".to_string(), "tsx".to_string()],
        },
    );
    langs.insert(
        "go".to_string(),
        LanguageConfig {
            enabled: true,
            extensions: vec!["go".to_string()],
        },
    );
    langs
}

impl Settings {
    pub fn load() -> Result<Self, figment::Error> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(".bombe/config.toml"));

        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("BOMBE_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
    }

    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(".bombe");
            if config_dir.is_dir() {
                return Some(config_dir.join("config.toml"));
            }
        }
        None
    }

    pub fn check_init() -> Result<(), String> {
        let config_path = match Self::find_workspace_config() {
            Some(path) => path,
            None => {
                let current_config = PathBuf::from(".bombe/config.toml");
                if !current_config.parent().unwrap().exists() {
                    return Err(
                        "No .bombe directory found in current directory or any parent.\nRun 'bombe init' to initialize this workspace."
                            .to_string(),
                    );
                }
                current_config
            }
        };

        if !config_path.exists() {
            return Err(
                "No config.toml found in .bombe directory.\nRun 'bombe init' to create one."
                    .to_string(),
            );
        }

        match std::fs::read_to_string(&config_path) {
            Ok(content) => {
                if let Err(e) = toml::from_str::<Settings>(&content) {
                    return Err(format!(
                        "Configuration file is corrupted: {e}\nRun 'bombe init --force' to regenerate."
                    ));
                }
            }
            Err(e) => return Err(format!("Cannot read configuration file: {e}")),
        }

        Ok(())
    }

    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(".bombe");
            if config_dir.is_dir() {
                return Some(ancestor.to_path_buf());
            }
        }
        None
    }

    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("BOMBE_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(".bombe/config.toml");
        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }
        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_have_four_languages() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert!(settings.indexing.parallel_threads > 0);
        for lang in ["python", "java", "typescript", "go"] {
            assert!(settings.languages.contains_key(lang));
        }
    }

    #[test]
    fn load_from_toml_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
version = 2

[indexing]
parallel_threads = 4
include_tests = false

[mcp]
port = 8888
debug = true

[runtime]
hybrid_search_enabled = false
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.indexing.parallel_threads, 4);
        assert!(!settings.indexing.include_tests);
        assert_eq!(settings.mcp.port, 8888);
        assert!(settings.mcp.debug);
        assert!(!settings.runtime.hybrid_search_enabled);
    }

    #[test]
    fn layered_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let config_dir = temp_dir.path().join(".bombe");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join("config.toml"),
            "[indexing]\nparallel_threads = 8\n",
        )
        .unwrap();

        unsafe {
            std::env::set_var("BOMBE_INDEXING__PARALLEL_THREADS", "16");
        }

        let settings = Settings::load().unwrap();
        assert_eq!(settings.indexing.parallel_threads, 16);

        unsafe {
            std::env::remove_var("BOMBE_INDEXING__PARALLEL_THREADS");
        }
        std::env::set_current_dir(original_dir).unwrap();
    }
}
