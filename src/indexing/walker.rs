//! Repository file discovery: merges `.gitignore`, a repo-local
//! `.bombeignore`, the config's `ignore_patterns`, and a built-in
//! sensitive-file denylist, then classifies surviving files by language.

use crate::config::Settings;
use crate::types::Language;
use ignore::WalkBuilder;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub struct DiscoveredFile {
    pub path: PathBuf,
    pub relative_path: String,
    pub language: Language,
}

const SENSITIVE_PATTERNS: &[&str] = &[
    ".env",
    ".env.*",
    "*.pem",
    "*.key",
    "id_rsa",
    "id_ed25519",
    "*.pfx",
    "secrets.*",
];

pub fn discover_files(repo_root: &Path, settings: &Settings) -> Vec<DiscoveredFile> {
    let mut builder = WalkBuilder::new(repo_root);
    builder
        .hidden(false)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .add_custom_ignore_filename(".bombeignore");

    let mut overrides = ignore::overrides::OverrideBuilder::new(repo_root);
    for pattern in &settings.indexing.ignore_patterns {
        let _ = overrides.add(&format!("!{pattern}"));
    }
    if settings.runtime.exclude_sensitive_files {
        for pattern in SENSITIVE_PATTERNS {
            let _ = overrides.add(&format!("!{pattern}"));
        }
    }
    if let Ok(built) = overrides.build() {
        builder.overrides(built);
    }

    let enabled_extensions = enabled_extensions(settings);

    let mut files = Vec::new();
    for entry in builder.build().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let Some(language) = enabled_extensions.get(ext).copied() else {
            continue;
        };
        let relative_path = path
            .strip_prefix(repo_root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        files.push(DiscoveredFile {
            path: path.to_path_buf(),
            relative_path,
            language,
        });
    }
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    files
}

fn enabled_extensions(settings: &Settings) -> std::collections::HashMap<String, Language> {
    let mut map = std::collections::HashMap::new();
    for (name, lang_cfg) in &settings.languages {
        if !lang_cfg.enabled {
            continue;
        }
        let Some(language) = (match name.as_str() {
            "python" => Some(Language::Python),
            "java" => Some(Language::Java),
            "typescript" => Some(Language::TypeScript),
            "go" => Some(Language::Go),
            _ => None,
        }) else {
            continue;
        };
        for ext in &lang_cfg.extensions {
            map.insert(ext.clone(), language);
        }
    }
    map
}

pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use tempfile::TempDir;

    #[test]
    fn discovers_python_and_skips_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.py"), "x = 1").unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        std::fs::write(dir.path().join("node_modules/b.py"), "y = 1").unwrap();

        let settings = Settings::default();
        let files = discover_files(dir.path(), &settings);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path, "a.py");
    }
}
