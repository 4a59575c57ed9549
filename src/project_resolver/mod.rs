//! Repository-level import target resolution: mapping a parsed import's
//! module name to a file already known to the index, per the conventions of
//! each supported language's module system.

use crate::types::Language;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Module path declared by a `go.mod` file's `module` directive, used to
/// turn an absolute Go import path into a repo-relative file prefix.
pub struct GoModule {
    pub path: String,
}

impl GoModule {
    pub fn read(repo_root: &Path) -> Option<Self> {
        let go_mod = repo_root.join("go.mod");
        let content = std::fs::read_to_string(go_mod).ok()?;
        for line in content.lines() {
            let stripped = line.trim();
            if let Some(rest) = stripped.strip_prefix("module ") {
                return Some(Self {
                    path: rest.trim().to_string(),
                });
            }
        }
        None
    }
}

pub fn resolve_python(module_name: &str, known_files: &HashSet<String>) -> Option<String> {
    if module_name.is_empty() {
        return None;
    }
    let base = module_name.replace('.', "/");
    for candidate in [format!("{base}.py"), format!("{base}/__init__.py")] {
        if known_files.contains(&candidate) {
            return Some(candidate);
        }
    }
    None
}

pub fn resolve_java(module_name: &str, known_files: &HashSet<String>) -> Option<String> {
    let candidate = format!("{}.java", module_name.replace('.', "/"));
    known_files.contains(&candidate).then_some(candidate)
}

pub fn resolve_typescript(
    source_path: &str,
    module_name: &str,
    known_files: &HashSet<String>,
) -> Option<String> {
    if !module_name.starts_with('.') {
        return None;
    }
    let source_dir = Path::new(source_path).parent().unwrap_or_else(|| Path::new(""));
    let mut resolved_base = normalize_posix(&source_dir.join(module_name));
    if let Some(stripped) = resolved_base.strip_prefix("./") {
        resolved_base = stripped.to_string();
    }
    for candidate in [
        resolved_base.clone(),
        format!("{resolved_base}.ts"),
        format!("{resolved_base}.tsx"),
        format!("{resolved_base}/index.ts"),
        format!("{resolved_base}/index.tsx"),
    ] {
        let normalized = normalize_posix(Path::new(&candidate));
        if known_files.contains(&normalized) {
            return Some(normalized);
        }
    }
    None
}

pub fn resolve_go(root_module: &GoModule, module_name: &str, known_files: &HashSet<String>) -> Option<String> {
    if !module_name.starts_with(root_module.path.as_str()) {
        return None;
    }
    let rel_pkg = module_name[root_module.path.len()..].trim_start_matches('/');
    let prefix = if rel_pkg.is_empty() {
        String::new()
    } else {
        format!("{rel_pkg}/")
    };
    let mut candidates: Vec<&String> = known_files
        .iter()
        .filter(|path| path.starts_with(&prefix) && path.ends_with(".go"))
        .collect();
    candidates.sort();
    candidates.first().map(|s| s.to_string())
}

fn normalize_posix(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::Normal(s) => parts.push(s.to_string_lossy().into_owned()),
            std::path::Component::ParentDir => {
                parts.pop();
            }
            _ => {}
        }
    }
    parts.join("/")
}

/// Resolves one import record's module name against the known file set,
/// dispatching by the source file's language.
pub fn resolve_module(
    repo_root: &Path,
    language: Language,
    source_path: &str,
    module_name: &str,
    known_files: &HashSet<String>,
    go_module: Option<&GoModule>,
) -> Option<String> {
    match language {
        Language::Python => resolve_python(module_name, known_files),
        Language::Java => resolve_java(module_name, known_files),
        Language::TypeScript => resolve_typescript(source_path, module_name, known_files),
        Language::Go => {
            let module = go_module
                .map(|m| m.path.clone())
                .or_else(|| GoModule::read(repo_root).map(|m| m.path))?;
            resolve_go(&GoModule { path: module }, module_name, known_files)
        }
    }
}

pub fn workspace_root_from(path: &Path) -> PathBuf {
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_module_resolves_to_package_init() {
        let mut files = HashSet::new();
        files.insert("pkg/sub/__init__.py".to_string());
        assert_eq!(
            resolve_python("pkg.sub", &files),
            Some("pkg/sub/__init__.py".to_string())
        );
    }

    #[test]
    fn typescript_relative_import_resolves() {
        let mut files = HashSet::new();
        files.insert("src/utils.ts".to_string());
        assert_eq!(
            resolve_typescript("src/main.ts", "./utils", &files),
            Some("src/utils.ts".to_string())
        );
    }
}
