//! Import specifier resolution, following node-style path-joining
//! conventions over the `Host` trait's `stat`/`is_dir`/`is_file`/`realpath`
//! primitives since there is no real filesystem underneath.
//!
//! A specifier is one of:
//! - relative (`./foo`, `../foo`) or absolute (starts with `/`): resolved
//!   directly against the importing file's directory.
//! - a directory: resolved through its package descriptor's entry point.
//! - a bare specifier (`my-lib`, `my-lib/sub`): looked up node-style, walking
//!   `node_modules` directories from the importing file's directory upward.
//!
//! Any resolved path that names a directory is re-resolved through its
//! package descriptor, so a bare specifier and a relative directory import
//! share the same "substitute the package's CADL entry point" step.

use crate::host::{Host, HostResult};
use crate::package::PackageDescriptor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedKind {
    /// A `.cadl` source file, to be scanned/parsed/bound by the loader.
    CadlFile,
    /// A `.js`/`.mjs` external module, to be reflected via
    /// [`Host::get_external_module_exports`].
    ExternalModule,
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub path: String,
    pub kind: ResolvedKind,
}

#[derive(Debug, Clone)]
pub enum ResolveError {
    NotFound { specifier: String, from: String },
    Host(crate::host::HostError),
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::NotFound { specifier, from } => {
                write!(f, "couldn't resolve import '{specifier}' from '{from}'")
            }
            ResolveError::Host(e) => write!(f, "{e}"),
        }
    }
}

impl From<crate::host::HostError> for ResolveError {
    fn from(e: crate::host::HostError) -> Self {
        ResolveError::Host(e)
    }
}

fn is_relative_or_absolute(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/') || specifier == "."
    || specifier == ".."
}

fn join(dir: &str, rest: &str) -> String {
    if rest.is_empty() {
        return dir.to_string();
    }
    if dir.is_empty() || dir == "." {
        return rest.to_string();
    }
    let mut segments: Vec<&str> = Vec::new();
    for seg in dir.split('/').chain(rest.split('/')) {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if dir.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

fn dir_name(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => path[..idx].to_string(),
        None => String::new(),
    }
}

fn classify(path: &str) -> ResolvedKind {
    if path.ends_with(".js") || path.ends_with(".mjs") {
        ResolvedKind::ExternalModule
    } else {
        ResolvedKind::CadlFile
    }
}

/// Resolves `path` to a concrete file, substituting a directory's package
/// descriptor for its entry point.
fn resolve_path(host: &dyn Host, path: &str) -> HostResult<Resolved> {
    if host.is_dir(path) {
        let descriptor_path = join(path, "package.json");
        let entry = if host.is_file(&descriptor_path) {
            PackageDescriptor::load(host, &descriptor_path)?.entry_point().map(str::to_string)
        } else {
            None
        };
        let entry = entry.unwrap_or_else(|| "main.cadl".to_string());
        return resolve_path(host, &join(path, &entry));
    }
    if host.is_file(path) {
        return Ok(Resolved { path: host.resolve_absolute_path(path), kind: classify(path) });
    }
    if !path.ends_with(".cadl") {
        let with_ext = format!("{path}.cadl");
        if host.is_file(&with_ext) {
            return Ok(Resolved { path: host.resolve_absolute_path(&with_ext), kind: ResolvedKind::CadlFile });
        }
    }
    Err(crate::host::HostError::FileNotFound(path.to_string()))
}

/// Node-style bare-specifier lookup: walk `node_modules` directories from
/// `from_dir` upward.
fn resolve_bare(host: &dyn Host, specifier: &str, from_dir: &str) -> HostResult<Resolved> {
    let mut dir = from_dir.to_string();
    loop {
        let candidate = join(&dir, &format!("node_modules/{specifier}"));
        if host.is_dir(&candidate) || host.is_file(&candidate) || host.is_file(&format!("{candidate}.cadl")) {
            return resolve_path(host, &candidate);
        }
        let parent = dir_name(&dir);
        if parent == dir || parent.is_empty() {
            break;
        }
        dir = parent;
    }
    Err(crate::host::HostError::FileNotFound(specifier.to_string()))
}

/// Resolves one `import` specifier relative to the file that contains it.
pub fn resolve_import(host: &dyn Host, specifier: &str, importing_file: &str) -> Result<Resolved, ResolveError> {
    let from_dir = dir_name(importing_file);
    if is_relative_or_absolute(specifier) {
        let candidate = if specifier.starts_with('/') { specifier.to_string() } else { join(&from_dir, specifier) };
        return resolve_path(host, &candidate).map_err(|_| ResolveError::NotFound {
            specifier: specifier.to_string(),
            from: importing_file.to_string(),
        });
    }
    resolve_bare(host, specifier, &from_dir).map_err(|_| ResolveError::NotFound {
        specifier: specifier.to_string(),
        from: importing_file.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_specifier_is_detected() {
        assert!(is_relative_or_absolute("./a"));
        assert!(is_relative_or_absolute("../a"));
        assert!(is_relative_or_absolute("/a"));
        assert!(!is_relative_or_absolute("a"));
    }

    #[test]
    fn join_normalizes_dot_dot_segments() {
        assert_eq!(join("/a/b", "../c"), "/a/c");
        assert_eq!(join("/a/b", "./c"), "/a/b/c");
    }

    #[test]
    fn dir_name_strips_last_segment() {
        assert_eq!(dir_name("/a/b/c.cadl"), "/a/b");
        assert_eq!(dir_name("c.cadl"), "");
    }
}
