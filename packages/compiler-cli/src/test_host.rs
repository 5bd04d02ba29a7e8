//! An in-memory [`Host`] for tests: a path->text map, since [`Host`] is a
//! single flat contract rather than a layered path-manipulation/
//! read-only-filesystem/filesystem split.

use std::collections::HashMap;
use std::sync::Mutex;

use cadl_compiler::checker::DecoratorFn;
use std::sync::Arc;

use crate::host::{ExternalExport, FileContents, Host, HostError, HostResult, Stat};
use crate::logging::LogLevel;

#[derive(Default)]
pub struct MemoryHost {
    files: Mutex<HashMap<String, String>>,
    external_modules: Mutex<HashMap<String, HashMap<String, ExternalExport>>>,
    lib_dirs: Mutex<Vec<String>>,
    written: Mutex<HashMap<String, Vec<u8>>>,
    logged: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the host with a CADL or arbitrary text file at an absolute path.
    pub fn add_file(&self, path: impl Into<String>, text: impl Into<String>) -> &Self {
        self.files.lock().unwrap().insert(path.into(), text.into());
        self
    }

    /// Seeds the host with an external module's reflected exports, keyed by
    /// the same absolute path a `read_file`/`stat` call would use.
    pub fn add_external_module(&self, path: impl Into<String>, exports: HashMap<String, ExternalExport>) -> &Self {
        self.external_modules.lock().unwrap().insert(path.into(), exports);
        self
    }

    pub fn add_lib_dir(&self, dir: impl Into<String>) -> &Self {
        self.lib_dirs.lock().unwrap().push(dir.into());
        self
    }

    pub fn written_file(&self, path: &str) -> Option<Vec<u8>> {
        self.written.lock().unwrap().get(path).cloned()
    }

    pub fn logs(&self) -> Vec<(LogLevel, String)> {
        self.logged.lock().unwrap().clone()
    }

    fn is_directory(&self, path: &str) -> bool {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let files = self.files.lock().unwrap();
        let externals = self.external_modules.lock().unwrap();
        files.keys().any(|p| p.starts_with(&prefix)) || externals.keys().any(|p| p.starts_with(&prefix))
    }
}

impl Host for MemoryHost {
    fn read_file(&self, path: &str) -> HostResult<FileContents> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|text| FileContents { path: path.to_string(), text: text.clone() })
            .ok_or_else(|| HostError::FileNotFound(path.to_string()))
    }

    fn stat(&self, path: &str) -> HostResult<Stat> {
        if self.files.lock().unwrap().contains_key(path) || self.external_modules.lock().unwrap().contains_key(path)
        {
            return Ok(Stat { is_file: true, is_directory: false });
        }
        if self.is_directory(path) {
            return Ok(Stat { is_file: false, is_directory: true });
        }
        Err(HostError::FileNotFound(path.to_string()))
    }

    fn realpath(&self, path: &str) -> HostResult<String> {
        Ok(path.to_string())
    }

    fn get_external_module_exports(&self, path: &str) -> HostResult<HashMap<String, ExternalExport>> {
        self.external_modules
            .lock()
            .unwrap()
            .get(path)
            .map(|exports| {
                exports
                    .iter()
                    .map(|(k, v)| {
                        let cloned = match v {
                            ExternalExport::Function(f) => ExternalExport::Function(f.clone()),
                            ExternalExport::Hook(f) => ExternalExport::Hook(f.clone()),
                            ExternalExport::Namespace(n) => ExternalExport::Namespace(n.clone()),
                            ExternalExport::Other => ExternalExport::Other,
                        };
                        (k.clone(), cloned)
                    })
                    .collect()
            })
            .ok_or_else(|| HostError::FileNotFound(path.to_string()))
    }

    fn get_lib_dirs(&self) -> Vec<String> {
        self.lib_dirs.lock().unwrap().clone()
    }

    fn write_file(&self, path: &str, content: &[u8]) -> HostResult<()> {
        self.written.lock().unwrap().insert(path.to_string(), content.to_vec());
        Ok(())
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.logged.lock().unwrap().push((level, message.to_string()));
    }

    fn resolve_absolute_path(&self, path: &str) -> String {
        path.to_string()
    }
}

/// Convenience for tests registering a single decorator export on a module,
/// the common case.
pub fn single_decorator_export(name: &str, func: Arc<DecoratorFn>) -> HashMap<String, ExternalExport> {
    let mut map = HashMap::new();
    map.insert(name.to_string(), ExternalExport::Function(func));
    map
}

/// Convenience for tests registering a `$onValidate`/`$onEmit` hook export.
pub fn single_hook_export(name: &str, hook: Arc<crate::program::ProgramCallback>) -> HashMap<String, ExternalExport> {
    let mut map = HashMap::new();
    map.insert(name.to_string(), ExternalExport::Hook(hook));
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_file_returns_seeded_text() {
        let host = MemoryHost::new();
        host.add_file("/a.cadl", "model A {}");
        let contents = host.read_file("/a.cadl").unwrap();
        assert_eq!(contents.text, "model A {}");
    }

    #[test]
    fn stat_reports_directories_by_prefix() {
        let host = MemoryHost::new();
        host.add_file("/lib/main.cadl", "");
        assert!(host.is_dir("/lib"));
        assert!(host.is_file("/lib/main.cadl"));
        assert!(!host.is_file("/missing.cadl"));
    }

    #[test]
    fn write_file_is_observable() {
        let host = MemoryHost::new();
        host.write_file("/out/a.json", b"{}").unwrap();
        assert_eq!(host.written_file("/out/a.json"), Some(b"{}".to_vec()));
    }
}
