//! The `Host` contract: everything the core has no opinion on -- file I/O,
//! module resolution primitives, and reflection of external (`.js`/`.mjs`)
//! decorator modules. Collapsed into one flat trait rather than a layered
//! path-manipulation/read-only-filesystem/filesystem split.
//!
//! This is synchronous: a blocking `Host` is observably equivalent for
//! every implementation this repo ships (the in-memory test host, and a
//! Node-backed host across the napi boundary), and it keeps the core free
//! of an async runtime dependency.

use std::collections::HashMap;
use std::sync::Arc;

use cadl_compiler::checker::DecoratorFn;
use thiserror::Error;

use crate::logging::LogLevel;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{0}' is not a directory")]
    NotADirectory(String),
}

/// The bytes behind one path, as handed back by [`Host::read_file`].
pub struct FileContents {
    pub path: String,
    pub text: String,
}

/// Mirrors Node's `fs.Stats` just enough for the loader's directory/package
/// resolution.
#[derive(Debug, Clone, Copy)]
pub struct Stat {
    pub is_file: bool,
    pub is_directory: bool,
}

/// One export of an external (`.js`/`.mjs`) module, as reflected by the
/// Host. The core treats these as opaque; only the loader inspects the
/// `$`-prefixed naming convention and the `namespace` export.
///
/// There is no JS runtime in this workspace -- the emitter plugin loader
/// that imports JavaScript decorator modules is an external collaborator.
/// A `Host` implementation is expected to have already evaluated the
/// module on its own side and handed back native Rust closures for its
/// `$`-prefixed exports.
pub enum ExternalExport {
    /// A `$`-prefixed decorator export, called once per declaration it's
    /// applied to.
    Function(Arc<DecoratorFn>),
    /// `$onValidate`/`$onEmit`: a program-level hook, called once against
    /// the completed program rather than per-declaration, lifted out as a
    /// callback rather than a decorator.
    Hook(Arc<crate::program::ProgramCallback>),
    /// The module's top-level `namespace` export (a dotted string).
    Namespace(String),
    /// Anything else a module exports that isn't meaningful to the core.
    Other,
}

pub type HostResult<T> = Result<T, HostError>;

/// Everything the core is driven by but never touches directly. One `Host`
/// implementation backs one compilation.
pub trait Host {
    fn read_file(&self, path: &str) -> HostResult<FileContents>;
    fn stat(&self, path: &str) -> HostResult<Stat>;
    fn realpath(&self, path: &str) -> HostResult<String>;
    fn get_external_module_exports(&self, path: &str) -> HostResult<HashMap<String, ExternalExport>>;
    fn get_lib_dirs(&self) -> Vec<String>;
    fn write_file(&self, path: &str, content: &[u8]) -> HostResult<()>;
    fn log(&self, level: LogLevel, message: &str);
    fn resolve_absolute_path(&self, path: &str) -> String;

    fn is_file(&self, path: &str) -> bool {
        self.stat(path).map(|s| s.is_file).unwrap_or(false)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.stat(path).map(|s| s.is_directory).unwrap_or(false)
    }
}
