//! Node.js bindings: a Node-backed host exposed across the napi boundary.
//! One `#[napi]` free function, JSON in and JSON out, rather than exposing
//! a richer object graph across the FFI boundary.
//!
//! The native addon runs inside the Node process on the same machine as the
//! project being compiled, so it reaches the filesystem directly through
//! [`cadl_compiler_cli::fs_host::FsHost`] rather than round-tripping every
//! `read_file` back into JavaScript. Decorator implementations are still
//! supplied the way [`cadl_compiler_cli::host::Host::get_external_module_exports`]
//! documents: a caller-assembled registry, not a live call into a JS
//! evaluator embedded in this process (there isn't one).
#![deny(clippy::all)]

use napi::{Error, Result, Status};
use napi_derive::napi;

use cadl_compiler_cli::fs_host::FsHost;
use cadl_compiler_cli::logging::{ConsoleLogger, LogLevel};
use cadl_compiler_cli::options::{CompilerOptionsBuilder, DiagnosticLevel};
use cadl_compiler_cli::program::{load_program, LoadError};

/// Mirrors `CompilerOptions`' wire-relevant fields, shaped for a plain JSON
/// object coming from the JS side rather than the builder-chain the `cadlc`
/// binary uses.
#[napi(object)]
#[derive(Debug, Clone, Default)]
pub struct CompileOptionsJs {
    pub emit: Option<Vec<String>>,
    pub output_dir: Option<String>,
    pub no_emit: Option<bool>,
    pub no_std_lib: Option<bool>,
    pub errors_only: Option<bool>,
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct CompileResultJs {
    pub success: bool,
    /// JSON-encoded `Vec<cadl_compiler::diagnostics::Diagnostic>`; kept as a
    /// string rather than a napi object graph since `Diagnostic` already
    /// derives `Serialize` and the JS side wants it as plain data anyway.
    pub diagnostics_json: String,
}

fn build_options(js: Option<CompileOptionsJs>) -> cadl_compiler_cli::options::CompilerOptions {
    let js = js.unwrap_or_default();
    let mut builder = CompilerOptionsBuilder::new();
    for spec in js.emit.unwrap_or_default() {
        builder = builder.emit(&spec);
    }
    if let Some(dir) = js.output_dir {
        builder = builder.output_dir(dir);
    }
    builder = builder.no_emit(js.no_emit.unwrap_or(false));
    builder = builder.no_std_lib(js.no_std_lib.unwrap_or(false));
    if js.errors_only.unwrap_or(false) {
        builder = builder.diagnostic_level(DiagnosticLevel::ErrorsOnly);
    }
    builder.build()
}

/// Loads and checks a CADL program rooted at `entry_path`, returning every
/// diagnostic produced. Running emitters registered by `options.emit` is
/// intentionally out of scope here:
/// an emitter is a native Rust crate the embedder links in, not something
/// this generic binding can discover from a package name alone.
#[napi]
pub fn compile(entry_path: String, options: Option<CompileOptionsJs>) -> Result<CompileResultJs> {
    let logger = ConsoleLogger::new(LogLevel::Warn);
    let host = FsHost::new(logger, Vec::new());
    let compiler_options = build_options(options);

    match load_program(&host, &entry_path, compiler_options) {
        Ok(program) => {
            let diagnostics: Vec<_> = program.diagnostics().cloned().collect();
            let success = !program.has_error();
            let diagnostics_json = serde_json::to_string(&diagnostics)
                .map_err(|e| Error::new(Status::GenericFailure, format!("failed to encode diagnostics: {e}")))?;
            Ok(CompileResultJs { success, diagnostics_json })
        }
        Err(LoadError::Fatal(diagnostics)) => {
            let diagnostics_json = serde_json::to_string(&diagnostics)
                .map_err(|e| Error::new(Status::GenericFailure, format!("failed to encode diagnostics: {e}")))?;
            Ok(CompileResultJs { success: false, diagnostics_json })
        }
    }
}

/// The running compiler's version, exposed so a JS wrapper can print it
/// without spawning the `cadlc` binary.
#[napi]
pub fn version() -> String {
    cadl_compiler_cli::version::VERSION.to_string()
}
