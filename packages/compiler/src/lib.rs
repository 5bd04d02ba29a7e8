//! CADL compiler front end: scanner, parser, binder, and checker.
//!
//! This crate has no knowledge of file systems, module loaders, or emitters
//! — it consumes already-read source text and a caller-supplied file graph
//! and produces a checked program plus diagnostics.
//! [`compiler_cli`](../cadl_compiler_cli/index.html) builds the file graph
//! and owns the `Host` abstraction on top of this crate.

pub mod binder;
pub mod chars;
pub mod checker;
pub mod diagnostics;
pub mod parser;
pub mod scanner;
pub mod state;
pub mod symbols;
pub mod tree;
pub mod types;

pub use diagnostics::{Diagnostic, DiagnosticCode, Severity};
