//! `CompilerOptions`: the in-core type the CLI populates from flags, and
//! that an external configuration loader could populate from a file. A
//! plain struct plus a builder, rather than threading a dozen constructor
//! arguments through the loader.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    /// Only emit diagnostics of severity "error".
    ErrorsOnly,
    /// Emit both warnings and errors (the default).
    All,
}

impl Default for DiagnosticLevel {
    fn default() -> Self {
        DiagnosticLevel::All
    }
}

/// One `<package>[:<name>]` emitter spec, from the CLI surface
/// `--emit=<pkg>[:<name>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitterSpec {
    pub package: String,
    pub name: Option<String>,
}

impl EmitterSpec {
    pub fn parse(spec: &str) -> Self {
        match spec.split_once(':') {
            Some((package, name)) => EmitterSpec { package: package.to_string(), name: Some(name.to_string()) },
            None => EmitterSpec { package: spec.to_string(), name: None },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompilerOptions {
    pub emitters: Vec<EmitterSpec>,
    pub output_dir: Option<String>,
    pub no_emit: bool,
    pub no_std_lib: bool,
    pub diagnostic_level: DiagnosticLevel,
    pub misc: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct CompilerOptionsBuilder {
    options: CompilerOptions,
}

impl CompilerOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(mut self, spec: &str) -> Self {
        self.options.emitters.push(EmitterSpec::parse(spec));
        self
    }

    pub fn output_dir(mut self, dir: impl Into<String>) -> Self {
        self.options.output_dir = Some(dir.into());
        self
    }

    pub fn no_emit(mut self, value: bool) -> Self {
        self.options.no_emit = value;
        self
    }

    pub fn no_std_lib(mut self, value: bool) -> Self {
        self.options.no_std_lib = value;
        self
    }

    pub fn diagnostic_level(mut self, level: DiagnosticLevel) -> Self {
        self.options.diagnostic_level = level;
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.misc.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> CompilerOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emitter_spec_splits_package_and_name() {
        let spec = EmitterSpec::parse("openapi3:v2");
        assert_eq!(spec.package, "openapi3");
        assert_eq!(spec.name.as_deref(), Some("v2"));
    }

    #[test]
    fn emitter_spec_without_name() {
        let spec = EmitterSpec::parse("openapi3");
        assert_eq!(spec.package, "openapi3");
        assert_eq!(spec.name, None);
    }

    #[test]
    fn builder_collects_every_field() {
        let opts = CompilerOptionsBuilder::new()
            .emit("openapi3")
            .output_dir("out")
            .no_emit(true)
            .option("k", "v")
            .build();
        assert_eq!(opts.emitters.len(), 1);
        assert_eq!(opts.output_dir.as_deref(), Some("out"));
        assert!(opts.no_emit);
        assert_eq!(opts.misc.get("k").map(String::as_str), Some("v"));
    }
}
