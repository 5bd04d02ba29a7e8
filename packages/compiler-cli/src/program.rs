//! Program Loader and the `Program` object handed to emitters. Drives
//! everything from one entry point, collecting diagnostics along the way
//! and bailing on the first fatal one, over CADL's synchronous `Host` and a
//! single-pass recursive import loader rather than an incremental program
//! model.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cadl_compiler::binder::{bind_file, NamespaceRegistry};
use cadl_compiler::checker::{check_program, CheckInput, CheckedProgram, DecoratorContext, DecoratorFn, DecoratorRegistry};
use cadl_compiler::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticTarget, SourceFile};
use cadl_compiler::parser::parse;
use cadl_compiler::symbols::{FileId, Symbol, SymbolArena, SymbolKind, SymbolTableId};
use cadl_compiler::tree::{NodeKind, SyntaxTree};
use cadl_compiler::types::TypeId;

use crate::host::{ExternalExport, Host};
use crate::options::CompilerOptions;
use crate::package::PackageDescriptor;
use crate::resolver::{resolve_import, Resolved, ResolvedKind};
use crate::version::{Version, VERSION};

/// A hook an external module registers for `$onValidate`/`$onEmit`, lifted
/// out as a program-level callback rather than a decorator. Runs after
/// checking, with the completed program.
pub type ProgramCallback = dyn Fn(&mut Program) + Send + Sync;

/// Everything the loader accumulated about one loaded file, kept around so
/// the returned [`Program`] can still decode spans and so callers can look
/// a file up by path.
struct LoadedFile {
    tree: SyntaxTree,
    source: SourceFile,
}

/// The completed compilation, handed to emitters: the source files, the
/// type graph, diagnostics, state, and accessors for the compiler options
/// that produced it.
pub struct Program {
    pub options: CompilerOptions,
    files: HashMap<FileId, LoadedFile>,
    file_ids_by_path: HashMap<String, FileId>,
    checked: CheckedProgram,
    /// Load-phase (scan/parse/bind) diagnostics, kept separate from the
    /// checker's own sink so they still precede check-phase diagnostics in
    /// emission order.
    load_diagnostics: Vec<Diagnostic>,
    on_emit: Vec<Arc<ProgramCallback>>,
}

impl Program {
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.load_diagnostics.iter().chain(self.checked.diagnostics.all().iter())
    }

    pub fn has_error(&self) -> bool {
        self.load_diagnostics.iter().any(|d| d.severity == cadl_compiler::diagnostics::Severity::Error)
            || self.checked.diagnostics.has_error()
    }

    pub fn types(&self) -> &cadl_compiler::types::TypeArena {
        &self.checked.types
    }

    pub fn state(&self) -> &cadl_compiler::state::StateRegistry {
        &self.checked.state
    }

    pub fn state_mut(&mut self) -> &mut cadl_compiler::state::StateRegistry {
        &mut self.checked.state
    }

    /// Top-level declarations reachable from the program's global scope, by
    /// name.
    pub fn exports(&self) -> &HashMap<String, TypeId> {
        &self.checked.exports
    }

    pub fn source_file(&self, path: &str) -> Option<&SourceFile> {
        let id = self.file_ids_by_path.get(path)?;
        self.files.get(id).map(|f| &f.source)
    }

    pub fn source_files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.values().map(|f| &f.source)
    }

    /// Lets an `$onValidate` hook raise a diagnostic against the completed
    /// program.
    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.load_diagnostics.push(diagnostic);
    }

    /// Runs every `$onEmit` callback registered by a loaded external module.
    /// Emitters themselves are external collaborators; this only fires the
    /// hooks the loader discovered.
    pub fn run_emitters(&mut self) {
        let callbacks = self.on_emit.clone();
        for cb in callbacks {
            cb(self);
        }
    }
}

#[derive(Debug)]
pub enum LoadError {
    /// A fatal diagnostic was recorded; loading stopped before checking.
    Fatal(Vec<Diagnostic>),
}

struct PendingDecorator {
    name: String,
    func: Arc<DecoratorFn>,
}

/// Loads and checks one CADL program rooted at `entry_path`. The returned
/// `Program` always carries the full diagnostic history
/// even on success; [`LoadError::Fatal`] is only returned for failures that
/// abort before a type graph could be produced at all (version mismatch,
/// an unreadable entry file).
pub fn load_program(host: &dyn Host, entry_path: &str, options: CompilerOptions) -> Result<Program, LoadError> {
    let mut loader = Loader {
        host,
        seen: HashSet::new(),
        files: HashMap::new(),
        file_ids_by_path: HashMap::new(),
        source_files: Vec::new(),
        symbols: SymbolArena::new(),
        namespaces: NamespaceRegistry::new(),
        global_exports: None,
        uses: HashMap::new(),
        decorators: Vec::new(),
        on_validate: Vec::new(),
        on_emit: Vec::new(),
        fatal: Vec::new(),
        load_diagnostics: Vec::new(),
    };
    loader.run(entry_path, &options)
}

struct Loader<'h> {
    host: &'h dyn Host,
    seen: HashSet<String>,
    files: HashMap<FileId, LoadedFile>,
    file_ids_by_path: HashMap<String, FileId>,
    source_files: Vec<(FileId, SourceFile)>,
    symbols: SymbolArena,
    namespaces: NamespaceRegistry,
    global_exports: Option<SymbolTableId>,
    uses: HashMap<FileId, Vec<cadl_compiler::tree::NodeId>>,
    decorators: Vec<PendingDecorator>,
    on_validate: Vec<Arc<ProgramCallback>>,
    on_emit: Vec<Arc<ProgramCallback>>,
    fatal: Vec<Diagnostic>,
    load_diagnostics: Vec<Diagnostic>,
}

impl<'h> Loader<'h> {
    fn run(mut self, entry_path: &str, options: &CompilerOptions) -> Result<Program, LoadError> {
        if !options.no_std_lib {
            for lib_dir in self.host.get_lib_dirs() {
                let entry = format!("{}/main.cadl", lib_dir.trim_end_matches('/'));
                if self.host.is_file(&entry) {
                    self.load_cadl_file(&entry);
                }
            }
        }

        let resolved_entry = self.resolve_entry(entry_path);
        match &resolved_entry {
            Some(path) => self.check_version_mismatch(path),
            None => {
                self.fatal.push(Diagnostic::new(
                    DiagnosticCode::FileNotFound,
                    format!("cannot find entry file '{entry_path}'"),
                    DiagnosticTarget::no_target(),
                ));
            }
        }
        if !self.fatal.is_empty() {
            return Err(LoadError::Fatal(self.fatal));
        }

        let entry_resolved = resolved_entry.expect("checked above");
        self.load_cadl_file(&entry_resolved);

        let global_exports = self.global_exports.expect("at least the entry file allocates it");
        let mut registry = DecoratorRegistry::new();
        for pending in &self.decorators {
            let func = pending.func.clone();
            registry.register(pending.name.clone(), move |ctx: &mut DecoratorContext, ty, args| func(ctx, ty, args));
        }

        let files: Vec<_> = self
            .files
            .iter()
            .map(|(id, f)| (*id, &f.tree, &f.source))
            .collect();
        let checked = check_program(
            CheckInput { files, symbols: &self.symbols, global_exports, uses: self.uses.clone() },
            &registry,
        );

        let mut program = Program {
            options: options.clone(),
            files: self.files,
            file_ids_by_path: self.file_ids_by_path,
            checked,
            load_diagnostics: self.load_diagnostics,
            on_emit: self.on_emit,
        };
        for cb in self.on_validate {
            cb(&mut program);
        }
        Ok(program)
    }

    fn resolve_entry(&self, entry_path: &str) -> Option<String> {
        if self.host.is_dir(entry_path) {
            let descriptor_path = format!("{}/package.json", entry_path.trim_end_matches('/'));
            let entry = if self.host.is_file(&descriptor_path) {
                PackageDescriptor::load(self.host, &descriptor_path).ok()?.entry_point().map(str::to_string)
            } else {
                None
            }
            .unwrap_or_else(|| "main.cadl".to_string());
            Some(format!("{}/{entry}", entry_path.trim_end_matches('/')))
        } else {
            Some(self.host.resolve_absolute_path(entry_path))
        }
    }

    /// A locally-installed compiler under the main file's directory that
    /// isn't (by real path) the running compiler is a fatal mismatch.
    fn check_version_mismatch(&mut self, entry_path: &str) {
        let dir = match entry_path.rfind('/') {
            Some(idx) => &entry_path[..idx],
            None => "",
        };
        let local_launcher = format!("{dir}/node_modules/.bin/cadl-server");
        if !self.host.is_file(&local_launcher) {
            return;
        }
        let running = self.host.realpath(&local_launcher).ok();
        let expected = Version::current();
        let local_version_file = format!("{dir}/node_modules/cadl-compiler-cli/VERSION");
        if let Ok(contents) = self.host.read_file(&local_version_file) {
            let local = Version::parse(contents.text.trim());
            if local.as_ref() != Some(&expected) && running.is_some() {
                self.fatal.push(
                    Diagnostic::new(
                        DiagnosticCode::CompilerVersionMismatch,
                        format!(
                            "Compiler version mismatch: expected to run via '{local_launcher}' (found version {}, running {VERSION}).",
                            local.map(|v| v.to_string()).unwrap_or_else(|| "unknown".to_string())
                        ),
                        DiagnosticTarget::no_target(),
                    ),
                );
            }
        }
    }

    fn load_cadl_file(&mut self, abs_path: &str) {
        if self.seen.contains(abs_path) {
            return;
        }
        self.seen.insert(abs_path.to_string());

        let contents = match self.host.read_file(abs_path) {
            Ok(c) => c,
            Err(e) => {
                self.fatal.push(Diagnostic::new(
                    DiagnosticCode::FileNotFound,
                    format!("could not read '{abs_path}': {e}"),
                    DiagnosticTarget::no_target(),
                ));
                return;
            }
        };

        let source = SourceFile::new(abs_path.to_string(), contents.text.clone());
        let parsed = parse(abs_path, &contents.text);
        let mut tree = parsed.tree;

        let file_id = FileId(self.source_files.len() as u32);
        self.file_ids_by_path.insert(abs_path.to_string(), file_id);

        let global_exports = *self.global_exports.get_or_insert_with(|| self.symbols.alloc_table());
        let bind_result = bind_file(file_id, &mut tree, &mut self.symbols, global_exports, &mut self.namespaces);
        self.uses.insert(file_id, bind_result.uses);

        self.load_diagnostics.extend(parsed.diagnostics);

        self.source_files.push((file_id, source.clone()));
        self.files.insert(file_id, LoadedFile { tree, source: source.clone() });

        let import_specifiers = self.collect_imports(file_id);
        for (specifier, _node) in import_specifiers {
            match resolve_import(self.host, &specifier, abs_path) {
                Ok(Resolved { path, kind: ResolvedKind::CadlFile }) => self.load_cadl_file(&path),
                Ok(Resolved { path, kind: ResolvedKind::ExternalModule }) => self.load_external_module(&path),
                Err(e) => {
                    self.fatal.push(Diagnostic::new(
                        DiagnosticCode::InvalidImport,
                        e.to_string(),
                        DiagnosticTarget::span(abs_path, cadl_compiler::diagnostics::Span::empty_at(0)),
                    ));
                }
            }
        }
    }

    fn collect_imports(&self, file_id: FileId) -> Vec<(String, cadl_compiler::tree::NodeId)> {
        let tree = &self.files.get(&file_id).expect("just inserted").tree;
        let mut out = Vec::new();
        for (_id, node) in tree.iter() {
            if let NodeKind::Import(import) = &node.kind {
                if let NodeKind::StringLiteral(lit) = &tree.get(import.path).kind {
                    out.push((lit.value.clone(), import.path));
                }
            }
        }
        out
    }

    /// Reflects an external module's exports, binds `$`-prefixed ones as
    /// decorators (into the namespace its `namespace` export names), and
    /// lifts `$onValidate`/`$onEmit` out as program callbacks rather than
    /// decorators.
    fn load_external_module(&mut self, abs_path: &str) {
        if self.seen.contains(abs_path) {
            return;
        }
        self.seen.insert(abs_path.to_string());

        let exports = match self.host.get_external_module_exports(abs_path) {
            Ok(e) => e,
            Err(e) => {
                self.fatal.push(Diagnostic::new(
                    DiagnosticCode::FileNotFound,
                    format!("could not load external module '{abs_path}': {e}"),
                    DiagnosticTarget::no_target(),
                ));
                return;
            }
        };

        let namespace = exports.iter().find_map(|(key, value)| {
            if key == "namespace" {
                if let ExternalExport::Namespace(ns) = value {
                    return Some(ns.clone());
                }
            }
            None
        });

        let mut names: Vec<&String> = exports.keys().collect();
        names.sort();
        for key in names {
            let value = &exports[key];
            match (key.as_str(), value) {
                ("$onValidate", ExternalExport::Hook(hook)) => self.on_validate.push(hook.clone()),
                ("$onEmit", ExternalExport::Hook(hook)) => self.on_emit.push(hook.clone()),
                (name, ExternalExport::Function(func)) if name.starts_with('$') => {
                    let bare = &name[1..];
                    let qualified = match &namespace {
                        Some(ns) if !ns.is_empty() => format!("{ns}.{bare}"),
                        _ => bare.to_string(),
                    };
                    self.decorators.push(PendingDecorator { name: format!("@{qualified}"), func: func.clone() });
                    self.symbols.alloc_symbol(Symbol {
                        name: format!("@{qualified}"),
                        kind: SymbolKind::Decorator { originating_path: abs_path.to_string() },
                    });
                }
                _ => {}
            }
        }
    }
}
