//! End-to-end Program Loader scenarios driven entirely through the public
//! `load_program` entry point and an in-memory `Host`, the way a real
//! `cadlc` invocation would exercise the loader.

use std::collections::HashMap;
use std::sync::Arc;

use cadl_compiler::checker::DecoratorContext;
use cadl_compiler::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticTarget};
use cadl_compiler::state::StateKey;
use cadl_compiler::types::Type;
use cadl_compiler_cli::host::ExternalExport;
use cadl_compiler_cli::options::CompilerOptionsBuilder;
use cadl_compiler_cli::program::{load_program, LoadError};
use cadl_compiler_cli::test_host::{single_decorator_export, single_hook_export, MemoryHost};
use cadl_compiler_cli::version::VERSION;

#[test]
fn loads_across_a_relative_import_and_merges_into_one_program() {
    let host = MemoryHost::new();
    host.add_file("/a.cadl", "model A { }");
    host.add_file("/main.cadl", "import \"./a.cadl\";\nmodel Uses { a: A }");

    let program = load_program(&host, "/main.cadl", CompilerOptionsBuilder::new().build()).expect("loads");
    assert!(!program.has_error());
    assert!(program.exports().contains_key("A"));
    assert!(program.exports().contains_key("Uses"));
}

#[test]
fn directory_entry_resolves_through_its_package_descriptor() {
    let host = MemoryHost::new();
    host.add_file("/proj/package.json", r#"{"name":"proj","cadlMain":"lib/main.cadl"}"#);
    host.add_file("/proj/lib/main.cadl", "model Widget { }");

    let program = load_program(&host, "/proj", CompilerOptionsBuilder::new().build()).expect("loads");
    assert!(!program.has_error());
    assert!(program.exports().contains_key("Widget"));
}

#[test]
fn external_module_decorator_is_dispatched_by_its_bare_name_and_writes_state() {
    let host = MemoryHost::new();
    host.add_file("/main.cadl", "import \"./lib.js\";\n@blue model Foo { }");

    let key = StateKey::new();
    let marked_key = key;
    let func: Arc<cadl_compiler::checker::DecoratorFn> = Arc::new(move |ctx: &mut DecoratorContext, ty: &Type, _args| {
        let Type::Model(_) = ty else { return Ok(()) };
        ctx.state.state_set(marked_key);
        Ok(())
    });
    host.add_external_module("/lib.js", single_decorator_export("$blue", func));

    let mut program = load_program(&host, "/main.cadl", CompilerOptionsBuilder::new().build()).expect("loads");
    assert!(!program.has_error());
    let foo = *program.exports().get("Foo").unwrap();
    assert!(program.state_mut().state_set(key).contains(&foo));
}

#[test]
fn external_module_namespace_export_qualifies_its_decorators() {
    let host = MemoryHost::new();
    host.add_file("/main.cadl", "import \"./lib.js\";\n@Demo.blue model Foo { }");

    let func: Arc<cadl_compiler::checker::DecoratorFn> =
        Arc::new(|_ctx: &mut DecoratorContext, _ty: &Type, _args| Ok(()));
    let mut exports = HashMap::new();
    exports.insert("namespace".to_string(), ExternalExport::Namespace("Demo".to_string()));
    exports.insert("$blue".to_string(), ExternalExport::Function(func));
    host.add_external_module("/lib.js", exports);

    let program = load_program(&host, "/main.cadl", CompilerOptionsBuilder::new().build()).expect("loads");
    assert!(!program.has_error());
}

#[test]
fn locally_installed_compiler_mismatch_aborts_loading() {
    let host = MemoryHost::new();
    host.add_file("/proj/main.cadl", "model A { }");
    host.add_file("/proj/node_modules/.bin/cadl-server", "#!/usr/bin/env node");
    host.add_file("/proj/node_modules/cadl-compiler-cli/VERSION", "9.9.9");

    match load_program(&host, "/proj/main.cadl", CompilerOptionsBuilder::new().build()) {
        Err(LoadError::Fatal(diagnostics)) => {
            assert!(diagnostics.iter().any(|d| d.code == cadl_compiler::diagnostics::DiagnosticCode::CompilerVersionMismatch));
        }
        Ok(_) => panic!("expected a fatal version-mismatch error"),
    }
}

#[test]
fn matching_local_compiler_version_loads_normally() {
    let host = MemoryHost::new();
    host.add_file("/proj/main.cadl", "model A { }");
    host.add_file("/proj/node_modules/.bin/cadl-server", "#!/usr/bin/env node");
    host.add_file("/proj/node_modules/cadl-compiler-cli/VERSION", VERSION);

    let program = load_program(&host, "/proj/main.cadl", CompilerOptionsBuilder::new().build()).expect("loads");
    assert!(!program.has_error());
}

#[test]
fn missing_entry_file_is_a_fatal_diagnostic() {
    let host = MemoryHost::new();
    match load_program(&host, "/nope.cadl", CompilerOptionsBuilder::new().build()) {
        Err(LoadError::Fatal(diagnostics)) => {
            assert!(diagnostics.iter().any(|d| d.code == cadl_compiler::diagnostics::DiagnosticCode::FileNotFound));
        }
        Ok(_) => panic!("expected a fatal file-not-found error"),
    }
}

#[test]
fn on_validate_hook_runs_once_against_the_completed_program() {
    let host = MemoryHost::new();
    host.add_file("/main.cadl", "import \"./lib.js\";\nmodel Foo { }");

    let hook: std::sync::Arc<cadl_compiler_cli::program::ProgramCallback> = std::sync::Arc::new(|program| {
        if !program.exports().contains_key("Foo") {
            program.push_diagnostic(Diagnostic::new(
                DiagnosticCode::FileNotFound,
                "Foo went missing",
                DiagnosticTarget::no_target(),
            ));
        }
    });
    host.add_external_module("/lib.js", single_hook_export("$onValidate", hook));

    let program = load_program(&host, "/main.cadl", CompilerOptionsBuilder::new().build()).expect("loads");
    assert!(!program.has_error());
}

#[test]
fn self_recursive_base_is_reported_end_to_end() {
    let host = MemoryHost::new();
    host.add_file("/main.cadl", "model A extends A { }");
    let program = load_program(&host, "/main.cadl", CompilerOptionsBuilder::new().build()).expect("loads");
    assert!(program.has_error());
    assert!(program
        .diagnostics()
        .any(|d| d.code == cadl_compiler::diagnostics::DiagnosticCode::RecursiveBase));
}
