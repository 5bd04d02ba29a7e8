//! Checker coverage for the scenarios the inline `src/checker.rs` unit
//! tests don't already exercise: spread provenance carrying per-property
//! decorations, ambiguous `using` resolution, interface mixing, and
//! decorator timing against uninstantiated templates.

use std::collections::HashMap;

use cadl_compiler::binder::{bind_file, NamespaceRegistry};
use cadl_compiler::checker::{check_program, CheckInput, CheckedProgram, DecoratorRegistry};
use cadl_compiler::diagnostics::{DiagnosticCode, SourceFile};
use cadl_compiler::parser::parse;
use cadl_compiler::symbols::{FileId, SymbolArena};
use cadl_compiler::types::Type;

fn check(sources: &[&str]) -> CheckedProgram {
    check_with_decorators(sources, DecoratorRegistry::new())
}

fn check_with_decorators(sources: &[&str], decorators: DecoratorRegistry) -> CheckedProgram {
    let mut trees = Vec::new();
    let mut source_files = Vec::new();
    let mut symbols = SymbolArena::new();
    let global = symbols.alloc_table();
    let mut namespaces = NamespaceRegistry::new();
    let mut uses = HashMap::new();

    for (i, src) in sources.iter().enumerate() {
        let path = format!("f{i}.cadl");
        let file = FileId(i as u32);
        let result = parse(&path, src);
        let mut tree = result.tree;
        let bind_result = bind_file(file, &mut tree, &mut symbols, global, &mut namespaces);
        uses.insert(file, bind_result.uses);
        trees.push(tree);
        source_files.push(SourceFile::new(path, *src));
    }

    let files = trees.iter().zip(source_files.iter()).enumerate().map(|(i, (t, s))| (FileId(i as u32), t, s)).collect();
    let input = CheckInput { files, symbols: &symbols, global_exports: global, uses };
    check_program(input, &decorators)
}

#[test]
fn spread_preserves_per_property_decoration() {
    let program = check(&["model A { @mark x: string; } model C { ...A }"]);
    assert!(!program.diagnostics.has_error());
    let c = *program.exports.get("C").unwrap();
    let Type::Model(m) = program.types.get(c) else { panic!("expected model") };
    let prop = program.types.property(m.properties[0]);
    assert!(prop.source_property.is_some());
    assert_eq!(prop.decorators.len(), 1);
    assert_eq!(prop.decorators[0].name, "@mark");
}

#[test]
fn duplicate_spread_of_same_property_name_is_a_diagnostic() {
    let program = check(&["model A { x: string; } model B { x: int32; } model C { ...A, ...B }"]);
    assert!(program.diagnostics.has_error());
    assert!(program.diagnostics.all().iter().any(|d| d.code == DiagnosticCode::DuplicateProperty));
}

#[test]
fn using_a_namespace_brings_its_exports_into_global_scope() {
    let program = check(&[
        "namespace Lib { model Widget { } }\nusing Lib;\nmodel Uses { w: Widget }",
    ]);
    assert!(!program.diagnostics.has_error());
}

#[test]
fn two_usings_of_the_same_name_are_ambiguous_at_the_use_site() {
    let program = check(&[
        "namespace A { model Dup { } }\nnamespace B { model Dup { } }\nusing A;\nusing B;\nmodel Uses { d: Dup }",
    ]);
    assert!(program.diagnostics.all().iter().any(|d| d.code == DiagnosticCode::AmbiguousReference));
}

#[test]
fn local_declaration_shadows_a_using_import() {
    let program = check(&[
        "namespace Lib { model Widget { } }\nusing Lib;\nmodel Widget { }\nmodel Uses { w: Widget }",
    ]);
    assert!(!program.diagnostics.has_error());
}

#[test]
fn uninstantiated_template_never_fires_its_decorator() {
    let mut registry = DecoratorRegistry::new();
    let key = cadl_compiler::state::StateKey::new();
    registry.register("@mark", move |ctx, ty, _args| {
        let Type::Model(_) = ty else { return Ok(()) };
        ctx.state.state_set(key);
        Ok(())
    });
    let mut program = check_with_decorators(&["@mark model Box<T> { value: T }"], registry);
    assert!(!program.diagnostics.has_error());
    assert!(program.state.state_set(key).is_empty());
}

#[test]
fn interface_mixes_pulls_in_the_mixed_interfaces_operations() {
    let program = check(&["interface Readable { op read(): string; }\ninterface Full mixes Readable { op write(v: string): void; }"]);
    assert!(!program.diagnostics.has_error());
    let full = *program.exports.get("Full").unwrap();
    let Type::Interface(i) = program.types.get(full) else { panic!("expected interface") };
    assert_eq!(i.operations.len(), 2);
}

#[test]
fn recursive_template_is_clause_terminates_instead_of_looping() {
    let program = check(&["model Self is Self { }"]);
    assert!(program.diagnostics.all().iter().any(|d| d.code == DiagnosticCode::RecursiveBase));
}

#[test]
fn intersection_of_two_models_unions_their_properties() {
    let program = check(&["model A { a: string; } model B { b: int32; } model C { ab: A & B }"]);
    assert!(!program.diagnostics.has_error());
    let c = *program.exports.get("C").unwrap();
    let Type::Model(m) = program.types.get(c) else { panic!("expected model") };
    let ab_prop = program.types.property(m.properties[0]);
    let Type::Model(ab) = program.types.get(ab_prop.type_) else { panic!("expected anonymous model") };
    assert_eq!(ab.properties.len(), 2);
}
