//! Black-box parser coverage: error recovery, directive and
//! decorator attachment, the namespace dotted-form desugaring, and the
//! blockless-namespace rules, all driven through the public `parse` entry
//! point rather than the parser's internal state.

use cadl_compiler::diagnostics::DiagnosticCode;
use cadl_compiler::parser::parse;
use cadl_compiler::tree::NodeKind;

fn script_statements(tree: &cadl_compiler::tree::SyntaxTree) -> Vec<cadl_compiler::tree::NodeId> {
    match &tree.get(tree.root).kind {
        NodeKind::Script(s) => s.statements.clone(),
        _ => panic!("root is always a Script node"),
    }
}

#[test]
fn missing_close_brace_still_yields_a_printable_free_tree_flagged_as_error() {
    let result = parse("t.cadl", "model Foo { x: int32");
    assert!(!result.tree.printable);
    let stmts = script_statements(&result.tree);
    assert!(matches!(&result.tree.get(stmts[0]).kind, NodeKind::Model(_)));
    assert!(result.diagnostics.iter().any(|d| d.code == DiagnosticCode::MissingToken));
}

#[test]
fn missing_identifier_is_synthesized_rather_than_panicking() {
    let result = parse("t.cadl", "model { x: int32 }");
    let stmts = script_statements(&result.tree);
    let NodeKind::Model(m) = &result.tree.get(stmts[0]).kind else { panic!("expected a model") };
    let name = m.name.expect("model always gets a name node, synthesized if missing");
    let NodeKind::Identifier(ident) = &result.tree.get(name).kind else { panic!("expected identifier") };
    assert!(ident.missing);
}

#[test]
fn decorator_and_directive_attach_to_the_next_statement() {
    let result = parse("t.cadl", "#suppress unresolved-reference\n@blue\nmodel Foo { }");
    let stmts = script_statements(&result.tree);
    let model = result.tree.get(stmts[0]);
    assert_eq!(model.directives.len(), 1);
    let NodeKind::Model(m) = &model.kind else { panic!("expected a model") };
    assert_eq!(m.decorators.len(), 1);
}

#[test]
fn decorator_on_import_is_an_invalid_decorator_location() {
    let result = parse("t.cadl", "@blue\nimport \"./a.cadl\";");
    assert!(result.diagnostics.iter().any(|d| d.code == DiagnosticCode::InvalidDecoratorLocation));
}

#[test]
fn dotted_namespace_desugars_into_nested_chain() {
    let result = parse("t.cadl", "namespace A.B.C { model X { } }");
    let stmts = script_statements(&result.tree);
    let NodeKind::Namespace(outer) = &result.tree.get(stmts[0]).kind else { panic!("expected namespace") };
    let inner_id = outer.body.as_ref().unwrap()[0];
    let NodeKind::Namespace(inner) = &result.tree.get(inner_id).kind else { panic!("expected nested namespace") };
    let NodeKind::Identifier(name) = &result.tree.get(inner.name).kind else { panic!("expected identifier") };
    assert_eq!(name.text, "B");
}

#[test]
fn blockless_namespace_consumes_rest_of_file() {
    let result = parse("t.cadl", "namespace Foo;\nmodel A { }\nmodel B { }");
    let stmts = script_statements(&result.tree);
    assert_eq!(stmts.len(), 1);
    let NodeKind::Namespace(ns) = &result.tree.get(stmts[0]).kind else { panic!("expected namespace") };
    assert!(ns.blockless);
    assert_eq!(ns.body.as_ref().unwrap().len(), 2);
}

#[test]
fn second_blockless_namespace_is_an_error() {
    let result = parse("t.cadl", "namespace A;\nnamespace B;\nmodel M { }");
    assert!(result.diagnostics.iter().any(|d| d.code == DiagnosticCode::InvalidDirectiveLocation));
}

#[test]
fn model_extends_and_is_are_both_recorded() {
    let result = parse("t.cadl", "model A extends B is C { }");
    let stmts = script_statements(&result.tree);
    let NodeKind::Model(m) = &result.tree.get(stmts[0]).kind else { panic!("expected model") };
    assert!(m.extends.is_some());
    assert!(m.is_clause.is_some());
}

#[test]
fn model_spread_and_property_both_parse_as_members() {
    let result = parse("t.cadl", "model C { ...A, x: string, y?: int32 = 1 }");
    let stmts = script_statements(&result.tree);
    let NodeKind::Model(m) = &result.tree.get(stmts[0]).kind else { panic!("expected model") };
    assert_eq!(m.members.len(), 3);
    assert!(matches!(result.tree.get(m.members[0]).kind, NodeKind::ModelSpread(_)));
    let NodeKind::ModelProperty(y) = &result.tree.get(m.members[2]).kind else { panic!("expected property") };
    assert!(y.optional);
    assert!(y.default.is_some());
}

#[test]
fn operation_inside_interface_parses() {
    let result = parse("t.cadl", "interface Svc { op get(id: string): void; }");
    let stmts = script_statements(&result.tree);
    let NodeKind::Interface(i) = &result.tree.get(stmts[0]).kind else { panic!("expected interface") };
    assert_eq!(i.operations.len(), 1);
}

#[test]
fn no_two_errors_at_the_same_position() {
    let result = parse("t.cadl", "model Foo {");
    let positions: Vec<u32> = result
        .diagnostics
        .iter()
        .map(|d| match &d.target {
            cadl_compiler::diagnostics::DiagnosticTarget::Span { pos, .. } => *pos,
            _ => u32::MAX,
        })
        .collect();
    let mut deduped = positions.clone();
    deduped.dedup();
    assert_eq!(positions.len(), deduped.len());
}
