//! Symbol Binder.
//!
//! One pass over a single file's syntax tree: assigns parent links, allocates
//! a `locals` table for every scoped node, and declares named statements into
//! the nearest enclosing `exports` table. Namespace declarations that share a
//! fully-qualified name with an earlier one are merged by aliasing the new
//! node's `exports` onto the existing one's table id — this never goes
//! through `SymbolTable::declare`, since a merge is not a collision. Name
//! *resolution* (what a `TypeReference` or `using` points at) is the
//! checker's job; the binder only records file-level `using` statements for
//! it to consult later.

use std::collections::HashMap;

use crate::symbols::{DeclRef, FileId, Symbol, SymbolArena, SymbolKind, SymbolId, SymbolTableId};
use crate::tree::{NodeId, NodeKind, SyntaxTree};

pub struct BindResult {
    /// Every `using` statement in the file, in source order.
    pub uses: Vec<NodeId>,
}

/// Maps a namespace's fully-qualified dotted name (`"Shared.Inner"`) to the
/// symbol and exports table every declaration of that name shares, across
/// every file in the program. Owned by whatever drives
/// `bind_file` across a whole program (the program loader), not by one
/// file's binder pass, so namespace merging is resolved the moment a second
/// file declares the same fully-qualified namespace rather than requiring a
/// later re-homing pass over already-bound trees.
#[derive(Debug, Default)]
pub struct NamespaceRegistry(HashMap<String, (SymbolId, SymbolTableId)>);

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, fqn: &str) -> Option<(SymbolId, SymbolTableId)> {
        self.0.get(fqn).copied()
    }

    fn insert(&mut self, fqn: String, entry: (SymbolId, SymbolTableId)) {
        self.0.insert(fqn, entry);
    }
}

struct Binder<'a> {
    file: FileId,
    tree: &'a mut SyntaxTree,
    symbols: &'a mut SymbolArena,
    namespaces: &'a mut NamespaceRegistry,
    uses: Vec<NodeId>,
}

/// Binds one file's tree. `global_exports` is the program-wide table shared
/// by every file's top-level statements, so top-level declarations across
/// files merge the same way nested namespaces do. `namespaces` must be the
/// same registry passed to every other file bound in this program.
pub fn bind_file(
    file: FileId,
    tree: &mut SyntaxTree,
    symbols: &mut SymbolArena,
    global_exports: SymbolTableId,
    namespaces: &mut NamespaceRegistry,
) -> BindResult {
    let root = tree.root;
    let locals = symbols.alloc_table();
    tree.get_mut(root).locals = Some(locals);
    tree.get_mut(root).exports = Some(global_exports);

    let statements = match &tree.get(root).kind {
        NodeKind::Script(script) => script.statements.clone(),
        _ => panic!("SyntaxTree root must be a Script node"),
    };

    let mut binder = Binder { file, tree, symbols, namespaces, uses: Vec::new() };
    binder.bind_statements(&statements, root, locals, Some(global_exports), "");
    BindResult { uses: binder.uses }
}

impl<'a> Binder<'a> {
    fn decl(&self, node: NodeId) -> DeclRef {
        DeclRef { file: self.file, node }
    }

    fn identifier_text(&self, id: NodeId) -> String {
        match &self.tree.get(id).kind {
            NodeKind::Identifier(i) => i.text.clone(),
            NodeKind::StringLiteral(s) => s.value.clone(),
            _ => String::new(),
        }
    }

    fn declare_type(&mut self, exports: SymbolTableId, name: &str, decl: NodeId) -> crate::symbols::SymbolId {
        let sym = self.symbols.alloc_symbol(Symbol { name: name.to_string(), kind: SymbolKind::Type { decl: self.decl(decl) } });
        self.symbols.table_mut(exports).declare(name, sym);
        sym
    }

    fn bind_statements(&mut self, stmts: &[NodeId], parent: NodeId, locals: SymbolTableId, exports: Option<SymbolTableId>, fqn_prefix: &str) {
        for &stmt in stmts {
            self.tree.get_mut(stmt).parent = Some(parent);
            self.bind_node(stmt, locals, exports, fqn_prefix);
        }
    }

    fn bind_node(&mut self, id: NodeId, locals: SymbolTableId, exports: Option<SymbolTableId>, fqn_prefix: &str) {
        let kind = self.tree.get(id).kind.clone();
        match kind {
            NodeKind::Import(imp) => {
                self.tree.get_mut(imp.path).parent = Some(id);
            }
            NodeKind::Using(u) => {
                self.tree.get_mut(u.path).parent = Some(id);
                self.bind_expr(u.path, locals, exports);
                self.uses.push(id);
            }
            NodeKind::Namespace(ns) => self.bind_namespace(id, ns, locals, exports, fqn_prefix.to_string()),
            NodeKind::Model(m) => self.bind_model(id, m, locals, exports),
            NodeKind::Interface(i) => self.bind_interface(id, i, locals, exports),
            NodeKind::Union(u) => self.bind_union(id, u, locals, exports),
            NodeKind::Enum(e) => self.bind_enum(id, e, locals, exports),
            NodeKind::Alias(a) => self.bind_alias(id, a, locals, exports),
            NodeKind::Operation(op) => self.bind_operation(id, op, locals, exports, false),
            NodeKind::EmptyStatement | NodeKind::InvalidStatement => {}
            other => self.bind_expr_kind(id, other, locals, exports),
        }
        let directives = self.tree.get(id).directives.clone();
        for d in directives {
            self.tree.get_mut(d).parent = Some(id);
        }
    }

    /// `fqn_prefix` is the dot-joined path of enclosing namespace names.
    /// Namespace merging is keyed on this fully-qualified name through
    /// `self.namespaces`, which is shared across every file bound into this
    /// program: the second file to declare `namespace Shared` finds the
    /// first file's entry directly, with no need to re-read the other
    /// file's tree.
    fn bind_namespace(&mut self, id: NodeId, ns: crate::tree::NamespaceNode, _locals: SymbolTableId, exports: Option<SymbolTableId>, fqn_prefix: String) {
        let exports_table = exports.expect("namespace statements only appear inside an exports-bearing scope");
        self.tree.get_mut(ns.name).parent = Some(id);
        let name_text = self.identifier_text(ns.name);
        let fqn = if fqn_prefix.is_empty() { name_text.clone() } else { format!("{fqn_prefix}.{name_text}") };

        let (symbol_id, ns_exports) = match self.namespaces.get(&fqn) {
            Some(entry) => entry,
            None => {
                let new_exports = self.symbols.alloc_table();
                let sym = self.declare_type(exports_table, &name_text, id);
                self.namespaces.insert(fqn.clone(), (sym, new_exports));
                (sym, new_exports)
            }
        };

        self.tree.get_mut(id).symbol = Some(symbol_id);
        self.tree.get_mut(id).exports = Some(ns_exports);
        let ns_locals = self.symbols.alloc_table();
        self.tree.get_mut(id).locals = Some(ns_locals);

        for &dec in &ns.decorators {
            self.tree.get_mut(dec).parent = Some(id);
            self.bind_decorator(dec, ns_locals);
        }
        if let Some(body) = ns.body {
            self.bind_statements(&body, id, ns_locals, Some(ns_exports), &fqn);
        }
    }

    fn bind_model(&mut self, id: NodeId, m: crate::tree::ModelNode, locals_ctx: SymbolTableId, exports_ctx: Option<SymbolTableId>) {
        if let Some(name_id) = m.name {
            self.tree.get_mut(name_id).parent = Some(id);
            let name_text = self.identifier_text(name_id);
            if let Some(exports_table) = exports_ctx {
                let sym = self.declare_type(exports_table, &name_text, id);
                self.tree.get_mut(id).symbol = Some(sym);
            }
        }
        let own_locals = self.symbols.alloc_table();
        self.tree.get_mut(id).locals = Some(own_locals);

        for &tp in &m.template_params {
            self.tree.get_mut(tp).parent = Some(id);
            self.bind_template_param(tp, own_locals);
        }
        if let Some(ext) = m.extends {
            self.tree.get_mut(ext).parent = Some(id);
            self.bind_expr(ext, own_locals, None);
        }
        if let Some(isc) = m.is_clause {
            self.tree.get_mut(isc).parent = Some(id);
            self.bind_expr(isc, own_locals, None);
        }
        for &mem in &m.members {
            self.tree.get_mut(mem).parent = Some(id);
            self.bind_model_member(mem, own_locals);
        }
        for &dec in &m.decorators {
            self.tree.get_mut(dec).parent = Some(id);
            self.bind_decorator(dec, locals_ctx);
        }
    }

    fn bind_model_member(&mut self, id: NodeId, locals: SymbolTableId) {
        let kind = self.tree.get(id).kind.clone();
        match kind {
            NodeKind::ModelProperty(p) => {
                self.tree.get_mut(p.name).parent = Some(id);
                self.tree.get_mut(p.type_expr).parent = Some(id);
                self.bind_expr(p.type_expr, locals, None);
                if let Some(def) = p.default {
                    self.tree.get_mut(def).parent = Some(id);
                    self.bind_expr(def, locals, None);
                }
                for &d in &p.decorators {
                    self.tree.get_mut(d).parent = Some(id);
                    self.bind_decorator(d, locals);
                }
            }
            NodeKind::ModelSpread(s) => {
                self.tree.get_mut(s.target).parent = Some(id);
                self.bind_expr(s.target, locals, None);
            }
            _ => {}
        }
    }

    fn bind_interface(&mut self, id: NodeId, i: crate::tree::InterfaceNode, locals_ctx: SymbolTableId, exports_ctx: Option<SymbolTableId>) {
        self.tree.get_mut(i.name).parent = Some(id);
        let name_text = self.identifier_text(i.name);
        if let Some(exports_table) = exports_ctx {
            let sym = self.declare_type(exports_table, &name_text, id);
            self.tree.get_mut(id).symbol = Some(sym);
        }
        let own_locals = self.symbols.alloc_table();
        self.tree.get_mut(id).locals = Some(own_locals);

        for &tp in &i.template_params {
            self.tree.get_mut(tp).parent = Some(id);
            self.bind_template_param(tp, own_locals);
        }
        for &mix in &i.mixes {
            self.tree.get_mut(mix).parent = Some(id);
            self.bind_expr(mix, own_locals, None);
        }
        for &op in &i.operations {
            self.tree.get_mut(op).parent = Some(id);
            let crate::tree::NodeKind::Operation(op_node) = self.tree.get(op).kind.clone() else { continue };
            self.bind_operation(op, op_node, own_locals, None, true);
        }
        for &dec in &i.decorators {
            self.tree.get_mut(dec).parent = Some(id);
            self.bind_decorator(dec, locals_ctx);
        }
    }

    fn bind_operation(&mut self, id: NodeId, op: crate::tree::OperationNode, locals_ctx: SymbolTableId, exports_ctx: Option<SymbolTableId>, from_interface: bool) {
        self.tree.get_mut(op.name).parent = Some(id);
        let name_text = self.identifier_text(op.name);
        if from_interface {
            let sym = self.symbols.alloc_symbol(Symbol { name: name_text, kind: SymbolKind::Type { decl: self.decl(id) } });
            self.tree.get_mut(id).symbol = Some(sym);
        } else if let Some(exports_table) = exports_ctx {
            let sym = self.declare_type(exports_table, &name_text, id);
            self.tree.get_mut(id).symbol = Some(sym);
        }

        let own_locals = self.symbols.alloc_table();
        self.tree.get_mut(id).locals = Some(own_locals);
        for &tp in &op.template_params {
            self.tree.get_mut(tp).parent = Some(id);
            self.bind_template_param(tp, own_locals);
        }
        self.tree.get_mut(op.params).parent = Some(id);
        self.bind_expr(op.params, own_locals, None);
        self.tree.get_mut(op.return_type).parent = Some(id);
        self.bind_expr(op.return_type, own_locals, None);
        for &dec in &op.decorators {
            self.tree.get_mut(dec).parent = Some(id);
            self.bind_decorator(dec, locals_ctx);
        }
    }

    fn bind_union(&mut self, id: NodeId, u: crate::tree::UnionNode, locals_ctx: SymbolTableId, exports_ctx: Option<SymbolTableId>) {
        if let Some(name_id) = u.name {
            self.tree.get_mut(name_id).parent = Some(id);
            let name_text = self.identifier_text(name_id);
            if let Some(exports_table) = exports_ctx {
                let sym = self.declare_type(exports_table, &name_text, id);
                self.tree.get_mut(id).symbol = Some(sym);
            }
        }
        let own_locals = self.symbols.alloc_table();
        self.tree.get_mut(id).locals = Some(own_locals);
        for &tp in &u.template_params {
            self.tree.get_mut(tp).parent = Some(id);
            self.bind_template_param(tp, own_locals);
        }
        for &variant in &u.variants {
            self.tree.get_mut(variant).parent = Some(id);
            self.bind_union_variant(variant, own_locals);
        }
        for &dec in &u.decorators {
            self.tree.get_mut(dec).parent = Some(id);
            self.bind_decorator(dec, locals_ctx);
        }
    }

    fn bind_union_variant(&mut self, id: NodeId, locals: SymbolTableId) {
        let NodeKind::UnionVariant(v) = self.tree.get(id).kind.clone() else { return };
        if let Some(name_id) = v.name {
            self.tree.get_mut(name_id).parent = Some(id);
        }
        self.tree.get_mut(v.type_expr).parent = Some(id);
        self.bind_expr(v.type_expr, locals, None);
        for &d in &v.decorators {
            self.tree.get_mut(d).parent = Some(id);
            self.bind_decorator(d, locals);
        }
    }

    fn bind_enum(&mut self, id: NodeId, e: crate::tree::EnumNode, locals_ctx: SymbolTableId, exports_ctx: Option<SymbolTableId>) {
        self.tree.get_mut(e.name).parent = Some(id);
        let name_text = self.identifier_text(e.name);
        if let Some(exports_table) = exports_ctx {
            let sym = self.declare_type(exports_table, &name_text, id);
            self.tree.get_mut(id).symbol = Some(sym);
        }
        for &member in &e.members {
            self.tree.get_mut(member).parent = Some(id);
            let NodeKind::EnumMember(m) = self.tree.get(member).kind.clone() else { continue };
            self.tree.get_mut(m.name).parent = Some(member);
            if let Some(val) = m.value {
                self.tree.get_mut(val).parent = Some(member);
                self.bind_expr(val, locals_ctx, None);
            }
            for &d in &m.decorators {
                self.tree.get_mut(d).parent = Some(member);
                self.bind_decorator(d, locals_ctx);
            }
        }
        for &dec in &e.decorators {
            self.tree.get_mut(dec).parent = Some(id);
            self.bind_decorator(dec, locals_ctx);
        }
    }

    fn bind_alias(&mut self, id: NodeId, a: crate::tree::AliasNode, locals_ctx: SymbolTableId, exports_ctx: Option<SymbolTableId>) {
        self.tree.get_mut(a.name).parent = Some(id);
        let name_text = self.identifier_text(a.name);
        if let Some(exports_table) = exports_ctx {
            let sym = self.declare_type(exports_table, &name_text, id);
            self.tree.get_mut(id).symbol = Some(sym);
        }
        let own_locals = self.symbols.alloc_table();
        self.tree.get_mut(id).locals = Some(own_locals);
        for &tp in &a.template_params {
            self.tree.get_mut(tp).parent = Some(id);
            self.bind_template_param(tp, own_locals);
        }
        self.tree.get_mut(a.value).parent = Some(id);
        self.bind_expr(a.value, own_locals, None);
        let _ = locals_ctx;
    }

    fn bind_template_param(&mut self, id: NodeId, locals: SymbolTableId) {
        let NodeKind::TemplateParameter(tp) = self.tree.get(id).kind.clone() else { return };
        self.tree.get_mut(tp.name).parent = Some(id);
        let name_text = self.identifier_text(tp.name);
        let sym = self.symbols.alloc_symbol(Symbol { name: name_text.clone(), kind: SymbolKind::Local { decl: self.decl(id) } });
        self.symbols.table_mut(locals).declare(&name_text, sym);
        self.tree.get_mut(id).symbol = Some(sym);
        if let Some(def) = tp.default {
            self.tree.get_mut(def).parent = Some(id);
            self.bind_expr(def, locals, None);
        }
    }

    fn bind_decorator(&mut self, id: NodeId, locals: SymbolTableId) {
        let NodeKind::Decorator(d) = self.tree.get(id).kind.clone() else { return };
        self.tree.get_mut(d.path).parent = Some(id);
        self.bind_expr(d.path, locals, None);
        for &arg in &d.args {
            self.tree.get_mut(arg).parent = Some(id);
            self.bind_expr(arg, locals, None);
        }
    }

    /// Parent-link and recurse into an expression-position node. Only
    /// `Model` can introduce a new scope here (an anonymous `{ ... }`
    /// expression); everything else is either a leaf or a plain container.
    fn bind_expr(&mut self, id: NodeId, locals: SymbolTableId, exports: Option<SymbolTableId>) {
        let kind = self.tree.get(id).kind.clone();
        self.bind_expr_kind(id, kind, locals, exports);
    }

    fn bind_expr_kind(&mut self, id: NodeId, kind: NodeKind, locals: SymbolTableId, exports: Option<SymbolTableId>) {
        match kind {
            NodeKind::Model(m) => self.bind_model(id, m, locals, exports),
            NodeKind::MemberExpr(e) => {
                self.tree.get_mut(e.base).parent = Some(id);
                self.tree.get_mut(e.member).parent = Some(id);
                self.bind_expr(e.base, locals, exports);
            }
            NodeKind::TypeReference(r) => {
                self.tree.get_mut(r.target).parent = Some(id);
                self.bind_expr(r.target, locals, exports);
                for &a in &r.args {
                    self.tree.get_mut(a).parent = Some(id);
                    self.bind_expr(a, locals, exports);
                }
            }
            NodeKind::ArrayExpr(a) => {
                self.tree.get_mut(a.element).parent = Some(id);
                self.bind_expr(a.element, locals, exports);
            }
            NodeKind::TupleExpr(t) => {
                for &e in &t.elements {
                    self.tree.get_mut(e).parent = Some(id);
                    self.bind_expr(e, locals, exports);
                }
            }
            NodeKind::UnionExpr(u) => {
                self.tree.get_mut(u.left).parent = Some(id);
                self.tree.get_mut(u.right).parent = Some(id);
                self.bind_expr(u.left, locals, exports);
                self.bind_expr(u.right, locals, exports);
            }
            NodeKind::IntersectionExpr(i) => {
                self.tree.get_mut(i.left).parent = Some(id);
                self.tree.get_mut(i.right).parent = Some(id);
                self.bind_expr(i.left, locals, exports);
                self.bind_expr(i.right, locals, exports);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn bind(text: &str) -> (SyntaxTree, SymbolArena, SymbolTableId, BindResult) {
        let result = parse("t.cadl", text);
        let mut tree = result.tree;
        let mut symbols = SymbolArena::new();
        let global = symbols.alloc_table();
        let mut namespaces = NamespaceRegistry::new();
        let bind_result = bind_file(FileId(0), &mut tree, &mut symbols, global, &mut namespaces);
        (tree, symbols, global, bind_result)
    }

    fn bind_two_files(a_text: &str, b_text: &str) -> (SyntaxTree, SyntaxTree, SymbolArena, SymbolTableId) {
        let a = parse("a.cadl", a_text);
        let b = parse("b.cadl", b_text);
        let mut tree_a = a.tree;
        let mut tree_b = b.tree;
        let mut symbols = SymbolArena::new();
        let global = symbols.alloc_table();
        let mut namespaces = NamespaceRegistry::new();
        bind_file(FileId(0), &mut tree_a, &mut symbols, global, &mut namespaces);
        bind_file(FileId(1), &mut tree_b, &mut symbols, global, &mut namespaces);
        (tree_a, tree_b, symbols, global)
    }

    #[test]
    fn declares_top_level_model_into_global_exports() {
        let (_tree, symbols, global, _) = bind("model Foo { }");
        assert!(symbols.table(global).get("Foo").is_some());
    }

    #[test]
    fn template_parameter_declared_into_model_locals() {
        let (tree, symbols, _global, _) = bind("model Box<T> { value: T }");
        let NodeKind::Model(m) = &tree.get(tree.root).kind else { unreachable!() };
        let NodeKind::Script(_) = &tree.get(tree.root).kind else { unreachable!() };
        let model_id = match &tree.get(tree.root).kind {
            NodeKind::Script(s) => s.statements[0],
            _ => unreachable!(),
        };
        let locals = tree.get(model_id).locals.expect("model has locals");
        assert!(symbols.table(locals).get("T").is_some());
        let _ = m;
    }

    #[test]
    fn two_namespace_blocks_share_one_exports_table() {
        let (tree, _symbols, _global, _) =
            bind("namespace Shared { model A { } }\nnamespace Shared { model B { } }");
        let NodeKind::Script(script) = &tree.get(tree.root).kind else { unreachable!() };
        let (ns1, ns2) = (script.statements[0], script.statements[1]);
        let exports1 = tree.get(ns1).exports.unwrap();
        let exports2 = tree.get(ns2).exports.unwrap();
        assert_eq!(exports1, exports2);
    }

    #[test]
    fn dotted_namespace_merge_also_shares_exports() {
        let (tree, symbols, global, _) = bind("namespace A.B { model X { } }");
        let outer = symbols.table(global).get("A").expect("A declared");
        let SymbolKind::Type { decl } = symbols.symbol(outer).kind else { unreachable!() };
        assert!(matches!(tree.get(decl.node).kind, NodeKind::Namespace(_)));
    }

    #[test]
    fn namespace_merges_across_files_by_fully_qualified_name() {
        let (tree_a, tree_b, _symbols, global) =
            bind_two_files("namespace Shared { model A { } }", "namespace Shared { model B { } }");
        let NodeKind::Script(script_a) = &tree_a.get(tree_a.root).kind else { unreachable!() };
        let NodeKind::Script(script_b) = &tree_b.get(tree_b.root).kind else { unreachable!() };
        let exports_a = tree_a.get(script_a.statements[0]).exports.unwrap();
        let exports_b = tree_b.get(script_b.statements[0]).exports.unwrap();
        assert_eq!(exports_a, exports_b);
        let _ = global;
    }

    #[test]
    fn using_statements_are_collected_in_source_order() {
        let (_tree, _symbols, _global, result) = bind("using Foo;\nusing Bar;\nmodel M { }");
        assert_eq!(result.uses.len(), 2);
    }

    #[test]
    fn duplicate_model_name_is_recorded_not_overwritten() {
        let (_tree, symbols, global, _) = bind("model Dup { }\nmodel Dup { }");
        let first = symbols.table(global).get("Dup").expect("first wins");
        assert_eq!(symbols.table(global).duplicates_of("Dup").len(), 1);
        let SymbolKind::Type { decl } = symbols.symbol(first).kind else { unreachable!() };
        let _ = decl;
    }

    #[test]
    fn interface_operation_symbol_not_declared_into_any_table() {
        let (tree, symbols, global, _) = bind("interface Svc { op get(): void; }");
        assert!(symbols.table(global).get("get").is_none());
        let NodeKind::Script(script) = &tree.get(tree.root).kind else { unreachable!() };
        let iface = script.statements[0];
        let NodeKind::Interface(i) = &tree.get(iface).kind else { unreachable!() };
        assert!(tree.get(i.operations[0]).symbol.is_some());
    }
}
