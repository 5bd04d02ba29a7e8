//! Type checker.
//!
//! Walks every bound file and, for each concrete (non-template, or fully
//! instantiated) declaration, resolves references, applies composition
//! (`extends`/`is`/spread/intersection/union), checks defaults, and runs
//! decorators. Template instantiation and cyclic `extends`/`is` chains share
//! one mechanism: a placeholder `TypeId` is reserved and memoized *before*
//! the declaration's body is built, so a reference back to the same
//! declaration (with the same template arguments) during that build resolves
//! to the same id instead of recursing forever.
//!
//! Name resolution climbs the lexical scope chain (locals, then exports, at
//! each enclosing scope) before falling back to the file's `using`
//! statements; a name found through two different `using`s is ambiguous.
//!
//! Decorators are looked up by their bare `@name` in a [`DecoratorRegistry`]
//! supplied by the caller rather than stored on the symbol itself: this
//! crate has no real external-module loader, so a library's decorator
//! implementations are handed in instead of discovered.

use std::collections::HashMap;
use std::sync::Arc;

use crate::binder::NamespaceRegistry;
use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, DiagnosticTarget, SourceFile, Span};
use crate::state::StateRegistry;
use crate::symbols::{DeclRef, FileId, SymbolArena, SymbolId, SymbolKind, SymbolTableId};
use crate::tree::{NodeId, NodeKind, SyntaxTree};
use crate::types::{
    AliasType, ArrayType, DecoratorApplication, DecoratorArgValue, EnumMember, EnumType, Intrinsic,
    InterfaceType, LiteralValue, ModelProperty, ModelType, NamespaceType, OperationType, PropertyId,
    TupleType, Type, TypeArena, TypeId, UnionType, UnionVariant,
};

/// A library's decorator implementation. Arguments have already been
/// evaluated: literals to their constant value, type references to the
/// instantiated type they name.
pub type DecoratorFn = dyn Fn(&mut DecoratorContext, &Type, &[DecoratorArgValue]) -> Result<(), DecoratorError> + Send + Sync;

#[derive(Debug, Clone)]
pub struct DecoratorError(pub String);

impl std::fmt::Display for DecoratorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a decorator function is given to work with: the state registry it
/// may stash metadata into, the sink for any diagnostics it wants to raise
/// directly, and the source location of the declaration it was applied to.
pub struct DecoratorContext<'c> {
    pub state: &'c mut StateRegistry,
    pub diagnostics: &'c mut DiagnosticSink,
    pub target_file: String,
    pub target_span: Span,
}

/// Maps a bare decorator name (`"@doc"`) to its implementation. Owned by the
/// caller of [`check_program`]; this crate ships none of its own.
#[derive(Default, Clone)]
pub struct DecoratorRegistry(HashMap<String, Arc<DecoratorFn>>);

impl DecoratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut DecoratorContext, &Type, &[DecoratorArgValue]) -> Result<(), DecoratorError> + Send + Sync + 'static,
    {
        self.0.insert(name.into(), Arc::new(f));
    }

    fn get(&self, name: &str) -> Option<Arc<DecoratorFn>> {
        self.0.get(name).cloned()
    }
}

/// Everything the checker needs about one already-parsed-and-bound program.
/// Borrowed for the duration of [`check_program`]; the returned
/// [`CheckedProgram`] owns everything it needs afterward.
pub struct CheckInput<'a> {
    pub files: Vec<(FileId, &'a SyntaxTree, &'a SourceFile)>,
    pub symbols: &'a SymbolArena,
    pub global_exports: SymbolTableId,
    /// Every file's `using` statements, in source order, as returned by
    /// [`crate::binder::bind_file`].
    pub uses: HashMap<FileId, Vec<NodeId>>,
}

pub struct CheckedProgram {
    pub types: TypeArena,
    pub diagnostics: DiagnosticSink,
    pub state: StateRegistry,
    /// Top-level declarations reachable from the program's global exports
    /// table, by name. Convenience for callers (and tests) that don't want
    /// to re-walk the symbol tables themselves.
    pub exports: HashMap<String, TypeId>,
}

pub fn check_program<'a>(input: CheckInput<'a>, decorators: &'a DecoratorRegistry) -> CheckedProgram {
    let mut checker = Checker::new(input, decorators);
    checker.run();
    checker.finish()
}

/// Caps how deep one instantiation chain may recurse before it's treated as
/// runaway (reported as `circular-template-instantiation`). Legitimate
/// self-reference within a single instantiation (e.g. `Self is Box<int32>`)
/// never reaches this: it's resolved by the placeholder memo hitting before
/// the body even finishes, not by recursion depth.
const MAX_INSTANTIATION_DEPTH: u32 = 64;

struct Checker<'a> {
    files: HashMap<FileId, (&'a SyntaxTree, &'a SourceFile)>,
    symbols: &'a SymbolArena,
    global_exports: SymbolTableId,
    uses: HashMap<FileId, Vec<NodeId>>,
    decorators: &'a DecoratorRegistry,
    types: TypeArena,
    diagnostics: DiagnosticSink,
    state: StateRegistry,
    /// Memoizes instantiation of `(declaration, template arguments)` to one
    /// `TypeId`, and is populated *before* the body is built so a cyclic
    /// reference to the same key returns the reserved id.
    decl_cache: HashMap<(DeclRef, Vec<TypeId>), TypeId>,
    /// The type a template parameter's own symbol is currently bound to.
    /// Pushed before, and popped after, building the body that introduced
    /// the binding (LIFO, so nested/recursive instantiations of the same
    /// declaration still see their own arguments).
    template_bindings: HashMap<SymbolId, TypeId>,
    literal_cache: HashMap<LiteralValue, TypeId>,
    instantiation_depth: u32,
    /// Fully-qualified namespace name -> its `Namespace` type, populated
    /// lazily the first time any declaration inside (or the namespace
    /// statement itself) is checked. Keyed by name rather than by node so
    /// every file's repetition of `namespace Shared { ... }` converges on
    /// one type regardless of which file is processed first.
    namespace_types: HashMap<String, TypeId>,
}

impl<'a> Checker<'a> {
    fn new(input: CheckInput<'a>, decorators: &'a DecoratorRegistry) -> Self {
        let files = input.files.into_iter().map(|(id, tree, src)| (id, (tree, src))).collect();
        Checker {
            files,
            symbols: input.symbols,
            global_exports: input.global_exports,
            uses: input.uses,
            decorators,
            types: TypeArena::new(),
            diagnostics: DiagnosticSink::new(),
            state: StateRegistry::new(),
            decl_cache: HashMap::new(),
            template_bindings: HashMap::new(),
            literal_cache: HashMap::new(),
            instantiation_depth: 0,
            namespace_types: HashMap::new(),
        }
    }

    /// Returns a reference bound to the checker's own lifetime rather than to
    /// this call's `&self` borrow: `self.files` stores `&'a SyntaxTree`
    /// directly (a `Copy` value), so reading it out is a copy, not a
    /// reborrow. This lets callers hold `tree` across later `&mut self`
    /// calls (building types, emitting diagnostics) without the borrow
    /// checker treating the two as overlapping.
    fn tree_for(&self, file: FileId) -> &'a SyntaxTree {
        self.files[&file].0
    }

    fn source_for(&self, file: FileId) -> &'a SourceFile {
        self.files[&file].1
    }

    fn span_of(&self, file: FileId, node: NodeId) -> Span {
        let n = self.tree_for(file).get(node);
        Span::new(n.pos, n.end)
    }

    fn identifier_text(&self, file: FileId, node: NodeId) -> String {
        match &self.tree_for(file).get(node).kind {
            NodeKind::Identifier(i) => i.text.clone(),
            NodeKind::StringLiteral(s) => s.value.clone(),
            _ => String::new(),
        }
    }

    fn emit(&mut self, file: FileId, node: NodeId, code: DiagnosticCode, message: String) {
        let span = self.span_of(file, node);
        let suppressed = self.is_suppressed(file, node, code);
        let path = self.tree_for(file).file_path.clone();
        let diag = Diagnostic::new(code, message, DiagnosticTarget::span(&path, span));
        self.diagnostics.push(diag, suppressed.as_deref());
    }

    /// Walks up from `node` through ancestor `directives` looking for
    /// `#suppress <code>`: a suppression applies to its own statement and
    /// every descendant.
    fn is_suppressed(&self, file: FileId, node: NodeId, code: DiagnosticCode) -> Option<String> {
        let tree = self.tree_for(file);
        let code_str = code.to_string();
        let mut cur = Some(node);
        while let Some(n) = cur {
            for &d in &tree.get(n).directives {
                if let NodeKind::Directive(dir) = &tree.get(d).kind {
                    if dir.name == "suppress" && dir.args.first().map(String::as_str) == Some(code_str.as_str()) {
                        return Some(code_str);
                    }
                }
            }
            cur = tree.get(n).parent;
        }
        None
    }

    // ---- top-level walk -----------------------------------------------

    fn run(&mut self) {
        let files: Vec<FileId> = self.files.keys().copied().collect();
        for file in files {
            let ids: Vec<NodeId> = self.tree_for(file).iter().map(|(id, _)| id).collect();
            for id in ids {
                self.check_top_level_node(file, id);
            }
        }
        self.emit_duplicate_symbols();
    }

    /// Reports every symbol table's recorded duplicates once, after the
    /// declarations themselves have been checked. A colliding symbol is
    /// flagged whether the collision happened within one file's scope or
    /// across two files sharing the same table (global scope, or a merged
    /// namespace's exports).
    fn emit_duplicate_symbols(&mut self) {
        let table_ids: Vec<SymbolTableId> = self.symbols.table_ids().collect();
        for table_id in table_ids {
            let duplicates: Vec<(String, Vec<SymbolId>)> = self
                .symbols
                .table(table_id)
                .all_duplicates()
                .map(|(name, syms)| (name.to_string(), syms.to_vec()))
                .collect();
            for (name, syms) in duplicates {
                for sym in syms {
                    if let SymbolKind::Type { decl } | SymbolKind::Local { decl } = self.symbols.symbol(sym).kind {
                        self.emit(
                            decl.file,
                            decl.node,
                            DiagnosticCode::DuplicateSymbol,
                            format!("Duplicate declaration of '{name}'."),
                        );
                    }
                }
            }
        }
    }

    fn check_top_level_node(&mut self, file: FileId, id: NodeId) {
        let kind = self.tree_for(file).get(id).kind.clone();
        let decl = DeclRef { file, node: id };
        match kind {
            NodeKind::Model(m) if m.name.is_some() && m.template_params.is_empty() => {
                self.get_or_build_decl(decl, Vec::new());
            }
            NodeKind::Interface(i) if i.template_params.is_empty() => {
                self.get_or_build_decl(decl, Vec::new());
            }
            NodeKind::Union(u) if u.name.is_some() && u.template_params.is_empty() => {
                self.get_or_build_decl(decl, Vec::new());
            }
            NodeKind::Enum(_) => {
                self.get_or_build_decl(decl, Vec::new());
            }
            NodeKind::Alias(a) if a.template_params.is_empty() => {
                self.get_or_build_decl(decl, Vec::new());
            }
            NodeKind::Operation(_) if !self.is_interface_member(file, id) => {
                self.get_or_build_decl(decl, Vec::new());
            }
            NodeKind::Namespace(_) => {
                self.ensure_namespace_type(decl);
            }
            _ => {}
        }
    }

    fn is_interface_member(&self, file: FileId, id: NodeId) -> bool {
        match self.tree_for(file).get(id).parent {
            Some(p) => matches!(self.tree_for(file).get(p).kind, NodeKind::Interface(_)),
            None => false,
        }
    }

    fn finish(mut self) -> CheckedProgram {
        let mut exports = HashMap::new();
        let entries: Vec<(String, SymbolId)> =
            self.symbols.table(self.global_exports).iter().map(|(n, s)| (n.to_string(), s)).collect();
        for (name, sym) in entries {
            let SymbolKind::Type { decl } = self.symbols.symbol(sym).kind.clone() else { continue };
            if let Some(&id) = self.decl_cache.get(&(decl, Vec::new())) {
                exports.insert(name, id);
            } else if matches!(self.tree_for(decl.file).get(decl.node).kind, NodeKind::Namespace(_)) {
                let fqn = self.fqn_of_namespace(decl.file, decl.node);
                if let Some(&id) = self.namespace_types.get(&fqn) {
                    exports.insert(name, id);
                }
            }
        }
        CheckedProgram { types: self.types, diagnostics: self.diagnostics, state: self.state, exports }
    }

    // ---- namespaces ------------------------------------------------------

    fn enclosing_namespace_decl(&self, file: FileId, node: NodeId) -> Option<NodeId> {
        let tree = self.tree_for(file);
        let mut cur = tree.get(node).parent;
        while let Some(p) = cur {
            if matches!(tree.get(p).kind, NodeKind::Namespace(_)) {
                return Some(p);
            }
            cur = tree.get(p).parent;
        }
        None
    }

    fn fqn_of_namespace(&self, file: FileId, ns_node: NodeId) -> String {
        let tree = self.tree_for(file);
        let mut parts = Vec::new();
        let mut cur = Some(ns_node);
        while let Some(n) = cur {
            if let NodeKind::Namespace(ns) = &tree.get(n).kind {
                parts.push(self.identifier_text(file, ns.name));
            }
            cur = tree.get(n).parent;
        }
        parts.reverse();
        parts.join(".")
    }

    /// Build (or fetch the memoized) `Namespace` type for the namespace
    /// enclosing `decl`, if any. Namespace types are keyed by fully-qualified
    /// name so every file's declaration of the same namespace converges on
    /// one `TypeId` regardless of processing order.
    fn ensure_namespace_for(&mut self, decl: DeclRef) -> Option<TypeId> {
        let ns_node = self.enclosing_namespace_decl(decl.file, decl.node)?;
        self.ensure_namespace_type(DeclRef { file: decl.file, node: ns_node })
    }

    fn ensure_namespace_type(&mut self, ns_decl: DeclRef) -> Option<TypeId> {
        let fqn = self.fqn_of_namespace(ns_decl.file, ns_decl.node);
        if let Some(&id) = self.namespace_types.get(&fqn) {
            return Some(id);
        }
        let placeholder = self.types.reserve();
        self.namespace_types.insert(fqn.clone(), placeholder);

        let parent = self.ensure_namespace_for(ns_decl);
        let _ = parent;
        let NodeKind::Namespace(ns) = self.tree_for(ns_decl.file).get(ns_decl.node).kind.clone() else {
            unreachable!("ensure_namespace_type called on a non-namespace node")
        };
        let name = self.identifier_text(ns_decl.file, ns.name);
        let decorators = self.evaluate_decorators(ns_decl, &ns.decorators);
        self.types.set(
            placeholder,
            Type::Namespace(NamespaceType { name, full_name: fqn, exports: HashMap::new(), decorators }),
        );
        self.fire_decorators(placeholder, ns_decl);
        Some(placeholder)
    }

    // ---- declaration instantiation ----------------------------------------

    fn template_params_of(kind: &NodeKind) -> &[NodeId] {
        match kind {
            NodeKind::Model(m) => &m.template_params,
            NodeKind::Interface(i) => &i.template_params,
            NodeKind::Union(u) => &u.template_params,
            NodeKind::Alias(a) => &a.template_params,
            NodeKind::Operation(op) => &op.template_params,
            _ => &[],
        }
    }

    /// Build (or fetch the memoized) type for `decl` applied to
    /// `template_args`. Reserves the arena slot before building the body so
    /// a reference back to this exact `(decl, args)` pair during the build
    /// resolves to the same id.
    fn get_or_build_decl(&mut self, decl: DeclRef, template_args: Vec<TypeId>) -> TypeId {
        let key = (decl, template_args.clone());
        if let Some(&id) = self.decl_cache.get(&key) {
            return id;
        }
        let placeholder = self.types.reserve();
        self.decl_cache.insert(key, placeholder);

        self.instantiation_depth += 1;
        if self.instantiation_depth > MAX_INSTANTIATION_DEPTH {
            self.emit(
                decl.file,
                decl.node,
                DiagnosticCode::CircularTemplateInstantiation,
                "Template instantiation did not terminate.".to_string(),
            );
            self.types.set(placeholder, Type::Intrinsic(Intrinsic::Unknown));
            self.instantiation_depth -= 1;
            return placeholder;
        }

        let kind = self.tree_for(decl.file).get(decl.node).kind.clone();
        let params = Self::template_params_of(&kind).to_vec();
        let mut bound_params = Vec::new();
        for (i, &p) in params.iter().enumerate() {
            let NodeKind::TemplateParameter(tp) = self.tree_for(decl.file).get(p).kind.clone() else { continue };
            let sym = self.tree_for(decl.file).get(p).symbol.expect("template param bound by binder");
            let arg = match template_args.get(i).copied() {
                Some(a) => a,
                None => match tp.default {
                    Some(def) => self.check_type_expr(decl.file, def),
                    None => self.types.alloc(Type::Intrinsic(Intrinsic::Unknown)),
                },
            };
            self.template_bindings.insert(sym, arg);
            bound_params.push(sym);
        }

        let built = match kind {
            NodeKind::Model(m) => self.build_model(decl, m, placeholder, &template_args),
            NodeKind::Interface(i) => self.build_interface(decl, i, placeholder, &template_args),
            NodeKind::Union(u) => self.build_union(decl, u, &template_args),
            NodeKind::Alias(a) => self.build_alias(decl, a),
            NodeKind::Operation(op) => self.build_operation(decl, op, None),
            NodeKind::Enum(e) => self.build_enum(decl, e),
            _ => Type::Intrinsic(Intrinsic::Unknown),
        };
        self.types.set(placeholder, built);
        self.fire_decorators(placeholder, decl);

        for sym in bound_params {
            self.template_bindings.remove(&sym);
        }
        self.instantiation_depth -= 1;
        placeholder
    }

    fn resolve_base(&mut self, decl: DeclRef, expr: NodeId, self_id: TypeId, name: &str, clause: &str) -> Option<TypeId> {
        let ty = self.check_type_expr(decl.file, expr);
        if ty == self_id {
            let _ = clause;
            self.emit(
                decl.file,
                expr,
                DiagnosticCode::RecursiveBase,
                format!("Model type '{name}' recursively references itself as a base type."),
            );
            return None;
        }
        Some(ty)
    }

    fn collect_inherited(&mut self, base: TypeId, properties: &mut Vec<PropertyId>, name_origin: &mut HashMap<String, bool>) {
        let base_props: Vec<PropertyId> = match self.types.get(base) {
            Type::Model(m) => m.properties.clone(),
            _ => return,
        };
        for prop_id in base_props {
            let prop = self.types.property(prop_id).clone();
            if name_origin.contains_key(&prop.name) {
                continue;
            }
            name_origin.insert(prop.name.clone(), true);
            let new_id = self.types.alloc_property(ModelProperty {
                name: prop.name,
                type_: prop.type_,
                optional: prop.optional,
                default: prop.default,
                source_property: Some(prop_id),
                decorators: prop.decorators,
                node: prop.node,
            });
            properties.push(new_id);
        }
    }

    fn build_model(&mut self, decl: DeclRef, m: crate::tree::ModelNode, self_id: TypeId, template_args: &[TypeId]) -> Type {
        let name = m.name.map(|n| self.identifier_text(decl.file, n));
        let namespace = self.ensure_namespace_for(decl);
        let mut properties = Vec::new();
        let mut name_origin: HashMap<String, bool> = HashMap::new();

        let name_for_diag = name.clone().unwrap_or_default();
        let mut base_model = m.extends.and_then(|ext| self.resolve_base(decl, ext, self_id, &name_for_diag, "extends"));
        if let Some(base) = base_model {
            self.collect_inherited(base, &mut properties, &mut name_origin);
        }
        if let Some(isc) = m.is_clause {
            if let Some(is_target) = self.resolve_base(decl, isc, self_id, &name_for_diag, "is") {
                self.collect_inherited(is_target, &mut properties, &mut name_origin);
                if base_model.is_none() {
                    base_model = match self.types.get(is_target) {
                        Type::Model(im) => im.base_model,
                        _ => None,
                    };
                }
            }
        }

        self.check_members_into(decl, &m.members, &mut properties, &mut name_origin);
        let decorators = self.evaluate_decorators(decl, &m.decorators);
        Type::Model(ModelType { name, properties, base_model, template_arguments: template_args.to_vec(), namespace, decorators, node: decl })
    }

    fn build_anonymous_model(&mut self, file: FileId, node: NodeId, m: crate::tree::ModelNode) -> TypeId {
        let placeholder = self.types.reserve();
        let decl = DeclRef { file, node };
        let built = self.build_model(decl, m, placeholder, &[]);
        self.types.set(placeholder, built);
        placeholder
    }

    fn check_members_into(
        &mut self,
        decl: DeclRef,
        members: &[NodeId],
        properties: &mut Vec<PropertyId>,
        name_origin: &mut HashMap<String, bool>,
    ) {
        for &member in members {
            let kind = self.tree_for(decl.file).get(member).kind.clone();
            match kind {
                NodeKind::ModelProperty(p) => {
                    let name = self.identifier_text(decl.file, p.name);
                    let type_ = self.check_type_expr(decl.file, p.type_expr);
                    let default = p.default.map(|d| self.check_default(decl.file, d, type_, p.optional, p.name));
                    let decorators = self.evaluate_decorators(decl, &p.decorators);
                    if let Some(&was_inherited) = name_origin.get(&name) {
                        let message = if was_inherited {
                            format!("Property '{name}' already exists as an inherited property.")
                        } else {
                            format!("Property '{name}' is already declared.")
                        };
                        self.emit(decl.file, p.name, DiagnosticCode::DuplicateProperty, message);
                        continue;
                    }
                    name_origin.insert(name.clone(), false);
                    let prop_id = self.types.alloc_property(ModelProperty {
                        name,
                        type_,
                        optional: p.optional,
                        default,
                        source_property: None,
                        decorators,
                        node: DeclRef { file: decl.file, node: member },
                    });
                    properties.push(prop_id);
                }
                NodeKind::ModelSpread(s) => {
                    let target = self.check_type_expr(decl.file, s.target);
                    let spread_props: Vec<PropertyId> = match self.types.get(target) {
                        Type::Model(m) => m.properties.clone(),
                        _ => continue,
                    };
                    for prop_id in spread_props {
                        let prop = self.types.property(prop_id).clone();
                        if name_origin.contains_key(&prop.name) {
                            continue;
                        }
                        name_origin.insert(prop.name.clone(), false);
                        let new_id = self.types.alloc_property(ModelProperty {
                            name: prop.name,
                            type_: prop.type_,
                            optional: prop.optional,
                            default: prop.default,
                            source_property: Some(prop_id),
                            decorators: prop.decorators,
                            node: prop.node,
                        });
                        properties.push(new_id);
                    }
                }
                _ => {}
            }
        }
    }

    fn check_default(&mut self, file: FileId, node: NodeId, property_type: TypeId, optional: bool, name_node: NodeId) -> LiteralValue {
        let lit = self.literal_of_node(file, node);
        if !optional {
            self.emit(
                file,
                name_node,
                DiagnosticCode::DefaultOnRequired,
                "Default values are only allowed on optional properties.".to_string(),
            );
        }
        if !self.default_matches(&lit, property_type) {
            let label = self.type_label(property_type);
            self.emit(file, node, DiagnosticCode::DefaultTypeMismatch, format!("Default must be a {label}."));
        }
        lit
    }

    fn default_matches(&self, lit: &LiteralValue, ty: TypeId) -> bool {
        match (self.types.get(ty), lit) {
            (Type::Intrinsic(Intrinsic::String), LiteralValue::String(_)) => true,
            (Type::Intrinsic(Intrinsic::String), _) => false,
            (Type::Intrinsic(i), LiteralValue::Number(_))
                if matches!(*i, Intrinsic::Int32 | Intrinsic::Int64 | Intrinsic::Float32 | Intrinsic::Float64) =>
            {
                true
            }
            (Type::Intrinsic(i), _)
                if matches!(*i, Intrinsic::Int32 | Intrinsic::Int64 | Intrinsic::Float32 | Intrinsic::Float64) =>
            {
                false
            }
            (Type::Intrinsic(Intrinsic::Boolean), LiteralValue::Boolean(_)) => true,
            (Type::Intrinsic(Intrinsic::Boolean), _) => false,
            (Type::Literal(expected), got) => expected == got,
            _ => true,
        }
    }

    fn type_label(&self, ty: TypeId) -> &'static str {
        match self.types.get(ty) {
            Type::Intrinsic(Intrinsic::String) => "string",
            Type::Intrinsic(Intrinsic::Boolean) => "boolean",
            Type::Intrinsic(i) if matches!(*i, Intrinsic::Int32 | Intrinsic::Int64 | Intrinsic::Float32 | Intrinsic::Float64) => "number",
            _ => "value",
        }
    }

    fn literal_of_node(&mut self, file: FileId, node: NodeId) -> LiteralValue {
        match self.tree_for(file).get(node).kind.clone() {
            NodeKind::StringLiteral(s) => LiteralValue::String(s.value),
            NodeKind::NumericLiteral(n) => LiteralValue::Number(n.raw),
            NodeKind::BooleanLiteral(b) => LiteralValue::Boolean(b.value),
            _ => LiteralValue::String(String::new()),
        }
    }

    fn intern_literal(&mut self, value: LiteralValue) -> TypeId {
        if let Some(&id) = self.literal_cache.get(&value) {
            return id;
        }
        let id = self.types.alloc(Type::Literal(value.clone()));
        self.literal_cache.insert(value, id);
        id
    }

    fn build_interface(&mut self, decl: DeclRef, i: crate::tree::InterfaceNode, self_id: TypeId, template_args: &[TypeId]) -> Type {
        let namespace = self.ensure_namespace_for(decl);
        let mut operations = Vec::new();
        let mut mixed_in = Vec::new();
        for &mix in &i.mixes {
            let target = self.check_type_expr(decl.file, mix);
            mixed_in.push(target);
            if let Type::Interface(mixed) = self.types.get(target) {
                operations.extend(mixed.operations.clone());
            }
        }
        for &op in &i.operations {
            let NodeKind::Operation(op_node) = self.tree_for(decl.file).get(op).kind.clone() else { continue };
            let op_decl = DeclRef { file: decl.file, node: op };
            let ty = self.build_operation(op_decl, op_node, Some(self_id));
            let op_id = self.types.alloc(ty);
            self.fire_decorators(op_id, op_decl);
            operations.push(op_id);
        }
        let decorators = self.evaluate_decorators(decl, &i.decorators);
        let _ = template_args;
        Type::Interface(InterfaceType { name: self.identifier_text(decl.file, i.name), operations, mixed_in, namespace, decorators, node: decl })
    }

    fn build_operation(&mut self, decl: DeclRef, op: crate::tree::OperationNode, interface: Option<TypeId>) -> Type {
        let parameters = self.check_type_expr(decl.file, op.params);
        let return_type = self.check_type_expr(decl.file, op.return_type);
        let name = self.identifier_text(decl.file, op.name);
        let namespace = if interface.is_none() { self.ensure_namespace_for(decl) } else { None };
        let decorators = self.evaluate_decorators(decl, &op.decorators);
        Type::Operation(OperationType { name, parameters, return_type, interface, namespace, decorators, node: decl })
    }

    fn build_union(&mut self, decl: DeclRef, u: crate::tree::UnionNode, template_args: &[TypeId]) -> Type {
        let name = u.name.map(|n| self.identifier_text(decl.file, n));
        let namespace = self.ensure_namespace_for(decl);
        let mut variants = Vec::new();
        for &v in &u.variants {
            let NodeKind::UnionVariant(variant) = self.tree_for(decl.file).get(v).kind.clone() else { continue };
            let vname = variant.name.map(|n| self.identifier_text(decl.file, n));
            let vty = self.check_type_expr(decl.file, variant.type_expr);
            variants.push(UnionVariant { name: vname, type_: vty });
        }
        let decorators = self.evaluate_decorators(decl, &u.decorators);
        let _ = template_args;
        Type::Union(UnionType { name, variants, namespace, decorators, node: Some(decl) })
    }

    fn build_enum(&mut self, decl: DeclRef, e: crate::tree::EnumNode) -> Type {
        let namespace = self.ensure_namespace_for(decl);
        let mut members = Vec::new();
        for &m in &e.members {
            let NodeKind::EnumMember(mem) = self.tree_for(decl.file).get(m).kind.clone() else { continue };
            let name = self.identifier_text(decl.file, mem.name);
            let value = mem.value.map(|v| self.literal_of_node(decl.file, v));
            // Collected for introspection but not invoked: enum members have
            // no Type of their own to hand a decorator, unlike every other
            // decorated declaration here.
            let decorators = self.evaluate_decorators(decl, &mem.decorators);
            members.push(self.types.alloc_member(EnumMember { name, value, decorators }));
        }
        let decorators = self.evaluate_decorators(decl, &e.decorators);
        Type::Enum(EnumType { name: self.identifier_text(decl.file, e.name), members, namespace, decorators, node: decl })
    }

    fn build_alias(&mut self, decl: DeclRef, a: crate::tree::AliasNode) -> Type {
        let target = self.check_type_expr(decl.file, a.value);
        Type::Alias(AliasType { name: self.identifier_text(decl.file, a.name), target })
    }

    // ---- type expressions --------------------------------------------------

    fn check_type_expr(&mut self, file: FileId, node: NodeId) -> TypeId {
        let kind = self.tree_for(file).get(node).kind.clone();
        match kind {
            NodeKind::TypeReference(r) => self.check_type_reference(file, node, r),
            NodeKind::Model(m) => self.build_anonymous_model(file, node, m),
            NodeKind::ArrayExpr(a) => {
                let element = self.check_type_expr(file, a.element);
                self.types.alloc(Type::Array(ArrayType { element }))
            }
            NodeKind::TupleExpr(t) => {
                let elements = t.elements.iter().map(|&e| self.check_type_expr(file, e)).collect();
                self.types.alloc(Type::Tuple(TupleType { elements }))
            }
            NodeKind::UnionExpr(_) => {
                let mut variants = Vec::new();
                self.flatten_union(file, node, &mut variants);
                self.types.alloc(Type::Union(UnionType { name: None, variants, namespace: None, decorators: Vec::new(), node: None }))
            }
            NodeKind::IntersectionExpr(_) => self.check_intersection(file, node),
            NodeKind::StringLiteral(s) => self.intern_literal(LiteralValue::String(s.value)),
            NodeKind::NumericLiteral(n) => self.intern_literal(LiteralValue::Number(n.raw)),
            NodeKind::BooleanLiteral(b) => self.intern_literal(LiteralValue::Boolean(b.value)),
            _ => self.types.alloc(Type::Intrinsic(Intrinsic::Unknown)),
        }
    }

    fn flatten_union(&mut self, file: FileId, node: NodeId, out: &mut Vec<UnionVariant>) {
        let kind = self.tree_for(file).get(node).kind.clone();
        if let NodeKind::UnionExpr(u) = kind {
            self.flatten_union(file, u.left, out);
            self.flatten_union(file, u.right, out);
        } else {
            let ty = self.check_type_expr(file, node);
            out.push(UnionVariant { name: None, type_: ty });
        }
    }

    fn flatten_intersection(&mut self, file: FileId, node: NodeId, out: &mut Vec<TypeId>) {
        let kind = self.tree_for(file).get(node).kind.clone();
        if let NodeKind::IntersectionExpr(i) = kind {
            self.flatten_intersection(file, i.left, out);
            self.flatten_intersection(file, i.right, out);
        } else {
            out.push(self.check_type_expr(file, node));
        }
    }

    /// Merges the effective properties of every operand into one anonymous
    /// model, same provenance convention as `extends`/`is`/spread: later
    /// operands never overwrite an earlier one's property of the same name.
    fn check_intersection(&mut self, file: FileId, node: NodeId) -> TypeId {
        let mut parts = Vec::new();
        self.flatten_intersection(file, node, &mut parts);
        let mut properties = Vec::new();
        let mut name_origin: HashMap<String, bool> = HashMap::new();
        for part in parts {
            self.collect_inherited(part, &mut properties, &mut name_origin);
        }
        self.types.alloc(Type::Model(ModelType {
            name: None,
            properties,
            base_model: None,
            template_arguments: Vec::new(),
            namespace: None,
            decorators: Vec::new(),
            node: DeclRef { file, node },
        }))
    }

    fn check_type_reference(&mut self, file: FileId, ref_node: NodeId, r: crate::tree::TypeReferenceNode) -> TypeId {
        let segments = self.flatten_path(file, r.target);
        let args: Vec<TypeId> = r.args.iter().map(|&a| self.check_type_expr(file, a)).collect();
        match self.resolve_path(file, ref_node, &segments) {
            Some(sym) => self.type_of_symbol(sym, args),
            None => {
                if segments.len() == 1 {
                    if let Some(intrinsic) = Intrinsic::from_name(&segments[0].0) {
                        return self.types.alloc(Type::Intrinsic(intrinsic));
                    }
                }
                let path_text = segments.iter().map(|s| s.0.as_str()).collect::<Vec<_>>().join(".");
                self.emit(file, ref_node, DiagnosticCode::UnresolvedReference, format!("Cannot resolve type reference '{path_text}'."));
                self.types.alloc(Type::Intrinsic(Intrinsic::Unknown))
            }
        }
    }

    fn type_of_symbol(&mut self, sym: SymbolId, args: Vec<TypeId>) -> TypeId {
        match self.symbols.symbol(sym).kind.clone() {
            SymbolKind::Local { .. } => self
                .template_bindings
                .get(&sym)
                .copied()
                .unwrap_or_else(|| self.types.alloc(Type::Intrinsic(Intrinsic::Unknown))),
            SymbolKind::Using { target, .. } => self.type_of_symbol(target, args),
            SymbolKind::Type { decl } => self.get_or_build_decl(decl, args),
            SymbolKind::Decorator { .. } => self.types.alloc(Type::Intrinsic(Intrinsic::Unknown)),
        }
    }

    fn flatten_path(&self, file: FileId, node: NodeId) -> Vec<(String, NodeId)> {
        match &self.tree_for(file).get(node).kind {
            NodeKind::MemberExpr(m) => {
                let mut segs = self.flatten_path(file, m.base);
                segs.extend(self.flatten_path(file, m.member));
                segs
            }
            NodeKind::Identifier(i) => vec![(i.text.clone(), node)],
            _ => Vec::new(),
        }
    }

    fn step_member(&self, sym: SymbolId, member: &str) -> Option<SymbolId> {
        let SymbolKind::Type { decl } = self.symbols.symbol(sym).kind.clone() else { return None };
        let exports = self.tree_for(decl.file).get(decl.node).exports?;
        self.symbols.table(exports).get(member)
    }

    fn resolve_path(&mut self, file: FileId, from: NodeId, segments: &[(String, NodeId)]) -> Option<SymbolId> {
        let (first, _) = segments.first()?;
        let mut sym = self.resolve_name(file, from, first)?;
        for (name, node) in &segments[1..] {
            match self.step_member(sym, name) {
                Some(next) => sym = next,
                None => {
                    self.emit(file, *node, DiagnosticCode::UnresolvedReference, format!("Namespace has no member '{name}'."));
                    return None;
                }
            }
        }
        Some(sym)
    }

    /// Locals and exports of every enclosing scope, nearest first, then the
    /// file's `using` statements. A name reachable through two different
    /// `using`s with no closer binding is ambiguous.
    fn resolve_name(&mut self, file: FileId, from: NodeId, name: &str) -> Option<SymbolId> {
        let tree = self.tree_for(file);
        let mut scope = tree.enclosing_scope(from);
        loop {
            let node = tree.get(scope);
            if let Some(locals) = node.locals {
                if let Some(sym) = self.symbols.table(locals).get(name) {
                    return Some(sym);
                }
            }
            if let Some(exports) = node.exports {
                if let Some(sym) = self.symbols.table(exports).get(name) {
                    return Some(sym);
                }
            }
            match node.parent {
                Some(p) => scope = tree.enclosing_scope(p),
                None => break,
            }
        }

        let uses = self.uses.get(&file).cloned().unwrap_or_default();
        let mut found: Option<SymbolId> = None;
        let mut ambiguous = false;
        for use_node in uses {
            let NodeKind::Using(u) = tree.get(use_node).kind.clone() else { continue };
            let use_segments = self.flatten_path(file, u.path);
            let Some(ns_sym) = self.resolve_path(file, use_node, &use_segments) else { continue };
            if let Some(member_sym) = self.step_member(ns_sym, name) {
                match found {
                    None => found = Some(member_sym),
                    Some(existing) if existing != member_sym => ambiguous = true,
                    _ => {}
                }
            }
        }
        if ambiguous {
            self.emit(
                file,
                from,
                DiagnosticCode::AmbiguousReference,
                format!("Reference to '{name}' is ambiguous across multiple 'using' imports."),
            );
            return None;
        }
        found
    }

    // ---- decorators --------------------------------------------------------

    fn evaluate_decorators(&mut self, decl: DeclRef, nodes: &[NodeId]) -> Vec<DecoratorApplication> {
        nodes.iter().map(|&d| self.evaluate_decorator(decl.file, d)).collect()
    }

    fn evaluate_decorator(&mut self, file: FileId, node: NodeId) -> DecoratorApplication {
        let NodeKind::Decorator(d) = self.tree_for(file).get(node).kind.clone() else {
            return DecoratorApplication { name: String::new(), args: Vec::new(), arg_source_span: Span::empty_at(0) };
        };
        let segments = self.flatten_path(file, d.path);
        let name = format!("@{}", segments.iter().map(|s| s.0.as_str()).collect::<Vec<_>>().join("."));
        let args = d.args.iter().map(|&a| self.evaluate_decorator_arg(file, a)).collect();
        let arg_source_span = self.span_of(file, node);
        DecoratorApplication { name, args, arg_source_span }
    }

    fn evaluate_decorator_arg(&mut self, file: FileId, node: NodeId) -> DecoratorArgValue {
        match self.tree_for(file).get(node).kind.clone() {
            NodeKind::StringLiteral(s) => DecoratorArgValue::Literal(LiteralValue::String(s.value)),
            NodeKind::NumericLiteral(n) => DecoratorArgValue::Literal(LiteralValue::Number(n.raw)),
            NodeKind::BooleanLiteral(b) => DecoratorArgValue::Literal(LiteralValue::Boolean(b.value)),
            _ => DecoratorArgValue::Type(self.check_type_expr(file, node)),
        }
    }

    /// Runs every decorator attached to the type just built at `id`. Only
    /// called on fully-instantiated declarations (models, interfaces,
    /// unions, enums, operations, namespaces) — never on an uninstantiated
    /// template, since those never reach [`Checker::get_or_build_decl`] at
    /// all: decorator application never fires on a template with unbound
    /// parameters.
    fn fire_decorators(&mut self, id: TypeId, decl: DeclRef) {
        let decorators = self.types.get(id).decorators().to_vec();
        for app in decorators {
            let Some(f) = self.decorators.get(&app.name) else {
                self.emit(decl.file, decl.node, DiagnosticCode::InvalidDecoratorTarget, format!("Unknown decorator '{}'.", app.name));
                continue;
            };
            let snapshot = self.types.get(id).clone();
            let span = self.span_of(decl.file, decl.node);
            let target_file = self.tree_for(decl.file).file_path.clone();
            let mut ctx = DecoratorContext { state: &mut self.state, diagnostics: &mut self.diagnostics, target_file, target_span: span };
            if let Err(e) = f(&mut ctx, &snapshot, &app.args) {
                self.emit(decl.file, decl.node, DiagnosticCode::DecoratorThrew, format!("Decorator '{}' failed: {e}", app.name));
            }
        }
    }
}
