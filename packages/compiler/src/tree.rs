//! The syntax tree produced by the parser.
//!
//! One enumerated node kind with a variant payload per case; shared fields
//! (pos, end, flags, parent, directives) live in every node rather than in
//! a class hierarchy. Nodes are addressed by a stable arena index so
//! cyclic declarations (a model referencing itself) can be wired up
//! before their body is fully populated.

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::symbols::{SymbolId, SymbolTableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NodeFlags: u8 {
        const HAS_PARSE_ERROR = 1 << 0;
        const DESCENDANT_HAS_ERROR = 1 << 1;
        const DESCENDANT_EXAMINED = 1 << 2;
        const SYNTHETIC = 1 << 3;
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub pos: u32,
    pub end: u32,
    pub parent: Option<NodeId>,
    pub flags: NodeFlags,
    /// Leading `#...` directives attached at this statement/list-item.
    pub directives: SmallVec<[NodeId; 2]>,
    /// Set by the binder for declaration nodes.
    pub symbol: Option<SymbolId>,
    /// Set by the binder for scoped kinds (Script, Namespace, Model,
    /// Interface, Union, Alias).
    pub locals: Option<SymbolTableId>,
    /// Set by the binder for Script and Namespace nodes only.
    pub exports: Option<SymbolTableId>,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_scoped_kind(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Script(_)
                | NodeKind::Namespace(_)
                | NodeKind::Model(_)
                | NodeKind::Interface(_)
                | NodeKind::Union(_)
                | NodeKind::Alias(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct ScriptNode {
    pub statements: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ImportNode {
    pub path: NodeId,
}

#[derive(Debug, Clone)]
pub struct NamespaceNode {
    pub name: NodeId,
    /// `None` for a blockless namespace; its body is the rest of the file.
    pub body: Option<Vec<NodeId>>,
    pub decorators: Vec<NodeId>,
    pub blockless: bool,
}

#[derive(Debug, Clone)]
pub struct UsingNode {
    pub path: NodeId,
}

#[derive(Debug, Clone)]
pub struct ModelNode {
    /// `None` for an anonymous model expression (`{ ... }` used as a type).
    pub name: Option<NodeId>,
    pub template_params: Vec<NodeId>,
    pub extends: Option<NodeId>,
    pub is_clause: Option<NodeId>,
    /// `ModelProperty` or `ModelSpread` nodes, in source order.
    pub members: Vec<NodeId>,
    pub decorators: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ModelPropertyNode {
    pub name: NodeId,
    pub type_expr: NodeId,
    pub optional: bool,
    pub default: Option<NodeId>,
    pub decorators: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ModelSpreadNode {
    pub target: NodeId,
}

#[derive(Debug, Clone)]
pub struct InterfaceNode {
    pub name: NodeId,
    pub template_params: Vec<NodeId>,
    pub mixes: Vec<NodeId>,
    pub operations: Vec<NodeId>,
    pub decorators: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct OperationNode {
    pub name: NodeId,
    pub template_params: Vec<NodeId>,
    pub params: NodeId,
    pub return_type: NodeId,
    pub decorators: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct UnionNode {
    pub name: Option<NodeId>,
    pub template_params: Vec<NodeId>,
    pub variants: Vec<NodeId>,
    pub decorators: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct UnionVariantNode {
    pub name: Option<NodeId>,
    pub type_expr: NodeId,
    pub decorators: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct EnumNode {
    pub name: NodeId,
    pub members: Vec<NodeId>,
    pub decorators: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct EnumMemberNode {
    pub name: NodeId,
    pub value: Option<NodeId>,
    pub decorators: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct AliasNode {
    pub name: NodeId,
    pub template_params: Vec<NodeId>,
    pub value: NodeId,
}

#[derive(Debug, Clone)]
pub struct TemplateParameterNode {
    pub name: NodeId,
    pub default: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct DecoratorNode {
    pub path: NodeId,
    pub args: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct DirectiveNode {
    pub name: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IdentifierNode {
    pub text: String,
    /// A synthesized placeholder stands in for a name the parser could not
    /// recover: a unique synthetic-missing identifier.
    pub missing: bool,
}

#[derive(Debug, Clone)]
pub struct StringLiteralNode {
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct NumericLiteralNode {
    pub raw: String,
}

#[derive(Debug, Clone)]
pub struct BooleanLiteralNode {
    pub value: bool,
}

#[derive(Debug, Clone)]
pub struct MemberExprNode {
    pub base: NodeId,
    pub member: NodeId,
}

#[derive(Debug, Clone)]
pub struct TypeReferenceNode {
    pub target: NodeId,
    pub args: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ArrayExprNode {
    pub element: NodeId,
}

#[derive(Debug, Clone)]
pub struct TupleExprNode {
    pub elements: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct UnionExprNode {
    pub left: NodeId,
    pub right: NodeId,
}

#[derive(Debug, Clone)]
pub struct IntersectionExprNode {
    pub left: NodeId,
    pub right: NodeId,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Script(ScriptNode),
    Import(ImportNode),
    Namespace(NamespaceNode),
    Using(UsingNode),
    Model(ModelNode),
    ModelProperty(ModelPropertyNode),
    ModelSpread(ModelSpreadNode),
    Interface(InterfaceNode),
    Operation(OperationNode),
    Union(UnionNode),
    UnionVariant(UnionVariantNode),
    Enum(EnumNode),
    EnumMember(EnumMemberNode),
    Alias(AliasNode),
    TemplateParameter(TemplateParameterNode),
    Decorator(DecoratorNode),
    Directive(DirectiveNode),
    Identifier(IdentifierNode),
    StringLiteral(StringLiteralNode),
    NumericLiteral(NumericLiteralNode),
    BooleanLiteral(BooleanLiteralNode),
    MemberExpr(MemberExprNode),
    TypeReference(TypeReferenceNode),
    ArrayExpr(ArrayExprNode),
    TupleExpr(TupleExprNode),
    UnionExpr(UnionExprNode),
    IntersectionExpr(IntersectionExprNode),
    EmptyStatement,
    InvalidStatement,
}

/// Owns every node of one file's tree, addressed by `NodeId`.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub file_path: String,
    nodes: Vec<Node>,
    pub root: NodeId,
    /// Clears the first time a node could not be fully parsed.
    pub printable: bool,
}

impl SyntaxTree {
    pub(crate) fn new(file_path: String, nodes: Vec<Node>, root: NodeId, printable: bool) -> Self {
        SyntaxTree { file_path, nodes, root, printable }
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i as u32), n))
    }

    /// Walk parent links until a scoped ancestor (or the root) is found.
    pub fn enclosing_scope(&self, mut id: NodeId) -> NodeId {
        loop {
            let node = self.get(id);
            if node.is_scoped_kind() {
                return id;
            }
            match node.parent {
                Some(p) => id = p,
                None => return id,
            }
        }
    }
}
