//! Symbols and symbol tables.
//!
//! A symbol table is insertion-ordered and *records but does not overwrite*
//! duplicates: the first entry wins, all colliders are retained under a
//! per-name duplicate list for later diagnostic emission. Namespace merging
//! requires two declaration nodes to share the exact same `exports` table
//! object; rather than `Rc<RefCell<_>>` handles, every table lives in one
//! arena and nodes carry a `SymbolTableId` so "the same object" is "the same
//! arena slot".

use indexmap::IndexMap;

use crate::tree::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolTableId(pub u32);

/// Identifies one file's `SyntaxTree` within a `Program`.
/// Symbols are shared across every file in a program, but a bare `NodeId`
/// only makes sense within the tree that allocated it, so every decl
/// reference a symbol carries names its file as well as its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclRef {
    pub file: FileId,
    pub node: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    /// Bound to a declaration node (model, interface, union, enum, alias,
    /// namespace, operation, template parameter as a type-position name).
    Type { decl: DeclRef },
    /// An external-module decorator function; name always starts with `@`.
    Decorator { originating_path: String },
    /// A `using N;` import of a namespace's exports. `duplicate` is set when
    /// another `using` in the same file already re-imports this name.
    Using { target: SymbolId, duplicate: bool },
    /// A template parameter or other scoped local that isn't itself a type
    /// declaration.
    Local { decl: DeclRef },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: IndexMap<String, SymbolId>,
    duplicates: IndexMap<String, Vec<SymbolId>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `symbol` under `name`. If `name` is already bound, the
    /// existing binding is untouched and `symbol` is appended to the
    /// duplicate list for `name`; returns whether this was a fresh name.
    pub fn declare(&mut self, name: &str, symbol: SymbolId) -> bool {
        if self.entries.contains_key(name) {
            self.duplicates.entry(name.to_string()).or_default().push(symbol);
            false
        } else {
            self.entries.insert(name.to_string(), symbol);
            true
        }
    }

    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.entries.get(name).copied()
    }

    pub fn duplicates_of(&self, name: &str) -> &[SymbolId] {
        self.duplicates.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn all_duplicates(&self) -> impl Iterator<Item = (&str, &[SymbolId])> {
        self.duplicates.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SymbolId)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Owns every `Symbol` and `SymbolTable` for one program.
#[derive(Debug, Default)]
pub struct SymbolArena {
    symbols: Vec<Symbol>,
    tables: Vec<SymbolTable>,
}

impl SymbolArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_symbol(&mut self, symbol: Symbol) -> SymbolId {
        self.symbols.push(symbol);
        SymbolId((self.symbols.len() - 1) as u32)
    }

    pub fn alloc_table(&mut self) -> SymbolTableId {
        self.tables.push(SymbolTable::new());
        SymbolTableId((self.tables.len() - 1) as u32)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn table(&self, id: SymbolTableId) -> &SymbolTable {
        &self.tables[id.0 as usize]
    }

    pub fn table_mut(&mut self, id: SymbolTableId) -> &mut SymbolTable {
        &mut self.tables[id.0 as usize]
    }

    pub fn table_ids(&self) -> impl Iterator<Item = SymbolTableId> {
        (0..self.tables.len() as u32).map(SymbolTableId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_entry_wins_duplicates_are_retained() {
        let mut arena = SymbolArena::new();
        let table = arena.alloc_table();
        let file = FileId(0);
        let a = arena.alloc_symbol(Symbol { name: "X".into(), kind: SymbolKind::Local { decl: DeclRef { file, node: NodeId(0) } } });
        let b = arena.alloc_symbol(Symbol { name: "X".into(), kind: SymbolKind::Local { decl: DeclRef { file, node: NodeId(1) } } });
        assert!(arena.table_mut(table).declare("X", a));
        assert!(!arena.table_mut(table).declare("X", b));
        assert_eq!(arena.table(table).get("X"), Some(a));
        assert_eq!(arena.table(table).duplicates_of("X"), &[b]);
    }
}
