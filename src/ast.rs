//! Abstract Syntax Tree for cipr
//!
//! Nodes live in a single append-only [`Arena`] and refer to each other by
//! [`NodeId`]. A missing child (an omitted `else`, a bare `let x;`, a
//! declaration that failed to parse) is the [`NodeId::NONE`] sentinel.

use std::fmt;
use std::rc::Rc;

use crate::token::{Literal, Token};

/// Index of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// "No node"
    pub const NONE: NodeId = NodeId(usize::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "#none")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Node kinds
///
/// Child layout per kind:
///
/// | kind        | token          | children                           |
/// |-------------|----------------|------------------------------------|
/// | `StmtList`  | last token     | declarations                       |
/// | `VarDecl`   | name           | `[initializer?]`                   |
/// | `Echo`      | `echo`         | `[expr]`                           |
/// | `ExprStmt`  | `;`            | `[expr]`                           |
/// | `Block`     | `{`            | declarations                       |
/// | `If`        | `if`           | `[cond, then, else?]`              |
/// | `While`     | `while`        | `[cond, body]`                     |
/// | `Function`  | name           | `[param..., body block]`           |
/// | `Return`    | `return`       | `[value?]`                         |
/// | `Param`     | name           | `[]`                               |
/// | `Literal`   | literal token  | `[]`, payload in `literal`         |
/// | `Grouping`  | `(`            | `[expr]`                           |
/// | `Unary`     | operator       | `[operand]`                        |
/// | `Binary`    | operator       | `[left, right]`                    |
/// | `Logical`   | `and` / `or`   | `[left, right]`                    |
/// | `Variable`  | name           | `[]`                               |
/// | `Assign`    | name           | `[value]`                          |
/// | `Call`      | `)`            | `[callee, arg...]`                 |
/// | `Array`     | `[`            | elements                           |
/// | `Index`     | `]`            | `[target, index]`                  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    // Statements
    StmtList,
    VarDecl,
    Echo,
    ExprStmt,
    Block,
    If,
    While,
    Function,
    Return,
    Param,

    // Expressions
    Literal,
    Grouping,
    Unary,
    Binary,
    Logical,
    Variable,
    Assign,
    Call,
    Array,
    Index,
}

/// Literal payload stored on a node
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
}

impl From<&Literal> for LiteralValue {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Number(n) => LiteralValue::Number(*n),
            Literal::String(s) => LiteralValue::String(Rc::from(s.as_str())),
        }
    }
}

/// A single AST node
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub token: Token,
    pub literal: Option<LiteralValue>,
    pub children: Vec<NodeId>,
}

impl Node {
    /// The `n`th child, or [`NodeId::NONE`] if there are fewer children.
    pub fn child(&self, n: usize) -> NodeId {
        self.children.get(n).copied().unwrap_or(NodeId::NONE)
    }

    pub fn name(&self) -> &str {
        &self.token.lexeme
    }
}

/// Append-only node store
///
/// Nodes are reference counted so the interpreter can hold one while it
/// recurses with mutable access to itself.
#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<Rc<Node>>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its index.
    ///
    /// Children must already be in the arena (or be [`NodeId::NONE`]), which
    /// keeps the structure acyclic.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        token: Token,
        literal: Option<LiteralValue>,
        children: Vec<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        debug_assert!(
            children.iter().all(|c| c.is_none() || c.0 < id.0),
            "child index not yet allocated"
        );
        self.nodes.push(Rc::new(Node {
            kind,
            token,
            literal,
            children,
        }));
        id
    }

    /// Borrow a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` is [`NodeId::NONE`] or was not returned by this arena.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// A shared handle to a node, if `id` refers to one.
    pub fn node(&self, id: NodeId) -> Option<Rc<Node>> {
        self.nodes.get(id.0).cloned()
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn number(arena: &mut Arena, n: f64) -> NodeId {
        arena.add_node(
            NodeKind::Literal,
            Token::synthetic(TokenKind::Number, n.to_string()),
            Some(LiteralValue::Number(n)),
            vec![],
        )
    }

    #[test]
    fn indices_are_sequential_and_stable() {
        let mut arena = Arena::new();
        let a = number(&mut arena, 1.0);
        let b = number(&mut arena, 2.0);
        let sum = arena.add_node(
            NodeKind::Binary,
            Token::synthetic(TokenKind::Plus, "+"),
            None,
            vec![a, b],
        );

        assert_eq!((a.index(), b.index(), sum.index()), (0, 1, 2));
        assert_eq!(arena.size(), 3);
        assert_eq!(arena.get(sum).children, vec![a, b]);
        assert_eq!(arena.get(a).literal, Some(LiteralValue::Number(1.0)));
    }

    #[test]
    fn none_sentinel() {
        let mut arena = Arena::new();
        let decl = arena.add_node(
            NodeKind::VarDecl,
            Token::synthetic(TokenKind::Ident, "x"),
            None,
            vec![NodeId::NONE],
        );
        assert!(arena.get(decl).child(0).is_none());
        assert!(arena.get(decl).child(5).is_none());
        assert!(arena.node(NodeId::NONE).is_none());
    }

    #[test]
    fn clear_empties_the_arena() {
        let mut arena = Arena::new();
        number(&mut arena, 1.0);
        arena.clear();
        assert!(arena.is_empty());
    }
}
