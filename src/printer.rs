//! Parenthesized prefix rendering of the AST, for debugging.

use crate::ast::{Arena, LiteralValue, NodeId, NodeKind};
use crate::stack::ensure_sufficient_stack;
use crate::value::format_number;

pub struct AstPrinter<'a> {
    arena: &'a Arena,
}

impl<'a> AstPrinter<'a> {
    pub fn new(arena: &'a Arena) -> Self {
        Self { arena }
    }

    /// Render `id`. Absent nodes render as the empty string.
    pub fn print(&self, id: NodeId) -> String {
        ensure_sufficient_stack(|| self.print_node(id))
    }

    fn print_node(&self, id: NodeId) -> String {
        if id.is_none() {
            return String::new();
        }

        let node = self.arena.get(id);
        match node.kind {
            NodeKind::Literal => match &node.literal {
                Some(LiteralValue::Null) | None => "null".to_string(),
                Some(LiteralValue::Bool(b)) => b.to_string(),
                Some(LiteralValue::Number(n)) => format_number(*n),
                Some(LiteralValue::String(s)) => format!("{:?}", s.as_ref()),
            },
            NodeKind::Variable | NodeKind::Param => node.name().to_string(),
            NodeKind::Unary | NodeKind::Binary | NodeKind::Logical => {
                self.parenthesize(node.name(), &node.children)
            }
            NodeKind::Grouping => self.parenthesize("group", &node.children),
            NodeKind::StmtList => self.parenthesize("list", &node.children),
            NodeKind::Echo => self.parenthesize("echo", &node.children),
            NodeKind::ExprStmt => self.parenthesize("expr", &node.children),
            NodeKind::Block => self.parenthesize("block", &node.children),
            NodeKind::VarDecl => self.parenthesize(&format!("var {}", node.name()), &node.children),
            NodeKind::Assign => {
                self.parenthesize(&format!("assign {}", node.name()), &node.children)
            }
            NodeKind::If => self.parenthesize("if", &node.children),
            NodeKind::While => self.parenthesize("while", &node.children),
            NodeKind::Return => self.parenthesize("return", &node.children),
            NodeKind::Call => self.parenthesize("call", &node.children),
            NodeKind::Array => self.parenthesize("array", &node.children),
            NodeKind::Index => self.parenthesize("index", &node.children),
            NodeKind::Function => {
                let (body, params) = match node.children.split_last() {
                    Some((body, params)) => (*body, params),
                    None => (NodeId::NONE, &[][..]),
                };
                let params: Vec<String> = params.iter().map(|&p| self.print(p)).collect();
                let head = format!("fn {} ({})", node.name(), params.join(" "));
                self.parenthesize(&head, &[body])
            }
        }
    }

    fn parenthesize(&self, name: &str, children: &[NodeId]) -> String {
        let mut out = format!("({}", name);
        for &child in children.iter().filter(|c| c.is_some()) {
            out.push(' ');
            out.push_str(&self.print(child));
        }
        out.push(')');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenKind};

    #[test]
    fn prints_literals_and_skips_absent_children() {
        let mut arena = Arena::new();
        let value = arena.add_node(
            NodeKind::Literal,
            Token::synthetic(TokenKind::Number, "3.1400"),
            Some(LiteralValue::Number(3.14)),
            vec![],
        );
        let decl = arena.add_node(
            NodeKind::VarDecl,
            Token::synthetic(TokenKind::Ident, "pi"),
            None,
            vec![value],
        );
        let empty = arena.add_node(
            NodeKind::VarDecl,
            Token::synthetic(TokenKind::Ident, "e"),
            None,
            vec![NodeId::NONE],
        );
        let list = arena.add_node(
            NodeKind::StmtList,
            Token::synthetic(TokenKind::Eof, ""),
            None,
            vec![decl, NodeId::NONE, empty],
        );

        let printer = AstPrinter::new(&arena);
        assert_eq!(printer.print(list), "(list (var pi 3.14) (var e))");
        assert_eq!(printer.print(NodeId::NONE), "");
    }
}
