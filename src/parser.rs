//! Parser for cipr
//!
//! Recursive descent over the token stream, emitting nodes into an
//! [`Arena`]. A syntax error inside a declaration is recorded, the parser
//! resynchronizes at the next statement boundary, and the failed
//! declaration becomes [`NodeId::NONE`] in the enclosing list.

use crate::ast::{Arena, LiteralValue, NodeId, NodeKind};
use crate::error::{CiprError, ErrorKind, Result};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenKind};

/// The parser state
pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    arena: &'a mut Arena,
    errors: Vec<CiprError>,
}

impl<'a> Parser<'a> {
    /// Create a parser that appends nodes to `arena`.
    ///
    /// `tokens` must end with an `Eof` token, as [`crate::Lexer`] produces.
    pub fn new(tokens: Vec<Token>, arena: &'a mut Arena) -> Self {
        Self {
            tokens,
            current: 0,
            arena,
            errors: Vec::new(),
        }
    }

    /// Parse the whole token stream into a `StmtList` node.
    pub fn parse(&mut self) -> NodeId {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            statements.push(self.declaration());
        }

        let token = self.peek().clone();
        let root = self.arena.add_node(NodeKind::StmtList, token, None, statements);
        tracing::debug!(root = %root, nodes = self.arena.size(), errors = self.errors.len(), "parsed program");
        root
    }

    pub fn take_errors(&mut self) -> Vec<CiprError> {
        std::mem::take(&mut self.errors)
    }

    // ==================== Declarations ====================

    fn declaration(&mut self) -> NodeId {
        let result = if self.match_token(TokenKind::Let) {
            self.let_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(id) => id,
            Err(err) => {
                tracing::debug!(error = %err, "recovering from syntax error");
                self.errors.push(err);
                self.synchronize();
                NodeId::NONE
            }
        }
    }

    fn let_declaration(&mut self) -> Result<NodeId> {
        let name = self.expect(TokenKind::Ident, "expected variable name")?.clone();

        let initializer = if self.match_token(TokenKind::Equal) {
            self.expression()?
        } else {
            NodeId::NONE
        };

        self.expect(TokenKind::Semicolon, "expected ';' after variable declaration")?;

        Ok(self.add(NodeKind::VarDecl, name, vec![initializer]))
    }

    fn function_declaration(&mut self) -> Result<NodeId> {
        let name = self.expect(TokenKind::Ident, "expected function name")?.clone();

        self.expect(TokenKind::LeftParen, "expected '(' after function name")?;

        let mut children = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                let param = self.expect(TokenKind::Ident, "expected parameter name")?.clone();
                children.push(self.add(NodeKind::Param, param, vec![]));
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(TokenKind::RightParen, "expected ')' after parameters")?;
        let brace = self.expect(TokenKind::LeftBrace, "expected '{' before function body")?.clone();

        let body = self.block_statements()?;
        children.push(self.add(NodeKind::Block, brace, body));

        Ok(self.add(NodeKind::Function, name, children))
    }

    // ==================== Statements ====================

    fn statement(&mut self) -> Result<NodeId> {
        ensure_sufficient_stack(|| self.statement_inner())
    }

    fn statement_inner(&mut self) -> Result<NodeId> {
        if self.match_token(TokenKind::Fn) {
            self.function_declaration()
        } else if self.match_token(TokenKind::Echo) {
            self.echo_statement()
        } else if self.match_token(TokenKind::If) {
            self.if_statement()
        } else if self.match_token(TokenKind::While) {
            self.while_statement()
        } else if self.match_token(TokenKind::Return) {
            self.return_statement()
        } else if self.match_token(TokenKind::LeftBrace) {
            let brace = self.previous().clone();
            let statements = self.block_statements()?;
            Ok(self.add(NodeKind::Block, brace, statements))
        } else {
            self.expression_statement()
        }
    }

    fn echo_statement(&mut self) -> Result<NodeId> {
        let keyword = self.previous().clone();
        let value = self.expression()?;
        self.expect(TokenKind::Semicolon, "expected ';' after value")?;
        Ok(self.add(NodeKind::Echo, keyword, vec![value]))
    }

    fn expression_statement(&mut self) -> Result<NodeId> {
        let expr = self.expression()?;
        let semicolon = self.expect(TokenKind::Semicolon, "expected ';' after expression")?.clone();
        Ok(self.add(NodeKind::ExprStmt, semicolon, vec![expr]))
    }

    fn if_statement(&mut self) -> Result<NodeId> {
        let keyword = self.previous().clone();

        self.expect(TokenKind::LeftParen, "expected '(' after 'if'")?;
        let condition = self.expression()?;
        self.expect(TokenKind::RightParen, "expected ')' after if condition")?;

        let then_branch = self.statement()?;
        let else_branch = if self.match_token(TokenKind::Else) {
            self.statement()?
        } else {
            NodeId::NONE
        };

        Ok(self.add(NodeKind::If, keyword, vec![condition, then_branch, else_branch]))
    }

    fn while_statement(&mut self) -> Result<NodeId> {
        let keyword = self.previous().clone();

        self.expect(TokenKind::LeftParen, "expected '(' after 'while'")?;
        let condition = self.expression()?;
        self.expect(TokenKind::RightParen, "expected ')' after while condition")?;

        let body = self.statement()?;

        Ok(self.add(NodeKind::While, keyword, vec![condition, body]))
    }

    fn return_statement(&mut self) -> Result<NodeId> {
        let keyword = self.previous().clone();

        let value = if self.check(TokenKind::Semicolon) {
            NodeId::NONE
        } else {
            self.expression()?
        };

        self.expect(TokenKind::Semicolon, "expected ';' after return value")?;
        Ok(self.add(NodeKind::Return, keyword, vec![value]))
    }

    /// Declarations up to and including the closing `}`.
    fn block_statements(&mut self) -> Result<Vec<NodeId>> {
        let mut statements = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration());
        }

        self.expect(TokenKind::RightBrace, "expected '}' after block")?;

        Ok(statements)
    }

    // ==================== Expressions ====================

    fn expression(&mut self) -> Result<NodeId> {
        ensure_sufficient_stack(|| self.assignment())
    }

    fn assignment(&mut self) -> Result<NodeId> {
        let expr = self.or_expr()?;

        if self.match_token(TokenKind::Equal) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            let target = self.arena.get(expr);
            if target.kind == NodeKind::Variable {
                let name = target.token.clone();
                return Ok(self.add(NodeKind::Assign, name, vec![value]));
            }

            // Reported, but the surrounding statement still parses
            self.errors.push(CiprError::at(ErrorKind::InvalidAssignmentTarget, &equals));
        }

        Ok(expr)
    }

    fn or_expr(&mut self) -> Result<NodeId> {
        let mut left = self.and_expr()?;

        while self.match_token(TokenKind::Or) {
            let op = self.previous().clone();
            let right = self.and_expr()?;
            left = self.add(NodeKind::Logical, op, vec![left, right]);
        }

        Ok(left)
    }

    fn and_expr(&mut self) -> Result<NodeId> {
        let mut left = self.equality()?;

        while self.match_token(TokenKind::And) {
            let op = self.previous().clone();
            let right = self.equality()?;
            left = self.add(NodeKind::Logical, op, vec![left, right]);
        }

        Ok(left)
    }

    fn equality(&mut self) -> Result<NodeId> {
        self.binary_level(&[TokenKind::EqualEqual, TokenKind::BangEqual], Self::comparison)
    }

    fn comparison(&mut self) -> Result<NodeId> {
        self.binary_level(
            &[
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<NodeId> {
        self.binary_level(&[TokenKind::Plus, TokenKind::Minus], Self::factor)
    }

    fn factor(&mut self) -> Result<NodeId> {
        self.binary_level(&[TokenKind::Star, TokenKind::Slash], Self::unary)
    }

    /// One left-associative precedence level
    fn binary_level(
        &mut self,
        operators: &[TokenKind],
        operand: fn(&mut Self) -> Result<NodeId>,
    ) -> Result<NodeId> {
        let mut left = operand(self)?;

        while operators.iter().any(|&op| self.match_token(op)) {
            let op = self.previous().clone();
            let right = operand(self)?;
            left = self.add(NodeKind::Binary, op, vec![left, right]);
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<NodeId> {
        ensure_sufficient_stack(|| {
            if self.match_token(TokenKind::Bang) || self.match_token(TokenKind::Minus) {
                let op = self.previous().clone();
                let operand = self.unary()?;
                return Ok(self.add(NodeKind::Unary, op, vec![operand]));
            }

            self.call()
        })
    }

    fn call(&mut self) -> Result<NodeId> {
        let mut expr = self.primary()?;

        loop {
            if self.match_token(TokenKind::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_token(TokenKind::LeftBracket) {
                let index = self.expression()?;
                let bracket = self.expect(TokenKind::RightBracket, "expected ']' after index")?.clone();
                expr = self.add(NodeKind::Index, bracket, vec![expr, index]);
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: NodeId) -> Result<NodeId> {
        let mut children = vec![callee];

        if !self.check(TokenKind::RightParen) {
            loop {
                children.push(self.expression()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        let paren = self.expect(TokenKind::RightParen, "expected ')' after arguments")?.clone();

        Ok(self.add(NodeKind::Call, paren, children))
    }

    fn primary(&mut self) -> Result<NodeId> {
        let token = self.peek().clone();

        let literal = match token.kind {
            TokenKind::False => Some(LiteralValue::Bool(false)),
            TokenKind::True => Some(LiteralValue::Bool(true)),
            TokenKind::Null => Some(LiteralValue::Null),
            TokenKind::Number | TokenKind::String => token.literal.as_ref().map(LiteralValue::from),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(self.arena.add_node(NodeKind::Literal, token, Some(literal), vec![]));
        }

        match token.kind {
            TokenKind::Ident => {
                self.advance();
                Ok(self.add(NodeKind::Variable, token, vec![]))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(TokenKind::RightParen, "expected ')' after expression")?;
                Ok(self.add(NodeKind::Grouping, token, vec![expr]))
            }
            TokenKind::LeftBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(TokenKind::RightBracket) {
                    loop {
                        elements.push(self.expression()?);
                        if !self.match_token(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RightBracket, "expected ']' after array elements")?;
                Ok(self.add(NodeKind::Array, token, elements))
            }
            _ => Err(CiprError::at(ErrorKind::ExpectedExpression, &token)),
        }
    }

    // ==================== Helpers ====================

    fn add(&mut self, kind: NodeKind, token: Token, children: Vec<NodeId>) -> NodeId {
        self.arena.add_node(kind, token, None, children)
    }

    /// Discard tokens until just past a `;` or just before a token that
    /// starts a new statement.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            if self.peek().kind.starts_statement() {
                return;
            }
            self.advance();
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<&Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(CiprError::at(ErrorKind::Expected(message.to_string()), self.peek()))
        }
    }
}
